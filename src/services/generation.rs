use super::{BoxFuture, CancelToken};
use crate::config::GenerationConfig;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

pub type JobId = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationRequest {
    Text { description: String },
    Image { image_url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationStatus {
    Pending { progress: Option<u8> },
    Succeeded { glb: Option<String>, gltf: Option<String> },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    StartFailed(String),
    /// A single status check could not be completed.
    Transport(String),
    Failed(String),
    TimedOut { job_id: JobId, attempts: u32 },
    Cancelled,
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::StartFailed(msg) => write!(f, "failed to start generation: {msg}"),
            GenerationError::Transport(msg) => write!(f, "generation status check failed: {msg}"),
            GenerationError::Failed(msg) => write!(f, "generation failed: {msg}"),
            GenerationError::TimedOut { job_id, attempts } => {
                write!(f, "generation job {job_id} still running after {attempts} checks")
            }
            GenerationError::Cancelled => f.write_str("generation cancelled"),
        }
    }
}

impl std::error::Error for GenerationError {}

pub trait GenerationBackend: Send + Sync {
    fn start<'a>(&'a self, request: &'a GenerationRequest) -> BoxFuture<'a, Result<JobId, GenerationError>>;
    fn status<'a>(&'a self, job_id: &'a str) -> BoxFuture<'a, Result<GenerationStatus, GenerationError>>;
}

fn poll_interval(config: &GenerationConfig) -> Duration {
    Duration::try_from_secs_f32(config.poll_interval_secs.max(0.0)).unwrap_or(Duration::from_secs(5))
}

/// Waits out the job, checking once per interval. Failed status checks still use up an attempt.
pub async fn poll_generation(
    backend: &dyn GenerationBackend,
    job_id: &str,
    config: &GenerationConfig,
    mut cancel: CancelToken,
) -> Result<String, GenerationError> {
    let interval = poll_interval(config);
    for attempt in 1..=config.max_attempts {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
        }
        let status = tokio::select! {
            status = backend.status(job_id) => status,
            _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
        };
        match status {
            Ok(GenerationStatus::Pending { progress }) => {
                debug!(job_id, attempt, ?progress, "generation pending");
            }
            Ok(GenerationStatus::Succeeded { glb, gltf }) => {
                return match glb.or(gltf) {
                    Some(url) => {
                        info!(job_id, attempt, "generation finished");
                        Ok(url)
                    }
                    None => Err(GenerationError::Failed("job succeeded without a model url".into())),
                };
            }
            Ok(GenerationStatus::Failed { reason }) => return Err(GenerationError::Failed(reason)),
            Err(err) => warn!(job_id, attempt, error = %err, "generation status check failed"),
        }
    }
    Err(GenerationError::TimedOut { job_id: job_id.to_string(), attempts: config.max_attempts })
}

/// Starts a job and polls it to completion.
pub async fn generate(
    backend: &dyn GenerationBackend,
    request: &GenerationRequest,
    config: &GenerationConfig,
    mut cancel: CancelToken,
) -> Result<String, GenerationError> {
    let job_id = tokio::select! {
        started = backend.start(request) => started?,
        _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
    };
    info!(job_id = %job_id, "generation started");
    poll_generation(backend, &job_id, config, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::cancel_pair;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct Script {
        statuses: Mutex<VecDeque<Result<GenerationStatus, GenerationError>>>,
        checks: Mutex<u32>,
    }

    impl Script {
        fn new(statuses: Vec<Result<GenerationStatus, GenerationError>>) -> Self {
            Self { statuses: Mutex::new(statuses.into()), checks: Mutex::new(0) }
        }

        fn checks(&self) -> u32 {
            *self.checks.lock().unwrap()
        }
    }

    impl GenerationBackend for Script {
        fn start<'a>(&'a self, request: &'a GenerationRequest) -> BoxFuture<'a, Result<JobId, GenerationError>> {
            Box::pin(async move {
                match request {
                    GenerationRequest::Text { description } if description.is_empty() => {
                        Err(GenerationError::StartFailed("empty description".into()))
                    }
                    _ => Ok("job-1".to_string()),
                }
            })
        }

        fn status<'a>(&'a self, _job_id: &'a str) -> BoxFuture<'a, Result<GenerationStatus, GenerationError>> {
            *self.checks.lock().unwrap() += 1;
            let next = self
                .statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(GenerationStatus::Pending { progress: None }));
            Box::pin(async move { next })
        }
    }

    fn pending() -> Result<GenerationStatus, GenerationError> {
        Ok(GenerationStatus::Pending { progress: Some(40) })
    }

    #[tokio::test(start_paused = true)]
    async fn success_prefers_glb() {
        let backend = Script::new(vec![
            pending(),
            Ok(GenerationStatus::Succeeded { glb: Some("a.glb".into()), gltf: Some("a.gltf".into()) }),
        ]);
        let url = poll_generation(&backend, "job-1", &GenerationConfig::default(), CancelToken::never()).await;
        assert_eq!(url, Ok("a.glb".to_string()));
        assert_eq!(backend.checks(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn gltf_used_when_glb_missing() {
        let backend = Script::new(vec![Ok(GenerationStatus::Succeeded { glb: None, gltf: Some("a.gltf".into()) })]);
        let url = poll_generation(&backend, "job-1", &GenerationConfig::default(), CancelToken::never()).await;
        assert_eq!(url, Ok("a.gltf".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_distinct_from_timeout() {
        let backend = Script::new(vec![Ok(GenerationStatus::Failed { reason: "nsfw".into() })]);
        let result = poll_generation(&backend, "job-1", &GenerationConfig::default(), CancelToken::never()).await;
        assert_eq!(result, Err(GenerationError::Failed("nsfw".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn transport_errors_consume_attempts_until_timeout() {
        let config = GenerationConfig { poll_interval_secs: 5.0, max_attempts: 3 };
        let backend = Script::new(vec![Err(GenerationError::Transport("502".into())), pending(), pending()]);
        let started = tokio::time::Instant::now();
        let result = poll_generation(&backend, "job-9", &config, CancelToken::never()).await;
        assert_eq!(result, Err(GenerationError::TimedOut { job_id: "job-9".into(), attempts: 3 }));
        assert_eq!(backend.checks(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_aborts_the_wait() {
        let (handle, token) = cancel_pair();
        handle.cancel();
        let backend = Script::new(Vec::new());
        let result = poll_generation(&backend, "job-1", &GenerationConfig::default(), token).await;
        assert_eq!(result, Err(GenerationError::Cancelled));
        assert_eq!(backend.checks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn generate_reports_start_failures() {
        let backend = Script::new(Vec::new());
        let request = GenerationRequest::Text { description: String::new() };
        let result = generate(&backend, &request, &GenerationConfig::default(), CancelToken::never()).await;
        assert!(matches!(result, Err(GenerationError::StartFailed(_))));
    }

    struct StalledStart;

    impl GenerationBackend for StalledStart {
        fn start<'a>(&'a self, _request: &'a GenerationRequest) -> BoxFuture<'a, Result<JobId, GenerationError>> {
            Box::pin(std::future::pending::<Result<JobId, GenerationError>>())
        }

        fn status<'a>(&'a self, _job_id: &'a str) -> BoxFuture<'a, Result<GenerationStatus, GenerationError>> {
            Box::pin(async { Ok(GenerationStatus::Pending { progress: None }) })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_aborts_a_stalled_start() {
        let (handle, token) = cancel_pair();
        let request = GenerationRequest::Image { image_url: "https://photos/me.jpg".into() };
        let cfg = GenerationConfig::default();
        let job = generate(&StalledStart, &request, &cfg, token);
        let cancel = async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            handle.cancel();
        };
        let (result, ()) =
            tokio::time::timeout(Duration::from_secs(600), async { tokio::join!(job, cancel) }).await.expect("not stalled");
        assert_eq!(result, Err(GenerationError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_start_returns_cancelled() {
        let (handle, token) = cancel_pair();
        handle.cancel();
        let request = GenerationRequest::Text { description: "scarf".into() };
        let result = tokio::time::timeout(
            Duration::from_secs(600),
            generate(&StalledStart, &request, &GenerationConfig::default(), token),
        )
        .await;
        assert_eq!(result, Ok(Err(GenerationError::Cancelled)));
    }
}
