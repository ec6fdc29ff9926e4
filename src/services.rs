//! Client-side orchestration for the remote collaborators: chat assistant, avatar generation and
//! the profile store. Transports are traits; nothing here talks to the network directly.

pub mod chat;
pub mod generation;
pub mod profile;

pub use chat::{ChatBackend, ChatError, ChatMessage, ChatRole, ChatSession, SendOutcome};
pub use generation::{generate, poll_generation, GenerationBackend, GenerationError, GenerationRequest, GenerationStatus, JobId};
pub use profile::{
    load_profile, profile_key, save_profile, update_avatar, update_dorm, InMemoryProfileStore, ProfileError, ProfileStore,
    UserProfile,
};

use std::future::Future;
use std::pin::Pin;
use tokio::sync::watch;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Abort signal shared with an in-flight request.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

/// Owner side of a [`CancelToken`]. Dropping it without cancelling leaves the token live forever.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn token(&self) -> CancelToken {
        CancelToken { rx: self.tx.subscribe() }
    }
}

impl CancelToken {
    /// A token nobody can cancel.
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the paired handle cancels.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
