use super::{BoxFuture, CancelToken};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;
use tracing::{debug, warn};
use uuid::Uuid;

pub const GREETING: &str = "Hi! I'm your Princeton Campus AI assistant. I can help you learn about the campus, \
buildings, eating clubs, or answer any questions you have about the 3D visualization. How can I help you?";
pub const APOLOGY: &str = "I'm sorry, I encountered an error. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: ChatRole,
    pub text: String,
    pub timestamp: SystemTime,
}

impl ChatMessage {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(), role, text: text.into(), timestamp: SystemTime::now() }
    }
}

/// Message shape the completion endpoint accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: ChatRole,
    pub content: String,
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        Self { role: message.role, content: message.text.clone() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    Transport(String),
    Rejected { status: u16, detail: String },
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::Transport(msg) => write!(f, "chat transport error: {msg}"),
            ChatError::Rejected { status, detail } => write!(f, "chat request rejected ({status}): {detail}"),
        }
    }
}

impl std::error::Error for ChatError {}

pub trait ChatBackend: Send + Sync {
    /// Returns the assistant reply for the full ordered history.
    fn complete(&self, history: Vec<WireMessage>) -> BoxFuture<'_, Result<String, ChatError>>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    Replied,
    /// The backend failed; the apology was appended instead.
    Failed(ChatError),
    Rejected,
    Cancelled,
}

/// Append-only conversation with a single in-flight request at a time.
#[derive(Debug, Clone)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    loading: bool,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self { messages: vec![ChatMessage::new(ChatRole::Assistant, GREETING)], loading: false }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Appends the user message and returns the history to send, or `None` when the send is refused.
    pub fn begin(&mut self, text: &str) -> Option<Vec<WireMessage>> {
        let trimmed = text.trim();
        if trimmed.is_empty() || self.loading {
            return None;
        }
        self.messages.push(ChatMessage::new(ChatRole::User, trimmed));
        self.loading = true;
        Some(self.messages.iter().map(WireMessage::from).collect())
    }

    pub fn finish(&mut self, result: Result<String, ChatError>) -> SendOutcome {
        self.loading = false;
        match result {
            Ok(reply) => {
                self.messages.push(ChatMessage::new(ChatRole::Assistant, reply));
                SendOutcome::Replied
            }
            Err(err) => {
                warn!(error = %err, "chat request failed");
                self.messages.push(ChatMessage::new(ChatRole::Assistant, APOLOGY));
                SendOutcome::Failed(err)
            }
        }
    }

    pub fn abandon(&mut self) {
        self.loading = false;
    }

    pub async fn send(&mut self, backend: &dyn ChatBackend, text: &str, mut cancel: CancelToken) -> SendOutcome {
        let Some(history) = self.begin(text) else {
            return SendOutcome::Rejected;
        };
        debug!(count = history.len(), "sending chat history");
        tokio::select! {
            result = backend.complete(history) => self.finish(result),
            _ = cancel.cancelled() => {
                self.abandon();
                SendOutcome::Cancelled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::cancel_pair;
    use std::sync::Mutex;

    struct Scripted {
        reply: Result<String, ChatError>,
        seen: Mutex<Vec<Vec<WireMessage>>>,
    }

    impl Scripted {
        fn new(reply: Result<String, ChatError>) -> Self {
            Self { reply, seen: Mutex::new(Vec::new()) }
        }
    }

    impl ChatBackend for Scripted {
        fn complete(&self, history: Vec<WireMessage>) -> BoxFuture<'_, Result<String, ChatError>> {
            self.seen.lock().unwrap().push(history);
            let reply = self.reply.clone();
            Box::pin(async move { reply })
        }
    }

    struct Stalled;

    impl ChatBackend for Stalled {
        fn complete(&self, _history: Vec<WireMessage>) -> BoxFuture<'_, Result<String, ChatError>> {
            Box::pin(std::future::pending::<Result<String, ChatError>>())
        }
    }

    #[test]
    fn session_opens_with_greeting() {
        let session = ChatSession::new();
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, ChatRole::Assistant);
        assert_eq!(session.messages()[0].text, GREETING);
    }

    #[test]
    fn blank_input_and_concurrent_sends_are_refused() {
        let mut session = ChatSession::new();
        assert!(session.begin("   ").is_none());
        assert!(session.begin("where is firestone?").is_some());
        assert!(session.is_loading());
        assert!(session.begin("again").is_none());
        assert_eq!(session.messages().len(), 2);
    }

    #[tokio::test]
    async fn reply_is_appended_after_full_history() {
        let backend = Scripted::new(Ok("It's next to the chapel.".into()));
        let mut session = ChatSession::new();
        let outcome = session.send(&backend, " Where is Firestone? ", CancelToken::never()).await;
        assert_eq!(outcome, SendOutcome::Replied);
        assert!(!session.is_loading());
        let texts: Vec<_> = session.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec![GREETING, "Where is Firestone?", "It's next to the chapel."]);
        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].len(), 2);
        assert_eq!(seen[0][1], WireMessage { role: ChatRole::User, content: "Where is Firestone?".into() });
    }

    #[tokio::test]
    async fn failure_appends_apology() {
        let backend = Scripted::new(Err(ChatError::Rejected { status: 500, detail: "boom".into() }));
        let mut session = ChatSession::new();
        let outcome = session.send(&backend, "hello", CancelToken::never()).await;
        assert!(matches!(outcome, SendOutcome::Failed(ChatError::Rejected { status: 500, .. })));
        assert_eq!(session.messages().last().map(|m| m.text.as_str()), Some(APOLOGY));
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn cancelled_send_appends_no_reply() {
        let (handle, token) = cancel_pair();
        handle.cancel();
        let mut session = ChatSession::new();
        let outcome = session.send(&Stalled, "hello", token).await;
        assert_eq!(outcome, SendOutcome::Cancelled);
        assert_eq!(session.messages().len(), 2);
        assert!(!session.is_loading());
    }

    #[test]
    fn wire_role_serializes_lowercase() {
        let wire = WireMessage { role: ChatRole::Assistant, content: "hi".into() };
        let json = serde_json::to_string(&wire).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }
}
