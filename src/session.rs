//! Client-side chat session: the transcript, the selected mode and one
//! request/response cycle per user turn.

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::api::{ChatRequest, ChatResponse};
use crate::mode::Mode;

pub const DEFAULT_FAILURE_TEXT: &str = "Sorry, the server could not answer this message.";
pub const CANCELLED_TEXT: &str = "The request was cancelled before the server answered.";
pub const CONNECTION_FAILURE_TEXT: &str = "Sorry, a connection error occurred. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Plain,
    RetrievalResult,
}

/// One transcript entry. Never changed once pushed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<MessageKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<f64>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            kind: None,
            sources: None,
            elapsed_seconds: None,
        }
    }

    pub fn is_bot(&self) -> bool {
        self.role == Role::Bot
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("server responded with status {status}")]
    Server {
        status: u16,
        /// The `error` field of the response body, when there was one.
        message: Option<String>,
    },
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("no response after {0:?}")]
    Timeout(Duration),
    #[error("could not decode server response: {0}")]
    Decode(String),
    #[error("request was cancelled before a reply arrived")]
    Cancelled,
}

/// Carries a chat request to the dispatcher and brings back its reply.
pub trait ChatTransport: Send + Sync {
    fn send<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> BoxFuture<'a, Result<ChatResponse, TransportError>>;
}

/// A submitted turn waiting for its reply.
#[derive(Debug)]
pub struct PendingTurn {
    pub request: ChatRequest,
    mode: Mode,
    started: Instant,
}

pub struct ChatSession<T> {
    transport: T,
    mode: Mode,
    input: String,
    messages: Vec<Message>,
    loading: bool,
    timeout: Option<Duration>,
}

impl<T: ChatTransport> ChatSession<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            mode: Mode::default(),
            input: String::new(),
            messages: Vec::new(),
            loading: false,
            timeout: None,
        }
    }

    /// Bound each request; an expired request is answered with a timeout message.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Only affects the next submission.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn reset(&mut self) {
        self.messages.clear();
    }

    /// Sends `text` and waits for the reply. Returns `false` when the text is
    /// blank or another turn is still in flight, in which case nothing changes.
    ///
    /// Dropping the returned future mid-flight still completes the turn with a
    /// cancellation message and clears the busy flag.
    pub async fn submit(&mut self, text: &str) -> bool {
        let Some(turn) = self.begin_turn(text) else {
            return false;
        };
        let request = turn.request.clone();

        let Self {
            transport,
            messages,
            loading,
            timeout,
            ..
        } = self;
        let guard = TurnGuard {
            messages,
            loading,
            turn: Some(turn),
        };

        let outcome = match *timeout {
            Some(limit) => tokio::time::timeout(limit, transport.send(&request))
                .await
                .unwrap_or(Err(TransportError::Timeout(limit))),
            None => transport.send(&request).await,
        };

        guard.finish(outcome);
        true
    }

    /// Submits whatever is in the input buffer.
    pub async fn submit_input(&mut self) -> bool {
        let text = self.input.clone();
        self.submit(&text).await
    }

    /// Records the user message and marks the session busy.
    pub fn begin_turn(&mut self, text: &str) -> Option<PendingTurn> {
        if text.trim().is_empty() || self.loading {
            return None;
        }

        self.messages.push(Message::user(text));
        self.input.clear();
        self.loading = true;

        Some(PendingTurn {
            request: ChatRequest {
                message: text.to_string(),
                mode: Some(self.mode.as_str().to_string()),
            },
            mode: self.mode,
            started: Instant::now(),
        })
    }

    /// Appends exactly one bot message for `turn` and clears the busy flag.
    pub fn finish_turn(&mut self, turn: PendingTurn, outcome: Result<ChatResponse, TransportError>) {
        record_reply(&mut self.messages, &mut self.loading, turn, outcome);
    }
}

/// Completes the turn it holds when dropped before `finish`.
struct TurnGuard<'s> {
    messages: &'s mut Vec<Message>,
    loading: &'s mut bool,
    turn: Option<PendingTurn>,
}

impl TurnGuard<'_> {
    fn finish(mut self, outcome: Result<ChatResponse, TransportError>) {
        if let Some(turn) = self.turn.take() {
            record_reply(&mut *self.messages, &mut *self.loading, turn, outcome);
        }
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        if let Some(turn) = self.turn.take() {
            record_reply(
                &mut *self.messages,
                &mut *self.loading,
                turn,
                Err(TransportError::Cancelled),
            );
        }
    }
}

fn record_reply(
    messages: &mut Vec<Message>,
    loading: &mut bool,
    turn: PendingTurn,
    outcome: Result<ChatResponse, TransportError>,
) {
    let elapsed = elapsed_seconds(turn.started);

    let message = match outcome {
        Ok(response) => {
            debug!(elapsed, "Received chat reply");
            let kind = match turn.mode {
                Mode::Retrieval => MessageKind::RetrievalResult,
                _ => MessageKind::Plain,
            };
            Message {
                role: Role::Bot,
                content: reply_text(&response.reply),
                kind: Some(kind),
                sources: Some(response.sources.unwrap_or_default()),
                elapsed_seconds: Some(elapsed),
            }
        }
        Err(e) => {
            warn!(error = %e, "Chat request failed");
            Message {
                role: Role::Bot,
                content: failure_text(e),
                kind: None,
                sources: None,
                elapsed_seconds: Some(elapsed),
            }
        }
    };

    messages.push(message);
    *loading = false;
}

/// Prefers a `generated_text` field, then the reply itself.
pub fn reply_text(reply: &Value) -> String {
    if let Some(text) = reply.get("generated_text").and_then(Value::as_str) {
        return text.to_string();
    }
    match reply {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn failure_text(error: TransportError) -> String {
    match error {
        TransportError::Server {
            message: Some(message),
            ..
        } if !message.is_empty() => message,
        TransportError::Server { .. } | TransportError::Decode(_) => DEFAULT_FAILURE_TEXT.to_string(),
        TransportError::Connection(_) => CONNECTION_FAILURE_TEXT.to_string(),
        TransportError::Timeout(limit) => {
            format!("The server did not answer within {:?}.", limit)
        }
        TransportError::Cancelled => CANCELLED_TEXT.to_string(),
    }
}

fn elapsed_seconds(started: Instant) -> f64 {
    round_to_hundredths(started.elapsed().as_secs_f64())
}

pub fn round_to_hundredths(seconds: f64) -> f64 {
    (seconds.max(0.0) * 100.0).round() / 100.0
}
