use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events emitted by the conversation core for the view layer.
///
/// The terminal renderer subscribes to these to redraw the transcript and
/// scroll to the latest exchange.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
#[non_exhaustive]
pub enum ConversationEvent {
    /// An exchange was appended at `index`.
    ExchangeAppended {
        exchange_id: Uuid,
        index: usize,
        timestamp: DateTime<Utc>,
    },

    /// The controller entered or left the awaiting-response state.
    LoadingChanged {
        loading: bool,
        timestamp: DateTime<Utc>,
    },

    /// A submission was dropped without reaching the backend.
    SubmissionIgnored {
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The in-flight request was cancelled by the user.
    RequestCancelled { timestamp: DateTime<Utc> },
}

impl ConversationEvent {
    /// Returns the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            ConversationEvent::ExchangeAppended { timestamp, .. }
            | ConversationEvent::LoadingChanged { timestamp, .. }
            | ConversationEvent::SubmissionIgnored { timestamp, .. }
            | ConversationEvent::RequestCancelled { timestamp } => *timestamp,
        }
    }

    /// Returns a short event name for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            ConversationEvent::ExchangeAppended { .. } => "exchange_appended",
            ConversationEvent::LoadingChanged { .. } => "loading_changed",
            ConversationEvent::SubmissionIgnored { .. } => "submission_ignored",
            ConversationEvent::RequestCancelled { .. } => "request_cancelled",
        }
    }
}
