//! Error types for the conversational core.

use std::time::Duration;

use lexi_core::error::LexiError;

/// Errors from the query client and submission controller.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("request cancelled")]
    Cancelled,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("storage error: {0}")]
    StorageError(String),
}

impl ChatError {
    /// Text shown in the transcript when a request fails.
    ///
    /// Contract violations get a generic message; the detail goes to the log.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::Timeout(after) => format!(
                "The legal research service did not respond within {} seconds. Please try again.",
                after.as_secs()
            ),
            ChatError::Cancelled => "Request cancelled.".to_string(),
            ChatError::Transport(_) => {
                "Could not reach the legal research service. Please try again.".to_string()
            }
            ChatError::MalformedPayload(_) | ChatError::StorageError(_) => {
                "Something went wrong while generating an answer. Please try again.".to_string()
            }
        }
    }
}

impl From<LexiError> for ChatError {
    fn from(err: LexiError) -> Self {
        match err {
            LexiError::Io(e) => ChatError::Transport(e.to_string()),
            LexiError::Serialization(msg) => ChatError::MalformedPayload(msg),
            LexiError::InvalidUrl { .. } => ChatError::MalformedPayload(err.to_string()),
            other => ChatError::StorageError(other.to_string()),
        }
    }
}
