//! Submission state machine.
//!
//! Two states and two transitions:
//! - Idle -> AwaitingResponse (a question was submitted)
//! - AwaitingResponse -> Idle (the request resolved, failed, or was cancelled)

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use lexi_core::error::LexiError;

/// Operational state of the submission controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChatState {
    /// No request in flight. Ready to accept a question.
    #[default]
    Idle,
    /// A question was sent and the answer has not arrived yet.
    AwaitingResponse,
}

impl fmt::Display for ChatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatState::Idle => write!(f, "Idle"),
            ChatState::AwaitingResponse => write!(f, "AwaitingResponse"),
        }
    }
}

impl ChatState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &ChatState) -> bool {
        matches!(
            (self, target),
            (ChatState::Idle, ChatState::AwaitingResponse)
                | (ChatState::AwaitingResponse, ChatState::Idle)
        )
    }

    pub fn is_busy(&self) -> bool {
        *self == ChatState::AwaitingResponse
    }
}

/// Thread-safe state machine for submission state.
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct StateMachine {
    state: Arc<Mutex<ChatState>>,
}

impl StateMachine {
    /// Create a new state machine initialized to `Idle`.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ChatState> {
        // ChatState is Copy; a poisoned guard still holds a valid value.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the current state.
    pub fn current(&self) -> ChatState {
        *self.lock()
    }

    /// Attempt to transition to the target state.
    pub fn transition(&self, target: ChatState) -> Result<(), LexiError> {
        let mut state = self.lock();
        if state.can_transition_to(&target) {
            tracing::debug!("Chat state: {} -> {}", *state, target);
            *state = target;
            Ok(())
        } else {
            Err(LexiError::InvalidTransition {
                from: state.to_string(),
                to: target.to_string(),
            })
        }
    }

    /// Move `Idle -> AwaitingResponse` atomically.
    ///
    /// Returns `false` without changing anything if a request is already in flight.
    pub fn try_begin(&self) -> bool {
        self.transition(ChatState::AwaitingResponse).is_ok()
    }

    /// Force the state machine back to Idle (used for error recovery).
    pub fn reset(&self) {
        let mut state = self.lock();
        if *state != ChatState::Idle {
            tracing::warn!("Chat state machine reset to Idle from {}", *state);
            *state = ChatState::Idle;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
