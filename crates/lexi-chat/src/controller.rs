//! Submission controller: mediates between the draft, the transcript, and
//! the query client.
//!
//! Exactly one question may be in flight. A submission that enters
//! `AwaitingResponse` always ends back in `Idle`, whether the client
//! answers, fails, times out, or is cancelled.

use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use lexi_core::config::LexiConfig;
use lexi_core::events::ConversationEvent;
use lexi_core::types::{AnswerPayload, Exchange};

use crate::client::QueryClient;
use crate::error::ChatError;
use crate::input::{InputAction, InputBuffer, KeyInput};
use crate::state::{ChatState, StateMachine};
use crate::store::Conversation;

/// Capacity of the view event channel.
const EVENT_CAPACITY: usize = 64;

/// Why a submission was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The draft was empty or whitespace only.
    Blank,
    /// A previous question is still awaiting its answer.
    Busy,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::Blank => write!(f, "blank input"),
            IgnoreReason::Busy => write!(f, "a question is already awaiting its answer"),
        }
    }
}

/// Result of one call to `SubmissionController::submit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing was appended and the client was not called.
    Ignored(IgnoreReason),
    /// An answer was appended.
    Answered,
    /// A failure notice was appended. Carries the underlying error text.
    Failed(String),
    /// The request was cancelled and a notice was appended.
    Cancelled,
}

/// Resets the state machine if a submission is abandoned mid-flight, and
/// tells the view that loading stopped.
struct InFlight<'a> {
    state: &'a StateMachine,
    events: &'a broadcast::Sender<ConversationEvent>,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn new(state: &'a StateMachine, events: &'a broadcast::Sender<ConversationEvent>) -> Self {
        Self {
            state,
            events,
            armed: true,
        }
    }

    fn finish(mut self) -> Result<(), ChatError> {
        self.armed = false;
        self.state
            .transition(ChatState::Idle)
            .map_err(ChatError::from)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.reset();
            tracing::debug!("Submission abandoned; back to idle");
            let _ = self.events.send(ConversationEvent::LoadingChanged {
                loading: false,
                timestamp: Utc::now(),
            });
        }
    }
}

/// Owns the conversation, the draft, and the busy flag for one session.
pub struct SubmissionController<C: QueryClient> {
    client: C,
    state: StateMachine,
    conversation: Mutex<Conversation>,
    input: Mutex<InputBuffer>,
    cancel: Mutex<Option<CancellationToken>>,
    events: broadcast::Sender<ConversationEvent>,
    timeout: Option<Duration>,
}

impl<C: QueryClient> SubmissionController<C> {
    /// Controller with an empty single-row draft and no timeout.
    pub fn new(client: C) -> Self {
        Self::with_input(client, InputBuffer::new(1))
    }

    /// Controller starting from the given draft.
    pub fn with_input(client: C, input: InputBuffer) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            client,
            state: StateMachine::new(),
            conversation: Mutex::new(Conversation::with_events(events.clone())),
            input: Mutex::new(input),
            cancel: Mutex::new(None),
            events,
            timeout: None,
        }
    }

    /// Controller configured from the `[client]` and `[chat]` sections.
    pub fn from_config(client: C, config: &LexiConfig) -> Self {
        let input = InputBuffer::with_text(&config.chat.initial_query, config.chat.max_input_rows);
        let timeout = match config.client.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self::with_input(client, input).with_timeout(timeout)
    }

    /// Set the request timeout. `None` waits forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn state(&self) -> ChatState {
        self.state.current()
    }

    /// Whether the loading indicator should be shown.
    pub fn is_loading(&self) -> bool {
        self.state.current().is_busy()
    }

    /// Subscribe to view events (appends, loading changes, rejections).
    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.events.subscribe()
    }

    pub fn conversation_snapshot(&self) -> Result<Vec<Exchange>, ChatError> {
        Ok(self.lock_conversation()?.snapshot())
    }

    pub fn conversation_len(&self) -> Result<usize, ChatError> {
        Ok(self.lock_conversation()?.len())
    }

    /// Copy of the current draft.
    pub fn input(&self) -> Result<InputBuffer, ChatError> {
        Ok(self.lock_input()?.clone())
    }

    pub fn set_input(&self, text: &str) -> Result<(), ChatError> {
        self.lock_input()?.set_text(text);
        Ok(())
    }

    /// Route a key press to the draft.
    ///
    /// The draft is read-only while a question is in flight. The caller is
    /// expected to call `submit` when this returns `InputAction::Submit`.
    pub fn handle_key(&self, key: KeyInput) -> Result<InputAction, ChatError> {
        if self.is_loading() {
            return Ok(InputAction::Ignored);
        }
        Ok(self.lock_input()?.handle_key(key))
    }

    /// Submit the current draft.
    ///
    /// Blank drafts and submissions while busy are no-ops reported as
    /// `SubmitOutcome::Ignored`. Otherwise the trimmed draft is appended as
    /// a user exchange, the draft is cleared, and the client is asked. The
    /// answer or a failure notice is appended before returning to `Idle`.
    pub async fn submit(&self) -> Result<SubmitOutcome, ChatError> {
        let question = {
            let mut input = self.lock_input()?;
            if self.is_loading() {
                return Ok(self.ignore(IgnoreReason::Busy));
            }
            if input.is_blank() {
                return Ok(self.ignore(IgnoreReason::Blank));
            }
            if !self.state.try_begin() {
                return Ok(self.ignore(IgnoreReason::Busy));
            }
            let question = input.trimmed().to_string();
            input.clear();
            question
        };
        let in_flight = InFlight::new(&self.state, &self.events);

        let token = CancellationToken::new();
        *self.lock_cancel()? = Some(token.clone());

        self.lock_conversation()?
            .append(Exchange::user(question.as_str()));
        self.publish(ConversationEvent::LoadingChanged {
            loading: true,
            timestamp: Utc::now(),
        });
        tracing::info!(question_len = question.len(), "Question submitted");

        let result = self.await_answer(&question, &token).await;
        self.lock_cancel()?.take();

        let (exchange, outcome) = match result {
            Ok(payload) => {
                tracing::info!(citations = payload.citations.len(), "Answer received");
                (Exchange::assistant(payload), SubmitOutcome::Answered)
            }
            Err(ChatError::Cancelled) => {
                tracing::info!("Question cancelled");
                (
                    Exchange::failure(ChatError::Cancelled.user_message()),
                    SubmitOutcome::Cancelled,
                )
            }
            Err(e) => {
                tracing::warn!(error = %e, "Query client failed");
                (
                    Exchange::failure(e.user_message()),
                    SubmitOutcome::Failed(e.to_string()),
                )
            }
        };

        self.lock_conversation()?.append(exchange);
        in_flight.finish()?;
        self.publish(ConversationEvent::LoadingChanged {
            loading: false,
            timestamp: Utc::now(),
        });

        Ok(outcome)
    }

    /// Cancel the question in flight.
    ///
    /// Returns `false` when there is nothing to cancel.
    pub fn cancel(&self) -> Result<bool, ChatError> {
        if !self.is_loading() {
            return Ok(false);
        }
        let guard = self.lock_cancel()?;
        match guard.as_ref() {
            Some(token) if !token.is_cancelled() => {
                token.cancel();
                self.publish(ConversationEvent::RequestCancelled {
                    timestamp: Utc::now(),
                });
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    // -- Private helpers --

    async fn await_answer(
        &self,
        question: &str,
        token: &CancellationToken,
    ) -> Result<AnswerPayload, ChatError> {
        let ask = self.client.ask(question);
        let bounded = async {
            match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, ask).await {
                    Ok(result) => result,
                    Err(_) => Err(ChatError::Timeout(limit)),
                },
                None => ask.await,
            }
        };

        tokio::select! {
            biased;

            () = token.cancelled() => Err(ChatError::Cancelled),
            result = bounded => result,
        }
    }

    fn ignore(&self, reason: IgnoreReason) -> SubmitOutcome {
        tracing::debug!(%reason, "Submission ignored");
        self.publish(ConversationEvent::SubmissionIgnored {
            reason: reason.to_string(),
            timestamp: Utc::now(),
        });
        SubmitOutcome::Ignored(reason)
    }

    fn publish(&self, event: ConversationEvent) {
        let _ = self.events.send(event);
    }

    fn lock_conversation(&self) -> Result<MutexGuard<'_, Conversation>, ChatError> {
        self.conversation
            .lock()
            .map_err(|e| ChatError::StorageError(format!("conversation lock poisoned: {}", e)))
    }

    fn lock_input(&self) -> Result<MutexGuard<'_, InputBuffer>, ChatError> {
        self.input
            .lock()
            .map_err(|e| ChatError::StorageError(format!("input lock poisoned: {}", e)))
    }

    fn lock_cancel(&self) -> Result<MutexGuard<'_, Option<CancellationToken>>, ChatError> {
        self.cancel
            .lock()
            .map_err(|e| ChatError::StorageError(format!("cancel lock poisoned: {}", e)))
    }
}
