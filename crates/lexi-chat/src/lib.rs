//! Conversational core for Lexi.
//!
//! Holds the append-only transcript, the two-state submission controller,
//! the query service client seam, the input buffer, and the plain-text
//! transcript renderer.

pub mod client;
pub mod controller;
pub mod error;
pub mod input;
pub mod render;
pub mod state;
pub mod store;

pub use client::{FixtureQueryClient, MockQueryClient, QueryClient};
pub use controller::{IgnoreReason, SubmissionController, SubmitOutcome};
pub use error::ChatError;
pub use input::{InputAction, InputBuffer, KeyInput};
pub use render::TranscriptRenderer;
pub use state::{ChatState, StateMachine};
pub use store::Conversation;
