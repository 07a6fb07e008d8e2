pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::LexiConfig;
pub use error::{LexiError, Result};
pub use events::ConversationEvent;
pub use types::*;
