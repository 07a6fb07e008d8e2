use thiserror::Error;

/// Top-level error type for Lexi.
///
/// Subsystem crates define their own error types and implement
/// `From<LexiError>` so that the `?` operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LexiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl From<toml::de::Error> for LexiError {
    fn from(err: toml::de::Error) -> Self {
        LexiError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for LexiError {
    fn from(err: toml::ser::Error) -> Self {
        LexiError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for LexiError {
    fn from(err: serde_json::Error) -> Self {
        LexiError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Lexi operations.
pub type Result<T> = std::result::Result<T, LexiError>;
