use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{LexiError, Result};

/// Sample question the input area is prefilled with on startup.
pub const DEFAULT_INITIAL_QUERY: &str = "In a motor accident claim where the deceased was self-employed and aged 54–55 years at the time of death, is the claimant entitled to an addition towards future prospects in computing compensation under Section 166 of the Motor Vehicles Act, 1988? If so, how much?";

/// Top-level configuration for Lexi.
///
/// Loaded from `~/.lexi/config.toml` by default. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LexiConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl LexiConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LexiConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.general.log_level.as_str()) {
            return Err(LexiError::Config(format!(
                "unknown log level '{}'",
                self.general.log_level
            )));
        }
        if self.chat.max_input_rows == 0 {
            return Err(LexiError::Config(
                "chat.max_input_rows must be at least 1".to_string(),
            ));
        }
        if matches!(self.client.fixture_path.as_deref(), Some(p) if p.trim().is_empty()) {
            return Err(LexiError::Config(
                "client.fixture_path must not be empty when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Heading printed above the transcript.
    pub title: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            title: "Lexi Legal Assistant".to_string(),
        }
    }
}

/// Query service client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Simulated backend latency in milliseconds.
    pub delay_ms: u64,
    /// Request timeout in seconds. `0` disables the timeout.
    pub timeout_secs: u64,
    /// Optional JSON file holding a recorded backend response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixture_path: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            delay_ms: 1500,
            timeout_secs: 30,
            fixture_path: None,
        }
    }
}

/// Conversation view settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Draft the input area starts with. Empty for a blank input.
    pub initial_query: String,
    /// Placeholder shown while the input is empty.
    pub placeholder: String,
    /// Maximum visible rows of the input area before it scrolls.
    pub max_input_rows: usize,
    /// Emit OSC 8 hyperlinks for citation sources.
    pub hyperlinks: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            initial_query: DEFAULT_INITIAL_QUERY.to_string(),
            placeholder: "Ask a legal question...".to_string(),
            max_input_rows: 8,
            hyperlinks: true,
        }
    }
}
