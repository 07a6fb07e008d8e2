//! CLI argument definitions for the Lexi application.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use lexi_core::config::LexiConfig;

/// Lexi: ask legal questions and read answers with citations.
#[derive(Parser, Debug)]
#[command(name = "lexi", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Simulated backend latency in milliseconds.
    #[arg(long = "delay-ms")]
    pub delay_ms: Option<u64>,

    /// Request timeout in seconds (0 waits forever).
    #[arg(long = "timeout-secs")]
    pub timeout_secs: Option<u64>,

    /// Replay a recorded backend response from this JSON file.
    #[arg(long = "fixture")]
    pub fixture: Option<PathBuf>,

    /// Start with an empty input instead of the sample question.
    #[arg(long = "no-initial-query")]
    pub no_initial_query: bool,

    /// Print citation links as plain text instead of terminal hyperlinks.
    #[arg(long = "no-hyperlinks")]
    pub no_hyperlinks: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > LEXI_CONFIG env var > platform default (~/.lexi/config.toml).
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("LEXI_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut LexiConfig) {
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(ms) = self.delay_ms {
            config.client.delay_ms = ms;
        }
        if let Some(secs) = self.timeout_secs {
            config.client.timeout_secs = secs;
        }
        if let Some(ref path) = self.fixture {
            config.client.fixture_path = Some(path.to_string_lossy().to_string());
        }
        if self.no_initial_query {
            config.chat.initial_query.clear();
        }
        if self.no_hyperlinks {
            config.chat.hyperlinks = false;
        }
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".lexi").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".lexi").join("config.toml");
    }
    PathBuf::from("config.toml")
}
