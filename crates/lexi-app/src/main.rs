//! Lexi application binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Initialize tracing (stderr, so the transcript on stdout stays clean)
//! 3. Pick the query client: recorded fixture or simulated backend
//! 4. Run the interactive terminal session

mod cli;
mod session;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use lexi_chat::{
    FixtureQueryClient, MockQueryClient, QueryClient, SubmissionController, TranscriptRenderer,
};
use lexi_core::config::LexiConfig;

use cli::CliArgs;

async fn run_with<C: QueryClient + 'static>(
    client: C,
    config: &LexiConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let controller = Arc::new(SubmissionController::from_config(client, config));
    let renderer = TranscriptRenderer::from_config(config);
    session::run(controller, renderer).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Configuration.
    let config_file = args.resolve_config_path();
    let (mut config, load_error) = if config_file.exists() {
        match LexiConfig::load(&config_file) {
            Ok(config) => (config, None),
            Err(e) => (LexiConfig::default(), Some(e)),
        }
    } else {
        (LexiConfig::default(), None)
    };
    args.apply_overrides(&mut config);
    config.validate()?;

    // Tracing.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Lexi v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        Some(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config. Using defaults."
        ),
        None => tracing::debug!(path = %config_file.display(), "Configuration resolved"),
    }

    // Query client.
    let delay = Duration::from_millis(config.client.delay_ms);
    match config.client.fixture_path.clone() {
        Some(path) => {
            let client = FixtureQueryClient::new(path, delay);
            tracing::info!(
                path = %client.path().display(),
                "Replaying recorded backend responses"
            );
            run_with(client, &config).await?;
        }
        None => {
            tracing::info!(delay_ms = config.client.delay_ms, "Using simulated backend");
            run_with(MockQueryClient::with_delay(delay), &config).await?;
        }
    }

    tracing::info!("Lexi shut down");
    Ok(())
}
