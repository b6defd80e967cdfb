//! Process-wide `tracing` setup.
//!
//! Logs go to stderr; stdout belongs to the MCP stdio transport and to
//! CLI output.

use crate::config::ConfigError;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Install the global subscriber with `directive` as its filter.
///
/// Calling this again, or after a host installed its own subscriber, keeps
/// the existing one and returns `Ok`.
pub fn init(directive: &str) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_new(directive)
        .map_err(|e| ConfigError::invalid_value("log_level", e.to_string()))?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .finish();
    if subscriber.try_init().is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}
