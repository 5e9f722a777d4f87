//! Tracing subscriber setup
//!
//! `RUST_LOG` overrides the configured level when set.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use mediatree_core::config::LoggingConfig;

/// Filter from `RUST_LOG`, falling back to `config.level`
pub fn env_filter(config: &LoggingConfig) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .with_context(|| format!("invalid log level \"{}\"", config.level)),
    }
}

/// Installs the global subscriber
///
/// # Errors
/// Fails when the level does not parse or a subscriber is already installed
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if config.json {
        builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))
    } else {
        builder
            .try_init()
            .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))
    }
}
