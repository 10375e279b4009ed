//! Boot: logging init and config load.

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::conf::{ConfigError, TraceConfig};

/// Initialise the tracing / logging subsystem. Logs go to stderr; stdout
/// carries emitted records.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bluetrace=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load config from `path` (or the configured default location).
pub fn load_config(path: Option<&str>) -> Result<TraceConfig, ConfigError> {
    let config = match path {
        Some(path) => TraceConfig::load_from(path)?,
        None => TraceConfig::load()?,
    };
    info!(
        "Loaded configuration: block_sizes={:?}, flush_on_eof={}, filter={:?}",
        config.block_sizes, config.flush_on_eof, config.filter.pattern
    );
    Ok(config)
}
