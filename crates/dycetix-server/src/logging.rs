//! Tracing subscriber bootstrap

use crate::config::{ConfigError, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over the configured filter.
///
/// # Errors
/// - `Invalid` when the configured filter does not parse
/// - `Logging` when a global subscriber is already installed
pub fn init(config: &LoggingConfig) -> Result<(), ConfigError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter).map_err(|err| ConfigError::Invalid {
            key: "logging.filter",
            reason: err.to_string(),
        })?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|err| ConfigError::Logging(err.to_string()))
}
