//! Logging setup.
//!
//! Library code logs through the `log` macros and opens `tracing` spans
//! around polls, submissions and deletions. The binary calls
//! [`init_logging`] once to route both into a `tracing-subscriber`
//! formatter. `RUST_LOG` overrides the configured level.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::HarvestlineError;

/// Installs the global subscriber. Returns `Ok(false)` if one was already
/// installed, in which case nothing changes.
pub fn init_logging(config: &LoggingConfig) -> Result<bool, HarvestlineError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| HarvestlineError::Logging(format!("invalid level: {e}")))?,
    };

    let (plain, json) = if config.json {
        (None, Some(fmt::layer().json().with_target(true)))
    } else {
        (Some(fmt::layer().with_target(true)), None)
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(plain)
        .with(json);

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return Ok(false);
    }

    tracing_log::LogTracer::init()
        .map_err(|e| HarvestlineError::Logging(format!("log bridge: {e}")))?;

    Ok(true)
}
