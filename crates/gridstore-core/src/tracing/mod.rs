//! Subscriber setup for binaries and tests embedding the engine.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;
use crate::errors::{GridError, GridResult};

/// Install a global `EnvFilter` + fmt subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Returns
/// `Ok(false)` if a subscriber was already installed.
pub fn init_tracing(config: &LoggingConfig) -> GridResult<bool> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.effective_level()))
        .map_err(|e| GridError::Config(format!("invalid log level: {e}")))?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if config.effective_json() {
        registry.with(fmt::layer().json().with_target(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    };
    Ok(installed.is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let cfg = LoggingConfig::default();
        let _first = init_tracing(&cfg).unwrap();
        assert!(!init_tracing(&cfg).unwrap(), "second install must be a no-op");
    }
}
