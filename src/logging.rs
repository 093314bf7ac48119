//! Logging setup.
//!
//! `RUST_LOG` wins when set; otherwise the level from `[logging]` in
//! host.toml is used.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

pub fn filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Init logging. Safe to call more than once; later calls are ignored.
pub fn init(config: &LoggingConfig) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(config))
        .with_target(false)
        .try_init();
}
