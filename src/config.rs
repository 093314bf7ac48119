//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `host.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - PollingConfig: How often the dashboard snapshot is refreshed.
//!     - StoreConfig: Which sensor store backs the session (mock or http).
//!     - ServerConfig: Where the json api listens.
//!     - LoggingConfig: Log level and whether readings are echoed.
//!
//! ==============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::session::SessionOptions;
use crate::store::LatencyProfile;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct HostConfig {
    pub polling: PollingConfig,
    pub store: StoreConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_seconds: u64,
    /// per-fetch limit; unset means wait as long as the store takes
    pub timeout_ms: Option<u64>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 60,
            timeout_ms: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Mock,
    Http,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// rest root for the http backend, e.g. "http://garden.local:3000/api"
    pub base_url: String,
    pub latency: LatencyConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Mock,
            base_url: "http://127.0.0.1:3000/api".to_string(),
            latency: LatencyConfig::default(),
        }
    }
}

/// simulated latency of the mock store, in milliseconds
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct LatencyConfig {
    pub read_ms: u64,
    pub bulk_ms: u64,
    pub history_ms: u64,
    pub update_ms: u64,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            read_ms: 300,
            bulk_ms: 500,
            history_ms: 400,
            update_ms: 300,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_sensor_data: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            show_sensor_data: true,
        }
    }
}

impl HostConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: HostConfig = toml::from_str(content).context("Failed to parse config")?;
        anyhow::ensure!(
            config.polling.interval_seconds > 0,
            "polling.interval_seconds must be greater than zero"
        );
        Ok(config)
    }

    /// Load with default fallback
    ///
    /// runs before logging is set up, so the caller reports the returned
    /// origin once the subscriber exists.
    pub fn load_or_default() -> (Self, ConfigOrigin) {
        let paths = [
            PathBuf::from("config").join("host.toml"),
            PathBuf::from("..").join("config").join("host.toml"),
        ];

        let mut rejected = Vec::new();
        for path in paths {
            if path.exists() {
                match Self::load(&path) {
                    Ok(config) => return (config, ConfigOrigin::File { path, rejected }),
                    Err(e) => rejected.push((path, format!("{e:#}"))),
                }
            }
        }

        (Self::default(), ConfigOrigin::Defaults { rejected })
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            interval: Duration::from_secs(self.polling.interval_seconds),
            timeout: self.polling.timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn latency_profile(&self) -> LatencyProfile {
        let latency = &self.store.latency;
        LatencyProfile {
            read: Duration::from_millis(latency.read_ms),
            bulk: Duration::from_millis(latency.bulk_ms),
            history: Duration::from_millis(latency.history_ms),
            update: Duration::from_millis(latency.update_ms),
        }
    }

    /// Log a configuration summary
    pub fn log_summary(&self) {
        tracing::info!(
            backend = ?self.store.backend,
            interval_secs = self.polling.interval_seconds,
            timeout_ms = ?self.polling.timeout_ms,
            bind = %self.server.bind,
            level = %self.logging.level,
            "host configuration"
        );
    }
}

/// where the running configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigOrigin {
    File {
        path: PathBuf,
        rejected: Vec<(PathBuf, String)>,
    },
    Defaults {
        rejected: Vec<(PathBuf, String)>,
    },
}

impl ConfigOrigin {
    pub fn log(&self) {
        let rejected = match self {
            ConfigOrigin::File { path, rejected } => {
                tracing::info!(path = %path.display(), "configuration loaded");
                rejected
            }
            ConfigOrigin::Defaults { rejected } => {
                tracing::warn!("no usable config file found, using defaults");
                rejected
            }
        };
        for (path, error) in rejected {
            tracing::warn!(path = %path.display(), %error, "failed to load configuration");
        }
    }
}
