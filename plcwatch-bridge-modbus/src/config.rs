//! Configuration for the Modbus bridge binary.

use plcwatch_core::LoggingConfig;
use plcwatch_core::types::{MonitorItem, TransportParams};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete watcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Controller endpoint
    pub connection: TransportParams,

    /// Monitor set
    pub monitor: MonitorConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The set of addresses to watch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Poll interval in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Addresses under watch
    pub items: Vec<MonitorItem>,
}

fn default_interval_ms() -> u64 {
    plcwatch_core::DEFAULT_INTERVAL_MS
}

impl WatchConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: WatchConfig = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.monitor.items.is_empty() {
            return Err(ConfigError::Validation(
                "At least one monitor item must be configured".to_string(),
            ));
        }

        if self.monitor.interval_ms == 0 {
            return Err(ConfigError::Validation(
                "Poll interval must be non-zero".to_string(),
            ));
        }

        if let TransportParams::Serial { baud_rate, .. } = &self.connection {
            if *baud_rate == 0 {
                return Err(ConfigError::Validation(
                    "Baud rate must be non-zero".to_string(),
                ));
            }
        }

        Ok(())
    }
}
