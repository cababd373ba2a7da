//! # Configuration Management Module
//!
//! TOML configuration for the teleport request service.
//!
//! ## Configuration Structure
//!
//! - [`TeleportConfig`] - request timeout and host tick length
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tpcache::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("tpcache.toml").await?;
//!     let config = Config::load("tpcache.toml").await?;
//!     println!("Requests expire after {:?}", config.teleport.request_timeout());
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [teleport]
//! request_timeout_ticks = 600   # 30 seconds at 50 ms per tick
//! tick_ms = 50
//!
//! [logging]
//! level = "info"
//! file = "tpcache.log"
//! ```

use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::teleport::errors::TeleportError;
use crate::teleport::scheduler::{ticks_to_duration, DEFAULT_TICK};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeleportConfig {
    /// How long a request stays pending, in host ticks.
    #[serde(default = "default_request_timeout_ticks")]
    pub request_timeout_ticks: u64,
    /// Length of one host tick in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

fn default_request_timeout_ticks() -> u64 {
    600
}

fn default_tick_ms() -> u64 {
    DEFAULT_TICK.as_millis() as u64
}

impl Default for TeleportConfig {
    fn default() -> Self {
        Self {
            request_timeout_ticks: default_request_timeout_ticks(),
            tick_ms: default_tick_ms(),
        }
    }
}

impl TeleportConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        ticks_to_duration(self.request_timeout_ticks, self.tick())
    }

    pub fn validate(&self) -> Result<(), TeleportError> {
        if self.request_timeout_ticks == 0 || self.tick_ms == 0 {
            return Err(TeleportError::InvalidTimeout);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("tpcache.log".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub teleport: TeleportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load and validate a configuration file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config
            .teleport
            .validate()
            .map_err(|e| anyhow!("Invalid config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeout_is_thirty_seconds() {
        let cfg = TeleportConfig::default();
        assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_tick_or_timeout_is_invalid() {
        let zero_ticks = TeleportConfig {
            request_timeout_ticks: 0,
            ..TeleportConfig::default()
        };
        assert_eq!(zero_ticks.validate(), Err(TeleportError::InvalidTimeout));
        let zero_tick = TeleportConfig {
            tick_ms: 0,
            ..TeleportConfig::default()
        };
        assert_eq!(zero_tick.validate(), Err(TeleportError::InvalidTimeout));
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let cfg: Config = toml::from_str("[teleport]\nrequest_timeout_ticks = 200\n").unwrap();
        assert_eq!(cfg.teleport.request_timeout_ticks, 200);
        assert_eq!(cfg.teleport.tick_ms, 50);
        assert_eq!(cfg.logging, LoggingConfig::default());
        assert_eq!(cfg.teleport.request_timeout(), Duration::from_secs(10));
    }
}
