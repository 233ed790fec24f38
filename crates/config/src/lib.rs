#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for dlmon
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/dlmon/config.toml)
//! - Environment variables
//! - CLI flags (applied by the binary)

pub mod constants;
pub mod core;

pub use core::{GeneralConfig, MetricsConfig, MonitorConfig};

use constants::{
    ENV_AUTO_RESOLVE, ENV_DETECTION_THROTTLE_MS, ENV_EVENT_LOG_CAPACITY, ENV_OUTPUT,
    ENV_TICK_INTERVAL_MS, ENV_VICTIM_POLICY,
};
use dlmon_errors::{ConfigError, Error};
use dlmon_types::OutputFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("dlmon").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let Ok(config_path) = Self::default_path() else {
            return Ok(Self::default());
        };

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        if let Ok(output) = std::env::var(ENV_OUTPUT) {
            self.general.default_output = match output.as_str() {
                "table" => OutputFormat::Table,
                "json" => OutputFormat::Json,
                _ => return Err(invalid(ENV_OUTPUT, output)),
            };
        }

        if let Ok(ms) = std::env::var(ENV_TICK_INTERVAL_MS) {
            self.monitor.tick_interval_ms =
                ms.parse().map_err(|_| invalid(ENV_TICK_INTERVAL_MS, ms))?;
        }

        if let Ok(ms) = std::env::var(ENV_DETECTION_THROTTLE_MS) {
            self.monitor.detection_throttle_ms = ms
                .parse()
                .map_err(|_| invalid(ENV_DETECTION_THROTTLE_MS, ms))?;
        }

        if let Ok(flag) = std::env::var(ENV_AUTO_RESOLVE) {
            self.monitor.auto_resolve = match flag.as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => return Err(invalid(ENV_AUTO_RESOLVE, flag)),
            };
        }

        if let Ok(policy) = std::env::var(ENV_VICTIM_POLICY) {
            self.monitor.victim_policy = dlmon_types::VictimPolicy::from_str(&policy)
                .map_err(|_| invalid(ENV_VICTIM_POLICY, policy))?;
        }

        if let Ok(capacity) = std::env::var(ENV_EVENT_LOG_CAPACITY) {
            self.metrics.event_log_capacity = capacity
                .parse()
                .map_err(|_| invalid(ENV_EVENT_LOG_CAPACITY, capacity))?;
        }

        Ok(())
    }

    /// Check values that would make the monitor unusable
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending field.
    pub fn validate(&self) -> Result<(), Error> {
        if self.monitor.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                message: "monitor.tick_interval_ms must be greater than zero".to_string(),
            }
            .into());
        }
        if self.metrics.event_log_capacity == 0 {
            return Err(ConfigError::Invalid {
                message: "metrics.event_log_capacity must be greater than zero".to_string(),
            }
            .into());
        }
        if self.metrics.latency_window == 0 {
            return Err(ConfigError::Invalid {
                message: "metrics.latency_window must be greater than zero".to_string(),
            }
            .into());
        }
        if self.metrics.deadlock_history_capacity == 0 {
            return Err(ConfigError::Invalid {
                message: "metrics.deadlock_history_capacity must be greater than zero"
                    .to_string(),
            }
            .into());
        }
        Ok(())
    }
}

fn invalid(field: &str, value: String) -> Error {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value,
    }
    .into()
}
