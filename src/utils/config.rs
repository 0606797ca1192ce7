//! Configuration management for the OTR client.
//!
//! This module provides TOML-based configuration with support for multiple
//! configuration sources (default, file-based, environment variables) and
//! validation of configuration parameters.

use crate::client::{DeviceClass, DeviceType};
use crate::crypto::{DEFAULT_PREKEY_COUNT, MAX_PREKEY_ID};
use crate::utils::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "otr-client.toml";

/// Environment variable prefix for configuration
pub const ENV_PREFIX: &str = "OTR_CLIENT";

/// Remaining-key count below which the client should upload more prekeys
pub const DEFAULT_LOW_PREKEY_THRESHOLD: u16 = 20;

/// Complete configuration for the client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Key generation settings
    pub keys: KeysConfig,
    /// Metadata sent when registering this device
    pub device: DeviceConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Key generation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysConfig {
    /// Number of one-time prekeys generated per registration or upload
    pub prekey_count: u16,
    /// Replenish once the backend reports fewer remaining keys than this
    pub low_prekey_threshold: u16,
}

/// Device metadata used by the CLI when creating a device record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Human readable label
    pub label: Option<String>,
    /// Hardware model
    pub model: Option<String>,
    /// Device class
    pub class: DeviceClass,
    /// Registration lifetime
    pub device_type: DeviceType,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            prekey_count: DEFAULT_PREKEY_COUNT,
            low_prekey_threshold: DEFAULT_LOW_PREKEY_THRESHOLD,
        }
    }
}

impl KeysConfig {
    /// Whether the backend-reported number of remaining prekeys is low
    /// enough that a replenishment request should be scheduled.
    pub fn needs_replenishment(&self, remaining: usize) -> bool {
        remaining < usize::from(self.low_prekey_threshold)
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            label: None,
            model: None,
            class: DeviceClass::Desktop,
            device_type: DeviceType::Permanent,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with multiple sources (default, file, environment)
    ///
    /// An explicit path that does not exist is an error; the default
    /// locations are only probed when no path is given.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default_locations()
                .iter()
                .find(|location| location.exists())
                .map(Self::from_file)
                .transpose()?
                .unwrap_or_default(),
        };

        config = config.merge_from_env()?;
        config.validate()?;

        Ok(config)
    }

    /// Candidate configuration files, in lookup order
    pub fn default_locations() -> Vec<PathBuf> {
        vec![
            PathBuf::from(DEFAULT_CONFIG_FILE),
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("otr-client")
                .join(DEFAULT_CONFIG_FILE),
        ]
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Merge configuration from environment variables
    fn merge_from_env(mut self) -> Result<Self> {
        let count_var = format!("{ENV_PREFIX}_KEYS_PREKEY_COUNT");
        if let Ok(count) = std::env::var(&count_var) {
            self.keys.prekey_count = count.parse().map_err(|_| ConfigError::InvalidValue {
                field: count_var,
                value: count,
            })?;
        }

        if let Ok(level) = std::env::var(format!("{ENV_PREFIX}_LOGGING_LEVEL")) {
            self.logging.level = level;
        }

        Ok(self)
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<()> {
        // The reserved last-resort id must stay out of every batch.
        if self.keys.prekey_count == 0 || self.keys.prekey_count > MAX_PREKEY_ID {
            return Err(ConfigError::InvalidValue {
                field: "keys.prekey_count".to_string(),
                value: self.keys.prekey_count.to_string(),
            }
            .into());
        }

        match self.logging.level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            _ => {
                return Err(ConfigError::InvalidValue {
                    field: "logging.level".to_string(),
                    value: self.logging.level.clone(),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Get the configuration as a pretty-printed TOML string
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| {
            ConfigError::ParseError {
                reason: e.to_string(),
            }
            .into()
        })
    }
}
