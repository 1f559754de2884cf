//! # Configuration Management
//!
//! Centralized configuration for the channel registration layer.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment-specific overrides via `from_env()`
//!
//! ## Example
//! ```toml
//! [registry]
//! max_channel_name_length = 128
//! extra_reserved_channels = ["host:internal"]
//!
//! [logging]
//! app_name = "channel-registry"
//! log_level = "debug"
//! log_to_console = true
//! log_to_file = false
//! json_format = false
//! ```

use crate::core::channel_id::ChannelId;
use crate::core::MAX_CHANNEL_NAME_LENGTH;
use crate::error::{ChannelError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::Level;

/// Upper bound for a configured channel name length (wire strings are i16-prefixed)
pub const MAX_CONFIGURABLE_NAME_LENGTH: usize = 32767;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct NetworkingConfig {
    /// Channel registry configuration
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl NetworkingConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ChannelError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ChannelError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ChannelError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(max) = std::env::var("CHANNEL_REGISTRY_MAX_NAME_LENGTH") {
            config.registry.max_channel_name_length = max.parse::<usize>().map_err(|e| {
                ChannelError::ConfigError(format!(
                    "Invalid CHANNEL_REGISTRY_MAX_NAME_LENGTH '{max}': {e}"
                ))
            })?;
        }

        // Comma-separated channel names
        if let Ok(reserved) = std::env::var("CHANNEL_REGISTRY_RESERVED") {
            config.registry.extra_reserved_channels = reserved
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect();
        }

        if let Ok(level) = std::env::var("CHANNEL_REGISTRY_LOG_LEVEL") {
            config.logging.log_level = Level::from_str(&level).map_err(|_| {
                ChannelError::ConfigError(format!("Invalid CHANNEL_REGISTRY_LOG_LEVEL '{level}'"))
            })?;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ChannelError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ChannelError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.registry.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ChannelError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Channel registry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Longest accepted channel name, in characters
    pub max_channel_name_length: usize,

    /// Names reserved in every registry on top of the protocol's own
    pub extra_reserved_channels: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_channel_name_length: MAX_CHANNEL_NAME_LENGTH,
            extra_reserved_channels: Vec::new(),
        }
    }
}

impl RegistryConfig {
    /// Validate registry configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_channel_name_length == 0 {
            errors.push("Max channel name length must be greater than 0".to_string());
        } else if self.max_channel_name_length > MAX_CONFIGURABLE_NAME_LENGTH {
            errors.push(format!(
                "Max channel name length too large: {} (maximum: {MAX_CONFIGURABLE_NAME_LENGTH})",
                self.max_channel_name_length
            ));
        }

        for name in &self.extra_reserved_channels {
            if let Err(e) = ChannelId::parse(name) {
                errors.push(format!("Invalid reserved channel '{name}': {e}"));
            }
        }

        errors
    }

    /// Parsed extra reserved channels
    pub fn reserved_channel_ids(&self) -> Result<Vec<ChannelId>> {
        self.extra_reserved_channels
            .iter()
            .map(|name| ChannelId::parse(name))
            .collect()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,

    /// Whether to log to file
    pub log_to_file: bool,

    /// Path to log file (if log_to_file is true)
    pub log_file_path: Option<String>,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("channel-registry"),
            log_level: Level::INFO,
            log_to_console: true,
            log_to_file: false,
            log_file_path: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        if self.log_to_file {
            if let Some(ref path) = self.log_file_path {
                if let Some(parent) = Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        errors.push(format!(
                            "Log file directory does not exist: {}",
                            parent.display()
                        ));
                    }
                }
            } else {
                errors.push("log_file_path must be specified when log_to_file is true".to_string());
            }
        }

        if !self.log_to_console && !self.log_to_file {
            errors
                .push("At least one logging output (console or file) must be enabled".to_string());
        }

        errors
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = level.as_str().to_lowercase();
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
