//! # Configuration Management
//!
//! Centralized configuration for the AFC client.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()`
//!
//! Transfer limits default to what devices accept: 4 KiB write chunks and
//! 1 MiB per read request.

use crate::error::{ProtocolError, Result};
use crate::protocol::TellByteOrder;
use crate::utils::paths::HostPathStyle;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Service name published by lockdown
pub const LOCKDOWN_SERVICE_NAME: &str = "com.apple.afc";

/// Service name published over remote service discovery
pub const RSD_SERVICE_NAME: &str = "com.apple.afc.shim.remote";

/// Default size of one write frame's data
pub const DEFAULT_WRITE_CHUNK_SIZE: usize = 4096;

/// Default cap on the data requested by one read frame (1 MiB)
pub const DEFAULT_MAX_READ_SIZE: usize = 1024 * 1024;

/// Default cap on one received frame, header included
pub const DEFAULT_MAX_FRAME_LENGTH: u64 = crate::core::codec::DEFAULT_MAX_FRAME_LENGTH;

/// How the channel to the service was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Lockdown,
    RemoteServiceDiscovery,
}

impl ServiceKind {
    pub fn service_name(&self) -> &'static str {
        match self {
            ServiceKind::Lockdown => LOCKDOWN_SERVICE_NAME,
            ServiceKind::RemoteServiceDiscovery => RSD_SERVICE_NAME,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AfcConfig {
    /// Client-specific configuration
    #[serde(default)]
    pub client: ClientConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AfcConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(size) = std::env::var("AFC_WRITE_CHUNK_SIZE") {
            if let Ok(val) = size.parse::<usize>() {
                config.client.write_chunk_size = val;
            }
        }

        if let Ok(size) = std::env::var("AFC_MAX_READ_SIZE") {
            if let Ok(val) = size.parse::<usize>() {
                config.client.max_read_size = val;
            }
        }

        if let Ok(timeout) = std::env::var("AFC_RESPONSE_TIMEOUT_MS") {
            if let Ok(val) = timeout.parse::<u64>() {
                config.client.response_timeout = Duration::from_millis(val);
            }
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

    /// Validate the configuration
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.client.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Client-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Data bytes carried by each write frame
    pub write_chunk_size: usize,

    /// Largest data length requested by a single read frame
    pub max_read_size: usize,

    /// Largest frame accepted from the device, header included
    pub max_frame_length: u64,

    /// Timeout for waiting for a reply once a request is sent
    #[serde(with = "duration_serde")]
    pub response_timeout: Duration,

    /// Byte order of the position in tell replies
    pub tell_byte_order: TellByteOrder,

    /// Rules applied to host path components created by `pull`
    pub host_path_style: HostPathStyle,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            write_chunk_size: DEFAULT_WRITE_CHUNK_SIZE,
            max_read_size: DEFAULT_MAX_READ_SIZE,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            response_timeout: Duration::from_secs(30),
            tell_byte_order: TellByteOrder::default(),
            host_path_style: HostPathStyle::default(),
        }
    }
}

impl ClientConfig {
    /// Validate client configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.write_chunk_size == 0 {
            errors.push("Write chunk size must be greater than 0".to_string());
        }

        if self.max_read_size == 0 {
            errors.push("Max read size must be greater than 0".to_string());
        } else if self.max_read_size as u64 + crate::core::header::HEADER_LENGTH
            > self.max_frame_length
        {
            errors.push(format!(
                "Max read size {} does not fit in max frame length {}",
                self.max_read_size, self.max_frame_length
            ));
        }

        if self.response_timeout.as_millis() < 10 {
            errors.push("Response timeout too short (minimum: 10ms)".to_string());
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("afc-client"),
            log_level: Level::INFO,
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

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
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
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
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
