//! Application settings

use crate::core::client::{ReadPolicy, SocketDialect};
use crate::core::logger::LogFormat;
use crate::core::session::SessionConfig;
use crate::core::transport::Transport;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No platform config directory
    #[error("Could not determine config directory")]
    NoConfigDir,

    /// Reading or writing the file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid TOML for this schema
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Settings could not be encoded
    #[error("Could not encode config: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Link to the board
    pub link: Transport,
    /// Read timing
    pub timing: TimingConfig,
    /// WebSocket settings
    pub websocket: WebSocketConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load config from the default location, or defaults if there is none
    pub fn load() -> Result<Self, ConfigError> {
        let path = super::config_file().ok_or(ConfigError::NoConfigDir)?;
        Self::load_from(&path)
    }

    /// Load config from `path`, or defaults if the file does not exist
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = super::config_file().ok_or(ConfigError::NoConfigDir)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.save_to(&path)
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Session settings derived from this config
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            transport: self.link.clone(),
            policy: self.timing.policy(),
            dialect: self.websocket.dialect,
            transcript: self
                .logging
                .transcript
                .clone()
                .map(|path| (path, self.logging.transcript_format)),
        }
    }
}

/// Read timing, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Per-attempt timeout for `[PING]`
    pub control_timeout_ms: u64,
    /// Per-attempt timeout for every other reply
    pub data_timeout_ms: u64,
    /// Reads per attempt before giving up
    pub read_attempts: u32,
    /// Per-attempt timeout while draining
    pub drain_timeout_ms: u64,
    /// Lines one drain may consume
    pub drain_iterations: u32,
    /// Reads allowed while waiting for a body line
    pub stream_line_cap: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        let policy = ReadPolicy::default();
        Self {
            control_timeout_ms: duration_ms(policy.control_timeout),
            data_timeout_ms: duration_ms(policy.data_timeout),
            read_attempts: policy.read_attempts,
            drain_timeout_ms: duration_ms(policy.drain_timeout),
            drain_iterations: policy.drain_iterations,
            stream_line_cap: policy.stream_line_cap,
        }
    }
}

impl TimingConfig {
    /// Convert to the client's read policy
    pub fn policy(&self) -> ReadPolicy {
        ReadPolicy {
            control_timeout: Duration::from_millis(self.control_timeout_ms),
            data_timeout: Duration::from_millis(self.data_timeout_ms),
            read_attempts: self.read_attempts,
            drain_timeout: Duration::from_millis(self.drain_timeout_ms),
            drain_iterations: self.drain_iterations,
            stream_line_cap: self.stream_line_cap,
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// WebSocket settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSocketConfig {
    /// Command family the firmware understands
    pub dialect: SocketDialect,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    /// Write diagnostics to this file instead of stderr
    pub log_file: Option<PathBuf>,
    /// Record board traffic to this file
    pub transcript: Option<PathBuf>,
    /// Transcript format
    pub transcript_format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_file: None,
            transcript: None,
            transcript_format: LogFormat::Text,
        }
    }
}
