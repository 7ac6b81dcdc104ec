//! Configuration module
//!
//! Handles the link, timing and logging settings

mod settings;

pub use settings::{AppConfig, ConfigError, LoggingConfig, TimingConfig, WebSocketConfig};

use directories::ProjectDirs;
use std::path::PathBuf;

/// Get the application configuration directory
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "devlink", "devlink").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Default location of the config file
pub fn config_file() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}
