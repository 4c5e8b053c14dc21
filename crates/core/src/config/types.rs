use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reannounce::ReannounceOptions;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// qBittorrent connection settings.
    #[serde(default)]
    pub qbittorrent: Option<QBittorrentConfig>,
    /// Deluge connection settings.
    #[serde(default)]
    pub deluge: Option<DelugeConfig>,
    /// Reannounce run defaults, overridable per run from the CLI.
    #[serde(default)]
    pub reannounce: ReannounceOptions,
}

/// qBittorrent WebUI connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QBittorrentConfig {
    /// WebUI URL (e.g. "http://localhost:8080").
    pub url: String,
    pub username: String,
    pub password: String,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

/// Deluge web UI connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DelugeConfig {
    /// Web UI URL (e.g. "http://localhost:8112").
    pub url: String,
    pub password: String,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_timeout() -> u32 {
    30
}
