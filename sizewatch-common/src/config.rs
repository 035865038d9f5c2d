//! Configuration for Sizewatch services.
//!
//! Configuration lives in `~/.sizewatch/config.json` and is loaded with
//! serde. Every section has sensible defaults so a missing file still
//! produces a usable configuration; secrets (the bot token) are usually
//! supplied through environment variables instead of the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Get the Sizewatch configuration directory (`~/.sizewatch`).
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".sizewatch"),
        |dirs| dirs.home_dir().join(".sizewatch"),
    )
}

/// Get the default configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Telegram bot configuration
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Downstream tracker service configuration
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Event ingress HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Selection session configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Telegram bot settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelegramConfig {
    /// Bot API token. Usually set via `SIZEWATCH_TELEGRAM_TOKEN`.
    #[serde(default)]
    pub bot_token: String,

    /// Long-poll timeout in seconds for `getUpdates`
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

/// Downstream tracker service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Base URL of the tracker service
    #[serde(default = "default_tracker_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_tracker_endpoint(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Event ingress HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Selection session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Sessions are evicted this many seconds after creation; button
    /// presses do not extend the deadline
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,

    /// How often the eviction sweep runs
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Output format: "json" for structured JSON, "pretty" for human-readable
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_poll_timeout() -> u64 {
    30
}

fn default_tracker_endpoint() -> String {
    "http://api-connect:5508".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_session_ttl() -> u64 {
    900
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides applied.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("SIZEWATCH_TELEGRAM_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Ok(endpoint) = std::env::var("SIZEWATCH_TRACKER_ENDPOINT") {
            self.tracker.endpoint = endpoint;
        }
        if let Ok(port) = std::env::var("SIZEWATCH_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(level) = std::env::var("SIZEWATCH_LOG_LEVEL") {
            self.observability.log_level = level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_usable() {
        let config = Config::default();
        assert_eq!(config.tracker.endpoint, "http://api-connect:5508");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.session.ttl_secs, 900);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "telegram": { "bot_token": "123:ABC" },
                "tracker": { "endpoint": "http://localhost:5508" },
                "server": { "port": 3100 }
            }"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.telegram.bot_token, "123:ABC");
        assert_eq!(config.tracker.endpoint, "http://localhost:5508");
        assert_eq!(config.server.port, 3100);
        // Untouched sections keep their defaults
        assert_eq!(config.session.sweep_interval_secs, 60);
    }

    #[test]
    fn load_from_invalid_json_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn env_overrides_take_precedence() {
        let mut config = Config::default();
        std::env::set_var("SIZEWATCH_TELEGRAM_TOKEN", "env-token");
        std::env::set_var("SIZEWATCH_PORT", "4000");

        config.apply_env_overrides();

        assert_eq!(config.telegram.bot_token, "env-token");
        assert_eq!(config.server.port, 4000);

        std::env::remove_var("SIZEWATCH_TELEGRAM_TOKEN");
        std::env::remove_var("SIZEWATCH_PORT");
    }
}
