//! Configuration management
//!
//! Handles loading, saving, and managing client settings.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable overriding the configured service URL
pub const API_URL_ENV: &str = "PII_SHIELD_API_URL";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the masking service, e.g. `http://127.0.0.1:8000/api`
    pub api_base_url: String,

    /// Timeout for upload and mask requests in seconds
    pub request_timeout_secs: u64,

    /// How often the dashboard probes the service health endpoint
    pub health_poll_secs: u64,

    /// Theme: "dark", "light", or "system"
    pub theme: String,

    /// How long the "Copied!" confirmation stays visible
    pub copy_feedback_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000/api".into(),
            request_timeout_secs: 300,
            health_poll_secs: 30,
            theme: "system".into(),
            copy_feedback_secs: 2,
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to find config directory")?
            .join("pii-shield");

        fs::create_dir_all(&config_dir)
            .context("Failed to create config directory")?;

        Ok(config_dir)
    }

    fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load config from disk or create default, then apply environment
    /// overrides
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        let mut config = if path.exists() {
            let data = fs::read_to_string(&path)
                .context("Failed to read config file")?;
            Self::from_json(&data)?
        } else {
            let config = Self::default();
            config.save()?;
            config
        };

        config.apply_env_overrides(std::env::var(API_URL_ENV).ok());
        Ok(config)
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        let data = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(&path, data)
            .context("Failed to write config file")?;
        Ok(())
    }

    /// Parse a config file body; missing fields take their defaults
    pub fn from_json(data: &str) -> Result<Self> {
        serde_json::from_str(data).context("Failed to parse config file")
    }

    fn apply_env_overrides(&mut self, api_url: Option<String>) {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            debug!("Service URL overridden by {}", API_URL_ENV);
            self.api_base_url = url;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn health_poll_interval(&self) -> Duration {
        Duration::from_secs(self.health_poll_secs.max(1))
    }

    pub fn copy_feedback(&self) -> Duration {
        Duration::from_secs(self.copy_feedback_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = Config::from_json(r#"{"api_base_url": "https://pii.internal/api"}"#).unwrap();
        assert_eq!(config.api_base_url, "https://pii.internal/api");
        assert_eq!(config.request_timeout_secs, 300);
        assert_eq!(config.theme, "system");
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        assert!(Config::from_json("not json").is_err());
    }

    #[test]
    fn test_env_override() {
        let mut config = Config::default();
        config.apply_env_overrides(Some("http://10.0.0.5:8000/api".into()));
        assert_eq!(config.api_base_url, "http://10.0.0.5:8000/api");

        let mut config = Config::default();
        config.apply_env_overrides(Some("  ".into()));
        assert_eq!(config.api_base_url, Config::default().api_base_url);
    }

    #[test]
    fn test_durations_never_zero() {
        let config = Config {
            request_timeout_secs: 0,
            health_poll_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.request_timeout(), Duration::from_secs(1));
        assert_eq!(config.health_poll_interval(), Duration::from_secs(1));
    }
}
