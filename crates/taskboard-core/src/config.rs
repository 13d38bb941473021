//! Application configuration management.
//!
//! Holds the backend address, request timeout, page size and the last email
//! used to sign in. Stored at `~/.config/taskboard/config.json`; a missing
//! file means defaults. `TASKBOARD_API_URL` overrides the stored address.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::task::{clamp_per_page, DEFAULT_PER_PAGE};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "taskboard";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `api_base_url`
pub const API_URL_ENV: &str = "TASKBOARD_API_URL";

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5005";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub per_page: u32,
    pub last_email: Option<String>,
    /// Address from the environment. Used for this run, never saved.
    #[serde(skip)]
    api_url_override: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            per_page: DEFAULT_PER_PAGE,
            last_email: None,
            api_url_override: None,
        }
    }
}

impl Config {
    /// Load the stored config and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };
        config.apply_overrides(std::env::var(API_URL_ENV).ok());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Apply an API address override for this run; blank values are ignored.
    /// The stored `api_base_url` is left alone so `save` never persists it.
    pub fn apply_overrides(&mut self, api_url: Option<String>) {
        if let Some(url) = api_url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()) {
            debug!(url = %url, "Using API URL from environment");
            self.api_url_override = Some(url);
        }
    }

    /// The address requests go to: the override if set, else the stored one.
    pub fn api_base_url(&self) -> &str {
        self.api_url_override.as_deref().unwrap_or(&self.api_base_url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Page size within the backend's accepted range.
    pub fn page_size(&self) -> u32 {
        clamp_per_page(self.per_page)
    }

    /// Remember the email of a successful sign-in.
    pub fn remember_email(&mut self, email: &str) -> bool {
        let email = email.trim();
        if email.is_empty() || self.last_email.as_deref() == Some(email) {
            return false;
        }
        self.last_email = Some(email.to_string());
        true
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for log files.
    pub fn log_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_base_url(), "http://127.0.0.1:5005");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.page_size(), 10);
        assert!(config.last_email.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"per_page": 25}"#).unwrap();
        assert_eq!(config.per_page, 25);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_env_override() {
        let mut config = Config::default();
        config.apply_overrides(Some(" http://api.internal:8080 ".to_string()));
        assert_eq!(config.api_base_url(), "http://api.internal:8080");

        config.apply_overrides(Some("   ".to_string()));
        assert_eq!(config.api_base_url(), "http://api.internal:8080");

        config.apply_overrides(None);
        assert_eq!(config.api_base_url(), "http://api.internal:8080");
    }

    #[test]
    fn test_env_override_is_not_saved() {
        let stored = r#"{"api_base_url": "http://tasks.example.com"}"#;
        let mut config: Config = serde_json::from_str(stored).unwrap();
        config.apply_overrides(Some("http://localhost:9999".to_string()));
        assert_eq!(config.api_base_url(), "http://localhost:9999");

        config.remember_email("a@example.com");
        let saved = serde_json::to_string_pretty(&config).unwrap();
        assert!(!saved.contains("localhost:9999"));

        let reloaded: Config = serde_json::from_str(&saved).unwrap();
        assert_eq!(reloaded.api_base_url(), "http://tasks.example.com");
        assert_eq!(reloaded.last_email.as_deref(), Some("a@example.com"));
    }

    #[test]
    fn test_page_size_is_clamped() {
        let config = Config {
            per_page: 1000,
            ..Config::default()
        };
        assert_eq!(config.page_size(), 100);
        let config = Config {
            per_page: 0,
            ..Config::default()
        };
        assert_eq!(config.page_size(), 1);
    }

    #[test]
    fn test_zero_timeout_is_raised() {
        let config = Config {
            request_timeout_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.request_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_remember_email() {
        let mut config = Config::default();
        assert!(config.remember_email(" a@example.com "));
        assert_eq!(config.last_email.as_deref(), Some("a@example.com"));
        assert!(!config.remember_email("a@example.com"));
        assert!(!config.remember_email(""));
    }

    #[test]
    fn test_round_trip_through_json() {
        let config = Config {
            last_email: Some("b@example.com".to_string()),
            ..Config::default()
        };
        let json = serde_json::to_string_pretty(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
