use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::ConwatchError;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub autosave: AutosaveConfig,
    #[serde(default)]
    pub resume: ResumeConfig,
    #[serde(default)]
    pub messaging: MessagingConfig,
    #[serde(default)]
    pub notice: NoticeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutosaveConfig {
    pub interval_secs: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self { interval_secs: 120 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeConfig {
    pub poll_interval_ms: u64,
    pub timeout_secs: u64,
    pub navigation_settle_ms: u64,
}

impl Default for ResumeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            timeout_secs: 20,
            navigation_settle_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    pub request_timeout_ms: u64,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticeConfig {
    pub dismiss_ms: u64,
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self { dismiss_ms: 2500 }
    }
}

impl AutosaveConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl ResumeConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn navigation_settle(&self) -> Duration {
        Duration::from_millis(self.navigation_settle_ms)
    }
}

impl NoticeConfig {
    pub fn dismiss(&self) -> Duration {
        Duration::from_millis(self.dismiss_ms)
    }
}

impl MessagingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl AppConfig {
    /// Load config: the user file if it exists, else the built-in defaults.
    pub fn load() -> Result<Self, ConwatchError> {
        let user_path = Self::config_path();
        if user_path.exists() {
            let user_str = std::fs::read_to_string(&user_path)?;
            Self::from_toml(&user_str)
        } else {
            Self::from_toml(DEFAULT_CONFIG)
        }
    }

    pub fn from_toml(s: &str) -> Result<Self, ConwatchError> {
        toml::from_str(s).map_err(|e| ConwatchError::Config(e.to_string()))
    }

    /// Path to user config file (XDG on Linux, AppData on Windows).
    pub fn config_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Path to the database file.
    pub fn db_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.data_dir().join("conwatch.db"))
            .unwrap_or_else(|| PathBuf::from("conwatch.db"))
    }

    /// Ensure the data directory exists and return the DB path.
    pub fn ensure_db_path() -> Result<PathBuf, ConwatchError> {
        let path = Self::db_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(path)
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "conwatch")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("built-in default config is valid TOML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config = AppConfig::default();
        assert_eq!(config.autosave.interval_secs, 120);
        assert_eq!(config.resume.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.resume.timeout(), Duration::from_secs(20));
        assert_eq!(config.resume.navigation_settle(), Duration::from_secs(1));
        assert_eq!(config.notice.dismiss_ms, 2500);
    }

    #[test]
    fn test_partial_user_file_falls_back() {
        let config = AppConfig::from_toml("[autosave]\ninterval_secs = 30\n").unwrap();
        assert_eq!(config.autosave.interval(), Duration::from_secs(30));
        assert_eq!(config.resume.timeout_secs, 20);
        assert_eq!(config.messaging.request_timeout_ms, 5000);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        assert!(matches!(
            AppConfig::from_toml("autosave = ["),
            Err(ConwatchError::Config(_))
        ));
    }

    #[test]
    fn test_roundtrip() {
        let config = AppConfig::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized = AppConfig::from_toml(&serialized).unwrap();
        assert_eq!(
            deserialized.autosave.interval_secs,
            config.autosave.interval_secs
        );
    }
}
