//! Application configuration.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tempbox_core::SessionConfig;

/// Environment variable overriding [`AppConfig::api_base_url`].
pub const API_URL_ENV: &str = "TEMPBOX_API_URL";

/// Settings read from `<config_dir>/tempbox/config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Backend base URL.
    pub api_base_url: String,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
    /// Snapshot database; defaults to the data directory.
    pub snapshot_path: Option<PathBuf>,
    /// Session tunables.
    #[serde(flatten)]
    pub session: SessionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8001".to_string(),
            request_timeout_secs: 10,
            snapshot_path: None,
            session: SessionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the config file, falling back to defaults if it does not exist,
    /// then applies the environment override.
    pub async fn load() -> Result<Self> {
        let path = config_dir().join("config.json");
        let mut config = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            Self::parse(&contents).with_context(|| format!("parsing {}", path.display()))?
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var(API_URL_ENV) {
            config.api_base_url = url;
        }
        config.session.validate()?;
        Ok(config)
    }

    fn parse(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Snapshot database path, creating its directory if needed.
    pub fn snapshot_path(&self) -> Result<PathBuf> {
        let path = self
            .snapshot_path
            .clone()
            .unwrap_or_else(|| data_dir().join("snapshot.db"));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        Ok(path)
    }
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tempbox")
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tempbox")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempbox_core::{ArchivePolicy, ProviderPreference, ProviderTag};

    #[test]
    fn test_empty_file_uses_defaults() {
        assert_eq!(AppConfig::parse("{}").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_session_fields_are_flattened() {
        let config = AppConfig::parse(
            r#"{
                "api_base_url": "https://mail.example.test",
                "refresh_interval_secs": 5,
                "archive_policy": "any_removal",
                "provider": "1secmail"
            }"#,
        )
        .unwrap();

        assert_eq!(config.api_base_url, "https://mail.example.test");
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.session.refresh_interval_secs, 5);
        assert_eq!(config.session.archive_policy, ArchivePolicy::AnyRemoval);
        assert_eq!(
            config.session.provider,
            ProviderPreference::Specific(ProviderTag::OneSecMail)
        );
        assert_eq!(config.session.countdown_interval_ms, 1_000);
    }
}
