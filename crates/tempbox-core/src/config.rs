//! Session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::{Preference, ProviderPreference};
use crate::{Error, Result};

/// What happens to a resource that leaves the active slot without expiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchivePolicy {
    /// Only natural expiry (and replacement) archives; explicit deletion is
    /// terminal.
    #[default]
    ExpiryOnly,
    /// Any removal from the active slot archives the resource.
    AnyRemoval,
}

/// Tunables for the session controller and its collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Countdown recomputation period in milliseconds.
    pub countdown_interval_ms: u64,
    /// Message polling period in seconds.
    pub refresh_interval_secs: u64,
    /// Maximum history entries kept locally; `0` means unbounded.
    pub history_limit: usize,
    /// Archival rule for explicit deletion.
    pub archive_policy: ArchivePolicy,
    /// Create a resource on startup when none is active.
    pub auto_create: bool,
    /// Preferred provider for new resources.
    pub provider: ProviderPreference,
    /// Preferred domain for new resources.
    pub domain: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            countdown_interval_ms: 1_000,
            refresh_interval_secs: 10,
            history_limit: 100,
            archive_policy: ArchivePolicy::default(),
            auto_create: true,
            provider: ProviderPreference::Auto,
            domain: None,
        }
    }
}

impl SessionConfig {
    /// Checks that the intervals are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if an interval is zero.
    pub fn validate(&self) -> Result<()> {
        if self.countdown_interval_ms == 0 {
            return Err(Error::Config(
                "countdown_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.refresh_interval_secs == 0 {
            return Err(Error::Config(
                "refresh_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Countdown period.
    #[must_use]
    pub const fn countdown_interval(&self) -> Duration {
        Duration::from_millis(self.countdown_interval_ms)
    }

    /// Polling period.
    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// History bound, if any.
    #[must_use]
    pub const fn history_capacity(&self) -> Option<usize> {
        if self.history_limit == 0 {
            None
        } else {
            Some(self.history_limit)
        }
    }

    /// Initial creation preference.
    #[must_use]
    pub fn preference(&self) -> Preference {
        Preference {
            provider: self.provider.clone(),
            domain: self.domain.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::ProviderTag;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.countdown_interval(), Duration::from_secs(1));
        assert_eq!(config.refresh_interval(), Duration::from_secs(10));
        assert_eq!(config.history_capacity(), Some(100));
        assert_eq!(config.archive_policy, ArchivePolicy::ExpiryOnly);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SessionConfig = serde_json::from_str(
            r#"{"refresh_interval_secs": 60, "archive_policy": "any_removal", "provider": "mailgw", "history_limit": 0}"#,
        )
        .unwrap();

        assert_eq!(config.refresh_interval_secs, 60);
        assert_eq!(config.countdown_interval_ms, 1_000);
        assert_eq!(config.archive_policy, ArchivePolicy::AnyRemoval);
        assert_eq!(config.history_capacity(), None);
        assert_eq!(
            config.preference().provider,
            ProviderPreference::Specific(ProviderTag::MailGw)
        );
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = SessionConfig {
            refresh_interval_secs: 0,
            ..SessionConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
