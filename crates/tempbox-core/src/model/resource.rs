//! Resource (mailbox) model types.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identifier for a resource, stable for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub String);

impl ResourceId {
    /// Create a new resource ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Upstream provider that backs a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderTag {
    /// Mail.tm.
    MailTm,
    /// Mail.gw.
    MailGw,
    /// 1secmail.
    OneSecMail,
    /// Guerrilla Mail.
    Guerrilla,
    /// TempMail.lol.
    TempMailLol,
    /// A provider this client does not know by name.
    Other(String),
}

impl ProviderTag {
    /// Providers known to this client, in display order.
    pub const KNOWN: [Self; 5] = [
        Self::MailTm,
        Self::MailGw,
        Self::OneSecMail,
        Self::Guerrilla,
        Self::TempMailLol,
    ];

    /// Wire name used by the backend.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::MailTm => "mailtm",
            Self::MailGw => "mailgw",
            Self::OneSecMail => "1secmail",
            Self::Guerrilla => "guerrilla",
            Self::TempMailLol => "tempmail_lol",
            Self::Other(name) => name,
        }
    }

    /// Human-readable provider name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Self::MailTm => "Mail.tm",
            Self::MailGw => "Mail.gw",
            Self::OneSecMail => "1secmail",
            Self::Guerrilla => "Guerrilla Mail",
            Self::TempMailLol => "TempMail.lol",
            Self::Other(name) => name,
        }
    }

    /// Parses a wire or display name, case-insensitively.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "mailtm" | "mail.tm" => Self::MailTm,
            "mailgw" | "mail.gw" => Self::MailGw,
            "1secmail" => Self::OneSecMail,
            "guerrilla" | "guerrillamail" | "guerrilla mail" => Self::Guerrilla,
            "tempmail_lol" | "tempmail.lol" => Self::TempMailLol,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ProviderTag {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ProviderTag> for String {
    fn from(value: ProviderTag) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ProviderTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Which provider the gateway should use for a new resource.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderPreference {
    /// Let the gateway choose.
    #[default]
    Auto,
    /// Use this provider only.
    Specific(ProviderTag),
}

impl ProviderPreference {
    /// Value sent as the `service` parameter.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Auto => "auto",
            Self::Specific(tag) => tag.as_str(),
        }
    }
}

impl From<String> for ProviderPreference {
    fn from(value: String) -> Self {
        if value.trim().is_empty() || value.eq_ignore_ascii_case("auto") {
            Self::Auto
        } else {
            Self::Specific(ProviderTag::parse(&value))
        }
    }
}

impl From<ProviderPreference> for String {
    fn from(value: ProviderPreference) -> Self {
        value.as_str().to_string()
    }
}

/// Provider and domain preference used when creating resources.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Preference {
    /// Provider choice.
    #[serde(default)]
    pub provider: ProviderPreference,
    /// Domain choice; `None` lets the gateway pick.
    #[serde(default)]
    pub domain: Option<String>,
}

impl Preference {
    /// Fully automatic preference.
    #[must_use]
    pub fn auto() -> Self {
        Self::default()
    }

    /// Preference for a specific provider and optional domain.
    #[must_use]
    pub const fn specific(provider: ProviderTag, domain: Option<String>) -> Self {
        Self {
            provider: ProviderPreference::Specific(provider),
            domain,
        }
    }
}

/// A provisioned, address-bearing mailbox with a bounded lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Stable identifier.
    pub id: ResourceId,
    /// Mail address, unique while active.
    pub address: String,
    /// Provider that created the mailbox.
    pub provider: ProviderTag,
    /// Creation time (server supplied).
    pub created_at: DateTime<Utc>,
    /// Expiry time (server supplied).
    pub expires_at: DateTime<Utc>,
    /// Whether the resource has been moved into history.
    #[serde(default)]
    pub is_archived: bool,
}

impl Resource {
    /// Whole seconds left before expiry, saturating at zero.
    #[must_use]
    pub fn time_left(&self, now: DateTime<Utc>) -> u64 {
        u64::try_from((self.expires_at - now).num_seconds()).unwrap_or(0)
    }

    /// Returns true once the countdown has reached zero.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.time_left(now) == 0
    }

    /// Lifetime granted at creation.
    #[must_use]
    pub fn ttl(&self) -> TimeDelta {
        self.expires_at - self.created_at
    }

    /// Local part of the address.
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.address
            .split_once('@')
            .map_or(self.address.as_str(), |(local, _)| local)
    }

    /// Domain part of the address, if any.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.address.split_once('@').map(|(_, domain)| domain)
    }
}

/// Formats seconds as `m:ss`.
#[must_use]
pub fn format_time_left(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
