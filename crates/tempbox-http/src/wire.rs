//! Backend payloads and their conversion into core models.
//!
//! The backend relays whatever its providers return, so payloads are parsed
//! leniently: ids may be numbers or strings, timestamps may lack a zone, and
//! message bodies may be a string, a list, null or absent. Everything is
//! normalized here so the core only sees canonical types.

use std::collections::HashSet;
use std::hash::BuildHasher;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tempbox_core::{
    HistoryEntry, Message, MessageDetail, MessageId, PinnedEntry, PinnedId, PinnedItem,
    Preference, ProviderTag, Resource, ResourceId, Sender,
};

use crate::error::{Error, Result};

/// An id the backend may send as a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    /// Numeric id.
    Int(i64),
    /// String id.
    Str(String),
}

impl From<WireId> for String {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Int(n) => n.to_string(),
            WireId::Str(s) => s,
        }
    }
}

/// Parses a timestamp with or without a zone; zoneless values are UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

fn timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognized timestamp: {raw}")))
}

fn optional_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("unrecognized timestamp: {raw}"))),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Fragments {
    One(String),
    Many(Vec<Option<String>>),
}

/// Body content as ordered, non-empty fragments.
fn fragments<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    let content: Option<Fragments> = Option::deserialize(deserializer)?;
    Ok(match content {
        None => Vec::new(),
        Some(Fragments::One(s)) => vec![s],
        Some(Fragments::Many(list)) => list.into_iter().flatten().collect(),
    }
    .into_iter()
    .filter(|s| !s.is_empty())
    .collect())
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireSender {
    Full {
        #[serde(default)]
        address: String,
        #[serde(default)]
        name: Option<String>,
    },
    Bare(String),
}

impl Default for WireSender {
    fn default() -> Self {
        Self::Bare(String::new())
    }
}

impl From<WireSender> for Sender {
    fn from(sender: WireSender) -> Self {
        match sender {
            WireSender::Full { address, name } => Self {
                name: name.filter(|n| !n.trim().is_empty() && *n != address),
                address,
            },
            WireSender::Bare(address) => Self {
                name: None,
                address,
            },
        }
    }
}

/// A message summary.
#[derive(Debug, Deserialize)]
pub struct WireMessage {
    id: WireId,
    #[serde(default)]
    from: WireSender,
    #[serde(default)]
    subject: Option<String>,
    #[serde(rename = "createdAt", alias = "created_at", deserialize_with = "timestamp")]
    created_at: DateTime<Utc>,
}

impl From<WireMessage> for Message {
    fn from(wire: WireMessage) -> Self {
        Self {
            id: MessageId::new(wire.id),
            from: wire.from.into(),
            subject: wire.subject.unwrap_or_default(),
            created_at: wire.created_at,
        }
    }
}

/// A message listing.
#[derive(Debug, Deserialize)]
pub struct WireMessageList {
    #[serde(default)]
    messages: Vec<WireMessage>,
}

impl WireMessageList {
    /// Summaries in server order.
    pub fn into_messages(self) -> Vec<Message> {
        self.messages.into_iter().map(Into::into).collect()
    }
}

/// Full message content.
#[derive(Debug, Deserialize)]
pub struct WireDetail {
    id: WireId,
    #[serde(default)]
    from: WireSender,
    #[serde(default)]
    subject: Option<String>,
    #[serde(rename = "createdAt", alias = "created_at", deserialize_with = "timestamp")]
    created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "fragments")]
    html: Vec<String>,
    #[serde(default, deserialize_with = "fragments")]
    text: Vec<String>,
}

impl From<WireDetail> for MessageDetail {
    fn from(wire: WireDetail) -> Self {
        Self {
            summary: Message {
                id: MessageId::new(wire.id),
                from: wire.from.into(),
                subject: wire.subject.unwrap_or_default(),
                created_at: wire.created_at,
            },
            html: wire.html,
            text: wire.text,
        }
    }
}

/// A mailbox as the backend describes it, live or archived.
#[derive(Debug, Deserialize)]
pub struct WireResource {
    id: WireId,
    address: String,
    #[serde(default)]
    provider: Option<String>,
    #[serde(deserialize_with = "timestamp")]
    created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    expires_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    expired_at: Option<DateTime<Utc>>,
}

impl WireResource {
    fn provider(&self) -> ProviderTag {
        self.provider
            .as_deref()
            .map_or(ProviderTag::MailTm, ProviderTag::parse)
    }

    /// Converts a live mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResponse`] without an expiry time.
    pub fn into_resource(self) -> Result<Resource> {
        let provider = self.provider();
        let expires_at = self
            .expires_at
            .ok_or_else(|| Error::InvalidResponse(format!("{} has no expiry", self.address)))?;
        Ok(Resource {
            id: ResourceId::new(self.id),
            address: self.address,
            provider,
            created_at: self.created_at,
            expires_at,
            is_archived: false,
        })
    }

    /// Converts an archived mailbox. Missing times fall back to each other,
    /// then to creation time.
    pub fn into_history(self) -> HistoryEntry {
        let provider = self.provider();
        let expired_at = self.expired_at.or(self.expires_at).unwrap_or(self.created_at);
        let resource = Resource {
            id: ResourceId::new(self.id),
            address: self.address,
            provider,
            created_at: self.created_at,
            expires_at: self.expires_at.unwrap_or(expired_at),
            is_archived: true,
        };
        HistoryEntry::new(resource, expired_at)
    }
}

/// Response of the extend route.
#[derive(Debug, Deserialize)]
pub struct WireExtension {
    /// New expiry.
    #[serde(deserialize_with = "timestamp")]
    pub expires_at: DateTime<Utc>,
}

/// Response of the domains route.
#[derive(Debug, Deserialize)]
pub struct WireDomains {
    /// Offered domains.
    #[serde(default)]
    pub domains: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireSavedItem {
    Email { email: WireResource },
    Message { email_id: WireId, message: WireDetail },
}

/// A pinned entry.
#[derive(Debug, Deserialize)]
pub struct WireSaved {
    id: WireId,
    #[serde(deserialize_with = "timestamp")]
    saved_at: DateTime<Utc>,
    #[serde(flatten)]
    item: WireSavedItem,
}

impl WireSaved {
    /// Converts to a pinned entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResponse`] if a saved mailbox has no expiry.
    pub fn into_pinned(self) -> Result<PinnedEntry> {
        let item = match self.item {
            WireSavedItem::Email { email } => {
                let expires_at = email.expires_at.or(email.expired_at);
                let resource = WireResource {
                    expires_at,
                    ..email
                }
                .into_resource()?;
                PinnedItem::Resource { resource }
            }
            WireSavedItem::Message { email_id, message } => PinnedItem::Message {
                resource_id: ResourceId::new(email_id),
                detail: message.into(),
            },
        };
        Ok(PinnedEntry {
            id: PinnedId::new(self.id),
            saved_at: self.saved_at,
            item,
        })
    }
}

/// Body of the create route.
#[derive(Debug, Serialize)]
pub struct CreateRequest<'a> {
    service: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    domain: Option<&'a str>,
}

impl<'a> CreateRequest<'a> {
    /// Request for `preference`.
    #[must_use]
    pub fn new(preference: &'a Preference) -> Self {
        Self {
            service: preference.provider.as_str(),
            domain: preference.domain.as_deref(),
        }
    }
}

/// Body of the bulk delete routes; `ids: null` deletes everything.
#[derive(Debug, Serialize)]
pub struct DeleteRequest {
    ids: Option<Vec<serde_json::Value>>,
}

impl DeleteRequest {
    /// Request for `ids`, or for everything when `None`.
    ///
    /// Numeric ids are sent as numbers.
    pub fn new<T: AsRef<str>, S: BuildHasher>(ids: Option<&HashSet<T, S>>) -> Self {
        Self {
            ids: ids.map(|ids| {
                let mut ids: Vec<&str> = ids.iter().map(AsRef::as_ref).collect();
                ids.sort_unstable();
                ids.into_iter()
                    .map(|id| {
                        id.parse::<i64>()
                            .map_or_else(|_| serde_json::Value::from(id), serde_json::Value::from)
                    })
                    .collect()
            }),
        }
    }
}
