//! History and pinned collection entries.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MessageDetail, MessageId, Resource, ResourceId};
use crate::collection::Entry;

/// A former active resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The archived resource.
    pub resource: Resource,
    /// When it left the active slot.
    pub expired_at: DateTime<Utc>,
    /// Archived by this client only. The remote history never lists it.
    #[serde(default)]
    pub local: bool,
}

impl HistoryEntry {
    /// Creates a history entry, marking the resource archived.
    #[must_use]
    pub fn new(mut resource: Resource, expired_at: DateTime<Utc>) -> Self {
        resource.is_archived = true;
        Self {
            resource,
            expired_at,
            local: false,
        }
    }

    /// Creates an entry for a resource this client archived itself, such as
    /// one displaced by a manual create.
    #[must_use]
    pub fn archived_locally(resource: Resource, expired_at: DateTime<Utc>) -> Self {
        Self {
            local: true,
            ..Self::new(resource, expired_at)
        }
    }
}

impl Entry for HistoryEntry {
    type Id = ResourceId;

    fn id(&self) -> &ResourceId {
        &self.resource.id
    }
}

/// Identifier of a pinned entry, independent of resource and message ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinnedId(pub String);

impl PinnedId {
    /// Create a new pinned ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for PinnedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a pinned entry holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PinnedItem {
    /// A saved mailbox. Its messages are not captured.
    Resource {
        /// The saved resource.
        resource: Resource,
    },
    /// A saved message with its full content captured at save time.
    Message {
        /// Resource the message arrived in.
        resource_id: ResourceId,
        /// Captured content.
        detail: MessageDetail,
    },
}

/// The thing a pinned entry was saved from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PinnedSource {
    /// Saved from a resource.
    Resource(ResourceId),
    /// Saved from a message of a resource.
    Message(ResourceId, MessageId),
}

/// A user-saved resource or message. Never expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedEntry {
    /// Own identifier.
    pub id: PinnedId,
    /// When it was saved.
    pub saved_at: DateTime<Utc>,
    /// Saved content.
    pub item: PinnedItem,
}

impl PinnedEntry {
    /// Source this entry was saved from.
    #[must_use]
    pub fn source(&self) -> PinnedSource {
        match &self.item {
            PinnedItem::Resource { resource } => PinnedSource::Resource(resource.id.clone()),
            PinnedItem::Message {
                resource_id,
                detail,
            } => PinnedSource::Message(resource_id.clone(), detail.id().clone()),
        }
    }

    /// One-line label for lists.
    #[must_use]
    pub fn label(&self) -> String {
        match &self.item {
            PinnedItem::Resource { resource } => resource.address.clone(),
            PinnedItem::Message { detail, .. } => format!(
                "{}: {}",
                detail.summary.from.display(),
                detail.summary.subject
            ),
        }
    }

    /// Captured message content, if this entry is a message.
    #[must_use]
    pub const fn detail(&self) -> Option<&MessageDetail> {
        match &self.item {
            PinnedItem::Message { detail, .. } => Some(detail),
            PinnedItem::Resource { .. } => None,
        }
    }
}

impl Entry for PinnedEntry {
    type Id = PinnedId;

    fn id(&self) -> &PinnedId {
        &self.id
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::model::{Message, ProviderTag, Sender};

    fn resource() -> Resource {
        let now = Utc::now();
        Resource {
            id: ResourceId::new("7"),
            address: "x7@mail.test".to_string(),
            provider: ProviderTag::MailGw,
            created_at: now,
            expires_at: now + TimeDelta::minutes(10),
            is_archived: false,
        }
    }

    #[test]
    fn test_history_entry_marks_archived() {
        let r = resource();
        let entry = HistoryEntry::new(r.clone(), r.expires_at);
        assert!(entry.resource.is_archived);
        assert!(!entry.local);
        assert_eq!(entry.id(), &r.id);

        let local = HistoryEntry::archived_locally(r.clone(), r.expires_at);
        assert!(local.local);
        assert!(local.resource.is_archived);
    }

    #[test]
    fn test_history_entry_without_local_flag() {
        let entry = HistoryEntry::archived_locally(resource(), Utc::now());
        let mut json = serde_json::to_value(&entry).unwrap();
        json.as_object_mut().unwrap().remove("local");
        let back: HistoryEntry = serde_json::from_value(json).unwrap();
        assert!(!back.local);
    }

    #[test]
    fn test_pinned_source_and_serde() {
        let detail = MessageDetail {
            summary: Message {
                id: MessageId::new("m9"),
                from: Sender {
                    name: Some("Bank".to_string()),
                    address: "otp@bank.test".to_string(),
                },
                subject: "OTP".to_string(),
                created_at: Utc::now(),
            },
            html: Vec::new(),
            text: vec!["123456".to_string()],
        };
        let entry = PinnedEntry {
            id: PinnedId::new("p1"),
            saved_at: Utc::now(),
            item: PinnedItem::Message {
                resource_id: ResourceId::new("7"),
                detail,
            },
        };

        assert_eq!(
            entry.source(),
            PinnedSource::Message(ResourceId::new("7"), MessageId::new("m9"))
        );
        assert_eq!(entry.label(), "Bank: OTP");
        assert!(entry.detail().is_some());

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["item"]["kind"], "message");
        let back: PinnedEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }
}
