//! Message data models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a message within its resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    /// Create a new message ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message sender.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sender {
    /// Display name, if the sender supplied one.
    pub name: Option<String>,
    /// Mail address.
    pub address: String,
}

impl Sender {
    /// Name for display, falling back to the address.
    #[must_use]
    pub fn display(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.address,
        }
    }
}

/// Summary of a message for display in a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Identifier.
    pub id: MessageId,
    /// Sender.
    pub from: Sender,
    /// Subject line.
    pub subject: String,
    /// Receive time.
    pub created_at: DateTime<Utc>,
}

/// Full message content.
///
/// Bodies are ordered fragment sequences. Either may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDetail {
    /// Summary fields.
    #[serde(flatten)]
    pub summary: Message,
    /// HTML fragments.
    #[serde(default)]
    pub html: Vec<String>,
    /// Plain text fragments.
    #[serde(default)]
    pub text: Vec<String>,
}

impl MessageDetail {
    /// Message identifier.
    #[must_use]
    pub const fn id(&self) -> &MessageId {
        &self.summary.id
    }

    /// Plain text body with fragments joined by newlines.
    #[must_use]
    pub fn text_body(&self) -> String {
        self.text.join("\n")
    }

    /// HTML body with fragments concatenated.
    #[must_use]
    pub fn html_body(&self) -> String {
        self.html.concat()
    }

    /// Returns true if neither body carries any content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.html.iter().chain(&self.text).all(|f| f.trim().is_empty())
    }
}
