//! Domain model types.

mod entry;
mod message;
mod resource;

pub use entry::{HistoryEntry, PinnedEntry, PinnedId, PinnedItem, PinnedSource};
pub use message::{Message, MessageDetail, MessageId, Sender};
pub use resource::{
    Preference, ProviderPreference, ProviderTag, Resource, ResourceId, format_time_left,
};
