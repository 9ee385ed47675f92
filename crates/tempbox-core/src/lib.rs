//! # tempbox-core
//!
//! Core logic for the Tempbox disposable mail client.
//!
//! This crate provides:
//! - Domain models (resources, messages, history and pinned entries)
//! - The [`MailGateway`] trait the backend is reached through
//! - **Session Controller** - single active resource with countdown and
//!   single-flight renewal on expiry
//! - **Refresh Scheduler** - background message polling with stale-response
//!   protection
//! - **Collections** - bounded history and pinned entries with bulk
//!   selection, mirrored against the backend
//! - **View Coordinator** - navigation state for front ends
//! - **Snapshot Cache** - `SQLite` copy of the collections for offline viewing

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod collection;
pub mod config;
mod error;
pub mod gateway;
pub mod model;
pub mod refresh;
pub mod session;
pub mod snapshot;
pub mod time;
pub mod view;
pub mod workspace;

pub use collection::{CollectionStore, Entry, RemoteEntry, SelectionSet, SyncedCollection};
pub use config::{ArchivePolicy, SessionConfig};
pub use error::{Error, Result};
pub use gateway::MailGateway;
pub use model::{
    HistoryEntry, Message, MessageDetail, MessageId, PinnedEntry, PinnedId, PinnedItem,
    PinnedSource, Preference, ProviderPreference, ProviderTag, Resource, ResourceId, Sender,
    format_time_left,
};
pub use refresh::{PollOutcome, RefreshScheduler};
pub use session::{
    ClearReason, ExpiryGuard, Renewal, SessionController, SessionEvent, SessionPhase, TickOutcome,
};
pub use snapshot::SnapshotRepository;
pub use time::{Clock, MockClock, SharedClock, SystemClock};
pub use view::{DetailItem, Scope, Tab, Ticket, View, ViewCoordinator};
pub use workspace::{SaveOutcome, Workspace};
