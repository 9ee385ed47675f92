//! History and pinned collections.
//!
//! Both collections share one contract: unique ids, most recent first,
//! bulk selection, and deletions confirmed upstream before they apply
//! locally.

mod selection;
mod store;
mod synced;

pub use selection::SelectionSet;
pub use store::{CollectionStore, Entry};
pub use synced::{RemoteEntry, SyncedCollection};
