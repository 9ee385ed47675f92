//! Collections mirrored against the remote store.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::{CollectionStore, Entry};
use crate::gateway::MailGateway;
use crate::model::{HistoryEntry, PinnedEntry};
use crate::{Error, Result};

/// An entry type with a remote listing and bulk delete.
pub trait RemoteEntry: Entry {
    /// Collection name used in logs.
    const COLLECTION: &'static str;

    /// Lists the remote collection, most recent first.
    fn fetch_all<G: MailGateway>(gateway: &G) -> impl Future<Output = Result<Vec<Self>>> + Send;

    /// Deletes `ids` remotely, or everything when `None`.
    fn delete_remote<G: MailGateway>(
        gateway: &G,
        ids: Option<&HashSet<Self::Id>>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Returns true if the remote listing never includes this entry.
    fn is_local(&self) -> bool {
        false
    }
}

impl RemoteEntry for HistoryEntry {
    const COLLECTION: &'static str = "history";

    fn fetch_all<G: MailGateway>(gateway: &G) -> impl Future<Output = Result<Vec<Self>>> + Send {
        gateway.list_history()
    }

    fn delete_remote<G: MailGateway>(
        gateway: &G,
        ids: Option<&HashSet<Self::Id>>,
    ) -> impl Future<Output = Result<()>> + Send {
        gateway.delete_history(ids)
    }

    fn is_local(&self) -> bool {
        self.local
    }
}

impl RemoteEntry for PinnedEntry {
    const COLLECTION: &'static str = "pinned";

    fn fetch_all<G: MailGateway>(gateway: &G) -> impl Future<Output = Result<Vec<Self>>> + Send {
        gateway.list_pinned()
    }

    fn delete_remote<G: MailGateway>(
        gateway: &G,
        ids: Option<&HashSet<Self::Id>>,
    ) -> impl Future<Output = Result<()>> + Send {
        gateway.delete_pinned(ids)
    }
}

/// A [`CollectionStore`] whose deletions are confirmed upstream first.
///
/// Local entries are only removed after the remote delete succeeds, so a
/// failed request leaves local and remote state in agreement. Cloning yields
/// another handle to the same store.
pub struct SyncedCollection<E: Entry, G> {
    gateway: Arc<G>,
    store: Arc<Mutex<CollectionStore<E>>>,
}

impl<E: Entry, G> Clone for SyncedCollection<E, G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            store: Arc::clone(&self.store),
        }
    }
}

impl<E: Entry, G> SyncedCollection<E, G> {
    /// Wraps `store`.
    #[must_use]
    pub fn new(gateway: Arc<G>, store: CollectionStore<E>) -> Self {
        Self {
            gateway,
            store: Arc::new(Mutex::new(store)),
        }
    }

    fn store(&self) -> MutexGuard<'_, CollectionStore<E>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds an entry locally.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateEntry`] if the id is already present.
    pub fn add(&self, entry: E) -> Result<()> {
        self.store().add(entry)
    }

    /// Replaces the local contents.
    pub fn replace_all(&self, entries: impl IntoIterator<Item = E>) {
        self.store().replace_all(entries);
    }

    /// Entries, most recent first.
    #[must_use]
    pub fn list(&self) -> Vec<E> {
        self.store().to_vec()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store().len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store().is_empty()
    }

    /// Looks up an entry by id.
    #[must_use]
    pub fn get(&self, id: &E::Id) -> Option<E> {
        self.store().get(id).cloned()
    }

    /// Returns true if an entry with `id` exists.
    #[must_use]
    pub fn contains(&self, id: &E::Id) -> bool {
        self.store().contains(id)
    }

    /// First entry matching `predicate`.
    #[must_use]
    pub fn find(&self, predicate: impl Fn(&E) -> bool) -> Option<E> {
        self.store().iter().find(|e| predicate(e)).cloned()
    }

    /// Entry at `index` in display order.
    #[must_use]
    pub fn nth(&self, index: usize) -> Option<E> {
        self.store().iter().nth(index).cloned()
    }

    /// Toggles selection of an existing entry.
    pub fn toggle_selected(&self, id: &E::Id) -> bool {
        self.store().toggle_selected(id)
    }

    /// Select-all / deselect-all.
    pub fn toggle_select_all(&self) {
        self.store().toggle_select_all();
    }

    /// Deselects everything.
    pub fn clear_selection(&self) {
        self.store().clear_selection();
    }

    /// Returns true if `id` is selected.
    #[must_use]
    pub fn is_selected(&self, id: &E::Id) -> bool {
        self.store().selection().is_selected(id)
    }

    /// Selected ids.
    #[must_use]
    pub fn selected(&self) -> HashSet<E::Id> {
        self.store().selection().to_set()
    }
}

impl<E: RemoteEntry, G: MailGateway> SyncedCollection<E, G> {
    /// Reloads the collection from the remote listing.
    ///
    /// Local-only entries the listing does not contain are kept ahead of it.
    ///
    /// # Errors
    ///
    /// Returns the gateway error; local contents are kept in that case.
    pub async fn sync(&self) -> Result<usize> {
        let entries = E::fetch_all(&*self.gateway).await?;
        let mut store = self.store();
        let listed: HashSet<&E::Id> = entries.iter().map(Entry::id).collect();
        let kept: Vec<E> = store
            .iter()
            .filter(|e| e.is_local() && !listed.contains(e.id()))
            .cloned()
            .collect();

        let kept_count = kept.len();
        store.replace_all(kept.into_iter().chain(entries));
        debug!(
            "Synced {} collection: {} entries ({kept_count} local only)",
            E::COLLECTION,
            store.len()
        );
        Ok(store.len())
    }

    /// Deletes `ids` upstream, then locally.
    ///
    /// # Errors
    ///
    /// Returns the gateway error; nothing is removed locally in that case.
    pub async fn delete(&self, ids: &HashSet<E::Id>) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        accept_missing(E::delete_remote(&*self.gateway, Some(ids)).await, E::COLLECTION)?;
        let removed = self.store().remove(ids);
        info!("Deleted {removed} {} entries", E::COLLECTION);
        Ok(removed)
    }

    /// Deletes the selected entries.
    ///
    /// # Errors
    ///
    /// Returns the gateway error; the selection is kept in that case.
    pub async fn delete_selected(&self) -> Result<usize> {
        let selected = self.selected();
        self.delete(&selected).await
    }

    /// Deletes everything upstream, then locally.
    ///
    /// # Errors
    ///
    /// Returns the gateway error; nothing is removed locally in that case.
    pub async fn clear(&self) -> Result<usize> {
        accept_missing(E::delete_remote(&*self.gateway, None).await, E::COLLECTION)?;
        let removed = self.store().clear();
        info!("Cleared {} collection ({removed} entries)", E::COLLECTION);
        Ok(removed)
    }
}

/// Deleting something that is already gone counts as success.
fn accept_missing(result: Result<()>, collection: &str) -> Result<()> {
    match result {
        Err(Error::NotFound(what)) => {
            debug!("{collection} delete target already gone: {what}");
            Ok(())
        }
        Err(e) => {
            warn!("{collection} delete failed: {e}");
            Err(e)
        }
        ok => ok,
    }
}
