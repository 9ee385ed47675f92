//! Deduplicated, most-recent-first entry store.

use std::collections::{HashSet, VecDeque};
use std::fmt::{Debug, Display};
use std::hash::Hash;

use super::SelectionSet;
use crate::{Error, Result};

/// An item that can live in a [`CollectionStore`].
pub trait Entry: Clone + Send + Sync + 'static {
    /// Key type. Unique within one collection.
    type Id: Clone + Eq + Hash + Debug + Display + Send + Sync + 'static;

    /// Returns the entry key.
    fn id(&self) -> &Self::Id;
}

/// In-memory collection with uniqueness on id and a scoped selection.
///
/// Entries are kept most recent first. Removing an entry always removes its
/// id from the selection.
#[derive(Debug, Clone)]
pub struct CollectionStore<E: Entry> {
    entries: VecDeque<E>,
    ids: HashSet<E::Id>,
    selection: SelectionSet<E::Id>,
    capacity: Option<usize>,
}

impl<E: Entry> Default for CollectionStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entry> CollectionStore<E> {
    /// Creates an unbounded store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            ids: HashSet::new(),
            selection: SelectionSet::new(),
            capacity: None,
        }
    }

    /// Creates a store that keeps at most `capacity` entries, evicting the
    /// oldest first.
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::new()
        }
    }

    /// Prepends `entry`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateEntry`] and leaves the store unchanged if an
    /// entry with the same id is already present.
    pub fn add(&mut self, entry: E) -> Result<()> {
        if self.ids.contains(entry.id()) {
            return Err(Error::DuplicateEntry(entry.id().to_string()));
        }
        self.ids.insert(entry.id().clone());
        self.entries.push_front(entry);
        self.evict_overflow();
        Ok(())
    }

    /// Removes every entry whose id is in `ids`. Unknown ids are ignored.
    ///
    /// Returns the number of entries removed.
    pub fn remove(&mut self, ids: &HashSet<E::Id>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !ids.contains(e.id()));
        for id in ids {
            self.ids.remove(id);
            self.selection.remove(id);
        }
        before - self.entries.len()
    }

    /// Removes all entries and the selection.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.ids.clear();
        self.selection.clear();
        removed
    }

    /// Replaces the contents with `entries` (already most recent first).
    ///
    /// Later duplicates of an id are dropped and the selection is pruned to
    /// the ids that survive.
    pub fn replace_all(&mut self, entries: impl IntoIterator<Item = E>) {
        self.entries.clear();
        self.ids.clear();
        for entry in entries {
            if self.ids.insert(entry.id().clone()) {
                self.entries.push_back(entry);
            }
        }
        self.evict_overflow();
        let ids = &self.ids;
        self.selection.retain(|id| ids.contains(id));
    }

    fn evict_overflow(&mut self) {
        let Some(capacity) = self.capacity else {
            return;
        };
        while self.entries.len() > capacity {
            if let Some(evicted) = self.entries.pop_back() {
                self.ids.remove(evicted.id());
                self.selection.remove(evicted.id());
            }
        }
    }

    /// Entries, most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.entries.iter()
    }

    /// Copies the entries out, most recent first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<E> {
        self.entries.iter().cloned().collect()
    }

    /// Looks up an entry by id.
    #[must_use]
    pub fn get(&self, id: &E::Id) -> Option<&E> {
        if !self.ids.contains(id) {
            return None;
        }
        self.entries.iter().find(|e| e.id() == id)
    }

    /// Returns true if an entry with `id` exists.
    #[must_use]
    pub fn contains(&self, id: &E::Id) -> bool {
        self.ids.contains(id)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries kept, if bounded.
    #[must_use]
    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Current selection.
    #[must_use]
    pub const fn selection(&self) -> &SelectionSet<E::Id> {
        &self.selection
    }

    /// Toggles selection of an existing entry. Unknown ids are ignored.
    ///
    /// Returns whether the entry is now selected.
    pub fn toggle_selected(&mut self, id: &E::Id) -> bool {
        if !self.ids.contains(id) {
            return false;
        }
        self.selection.toggle(id)
    }

    /// Select-all / deselect-all over the current entries.
    pub fn toggle_select_all(&mut self) {
        self.selection.select_all(self.ids.iter().cloned());
    }

    /// Deselects everything.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }
}
