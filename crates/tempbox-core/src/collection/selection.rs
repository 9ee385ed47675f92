//! Multi-select state shared by the history and pinned collections.

use std::collections::HashSet;
use std::hash::Hash;

/// A set of selected entry ids scoped to one collection.
///
/// The owning [`CollectionStore`](super::CollectionStore) keeps every id in
/// here present in the collection.
#[derive(Debug, Clone)]
pub struct SelectionSet<Id> {
    selected: HashSet<Id>,
}

impl<Id> Default for SelectionSet<Id> {
    fn default() -> Self {
        Self {
            selected: HashSet::new(),
        }
    }
}

impl<Id: Clone + Eq + Hash> SelectionSet<Id> {
    /// Creates an empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the selection of `id`. Returns whether it is now selected.
    pub fn toggle(&mut self, id: &Id) -> bool {
        if self.selected.remove(id) {
            false
        } else {
            self.selected.insert(id.clone());
            true
        }
    }

    /// Select-all / deselect-all.
    ///
    /// If the selection already covers every id of the collection it is
    /// cleared, otherwise every id is selected. Calling this twice in a row
    /// therefore flips back.
    pub fn select_all<I>(&mut self, all_ids: I)
    where
        I: IntoIterator<Item = Id>,
    {
        let all: HashSet<Id> = all_ids.into_iter().collect();
        if self.selected.len() == all.len() {
            self.selected.clear();
        } else {
            self.selected = all;
        }
    }

    /// Deselects everything.
    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Returns true if `id` is selected.
    #[must_use]
    pub fn is_selected(&self, id: &Id) -> bool {
        self.selected.contains(id)
    }

    /// Deselects `id`.
    pub fn remove(&mut self, id: &Id) {
        self.selected.remove(id);
    }

    /// Keeps only the ids for which `keep` returns true.
    pub fn retain(&mut self, keep: impl FnMut(&Id) -> bool) {
        self.selected.retain(keep);
    }

    /// Number of selected ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Returns true if nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected ids, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Id> {
        self.selected.iter()
    }

    /// Copies the selected ids out.
    #[must_use]
    pub fn to_set(&self) -> HashSet<Id> {
        self.selected.clone()
    }
}
