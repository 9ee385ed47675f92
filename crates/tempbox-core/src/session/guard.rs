//! Single-flight lock for resource renewal.

use crate::model::ResourceId;

/// Prevents a second replacement request for the same resource while one is
/// in flight.
///
/// The lock is keyed by resource id, so once the active resource changes any
/// hold on the old id no longer blocks anything.
#[derive(Debug, Default, Clone)]
pub struct ExpiryGuard {
    held: Option<ResourceId>,
}

impl ExpiryGuard {
    /// Creates a released guard.
    #[must_use]
    pub const fn new() -> Self {
        Self { held: None }
    }

    /// Takes the lock for `id`.
    ///
    /// Returns false if it is already held for `id`. A hold on any other id is
    /// stale and gets replaced.
    pub fn try_acquire(&mut self, id: &ResourceId) -> bool {
        if self.held.as_ref() == Some(id) {
            return false;
        }
        self.held = Some(id.clone());
        true
    }

    /// Releases the lock if it is held for `id`.
    pub fn release(&mut self, id: &ResourceId) {
        if self.held.as_ref() == Some(id) {
            self.held = None;
        }
    }

    /// Releases the lock whatever it is held for.
    pub fn reset(&mut self) {
        self.held = None;
    }

    /// Returns true if the lock is held for `id`.
    #[must_use]
    pub fn is_held_for(&self, id: &ResourceId) -> bool {
        self.held.as_ref() == Some(id)
    }
}
