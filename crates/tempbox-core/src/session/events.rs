//! Events published by the session for front ends to observe.

use crate::model::{HistoryEntry, Resource, ResourceId};

/// Why a resource left the active slot without being replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearReason {
    /// The user deleted it.
    Deleted,
    /// The upstream reported it gone.
    Gone,
}

/// Something that happened in the session.
///
/// Failures of automatic work (renewal, polling) are reported here rather
/// than returned, since nobody is waiting on them.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A resource became active.
    Activated(Resource),
    /// The active resource's lifetime was extended.
    Extended(Resource),
    /// A resource was moved into history.
    Archived(HistoryEntry),
    /// The active slot was emptied.
    Cleared {
        /// Resource that was removed.
        resource_id: ResourceId,
        /// Why.
        reason: ClearReason,
    },
    /// The message list of the active resource was replaced.
    MessagesUpdated {
        /// Resource polled.
        resource_id: ResourceId,
        /// Messages now listed.
        count: usize,
        /// Messages not present in the previous listing.
        new: usize,
    },
    /// An automatic renewal failed; it will be retried on the next tick.
    RenewalFailed {
        /// Expired resource.
        resource_id: ResourceId,
        /// Failure description.
        error: String,
    },
    /// A background poll failed.
    PollFailed {
        /// Resource polled.
        resource_id: ResourceId,
        /// Failure description.
        error: String,
    },
}
