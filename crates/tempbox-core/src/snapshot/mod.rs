//! Local snapshot of the history and pinned collections.
//!
//! Pinned messages carry their full content, so the snapshot keeps them
//! readable after the upstream resource is purged or the backend is down.

mod repository;

pub use repository::SnapshotRepository;
