//! Collections, saving and navigation through the workspace.

#![allow(clippy::unwrap_used)]

mod common;

use std::collections::HashSet;

use chrono::Utc;
use common::{Harness, settle};
use tempbox_core::{
    DetailItem, HistoryEntry, SaveOutcome, Scope, SessionConfig, SnapshotRepository, Tab, View,
    Workspace,
};

#[tokio::test]
async fn test_saving_active_twice_returns_existing() {
    let h = Harness::new();
    h.create().await;

    let first = h.workspace.save_active().await.unwrap();
    let second = h.workspace.save_active().await.unwrap();

    assert!(matches!(first, SaveOutcome::Saved(_)));
    let SaveOutcome::AlreadySaved(existing) = &second else {
        panic!("second save should report the existing entry");
    };
    assert_eq!(existing.id, first.entry().id);
    assert_eq!(h.workspace.pinned().len(), 1);
    assert_eq!(h.gateway.saves(), 1);
}

#[tokio::test]
async fn test_concurrent_saves_pin_once() {
    let h = Harness::new();
    h.create().await;
    let gate = h.gateway.hold_saves();

    let (first, second, ()) = tokio::join!(
        h.workspace.save_active(),
        h.workspace.save_active(),
        async {
            settle().await;
            gate.add_permits(2);
        }
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert!(matches!(first, SaveOutcome::Saved(_)));
    assert!(matches!(second, SaveOutcome::AlreadySaved(_)));
    assert_eq!(first.entry().id, second.entry().id);
    assert_eq!(h.workspace.pinned().len(), 1);
    assert_eq!(h.gateway.saves(), 1);
}

#[tokio::test]
async fn test_saved_message_opens_from_capture() {
    let h = Harness::new();
    let r1 = h.create().await;
    let message_id = h.gateway.deliver(&r1.id, "Your code");

    let saved = h.workspace.save_message(&r1.id, &message_id).await.unwrap();
    let again = h.workspace.save_message(&r1.id, &message_id).await.unwrap();
    assert!(matches!(again, SaveOutcome::AlreadySaved(_)));

    // Still readable once the mailbox is gone upstream.
    h.gateway.purge(&r1.id);
    let entry = h.workspace.open_pinned(&saved.entry().id).unwrap();

    let view = h.workspace.view();
    assert_eq!(
        view.view(),
        &View::Detail(Scope::Pinned, DetailItem::Pinned(entry.id.clone()))
    );
    assert_eq!(view.detail().unwrap().text_body(), format!("body of {message_id}"));
}

#[tokio::test]
async fn test_open_message_then_back() {
    let h = Harness::new();
    let r1 = h.create().await;
    let message_id = h.gateway.deliver(&r1.id, "hello");

    let detail = h
        .workspace
        .open_message(Scope::Active, &message_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.summary.subject, "hello");
    assert!(h.workspace.view().detail().is_some());

    h.workspace.back();
    let view = h.workspace.view();
    assert_eq!(view.view(), &View::List(Tab::Active));
    assert!(view.detail().is_none());
}

#[tokio::test]
async fn test_history_resource_messages() {
    let h = Harness::new();
    let r1 = h.create().await;
    h.gateway.deliver(&r1.id, "kept");
    h.create().await;

    h.workspace.switch_tab(Tab::History);
    let messages = h.workspace.open_history(&r1.id).await.unwrap().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(h.workspace.view().listing().unwrap().len(), 1);

    h.workspace.switch_tab(Tab::Pinned);
    assert!(h.workspace.view().listing().is_none());
}

#[tokio::test]
async fn test_failed_remote_delete_keeps_local_entries() {
    let h = Harness::new();
    let now = Utc::now();
    let seeded: Vec<HistoryEntry> = (1..=2)
        .map(|n| HistoryEntry::new(h.gateway.resource(100 + n), now))
        .collect();
    h.gateway.seed_history(seeded.clone());

    let history = h.workspace.history();
    assert_eq!(history.sync().await.unwrap(), 2);
    history.toggle_selected(&seeded[0].resource.id);

    h.gateway.fail_collection_deletes(true);
    assert!(history.delete_selected().await.is_err());
    assert_eq!(history.len(), 2);
    assert!(history.is_selected(&seeded[0].resource.id));

    h.gateway.fail_collection_deletes(false);
    assert_eq!(history.delete_selected().await.unwrap(), 1);
    assert_eq!(history.len(), 1);
    assert!(history.selected().is_empty());
    assert!(!history.contains(&seeded[0].resource.id));
}

#[tokio::test]
async fn test_sync_keeps_locally_archived_entries() {
    let h = Harness::new();
    let r1 = h.create().await;
    h.create().await;
    let now = Utc::now();
    let remote = HistoryEntry::new(h.gateway.resource(300), now);
    h.gateway.seed_history(vec![remote.clone()]);

    let history = h.workspace.history();
    assert!(history.get(&r1.id).unwrap().local);
    assert_eq!(history.sync().await.unwrap(), 2);
    assert_eq!(history.nth(0).unwrap().resource.id, r1.id);
    assert!(history.contains(&remote.resource.id));

    // Listed by the server as well: kept once, as the remote copy.
    h.gateway.seed_history(vec![HistoryEntry::new(r1.clone(), now), remote]);
    assert_eq!(history.sync().await.unwrap(), 2);
    assert!(!history.get(&r1.id).unwrap().local);
}

#[tokio::test]
async fn test_select_all_then_clear() {
    let h = Harness::new();
    let now = Utc::now();
    let seeded: Vec<HistoryEntry> = (1..=3)
        .map(|n| HistoryEntry::new(h.gateway.resource(200 + n), now))
        .collect();
    h.gateway.seed_history(seeded);

    let history = h.workspace.history();
    history.sync().await.unwrap();

    history.toggle_select_all();
    assert_eq!(history.selected().len(), 3);
    history.toggle_select_all();
    assert!(history.selected().is_empty());

    history.toggle_select_all();
    assert_eq!(history.clear().await.unwrap(), 3);
    assert!(history.is_empty());
    assert!(history.selected().is_empty());
}

#[tokio::test]
async fn test_delete_unknown_ids_is_noop() {
    let h = Harness::new();
    h.create().await;
    h.create().await;

    let unknown: HashSet<_> = [h.gateway.resource(999).id].into_iter().collect();
    assert_eq!(h.workspace.history().delete(&unknown).await.unwrap(), 0);
    assert_eq!(h.workspace.history().len(), 1);
}

#[tokio::test]
async fn test_history_is_bounded() {
    let h = Harness::with_config(SessionConfig {
        history_limit: 2,
        ..SessionConfig::default()
    });
    let first = h.create().await;
    for _ in 0..3 {
        h.create().await;
    }

    let history = h.workspace.history();
    assert_eq!(history.len(), 2);
    assert!(!history.contains(&first.id));
}

#[tokio::test]
async fn test_bootstrap_restores_snapshot_and_creates() {
    let h = Harness::new();
    let r1 = h.create().await;
    h.create().await;
    h.workspace.save_active().await.unwrap();

    let snapshot = SnapshotRepository::in_memory().await.unwrap();
    snapshot
        .save_history(&h.workspace.history().list())
        .await
        .unwrap();

    let restored = Workspace::new(
        h.gateway.clone(),
        h.clock.clone(),
        SessionConfig::default(),
        Some(snapshot),
    )
    .unwrap();
    let created = restored.bootstrap().await.unwrap().unwrap();

    // Locally archived entries outlive a sync against the empty remote listing.
    assert!(restored.history().get(&r1.id).unwrap().local);
    assert_eq!(restored.pinned().len(), 1);
    assert_eq!(restored.session().active().unwrap().id, created.id);

    restored.persist().await.unwrap();
    restored.shutdown();
}

#[tokio::test]
async fn test_bootstrap_without_auto_create() {
    let h = Harness::with_config(SessionConfig {
        auto_create: false,
        ..SessionConfig::default()
    });

    assert!(h.workspace.bootstrap().await.unwrap().is_none());
    assert!(h.workspace.session().active().is_none());
    assert_eq!(h.gateway.creates(), 0);
}
