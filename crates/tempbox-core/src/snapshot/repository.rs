//! Snapshot storage repository.

use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{debug, warn};

use crate::Result;
use crate::collection::Entry;
use crate::model::{HistoryEntry, PinnedEntry};

const HISTORY: &str = "history";
const PINNED: &str = "pinned";

/// Repository for collection snapshots.
pub struct SnapshotRepository {
    pool: SqlitePool,
}

impl SnapshotRepository {
    /// Create a new repository with the given database path.
    ///
    /// Creates the database and table if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Create an in-memory repository for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS collection_snapshots (
                kind TEXT NOT NULL,
                entry_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                payload TEXT NOT NULL,
                PRIMARY KEY(kind, entry_id)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replace the stored history snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the database query fails.
    pub async fn save_history(&self, entries: &[HistoryEntry]) -> Result<()> {
        self.save(HISTORY, entries).await
    }

    /// Load the history snapshot, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn load_history(&self) -> Result<Vec<HistoryEntry>> {
        self.load(HISTORY).await
    }

    /// Replace the stored pinned snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the database query fails.
    pub async fn save_pinned(&self, entries: &[PinnedEntry]) -> Result<()> {
        self.save(PINNED, entries).await
    }

    /// Load the pinned snapshot, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn load_pinned(&self) -> Result<Vec<PinnedEntry>> {
        self.load(PINNED).await
    }

    async fn save<E: Entry + Serialize>(&self, kind: &str, entries: &[E]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(r"DELETE FROM collection_snapshots WHERE kind = ?")
            .bind(kind)
            .execute(&mut *tx)
            .await?;

        for (position, entry) in (0_i64..).zip(entries) {
            sqlx::query(
                r"
                INSERT INTO collection_snapshots (kind, entry_id, position, payload)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(kind, entry_id) DO NOTHING
                ",
            )
            .bind(kind)
            .bind(entry.id().to_string())
            .bind(position)
            .bind(serde_json::to_string(entry)?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("Saved {} {kind} entries to snapshot", entries.len());
        Ok(())
    }

    async fn load<E: DeserializeOwned>(&self, kind: &str) -> Result<Vec<E>> {
        let rows = sqlx::query(
            r"
            SELECT entry_id, payload
            FROM collection_snapshots
            WHERE kind = ?
            ORDER BY position ASC
            ",
        )
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;

        let entries = rows
            .iter()
            .filter_map(|row| {
                let payload: String = row.get("payload");
                match serde_json::from_str(&payload) {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        let entry_id: String = row.get("entry_id");
                        warn!("Skipping unreadable {kind} snapshot entry {entry_id}: {e}");
                        None
                    }
                }
            })
            .collect();

        Ok(entries)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    use crate::model::{
        Message, MessageDetail, MessageId, PinnedId, PinnedItem, ProviderTag, Resource,
        ResourceId, Sender,
    };

    fn resource(id: &str, at: DateTime<Utc>) -> Resource {
        Resource {
            id: ResourceId::new(id),
            address: format!("{id}@example.test"),
            provider: ProviderTag::MailTm,
            created_at: at,
            expires_at: at + Duration::minutes(10),
            is_archived: false,
        }
    }

    #[tokio::test]
    async fn test_history_round_trip_keeps_order() {
        let repo = SnapshotRepository::in_memory().await.unwrap();
        let now = Utc::now();
        let entries = vec![
            HistoryEntry::new(resource("r2", now), now),
            HistoryEntry::new(resource("r1", now - Duration::hours(1)), now),
        ];

        repo.save_history(&entries).await.unwrap();
        let loaded = repo.load_history().await.unwrap();

        assert_eq!(loaded, entries);
        assert!(loaded.iter().all(|e| e.resource.is_archived));
    }

    #[tokio::test]
    async fn test_save_replaces_previous_snapshot() {
        let repo = SnapshotRepository::in_memory().await.unwrap();
        let now = Utc::now();

        repo.save_history(&[HistoryEntry::new(resource("r1", now), now)])
            .await
            .unwrap();
        repo.save_history(&[HistoryEntry::new(resource("r2", now), now)])
            .await
            .unwrap();

        let loaded = repo.load_history().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].resource.id, ResourceId::new("r2"));
    }

    #[tokio::test]
    async fn test_pinned_message_keeps_content() {
        let repo = SnapshotRepository::in_memory().await.unwrap();
        let now = Utc::now();
        let detail = MessageDetail {
            summary: Message {
                id: MessageId::new("m1"),
                from: Sender {
                    name: Some("Ada".to_string()),
                    address: "ada@example.test".to_string(),
                },
                subject: "Your code".to_string(),
                created_at: now,
            },
            html: vec!["<p>1234</p>".to_string()],
            text: vec!["1234".to_string()],
        };
        let pinned = vec![
            PinnedEntry {
                id: PinnedId::new("p2"),
                saved_at: now,
                item: PinnedItem::Message {
                    resource_id: ResourceId::new("r1"),
                    detail,
                },
            },
            PinnedEntry {
                id: PinnedId::new("p1"),
                saved_at: now,
                item: PinnedItem::Resource {
                    resource: resource("r1", now),
                },
            },
        ];

        repo.save_pinned(&pinned).await.unwrap();

        // Kinds are stored independently.
        assert!(repo.load_history().await.unwrap().is_empty());
        let loaded = repo.load_pinned().await.unwrap();
        assert_eq!(loaded, pinned);
        assert_eq!(loaded[0].detail().unwrap().text_body(), "1234");
    }
}
