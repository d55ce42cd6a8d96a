//! # Local Durable Store
//!
//! SQLite-backed [`DocumentStore`] used in demo (offline) mode.
//!
//! ## Commit Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  commit(Commit)                                                         │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  write_lock (one writer at a time, commit order = publish order)       │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  BEGIN                                                                  │
//! │     ├── SELECT version for every precondition ── mismatch? ─► ROLLBACK  │
//! │     ├── apply writes (upsert / merge / delete, version + 1)             │
//! │  COMMIT  (flushed before the call returns)                              │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  publish a fresh snapshot to every touched collection's watchers        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::{SqliteConnection, SqlitePool};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::model::{Collection, Commit, CommitReceipt, Document, Snapshot, WriteOp};
use crate::pool::{open_pool, LocalConfig};
use crate::store::{DocumentStore, StoreKind, Subscription};

#[derive(Debug)]
pub struct LocalStore {
    pool: SqlitePool,
    write_lock: Mutex<()>,
    watchers: HashMap<Collection, watch::Sender<Snapshot>>,
}

impl LocalStore {
    /// Opens (and migrates) the database and loads the initial snapshots.
    pub async fn open(config: LocalConfig) -> StoreResult<Self> {
        let pool = open_pool(&config).await?;

        let mut watchers = HashMap::new();
        for collection in Collection::ALL {
            let docs = list_documents(&pool, collection).await?;
            let (tx, _rx) = watch::channel(Arc::new(docs));
            watchers.insert(collection, tx);
        }

        info!(in_memory = config.is_in_memory(), "Local store ready");
        Ok(Self {
            pool,
            write_lock: Mutex::new(()),
            watchers,
        })
    }

    /// Shorthand for an isolated in-memory store.
    pub async fn in_memory() -> StoreResult<Self> {
        Self::open(LocalConfig::in_memory()).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    pub async fn close(&self) {
        info!("Closing local store");
        self.pool.close().await;
    }

    async fn publish(&self, collections: &[Collection]) {
        for collection in collections {
            let Some(sender) = self.watchers.get(collection) else {
                continue;
            };
            match list_documents(&self.pool, *collection).await {
                Ok(docs) => {
                    sender.send_replace(Arc::new(docs));
                }
                Err(e) => warn!(%collection, error = %e, "Failed to publish snapshot"),
            }
        }
    }
}

#[async_trait]
impl DocumentStore for LocalStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Local
    }

    fn max_batch_ops(&self) -> usize {
        usize::MAX
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Document>> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT version, data FROM documents WHERE collection = ? AND id = ?")
                .bind(collection.as_str())
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(version, data)| decode_row(id.to_string(), version, &data))
            .transpose()
    }

    async fn list(&self, collection: Collection) -> StoreResult<Vec<Document>> {
        list_documents(&self.pool, collection).await
    }

    async fn commit(&self, commit: Commit) -> StoreResult<CommitReceipt> {
        if commit.is_empty() && commit.preconditions.is_empty() {
            return Ok(CommitReceipt {
                writes: 0,
                collections: Vec::new(),
            });
        }

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        for pre in &commit.preconditions {
            let current: Option<i64> =
                sqlx::query_scalar("SELECT version FROM documents WHERE collection = ? AND id = ?")
                    .bind(pre.collection.as_str())
                    .bind(&pre.id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if !pre.holds(current.map(|v| v as u64)) {
                debug!(collection = %pre.collection, id = %pre.id, "Precondition failed, rolling back");
                tx.rollback().await?;
                return Err(pre.conflict());
            }
        }

        for write in &commit.writes {
            if let Err(e) = apply_write(&mut tx, write).await {
                tx.rollback().await?;
                return Err(e);
            }
        }

        tx.commit().await?;

        let collections = commit.collections();
        debug!(writes = commit.writes.len(), ?collections, "Local commit applied");
        self.publish(&collections).await;

        Ok(CommitReceipt {
            writes: commit.writes.len(),
            collections,
        })
    }

    async fn subscribe(&self, collection: Collection) -> StoreResult<Subscription> {
        let sender = self
            .watchers
            .get(&collection)
            .ok_or_else(|| StoreError::Internal(format!("no watcher for {collection}")))?;
        Ok(Subscription::new(collection, sender.subscribe()))
    }
}

// =============================================================================
// SQL helpers
// =============================================================================

async fn list_documents(pool: &SqlitePool, collection: Collection) -> StoreResult<Vec<Document>> {
    let rows: Vec<(String, i64, String)> = sqlx::query_as(
        "SELECT id, version, data FROM documents WHERE collection = ? ORDER BY id",
    )
    .bind(collection.as_str())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(id, version, data)| decode_row(id, version, &data))
        .collect()
}

fn decode_row(id: String, version: i64, data: &str) -> StoreResult<Document> {
    let data: Map<String, Value> = serde_json::from_str(data)?;
    Ok(Document {
        id,
        version: version.max(0) as u64,
        data,
    })
}

async fn apply_write(conn: &mut SqliteConnection, write: &WriteOp) -> StoreResult<()> {
    let now = Utc::now();
    match write {
        WriteOp::Set {
            collection,
            id,
            data,
        } => {
            sqlx::query(
                "INSERT INTO documents (collection, id, version, data, updated_at) \
                 VALUES (?, ?, 1, ?, ?) \
                 ON CONFLICT (collection, id) DO UPDATE SET \
                     version = documents.version + 1, \
                     data = excluded.data, \
                     updated_at = excluded.updated_at",
            )
            .bind(collection.as_str())
            .bind(id)
            .bind(serde_json::to_string(data)?)
            .bind(now)
            .execute(&mut *conn)
            .await?;
        }
        WriteOp::Update {
            collection,
            id,
            fields,
        } => {
            let existing: Option<String> =
                sqlx::query_scalar("SELECT data FROM documents WHERE collection = ? AND id = ?")
                    .bind(collection.as_str())
                    .bind(id)
                    .fetch_optional(&mut *conn)
                    .await?;
            let existing = existing.ok_or_else(|| StoreError::not_found(collection.as_str(), id.as_str()))?;

            let mut body: Map<String, Value> = serde_json::from_str(&existing)?;
            for (key, value) in fields {
                body.insert(key.clone(), value.clone());
            }

            sqlx::query(
                "UPDATE documents SET version = version + 1, data = ?, updated_at = ? \
                 WHERE collection = ? AND id = ?",
            )
            .bind(serde_json::to_string(&body)?)
            .bind(now)
            .bind(collection.as_str())
            .bind(id)
            .execute(&mut *conn)
            .await?;
        }
        WriteOp::Delete { collection, id } => {
            sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
                .bind(collection.as_str())
                .bind(id)
                .execute(&mut *conn)
                .await?;
        }
    }
    Ok(())
}
