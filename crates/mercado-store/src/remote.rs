//! # Remote Transactional Store Adapter
//!
//! [`DocumentStore`] over the shared cloud document database.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Remote document database                                               │
//! │                                                                         │
//! │  • live subscriptions       every commit pushes a full snapshot of the  │
//! │                             touched collections to all subscribers      │
//! │  • conditional commits      version preconditions, all-or-nothing       │
//! │  • batch ceiling            > max_batch_ops writes → BatchTooLarge      │
//! │  • outages                  every call → Unavailable                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Handles are cheap to clone and every clone talks to the same database,
//! which is how two registers racing for the same product are modelled.
//! The database state lives in process; connectivity is controlled with
//! [`RemoteStore::set_available`].

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::model::{Collection, Commit, CommitReceipt, Document, Snapshot, WriteOp};
use crate::store::{DocumentStore, StoreKind, Subscription};

/// Default per-commit write ceiling, below the backend's hard limit of 500.
pub const DEFAULT_MAX_BATCH_OPS: usize = 450;

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Default: [`DEFAULT_MAX_BATCH_OPS`]
    pub max_batch_ops: usize,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            max_batch_ops: DEFAULT_MAX_BATCH_OPS,
        }
    }
}

impl RemoteConfig {
    pub fn max_batch_ops(mut self, max: usize) -> Self {
        self.max_batch_ops = max;
        self
    }
}

type Collections = HashMap<Collection, BTreeMap<String, Document>>;

#[derive(Debug)]
struct RemoteInner {
    config: RemoteConfig,
    state: Mutex<Collections>,
    watchers: HashMap<Collection, watch::Sender<Snapshot>>,
    available: AtomicBool,
    commits: AtomicU64,
}

#[derive(Debug, Clone)]
pub struct RemoteStore {
    inner: Arc<RemoteInner>,
}

impl RemoteStore {
    pub fn connect(config: RemoteConfig) -> Self {
        info!(max_batch_ops = config.max_batch_ops, "Remote store adapter ready");
        let watchers = Collection::ALL
            .into_iter()
            .map(|c| (c, watch::channel(Arc::new(Vec::new())).0))
            .collect();
        Self {
            inner: Arc::new(RemoteInner {
                config,
                state: Mutex::new(HashMap::new()),
                watchers,
                available: AtomicBool::new(true),
                commits: AtomicU64::new(0),
            }),
        }
    }

    /// Simulates losing or regaining connectivity.
    pub fn set_available(&self, available: bool) {
        let was = self.inner.available.swap(available, Ordering::SeqCst);
        if was != available {
            if available {
                info!("Remote store reachable again");
            } else {
                warn!("Remote store unreachable");
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.inner.available.load(Ordering::SeqCst)
    }

    /// Number of commits applied since connect.
    pub fn commit_count(&self) -> u64 {
        self.inner.commits.load(Ordering::SeqCst)
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(StoreError::Unavailable("remote store unreachable".to_string()))
        }
    }

    fn snapshot_of(state: &Collections, collection: Collection) -> Snapshot {
        Arc::new(
            state
                .get(&collection)
                .map(|docs| docs.values().cloned().collect())
                .unwrap_or_default(),
        )
    }
}

impl Default for RemoteStore {
    fn default() -> Self {
        Self::connect(RemoteConfig::default())
    }
}

#[async_trait]
impl DocumentStore for RemoteStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Remote
    }

    fn max_batch_ops(&self) -> usize {
        self.inner.config.max_batch_ops
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Document>> {
        self.ensure_available()?;
        let state = self.inner.state.lock().await;
        Ok(state.get(&collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn list(&self, collection: Collection) -> StoreResult<Vec<Document>> {
        self.ensure_available()?;
        let state = self.inner.state.lock().await;
        Ok(Self::snapshot_of(&state, collection).as_ref().clone())
    }

    async fn commit(&self, commit: Commit) -> StoreResult<CommitReceipt> {
        self.ensure_available()?;

        let max = self.inner.config.max_batch_ops;
        if commit.writes.len() > max {
            return Err(StoreError::BatchTooLarge {
                ops: commit.writes.len(),
                max,
            });
        }

        let mut state = self.inner.state.lock().await;

        for pre in &commit.preconditions {
            let current = state
                .get(&pre.collection)
                .and_then(|docs| docs.get(&pre.id))
                .map(|doc| doc.version);
            if !pre.holds(current) {
                debug!(collection = %pre.collection, id = %pre.id, "Remote precondition failed");
                return Err(pre.conflict());
            }
        }

        // Stage every write against an overlay first so that a failing
        // Update leaves the database untouched.
        let mut staged: BTreeMap<(Collection, String), Option<Document>> = BTreeMap::new();
        for write in &commit.writes {
            let key = (write.collection(), write.id().to_string());
            let current = match staged.get(&key) {
                Some(doc) => doc.clone(),
                None => state
                    .get(&key.0)
                    .and_then(|docs| docs.get(&key.1))
                    .cloned(),
            };
            let next_version = current.as_ref().map(|d| d.version + 1).unwrap_or(1);

            let next = match write {
                WriteOp::Set { id, data, .. } => Some(Document {
                    id: id.clone(),
                    version: next_version,
                    data: data.clone(),
                }),
                WriteOp::Update {
                    collection,
                    id,
                    fields,
                } => {
                    let mut doc = current
                        .ok_or_else(|| StoreError::not_found(collection.as_str(), id.as_str()))?;
                    for (k, v) in fields {
                        doc.data.insert(k.clone(), v.clone());
                    }
                    doc.version = next_version;
                    Some(doc)
                }
                WriteOp::Delete { .. } => None,
            };
            staged.insert(key, next);
        }

        for ((collection, id), doc) in staged {
            let docs = state.entry(collection).or_default();
            match doc {
                Some(doc) => {
                    docs.insert(id, doc);
                }
                None => {
                    docs.remove(&id);
                }
            }
        }

        let collections = commit.collections();
        for collection in &collections {
            if let Some(sender) = self.inner.watchers.get(collection) {
                sender.send_replace(Self::snapshot_of(&state, *collection));
            }
        }
        self.inner.commits.fetch_add(1, Ordering::SeqCst);
        debug!(writes = commit.writes.len(), ?collections, "Remote commit applied");

        Ok(CommitReceipt {
            writes: commit.writes.len(),
            collections,
        })
    }

    async fn subscribe(&self, collection: Collection) -> StoreResult<Subscription> {
        self.ensure_available()?;
        let sender = self
            .inner
            .watchers
            .get(&collection)
            .ok_or_else(|| StoreError::Internal(format!("no watcher for {collection}")))?;
        Ok(Subscription::new(collection, sender.subscribe()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Precondition;
    use serde_json::{json, Map, Value};

    fn body(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_batch_ceiling() {
        let store = RemoteStore::connect(RemoteConfig::default().max_batch_ops(2));
        let commit = (0..3).fold(Commit::new(), |c, i| {
            c.set(Collection::Products, format!("p{i}"), Map::new())
        });
        let err = store.commit(commit).await.unwrap_err();
        assert!(matches!(err, StoreError::BatchTooLarge { ops: 3, max: 2 }));
        assert!(store.list(Collection::Products).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_two_handles_race_one_wins() {
        let register_a = RemoteStore::default();
        let register_b = register_a.clone();
        register_a
            .commit(Commit::new().set(Collection::Products, "p1", body(json!({"stock": 1}))))
            .await
            .unwrap();

        let seen_a = register_a.get(Collection::Products, "p1").await.unwrap();
        let seen_b = register_b.get(Collection::Products, "p1").await.unwrap();

        let sell = |seen: Option<Document>| {
            Commit::new()
                .require(Precondition::from_read(Collection::Products, "p1", seen.as_ref()))
                .update(Collection::Products, "p1", body(json!({"stock": 0})))
        };

        assert!(register_a.commit(sell(seen_a)).await.is_ok());
        let err = register_b.commit(sell(seen_b)).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(register_a.commit_count(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_fails_every_call() {
        let store = RemoteStore::default();
        store.set_available(false);
        assert!(matches!(
            store.list(Collection::Sales).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.subscribe(Collection::Sales).await.is_err());
        store.set_available(true);
        assert!(store.list(Collection::Sales).await.is_ok());
    }

    #[tokio::test]
    async fn test_set_then_update_in_same_commit() {
        let store = RemoteStore::default();
        store
            .commit(
                Commit::new()
                    .set(Collection::Clients, "c1", body(json!({"debt": 0})))
                    .update(Collection::Clients, "c1", body(json!({"debt": 5}))),
            )
            .await
            .unwrap();
        let doc = store.get(Collection::Clients, "c1").await.unwrap().unwrap();
        assert_eq!(doc.version, 2);
        assert_eq!(doc.data["debt"], 5);
    }

    #[tokio::test]
    async fn test_subscribers_see_commits() {
        let store = RemoteStore::default();
        let mut sub = store.subscribe(Collection::Expenses).await.unwrap();
        store
            .commit(Commit::new().set(Collection::Expenses, "e1", body(json!({"amount": 3}))))
            .await
            .unwrap();
        let snapshot = sub.next().await.unwrap();
        assert_eq!(snapshot.len(), 1);
    }
}
