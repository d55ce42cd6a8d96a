//! # The DocumentStore Capability
//!
//! One interface, two implementations, chosen once per session:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        dyn DocumentStore                                │
//! │                                                                         │
//! │   ┌───────────────────────────┐      ┌───────────────────────────┐     │
//! │   │ LocalStore                │      │ RemoteStore               │     │
//! │   │ SQLite file, demo mode    │      │ cloud adapter             │     │
//! │   │ always available          │      │ may be Unavailable        │     │
//! │   │ unbounded commits         │      │ ≤ max_batch_ops per commit│     │
//! │   └───────────────────────────┘      └───────────────────────────┘     │
//! │                                                                         │
//! │   Both: versioned documents • conditional atomic commit •               │
//! │         full-snapshot subscriptions                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The local store finishes each call without waiting on anything external,
//! but it exposes the same `async` surface so call sites never branch on the
//! back end.

use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::watch;

use crate::error::{StoreError, StoreResult};
use crate::model::{Collection, Commit, CommitReceipt, Document, Snapshot};

/// Which back end a store handle talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Local,
    Remote,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Local => f.write_str("local"),
            StoreKind::Remote => f.write_str("remote"),
        }
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// A live view of one collection.
///
/// Starts with the snapshot current at subscription time; [`Self::next`]
/// resolves with a new full snapshot after every commit that touches the
/// collection.
#[derive(Debug)]
pub struct Subscription {
    collection: Collection,
    rx: watch::Receiver<Snapshot>,
}

impl Subscription {
    pub fn new(collection: Collection, rx: watch::Receiver<Snapshot>) -> Self {
        Self { collection, rx }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// The latest delivered snapshot.
    pub fn current(&mut self) -> Snapshot {
        self.rx.borrow_and_update().clone()
    }

    /// Waits for the next change. `None` once the store has shut down.
    pub async fn next(&mut self) -> Option<Snapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

// =============================================================================
// Trait
// =============================================================================

/// Versioned document persistence with conditional atomic commits.
#[async_trait]
pub trait DocumentStore: Send + Sync + fmt::Debug {
    fn kind(&self) -> StoreKind;

    /// Maximum number of writes accepted by a single [`Self::commit`].
    fn max_batch_ops(&self) -> usize;

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Document>>;

    /// Every document in the collection, ordered by id.
    async fn list(&self, collection: Collection) -> StoreResult<Vec<Document>>;

    /// Applies every write if every precondition holds, otherwise nothing.
    ///
    /// ## Errors
    /// - `Conflict` if a precondition fails
    /// - `NotFound` if an `Update` targets a missing document
    /// - `BatchTooLarge` if `writes.len() > max_batch_ops()`
    /// - `Unavailable` if the store cannot be reached
    async fn commit(&self, commit: Commit) -> StoreResult<CommitReceipt>;

    async fn subscribe(&self, collection: Collection) -> StoreResult<Subscription>;
}

// =============================================================================
// Typed Helpers
// =============================================================================

/// Reads and decodes one record.
pub async fn get_record<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: Collection,
    id: &str,
) -> StoreResult<Option<T>> {
    match store.get(collection, id).await? {
        Some(doc) => Ok(Some(doc.decode()?)),
        None => Ok(None),
    }
}

/// Reads and decodes one record that must exist.
pub async fn require_record<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: Collection,
    id: &str,
) -> StoreResult<T> {
    get_record(store, collection, id)
        .await?
        .ok_or_else(|| StoreError::not_found(collection.as_str(), id))
}

/// Reads and decodes a whole collection. Undecodable documents are an error.
pub async fn list_records<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: Collection,
) -> StoreResult<Vec<T>> {
    store
        .list(collection)
        .await?
        .iter()
        .map(Document::decode)
        .collect()
}
