//! # Read-Then-Write Transactions
//!
//! Optimistic concurrency on top of [`DocumentStore::commit`]. Every read
//! made through a [`Transaction`] becomes a precondition on the final commit,
//! so if anything read has changed by commit time the whole unit aborts with
//! `Conflict` and nothing is written. No locks are held between read and
//! commit.
//!
//! ```text
//!   tx.get(products/p1)  ─► v7  ─┐
//!   tx.get(clients/c9)   ─► v3  ─┤ preconditions
//!   tx.update(products/p1, ..)   │
//!   tx.update(clients/c9, ..)    │ writes
//!   tx.commit() ─────────────────┴─► store.commit(Commit { .. })
//! ```
//!
//! Reads must precede writes. A read after the first staged write is
//! rejected because it could observe neither the staged nor the committed
//! state consistently.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::model::{to_body, Collection, Commit, CommitReceipt, Document, Precondition, WriteOp};
use crate::store::DocumentStore;

pub struct Transaction<'a> {
    store: &'a dyn DocumentStore,
    reads: HashMap<(Collection, String), Option<Document>>,
    commit: Commit,
}

impl<'a> Transaction<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self {
            store,
            reads: HashMap::new(),
            commit: Commit::new(),
        }
    }

    /// Reads a document and pins its version. Repeated reads are served from
    /// the transaction's own read set.
    pub async fn get(&mut self, collection: Collection, id: &str) -> StoreResult<Option<Document>> {
        let key = (collection, id.to_string());
        if let Some(cached) = self.reads.get(&key) {
            return Ok(cached.clone());
        }
        if !self.commit.writes.is_empty() {
            return Err(StoreError::Internal(
                "transaction reads must happen before writes".to_string(),
            ));
        }
        let doc = self.store.get(collection, id).await?;
        self.reads.insert(key, doc.clone());
        Ok(doc)
    }

    /// Reads and decodes a record.
    pub async fn get_record<T: DeserializeOwned>(
        &mut self,
        collection: Collection,
        id: &str,
    ) -> StoreResult<Option<T>> {
        match self.get(collection, id).await? {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }

    pub fn set(&mut self, collection: Collection, id: impl Into<String>, data: Map<String, Value>) {
        self.commit.writes.push(WriteOp::Set {
            collection,
            id: id.into(),
            data,
        });
    }

    /// Stages a full record write.
    pub fn set_record<T: Serialize>(
        &mut self,
        collection: Collection,
        id: impl Into<String>,
        record: &T,
    ) -> StoreResult<()> {
        let body = to_body(record)?;
        self.set(collection, id, body);
        Ok(())
    }

    pub fn update(&mut self, collection: Collection, id: impl Into<String>, fields: Map<String, Value>) {
        self.commit.writes.push(WriteOp::Update {
            collection,
            id: id.into(),
            fields,
        });
    }

    /// Stages a single-field update.
    pub fn update_field(
        &mut self,
        collection: Collection,
        id: impl Into<String>,
        field: &str,
        value: impl Into<Value>,
    ) {
        let mut fields = Map::new();
        fields.insert(field.to_string(), value.into());
        self.update(collection, id, fields);
    }

    pub fn delete(&mut self, collection: Collection, id: impl Into<String>) {
        self.commit.writes.push(WriteOp::Delete {
            collection,
            id: id.into(),
        });
    }

    pub fn write_count(&self) -> usize {
        self.commit.writes.len()
    }

    /// Builds the conditional commit without sending it.
    pub fn into_commit(self) -> Commit {
        let mut commit = self.commit;
        let mut reads: Vec<_> = self.reads.into_iter().collect();
        reads.sort_by(|a, b| a.0.cmp(&b.0));
        commit.preconditions = reads
            .into_iter()
            .map(|((collection, id), doc)| Precondition::from_read(collection, id, doc.as_ref()))
            .collect();
        commit
    }

    pub async fn commit(self) -> StoreResult<CommitReceipt> {
        let store = self.store;
        let commit = self.into_commit();
        debug!(
            store = %store.kind(),
            reads = commit.preconditions.len(),
            writes = commit.writes.len(),
            "Committing transaction"
        );
        store.commit(commit).await
    }
}
