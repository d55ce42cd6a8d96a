//! # Document Model
//!
//! What both stores persist and how a conditional commit is described.
//!
//! ## Anatomy of a Commit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Commit                                                                 │
//! │  ├── preconditions   "products/p1 is still at version 7"                │
//! │  │                   "counters/sales is still at version 41"            │
//! │  │                   "clients/c9 is still at version 3"                 │
//! │  │                                                                      │
//! │  └── writes          Update products/p1 { stock: 2 }                    │
//! │                      Set    counters/sales { value: 42 }                │
//! │                      Set    sales/<uuid> { ... }                        │
//! │                      Update clients/c9 { debt: 35.5 }                   │
//! │                                                                         │
//! │  Either every precondition holds and every write lands,                 │
//! │  or nothing is written and the store returns Conflict.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};

// =============================================================================
// Collection
// =============================================================================

/// Logical table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Products,
    Categories,
    Sales,
    Clients,
    Suppliers,
    Expenses,
    Config,
    ClientPayments,
    Counters,
}

impl Collection {
    pub const ALL: [Collection; 9] = [
        Collection::Products,
        Collection::Categories,
        Collection::Sales,
        Collection::Clients,
        Collection::Suppliers,
        Collection::Expenses,
        Collection::Config,
        Collection::ClientPayments,
        Collection::Counters,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Collection::Products => "products",
            Collection::Categories => "categories",
            Collection::Sales => "sales",
            Collection::Clients => "clients",
            Collection::Suppliers => "suppliers",
            Collection::Expenses => "expenses",
            Collection::Config => "config",
            Collection::ClientPayments => "client_payments",
            Collection::Counters => "counters",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| StoreError::Internal(format!("unknown collection: {s}")))
    }
}

/// Id of the singleton config document.
pub const CONFIG_DOC_ID: &str = "main";

/// Id of the sale number counter.
pub const SALES_COUNTER_ID: &str = "sales";

// =============================================================================
// Document
// =============================================================================

/// A stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    /// Starts at 1, increases by one on every write.
    pub version: u64,
    pub data: Map<String, Value>,
}

impl Document {
    /// Decodes the body into a typed record.
    ///
    /// The document id is injected as `id` when the body lacks one.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        let mut data = self.data.clone();
        data.entry("id")
            .or_insert_with(|| Value::String(self.id.clone()));
        Ok(serde_json::from_value(Value::Object(data))?)
    }
}

/// Full current contents of a collection, shared between subscribers.
pub type Snapshot = Arc<Vec<Document>>;

/// Decodes every document, skipping (and reporting) the ones that fail.
pub fn decode_all<T: DeserializeOwned>(docs: &[Document]) -> (Vec<T>, Vec<(String, StoreError)>) {
    let mut ok = Vec::with_capacity(docs.len());
    let mut failed = Vec::new();
    for doc in docs {
        match doc.decode() {
            Ok(record) => ok.push(record),
            Err(e) => failed.push((doc.id.clone(), e)),
        }
    }
    (ok, failed)
}

// =============================================================================
// Writes
// =============================================================================

/// One write inside a commit.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create or replace the whole body.
    Set {
        collection: Collection,
        id: String,
        data: Map<String, Value>,
    },
    /// Shallow-merge fields into an existing document. Fails the commit with
    /// `NotFound` if the document does not exist.
    Update {
        collection: Collection,
        id: String,
        fields: Map<String, Value>,
    },
    /// Remove the document. Deleting a missing document is not an error.
    Delete { collection: Collection, id: String },
}

impl WriteOp {
    pub fn collection(&self) -> Collection {
        match self {
            WriteOp::Set { collection, .. }
            | WriteOp::Update { collection, .. }
            | WriteOp::Delete { collection, .. } => *collection,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            WriteOp::Set { id, .. } | WriteOp::Update { id, .. } | WriteOp::Delete { id, .. } => id,
        }
    }
}

// =============================================================================
// Preconditions
// =============================================================================

/// What a document must look like for a commit to proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    /// Exists and is still at this version.
    Version(u64),
    /// Still does not exist.
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Precondition {
    pub collection: Collection,
    pub id: String,
    pub expected: Expected,
}

impl Precondition {
    /// Captures the state of a document as it was read.
    pub fn from_read(collection: Collection, id: impl Into<String>, read: Option<&Document>) -> Self {
        Self {
            collection,
            id: id.into(),
            expected: match read {
                Some(doc) => Expected::Version(doc.version),
                None => Expected::Absent,
            },
        }
    }

    /// True if a document currently at `current` version satisfies this.
    pub fn holds(&self, current: Option<u64>) -> bool {
        match (self.expected, current) {
            (Expected::Version(expected), Some(actual)) => expected == actual,
            (Expected::Absent, None) => true,
            _ => false,
        }
    }

    pub(crate) fn conflict(&self) -> StoreError {
        StoreError::Conflict {
            collection: self.collection.to_string(),
            id: self.id.clone(),
        }
    }
}

// =============================================================================
// Commit
// =============================================================================

/// An atomic unit of work.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Commit {
    pub preconditions: Vec<Precondition>,
    pub writes: Vec<WriteOp>,
}

impl Commit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, precondition: Precondition) -> Self {
        self.preconditions.push(precondition);
        self
    }

    pub fn set(mut self, collection: Collection, id: impl Into<String>, data: Map<String, Value>) -> Self {
        self.writes.push(WriteOp::Set {
            collection,
            id: id.into(),
            data,
        });
        self
    }

    pub fn update(mut self, collection: Collection, id: impl Into<String>, fields: Map<String, Value>) -> Self {
        self.writes.push(WriteOp::Update {
            collection,
            id: id.into(),
            fields,
        });
        self
    }

    pub fn delete(mut self, collection: Collection, id: impl Into<String>) -> Self {
        self.writes.push(WriteOp::Delete {
            collection,
            id: id.into(),
        });
        self
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Distinct collections written by this commit, sorted.
    pub fn collections(&self) -> Vec<Collection> {
        let mut out: Vec<Collection> = self.writes.iter().map(WriteOp::collection).collect();
        out.sort();
        out.dedup();
        out
    }
}

/// Outcome of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub writes: usize,
    pub collections: Vec<Collection>,
}

/// Serializes a record into a document body.
pub fn to_body<T: Serialize>(record: &T) -> StoreResult<Map<String, Value>> {
    Ok(mercado_core::document::to_document(record)?)
}
