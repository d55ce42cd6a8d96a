//! # mercado-store: Document Stores for Mercado POS
//!
//! Versioned JSON documents, conditional atomic commits and live
//! subscriptions, behind one [`DocumentStore`] trait.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  mercado-engine (SaleProcessor, CreditLedger, ImportReconciler)         │
//! │       │  Transaction::get / set / update / commit                       │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  mercado-store (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐   │   │
//! │  │   │ model        │   │ transaction  │   │ store            │   │   │
//! │  │   │ Document     │   │ read set ─►  │   │ dyn DocumentStore│   │   │
//! │  │   │ Commit       │   │ precondition │   │ Subscription     │   │   │
//! │  │   └──────────────┘   └──────────────┘   └────────┬─────────┘   │   │
//! │  │                                          ┌───────┴───────┐     │   │
//! │  │                                     LocalStore      RemoteStore │   │
//! │  │                                     (SQLite)        (cloud)     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mercado_store::{Collection, LocalStore, Transaction};
//!
//! let store = LocalStore::in_memory().await?;
//! let mut tx = Transaction::new(&store);
//! let product = tx.get(Collection::Products, "p1").await?;
//! tx.update_field(Collection::Products, "p1", "stock", 9);
//! tx.commit().await?; // Conflict if p1 changed since the read
//! ```

pub mod error;
pub mod local;
pub mod migrations;
pub mod model;
pub mod pool;
pub mod remote;
pub mod store;
pub mod transaction;

pub use error::{StoreError, StoreResult};
pub use local::LocalStore;
pub use model::{
    decode_all, to_body, Collection, Commit, CommitReceipt, Document, Expected, Precondition,
    Snapshot, WriteOp, CONFIG_DOC_ID, SALES_COUNTER_ID,
};
pub use pool::LocalConfig;
pub use remote::{RemoteConfig, RemoteStore, DEFAULT_MAX_BATCH_OPS};
pub use store::{get_record, list_records, require_record, DocumentStore, StoreKind, Subscription};
pub use transaction::Transaction;
