//! # Store Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error / serde_json::Error / remote outage                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (this module) ← Adds context and categorization             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  EngineError (mercado-engine) ← Validation / Policy / Conflict / ...    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Notification sink + caller                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Store operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A document required by the operation does not exist.
    #[error("{collection} not found: {id}")]
    NotFound { collection: String, id: String },

    /// A precondition failed: the document changed between read and commit.
    ///
    /// ## When This Occurs
    /// - Two registers sell the last unit of the same product
    /// - A payment and a credit sale hit the same client
    ///
    /// Nothing from the commit was applied. Retrying re-reads fresh state.
    #[error("Document {collection}/{id} changed since it was read")]
    Conflict { collection: String, id: String },

    /// Commit has more writes than the store accepts at once.
    #[error("Commit has {ops} writes, store accepts at most {max}")]
    BatchTooLarge { ops: usize, max: usize },

    /// The remote store cannot be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A document body could not be (de)serialized.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Internal store error.
    #[error("Internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Whether the same operation may succeed if attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Conflict { .. } | StoreError::Unavailable(_)
        )
    }
}

/// Convert sqlx errors to StoreError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database (BUSY/LOCKED) → StoreError::Conflict
/// sqlx::Error::Database (other)       → StoreError::QueryFailed
/// sqlx::Error::PoolTimedOut           → StoreError::Unavailable
/// sqlx::Error::PoolClosed             → StoreError::ConnectionFailed
/// Other                               → StoreError::Internal
/// ```
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                if msg.contains("database is locked") || msg.contains("database is busy") {
                    StoreError::Conflict {
                        collection: "*".to_string(),
                        id: "*".to_string(),
                    }
                } else {
                    StoreError::QueryFailed(msg.to_string())
                }
            }
            sqlx::Error::PoolTimedOut => StoreError::Unavailable("connection pool timed out".to_string()),
            sqlx::Error::PoolClosed => StoreError::ConnectionFailed("Pool is closed".to_string()),
            _ => StoreError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
