//! # Engine Error Type
//!
//! One error type for every mutating operation, split along the lines the
//! caller acts on.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Variant       Cause                               Caller reaction      │
//! │  ───────────   ─────────────────────────────────   ──────────────────   │
//! │  Validation    malformed input, nothing touched     fix the form         │
//! │  Policy        insufficient stock, protected        show the reason      │
//! │                client, not allowed in this mode                          │
//! │  NotFound      product / client gone                refresh, show reason │
//! │  Conflict      data changed under the commit        retry (retryable)    │
//! │  Unavailable   remote store unreachable             retry later          │
//! │  Store         anything else from the store         report               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `code()` gives a stable machine-readable code, e.g. `INSUFFICIENT_STOCK`.

use mercado_core::{CoreError, ValidationError};
use mercado_store::StoreError;
use mercado_sync::SyncError;
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An expected business condition.
    #[error("{0}")]
    Policy(CoreError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(StoreError),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Sync(SyncError),
}

impl EngineError {
    pub fn policy(err: CoreError) -> Self {
        EngineError::Policy(err)
    }

    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "VALIDATION_ERROR",
            EngineError::Policy(e) => match e {
                CoreError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
                CoreError::CreditRequiresClient => "CREDIT_REQUIRES_CLIENT",
                CoreError::ProtectedClient { .. } => "PROTECTED_CLIENT",
                CoreError::PermissionDenied { .. } => "PERMISSION_DENIED",
                CoreError::InvalidPaymentAmount { .. } => "PAYMENT_ERROR",
                CoreError::EmptySale => "EMPTY_SALE",
                CoreError::DemoOnly { .. } => "DEMO_ONLY",
                _ => "BUSINESS_LOGIC",
            },
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::Conflict(_) => "CONFLICT",
            EngineError::Unavailable(_) => "UNAVAILABLE",
            EngineError::Store(StoreError::BatchTooLarge { .. }) => "BATCH_TOO_LARGE",
            EngineError::Store(_) => "STORE_ERROR",
            EngineError::Sync(_) => "SESSION_ERROR",
        }
    }

    /// Conflicts and outages may succeed if the whole operation runs again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Conflict(_) | EngineError::Unavailable(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound(_))
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => EngineError::Validation(e),
            CoreError::ProductNotFound(_) | CoreError::ClientNotFound(_) => {
                EngineError::NotFound(err.to_string())
            }
            other => EngineError::Policy(other),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } => EngineError::Conflict(err),
            StoreError::Unavailable(msg) => EngineError::Unavailable(msg),
            StoreError::NotFound { .. } => EngineError::NotFound(err.to_string()),
            other => EngineError::Store(other),
        }
    }
}

impl From<SyncError> for EngineError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Store(e) => e.into(),
            other => EngineError::Sync(other),
        }
    }
}
