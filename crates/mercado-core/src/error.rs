//! # Error Types
//!
//! Domain-specific error types for mercado-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  mercado-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                        │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  mercado-store errors                                                   │
//! │  └── StoreError       - Persistence, conflicts, availability            │
//! │                                                                         │
//! │  mercado-engine errors                                                  │
//! │  └── EngineError      - What the UI collaborator sees                   │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┐                                   │
//! │                        StoreError ──┴──► EngineError → UI               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These are expected business conditions (policy violations) and are
/// always reported with a specific, human-readable reason.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A product referenced by a sale line no longer exists.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// A client referenced by a credit sale or payment does not exist.
    #[error("Client not found: {0}")]
    ClientNotFound(String),

    /// Insufficient stock to complete sale.
    ///
    /// ## When This Occurs
    /// Only when `enable_negative_stock` is off in the store configuration.
    ///
    /// ```text
    /// Sale line (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Coca-Cola 1L", available: 3, requested: 5 }
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// A sale was submitted without line items.
    #[error("Sale has no items")]
    EmptySale,

    /// Credit sales need a registered client to carry the debt.
    #[error("Credit sales require a registered client")]
    CreditRequiresClient,

    /// The walk-in client is a fixed record.
    #[error("The general client cannot be {action}")]
    ProtectedClient { action: String },

    /// Payment amount is invalid.
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// Destructive maintenance restricted to local demo data.
    #[error("{action} is only available in demo mode")]
    DemoOnly { action: String },

    /// The current role lacks a capability.
    #[error("Permission denied: {capability}")]
    PermissionDenied { capability: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any storage is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Value is NaN or infinite.
    #[error("{field} must be a finite number")]
    NotFinite { field: String },

    /// Invalid format (e.g., invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
