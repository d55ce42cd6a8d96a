//! # mercado-core: Pure Business Logic for Mercado POS
//!
//! Domain types and every calculation the store runs, as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Mercado POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            UI collaborator (register, catalog, import)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │   mercado-engine: SaleProcessor, CreditLedger, ImportReconciler │   │
//! │  └──────────────┬──────────────────────────────┬───────────────────┘   │
//! │                 │                              │                        │
//! │  ┌──────────────▼──────────────┐  ┌────────────▼────────────────────┐  │
//! │  │ ★ mercado-core (THIS) ★     │  │ mercado-sync / mercado-store    │  │
//! │  │ decimal  types  cart        │  │ session routing, SQLite, remote │  │
//! │  │ report   import validation  │  └─────────────────────────────────┘  │
//! │  │ NO I/O • PURE FUNCTIONS     │                                       │
//! │  └─────────────────────────────┘                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`decimal`] - Exact decimal arithmetic; the only way money is combined
//! - [`types`] - Domain records (Product, Sale, Client, AppConfig, ...)
//! - [`cart`] - Register cart and totals
//! - [`report`] - Cash-box and dashboard aggregates
//! - [`import`] - Spreadsheet cells, column mapping, strict import records
//! - [`document`] - JSON helpers for the storage boundary
//! - [`validation`] - Business rule validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use mercado_core::{AppConfig, Cart, Product};
//!
//! let rice = Product { id: "p1".into(), name: "Rice".into(), sale_price: 1.20, ..Product::default() };
//! let mut cart = Cart::new();
//! cart.add_item(&rice, 3).unwrap();
//!
//! let totals = cart.totals(&AppConfig::default());
//! assert_eq!(totals.total, 3.6);
//! assert_eq!(totals.total_local, 162.0); // 45 Bs per USD
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod decimal;
pub mod document;
pub mod error;
pub mod import;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartTotals};
pub use error::{CoreError, CoreResult, ValidationError};
pub use import::{Cell, ColumnMapping, ImportDataset, ImportRecord};
pub use report::CashboxSummary;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines in a single sale.
///
/// ## Business Reason
/// Keeps one sale inside a single remote commit: every line is one stock
/// write, plus the sale, the counter and the client debt.
pub const MAX_SALE_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Catches typos at the register (1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Maximum length of display names.
pub const MAX_NAME_LEN: usize = 120;
