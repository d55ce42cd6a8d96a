//! # mercado-engine: Mutating Operations for Mercado POS
//!
//! Every write that changes stock, debt or the catalog goes through this
//! crate, against whichever store the active session routes to.
//!
//! ## Operation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mercado Engine                                   │
//! │                                                                         │
//! │   UI collaborator                                                       │
//! │        │  SaleDraft / payment / ImportDataset / catalog edit            │
//! │        ▼                                                                │
//! │   ┌──────────────────────────────────────────────────────────────┐     │
//! │   │ validate ─► read pre-state ─► stage writes ─► conditional    │     │
//! │   │                                               commit         │     │
//! │   │      ▲                                          │ Conflict   │     │
//! │   │      └──────────── backoff, re-read ◄───────────┘            │     │
//! │   └───────────────────────────────┬──────────────────────────────┘     │
//! │                                   │ CommitReceipt                       │
//! │                                   ▼                                     │
//! │   demo: reload touched collections    cloud: subscription delivers     │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │                    notification (success / warning / error)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`sale`] - Atomic sale: stock, sale record, counter, client debt
//! - [`ledger`] - Debt payments and payment history
//! - [`import`] - Spreadsheet reconciliation into categories and products
//! - [`catalog`] - CRUD for reference data and business configuration
//! - [`admin`] - Demo-only history wipes and reset
//! - [`retry`] - Conflict retry with exponential backoff
//! - [`error`] - Engine error taxonomy

// =============================================================================
// Module Declarations
// =============================================================================

pub mod admin;
pub mod catalog;
pub mod error;
pub mod import;
pub mod ledger;
pub mod retry;
pub mod sale;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use admin::AdminActions;
pub use catalog::Catalog;
pub use error::{EngineError, EngineResult};
pub use import::{ImportReconciler, ImportSummary};
pub use ledger::CreditLedger;
pub use sale::{sale_number, SaleProcessor};

use mercado_sync::{SessionContext, DEFAULT_LOG_FILTER};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// All operations bound to one session.
#[derive(Debug, Clone)]
pub struct Engine {
    pub sales: SaleProcessor,
    pub ledger: CreditLedger,
    pub imports: ImportReconciler,
    pub catalog: Catalog,
    pub admin: AdminActions,
}

impl Engine {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            sales: SaleProcessor::new(ctx.clone()),
            ledger: CreditLedger::new(ctx.clone()),
            imports: ImportReconciler::new(ctx.clone()),
            catalog: Catalog::new(ctx.clone()),
            admin: AdminActions::new(ctx),
        }
    }
}

// =============================================================================
// Tracing
// =============================================================================

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise [`DEFAULT_LOG_FILTER`].
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    install(filter);
}

/// Installs the global tracing subscriber with an explicit filter, usually
/// `MercadoConfig::logging.filter`.
pub fn init_tracing_with(directives: &str) {
    let filter = EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    install(filter);
}

fn install(filter: EnvFilter) {
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_err()
    {
        debug!("Tracing subscriber already installed");
    }
}
