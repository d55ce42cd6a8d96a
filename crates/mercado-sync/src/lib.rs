//! # mercado-sync: Session Routing for Mercado POS
//!
//! Decides which store backs a session and keeps an in-memory view of every
//! collection current.
//!
//! ## Modes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   DEMO                                  CLOUD                           │
//! │   ────                                  ─────                           │
//! │   LocalStore (SQLite)                   RemoteStore                     │
//! │   loaded once at sign-in                one live subscription per       │
//! │   cache reloaded after each commit      collection, snapshot replaces   │
//! │   no push updates                       cache wholesale on delivery     │
//! │                                                                         │
//! │   Both: SessionContext { store, identity, cache, notifier }             │
//! │         is passed explicitly to every engine operation                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mercado_sync::{Identity, SyncController, TracingSink};
//!
//! let controller = SyncController::new(local, remote, Arc::new(TracingSink));
//! let session = controller.sign_in(Identity::demo("Caja 1")).await?;
//! let products = session.cache().products().await;
//! controller.sign_out().await?;
//! ```

pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod notify;
pub mod session;

pub use cache::DataCache;
pub use config::{EngineSettings, MercadoConfig, DEFAULT_LOG_FILTER};
pub use controller::{visible_collections, SyncController};
pub use error::{SyncError, SyncResult};
pub use notify::{emit, ChannelSink, NoOpSink, Notification, NotificationSink, Severity, TracingSink};
pub use session::{Identity, SessionContext, SessionMode, SessionState};
