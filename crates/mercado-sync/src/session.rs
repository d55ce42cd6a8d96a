//! # Session
//!
//! Who is signed in, which store backs the session, and the explicit
//! context object handed to every engine operation.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  unauthenticated ──► resolving-identity ──┬──► demo ─────────┐          │
//! │         ▲                    │             │                  │          │
//! │         └──── (load fails) ──┘             └──► cloud ──► subscribed     │
//! │                                                   │           │          │
//! │                                                   ▼           ▼          │
//! │  resolving-identity ◄──── (sign in again) ──── torn-down ◄────┘          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::sync::Arc;

use mercado_core::{AppConfig, Capability, CoreError, Role};
use mercado_store::{CommitReceipt, DocumentStore, StoreKind};
use serde::{Deserialize, Serialize};

use crate::cache::DataCache;
use crate::config::EngineSettings;
use crate::notify::{emit, NotificationSink, Severity};

// =============================================================================
// Identity
// =============================================================================

/// What the identity provider hands over at sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub display_name: String,
    pub role: Role,
    /// Locally issued demo identity. Never touches the remote store.
    pub is_demo: bool,
}

impl Identity {
    pub fn demo(display_name: impl Into<String>) -> Self {
        Self {
            uid: "demo".to_string(),
            display_name: display_name.into(),
            role: Role::Owner,
            is_demo: true,
        }
    }

    pub fn cloud(uid: impl Into<String>, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            uid: uid.into(),
            display_name: display_name.into(),
            role,
            is_demo: false,
        }
    }

    pub fn mode(&self) -> SessionMode {
        if self.is_demo {
            SessionMode::Demo
        } else {
            SessionMode::Cloud
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Local durable store, loaded once, no push updates.
    Demo,
    /// Remote store with live subscriptions.
    Cloud,
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionMode::Demo => write!(f, "demo"),
            SessionMode::Cloud => write!(f, "cloud"),
        }
    }
}

// =============================================================================
// Session State
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionState {
    #[default]
    Unauthenticated,
    ResolvingIdentity,
    Demo,
    Cloud,
    Subscribed,
    TornDown,
}

impl SessionState {
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Unauthenticated, ResolvingIdentity)
                | (TornDown, ResolvingIdentity)
                | (ResolvingIdentity, Demo)
                | (ResolvingIdentity, Cloud)
                | (ResolvingIdentity, Unauthenticated)
                | (Cloud, Subscribed)
                | (Demo, TornDown)
                | (Cloud, TornDown)
                | (Subscribed, TornDown)
        )
    }

    /// A session is usable once data has been loaded or subscribed.
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Demo | SessionState::Subscribed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::ResolvingIdentity => "resolving-identity",
            SessionState::Demo => "demo",
            SessionState::Cloud => "cloud",
            SessionState::Subscribed => "subscribed",
            SessionState::TornDown => "torn-down",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Session Context
// =============================================================================

/// Everything an engine operation needs: store handle, identity, cached
/// config and the notification sink. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SessionContext {
    store: Arc<dyn DocumentStore>,
    identity: Identity,
    cache: Arc<DataCache>,
    notifier: Arc<dyn NotificationSink>,
    engine: EngineSettings,
}

impl SessionContext {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Identity,
        cache: Arc<DataCache>,
        notifier: Arc<dyn NotificationSink>,
        engine: EngineSettings,
    ) -> Self {
        Self {
            store,
            identity,
            cache,
            notifier,
            engine,
        }
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub fn store_kind(&self) -> StoreKind {
        self.store.kind()
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn role(&self) -> Role {
        self.identity.role
    }

    pub fn mode(&self) -> SessionMode {
        self.identity.mode()
    }

    pub fn is_demo(&self) -> bool {
        self.identity.is_demo
    }

    pub fn cache(&self) -> &DataCache {
        &self.cache
    }

    pub fn engine(&self) -> &EngineSettings {
        &self.engine
    }

    /// Business config as last seen by the cache.
    pub async fn config(&self) -> AppConfig {
        self.cache.config().await
    }

    /// Fails with `PermissionDenied` unless the current role may use the
    /// capability.
    pub async fn require(&self, capability: Capability) -> Result<(), CoreError> {
        let config = self.config().await;
        if config.permissions.allows(self.role(), capability) {
            Ok(())
        } else {
            Err(CoreError::PermissionDenied {
                capability: capability.to_string(),
            })
        }
    }

    pub fn notify(&self, severity: Severity, message: impl Into<String>) {
        emit(self.notifier.as_ref(), severity, message);
    }

    /// Brings the cache in line with a commit this session just made.
    ///
    /// Demo sessions have no push channel, so touched collections are
    /// re-read from the local store. Cloud sessions wait for the next
    /// subscription delivery instead.
    pub async fn after_commit(&self, receipt: &CommitReceipt) {
        if self.mode() == SessionMode::Demo {
            self.cache
                .reload(self.store.as_ref(), &receipt.collections)
                .await;
        }
    }
}
