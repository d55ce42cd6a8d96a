//! # Sync Controller
//!
//! Picks the store for a session and keeps the [`DataCache`] current.
//!
//! ## Sign-in
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sign_in(identity)                                                      │
//! │     │                                                                   │
//! │     ├── is_demo ──► LocalStore.list(c) for every visible collection     │
//! │     │               cache.apply(c, docs)          state = demo          │
//! │     │                                                                   │
//! │     └── cloud ────► RemoteStore.subscribe(c) for every visible coll.    │
//! │                     ├── ok:   apply current snapshot, spawn a task      │
//! │                     │         that applies every later delivery         │
//! │                     └── err:  warn + notify, collection stays empty     │
//! │                                                   state = subscribed    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Sign-out
//! Subscription tasks are aborted and awaited BEFORE the cache is cleared,
//! so no late delivery can repopulate a torn-down session.

use std::sync::Arc;

use mercado_core::Role;
use mercado_store::{Collection, DocumentStore};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::DataCache;
use crate::config::EngineSettings;
use crate::error::{SyncError, SyncResult};
use crate::notify::{emit, NotificationSink, Severity};
use crate::session::{Identity, SessionContext, SessionMode, SessionState};

/// Collections a role may see. Suppliers are owner-only.
pub fn visible_collections(role: Role) -> Vec<Collection> {
    let mut collections = vec![
        Collection::Products,
        Collection::Categories,
        Collection::Sales,
        Collection::Clients,
    ];
    if role == Role::Owner {
        collections.push(Collection::Suppliers);
    }
    collections.push(Collection::Expenses);
    collections.push(Collection::Config);
    collections
}

#[derive(Debug)]
pub struct SyncController {
    local: Arc<dyn DocumentStore>,
    remote: Arc<dyn DocumentStore>,
    notifier: Arc<dyn NotificationSink>,
    engine: EngineSettings,
    cache: Arc<DataCache>,
    state: RwLock<SessionState>,
    session: RwLock<Option<SessionContext>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SyncController {
    pub fn new(
        local: Arc<dyn DocumentStore>,
        remote: Arc<dyn DocumentStore>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            local,
            remote,
            notifier,
            engine: EngineSettings::default(),
            cache: Arc::new(DataCache::new()),
            state: RwLock::new(SessionState::Unauthenticated),
            session: RwLock::new(None),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn with_engine_settings(mut self, engine: EngineSettings) -> Self {
        self.engine = engine;
        self
    }

    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    pub fn cache(&self) -> Arc<DataCache> {
        self.cache.clone()
    }

    /// The active session, if any.
    pub async fn session(&self) -> SyncResult<SessionContext> {
        self.session.read().await.clone().ok_or(SyncError::NotSignedIn)
    }

    async fn transition(&self, next: SessionState) -> SyncResult<()> {
        let mut state = self.state.write().await;
        if !state.can_transition_to(next) {
            return Err(SyncError::InvalidTransition {
                from: *state,
                to: next,
            });
        }
        debug!(from = %*state, to = %next, "Session transition");
        *state = next;
        Ok(())
    }

    /// Establishes a session for `identity` and loads its data.
    pub async fn sign_in(&self, identity: Identity) -> SyncResult<SessionContext> {
        self.transition(SessionState::ResolvingIdentity).await?;

        let mode = identity.mode();
        let collections = visible_collections(identity.role);
        info!(uid = %identity.uid, %mode, role = ?identity.role, "Signing in");

        let store = match mode {
            SessionMode::Demo => {
                if let Err(e) = self.load_demo(&collections).await {
                    self.cache.clear().await;
                    self.transition(SessionState::Unauthenticated).await?;
                    return Err(e);
                }
                self.transition(SessionState::Demo).await?;
                self.local.clone()
            }
            SessionMode::Cloud => {
                self.transition(SessionState::Cloud).await?;
                self.subscribe_all(&collections).await;
                self.transition(SessionState::Subscribed).await?;
                self.remote.clone()
            }
        };

        let context = SessionContext::new(
            store,
            identity,
            self.cache.clone(),
            self.notifier.clone(),
            self.engine.clone(),
        );
        *self.session.write().await = Some(context.clone());
        Ok(context)
    }

    async fn load_demo(&self, collections: &[Collection]) -> SyncResult<()> {
        for collection in collections {
            let docs = self.local.list(*collection).await?;
            self.cache.apply(*collection, &docs).await;
        }
        info!(collections = collections.len(), "Demo data loaded from local store");
        Ok(())
    }

    async fn subscribe_all(&self, collections: &[Collection]) {
        let mut tasks = self.tasks.lock().await;
        for collection in collections {
            match self.remote.subscribe(*collection).await {
                Ok(mut subscription) => {
                    let current = subscription.current();
                    self.cache.apply(*collection, &current).await;

                    let cache = self.cache.clone();
                    tasks.push(tokio::spawn(async move {
                        while let Some(snapshot) = subscription.next().await {
                            cache.apply(subscription.collection(), &snapshot).await;
                        }
                        debug!(collection = %subscription.collection(), "Subscription closed");
                    }));
                }
                Err(e) => {
                    warn!(%collection, error = %e, "Subscription failed, collection left empty");
                    self.cache.apply(*collection, &[]).await;
                    emit(
                        self.notifier.as_ref(),
                        Severity::Warning,
                        format!("No se pudo sincronizar {collection}"),
                    );
                }
            }
        }
        info!(subscriptions = tasks.len(), "Cloud subscriptions open");
    }

    /// Cancels every subscription, then clears the cache.
    pub async fn sign_out(&self) -> SyncResult<()> {
        let current = self.state().await;
        if !current.can_transition_to(SessionState::TornDown) {
            return Err(SyncError::InvalidTransition {
                from: current,
                to: SessionState::TornDown,
            });
        }

        let handles: Vec<_> = self.tasks.lock().await.drain(..).collect();
        for handle in &handles {
            handle.abort();
        }
        for handle in handles {
            // Cancelled tasks resolve with a JoinError; that is the expected outcome.
            let _ = handle.await;
        }

        *self.session.write().await = None;
        self.cache.clear().await;
        self.transition(SessionState::TornDown).await?;
        info!("Signed out");
        Ok(())
    }
}
