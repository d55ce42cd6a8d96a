//! Shared fixtures: a signed-in session over either store.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use mercado_core::{AppConfig, Client, Product, Role};
use mercado_engine::Engine;
use mercado_store::{
    get_record, to_body, Collection, Commit, DocumentStore, LocalStore, RemoteConfig, RemoteStore,
    CONFIG_DOC_ID,
};
use mercado_sync::{ChannelSink, EngineSettings, Identity, Notification, SessionContext, SyncController};
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Demo,
    Cloud,
}

pub const BOTH: [Backend; 2] = [Backend::Demo, Backend::Cloud];

pub struct Harness {
    pub backend: Backend,
    pub local: Arc<LocalStore>,
    pub remote: RemoteStore,
    pub controller: SyncController,
    pub ctx: SessionContext,
    pub engine: Engine,
    pub notifications: UnboundedReceiver<Notification>,
}

impl Harness {
    /// Seeds `seed` into the backend's store, then signs in.
    pub async fn start(backend: Backend, seed: Commit) -> Self {
        Self::start_with(backend, seed, RemoteConfig::default()).await
    }

    pub async fn start_with(backend: Backend, seed: Commit, remote: RemoteConfig) -> Self {
        Self::open(backend, seed, remote, Role::Owner).await
    }

    /// Like [`Harness::start`], signed in with `role`.
    pub async fn start_as(backend: Backend, seed: Commit, role: Role) -> Self {
        Self::open(backend, seed, RemoteConfig::default(), role).await
    }

    async fn open(backend: Backend, seed: Commit, remote: RemoteConfig, role: Role) -> Self {
        let local = Arc::new(LocalStore::in_memory().await.unwrap());
        let remote = RemoteStore::connect(remote);

        if !seed.is_empty() {
            match backend {
                Backend::Demo => local.commit(seed).await.unwrap(),
                Backend::Cloud => remote.commit(seed).await.unwrap(),
            };
        }

        let (sink, notifications) = ChannelSink::new();
        let controller = SyncController::new(local.clone(), Arc::new(remote.clone()), Arc::new(sink))
            .with_engine_settings(fast_retry());

        let identity = match backend {
            Backend::Demo => Identity {
                role,
                ..Identity::demo("Demo")
            },
            Backend::Cloud => Identity::cloud("user-1", "Dueña", role),
        };
        let ctx = controller.sign_in(identity).await.unwrap();
        let engine = Engine::new(ctx.clone());

        Self {
            backend,
            local,
            remote,
            controller,
            ctx,
            engine,
            notifications,
        }
    }

    /// A second, independent engine over the same store, as another
    /// register would have.
    pub async fn second_register(&self) -> Engine {
        let (sink, _rx) = ChannelSink::new();
        let other = SyncController::new(
            self.local.clone(),
            Arc::new(self.remote.clone()),
            Arc::new(sink),
        )
        .with_engine_settings(fast_retry());
        let identity = match self.backend {
            Backend::Demo => Identity::demo("Caja 2"),
            Backend::Cloud => Identity::cloud("owner-2", "Caja 2", Role::Owner),
        };
        Engine::new(other.sign_in(identity).await.unwrap())
    }

    pub fn store(&self) -> &dyn DocumentStore {
        match self.backend {
            Backend::Demo => self.local.as_ref(),
            Backend::Cloud => &self.remote,
        }
    }

    pub async fn product(&self, id: &str) -> Product {
        get_record(self.store(), Collection::Products, id)
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn client(&self, id: &str) -> Client {
        get_record(self.store(), Collection::Clients, id)
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn count(&self, collection: Collection) -> usize {
        self.store().list(collection).await.unwrap().len()
    }

    /// Drains notifications received so far.
    pub fn drain(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(n) = self.notifications.try_recv() {
            out.push(n);
        }
        out
    }
}

pub fn fast_retry() -> EngineSettings {
    EngineSettings {
        max_commit_attempts: 10,
        initial_backoff_ms: 1,
        max_backoff_ms: 10,
    }
}

pub fn product(id: &str, name: &str, price: f64, stock: i64) -> Product {
    Product {
        id: id.to_string(),
        code: format!("C-{id}"),
        name: name.to_string(),
        sale_price: price,
        cost_price: price / 2.0,
        stock,
        ..Product::default()
    }
}

pub fn client(id: &str, name: &str, debt: f64) -> Client {
    Client {
        id: id.to_string(),
        name: name.to_string(),
        debt,
        ..Client::default()
    }
}

/// Seed commit builder.
#[derive(Default)]
pub struct Seed(Commit);

impl Seed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn product(self, p: Product) -> Self {
        Seed(self.0.set(Collection::Products, p.id.clone(), to_body(&p).unwrap()))
    }

    pub fn client(self, c: Client) -> Self {
        Seed(self.0.set(Collection::Clients, c.id.clone(), to_body(&c).unwrap()))
    }

    pub fn category(self, id: &str, name: &str) -> Self {
        let category = mercado_core::Category {
            id: id.to_string(),
            name: name.to_string(),
            color: "#3b82f6".to_string(),
        };
        Seed(self.0.set(Collection::Categories, id, to_body(&category).unwrap()))
    }

    pub fn config(self, config: AppConfig) -> Self {
        Seed(self.0.set(Collection::Config, CONFIG_DOC_ID, to_body(&config).unwrap()))
    }

    pub fn strict_stock(self) -> Self {
        self.config(AppConfig {
            enable_negative_stock: false,
            ..AppConfig::default()
        })
    }

    pub fn build(self) -> Commit {
        self.0
    }
}

/// Waits until the session cache has moved past `after`.
pub async fn wait_for_cache(ctx: &SessionContext, after: u64) {
    let mut rx = ctx.cache().watch();
    tokio::time::timeout(Duration::from_secs(2), async {
        while *rx.borrow_and_update() <= after {
            if rx.changed().await.is_err() {
                break;
            }
        }
    })
    .await
    .unwrap();
}
