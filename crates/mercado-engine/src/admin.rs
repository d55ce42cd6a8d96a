//! # Administrative Actions
//!
//! Bulk wipes of local demo data.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  clear_sales_history      sales/*  + counters/sales  (numbering restarts)│
//! │  clear_expenses_history   expenses/*                                    │
//! │  reset_system             every collection, then default config and     │
//! │                           the walk-in client are written back           │
//! │                                                                         │
//! │  Demo session  ─► deletes chunked by store.max_batch_ops()              │
//! │  Cloud session ─► Policy(DemoOnly) + warning notification, no writes    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use mercado_core::{AppConfig, Client, CoreError, WALK_IN_CLIENT_ID};
use mercado_store::{
    to_body, Collection, Commit, CommitReceipt, CONFIG_DOC_ID, SALES_COUNTER_ID,
};
use mercado_sync::{SessionContext, Severity};
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone)]
pub struct AdminActions {
    ctx: SessionContext,
}

impl AdminActions {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    /// Deletes every sale. Returns how many were removed.
    pub async fn clear_sales_history(&self) -> EngineResult<usize> {
        let result = self.try_clear_sales().await;
        self.report(result, "clear_sales_history", |n| {
            format!("Historial de ventas eliminado ({n} ventas)")
        })
    }

    async fn try_clear_sales(&self) -> EngineResult<usize> {
        self.demo_only("clear_sales_history")?;
        let deleted = self.delete_all(&[Collection::Sales]).await?;
        let counter = Commit::new().delete(Collection::Counters, SALES_COUNTER_ID);
        let receipt = self.ctx.store().commit(counter).await?;
        self.ctx.after_commit(&receipt).await;
        Ok(deleted)
    }

    /// Deletes every expense. Returns how many were removed.
    pub async fn clear_expenses_history(&self) -> EngineResult<usize> {
        let result = self.try_clear_expenses().await;
        self.report(result, "clear_expenses_history", |n| {
            format!("Historial de gastos eliminado ({n} gastos)")
        })
    }

    async fn try_clear_expenses(&self) -> EngineResult<usize> {
        self.demo_only("clear_expenses_history")?;
        self.delete_all(&[Collection::Expenses]).await
    }

    /// Wipes all data and writes back the default configuration and the
    /// walk-in client.
    pub async fn reset_system(&self) -> EngineResult<usize> {
        let result = self.try_reset().await;
        self.report(result, "reset_system", |_| "Sistema restablecido".to_string())
    }

    async fn try_reset(&self) -> EngineResult<usize> {
        self.demo_only("reset_system")?;
        let deleted = self.delete_all(&Collection::ALL).await?;

        let baseline = Commit::new()
            .set(Collection::Config, CONFIG_DOC_ID, to_body(&AppConfig::default())?)
            .set(Collection::Clients, WALK_IN_CLIENT_ID, to_body(&Client::walk_in())?);
        let receipt = self.ctx.store().commit(baseline).await?;
        self.ctx.after_commit(&receipt).await;
        Ok(deleted)
    }

    fn demo_only(&self, action: &str) -> EngineResult<()> {
        if self.ctx.is_demo() {
            Ok(())
        } else {
            Err(CoreError::DemoOnly {
                action: action.to_string(),
            }
            .into())
        }
    }

    /// Deletes every document of `collections`, in commits no larger than
    /// the store allows.
    async fn delete_all(&self, collections: &[Collection]) -> EngineResult<usize> {
        let store = self.ctx.store();
        let max_ops = store.max_batch_ops().max(1);

        let mut targets = Vec::new();
        for &collection in collections {
            let docs = store.list(collection).await?;
            targets.extend(docs.into_iter().map(|doc| (collection, doc.id)));
        }

        let mut touched = CommitReceipt {
            writes: 0,
            collections: Vec::new(),
        };
        for (index, chunk) in targets.chunks(max_ops).enumerate() {
            let commit = chunk
                .iter()
                .fold(Commit::new(), |commit, (collection, id)| {
                    commit.delete(*collection, id.clone())
                });
            let receipt = store.commit(commit).await?;
            debug!(batch = index, deletes = receipt.writes, "Delete batch committed");
            touched.writes += receipt.writes;
            for collection in receipt.collections {
                if !touched.collections.contains(&collection) {
                    touched.collections.push(collection);
                }
            }
        }

        self.ctx.after_commit(&touched).await;
        Ok(targets.len())
    }

    fn report<F>(&self, result: EngineResult<usize>, action: &str, success: F) -> EngineResult<usize>
    where
        F: FnOnce(usize) -> String,
    {
        match &result {
            Ok(deleted) => {
                info!(action, deleted, "Administrative action completed");
                self.ctx.notify(Severity::Success, success(*deleted));
            }
            Err(EngineError::Policy(CoreError::DemoOnly { .. })) => {
                warn!(action, mode = %self.ctx.mode(), "Administrative action refused");
                self.ctx.notify(
                    Severity::Warning,
                    "Esta accion solo esta disponible en modo demo",
                );
            }
            Err(e) => {
                warn!(action, code = e.code(), error = %e, "Administrative action failed");
                self.ctx
                    .notify(Severity::Error, format!("No se pudo completar la accion: {e}"));
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use mercado_core::Role;
    use mercado_store::{DocumentStore, LocalStore, RemoteConfig, RemoteStore};
    use mercado_sync::{DataCache, EngineSettings, Identity, NoOpSink};
    use serde_json::{json, Map, Value};

    fn body(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap_or_default()
    }

    fn ctx(store: Arc<dyn DocumentStore>, identity: Identity) -> SessionContext {
        SessionContext::new(
            store,
            identity,
            Arc::new(DataCache::new()),
            Arc::new(NoOpSink),
            EngineSettings::default(),
        )
    }

    async fn seed_sales(store: &dyn DocumentStore, n: usize) {
        let commit = (0..n).fold(Commit::new(), |c, i| {
            c.set(Collection::Sales, format!("s{i}"), body(json!({"total": 1.0})))
        });
        store.commit(commit).await.unwrap();
    }

    #[tokio::test]
    async fn test_clear_sales_in_demo() {
        let store = Arc::new(LocalStore::in_memory().await.unwrap());
        seed_sales(store.as_ref(), 3).await;
        store
            .commit(Commit::new().set(Collection::Counters, SALES_COUNTER_ID, body(json!({"value": 3}))))
            .await
            .unwrap();

        let admin = AdminActions::new(ctx(store.clone(), Identity::demo("Demo")));
        assert_eq!(admin.clear_sales_history().await.unwrap(), 3);
        assert!(store.list(Collection::Sales).await.unwrap().is_empty());
        assert!(store
            .get(Collection::Counters, SALES_COUNTER_ID)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_refused_in_cloud() {
        let remote = RemoteStore::default();
        seed_sales(&remote, 2).await;
        let before = remote.commit_count();

        let admin = AdminActions::new(ctx(
            Arc::new(remote.clone()),
            Identity::cloud("u1", "Ana", Role::Owner),
        ));
        let err = admin.clear_sales_history().await.unwrap_err();

        assert_eq!(err.code(), "DEMO_ONLY");
        assert_eq!(remote.commit_count(), before);
        assert_eq!(remote.list(Collection::Sales).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_deletes_respect_batch_ceiling() {
        let remote = RemoteStore::connect(RemoteConfig::default().max_batch_ops(4));
        for chunk in 0..3 {
            let commit = (0..4).fold(Commit::new(), |c, i| {
                c.set(Collection::Expenses, format!("e{chunk}-{i}"), body(json!({"amount": 1.0})))
            });
            remote.commit(commit).await.unwrap();
        }
        let before = remote.commit_count();

        // A demo identity over a bounded store exercises the chunking.
        let admin = AdminActions::new(ctx(Arc::new(remote.clone()), Identity::demo("Demo")));
        assert_eq!(admin.clear_expenses_history().await.unwrap(), 12);
        assert_eq!(remote.commit_count() - before, 3);
        assert!(remote.list(Collection::Expenses).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reset_restores_baseline() {
        let store = Arc::new(LocalStore::in_memory().await.unwrap());
        seed_sales(store.as_ref(), 2).await;
        store
            .commit(
                Commit::new()
                    .set(Collection::Products, "p1", body(json!({"name": "Arroz"})))
                    .set(Collection::Clients, WALK_IN_CLIENT_ID, body(json!({"name": "X", "debt": 9.0}))),
            )
            .await
            .unwrap();

        let admin = AdminActions::new(ctx(store.clone(), Identity::demo("Demo")));
        assert_eq!(admin.reset_system().await.unwrap(), 4);

        assert!(store.list(Collection::Products).await.unwrap().is_empty());
        let clients = store.list(Collection::Clients).await.unwrap();
        assert_eq!(clients.len(), 1);
        let walk_in: Client = clients[0].decode().unwrap();
        assert_eq!(walk_in, Client::walk_in());
        assert!(store.get(Collection::Config, CONFIG_DOC_ID).await.unwrap().is_some());
    }
}
