//! # In-Memory Data Cache
//!
//! The session's view of every collection. Each delivery (a subscription
//! snapshot in cloud mode, a reload in demo mode) replaces a collection
//! wholesale; nothing is patched incrementally and no operation writes
//! into the cache directly.
//!
//! ```text
//!   Subscription(products) ──snapshot──┐
//!   Subscription(sales)    ──snapshot──┼──► apply() ──► RwLock<CacheState>
//!   LocalStore reload      ──list()────┘          └──► revision += 1
//! ```

use mercado_core::document::merge_over_defaults;
use mercado_core::{AppConfig, Category, Client, Expense, Product, Sale, Supplier};
use mercado_store::{decode_all, Collection, Document, DocumentStore, CONFIG_DOC_ID};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{watch, RwLock};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
struct CacheState {
    products: Vec<Product>,
    categories: Vec<Category>,
    /// Newest first.
    sales: Vec<Sale>,
    clients: Vec<Client>,
    suppliers: Vec<Supplier>,
    expenses: Vec<Expense>,
    config: AppConfig,
}

#[derive(Debug)]
pub struct DataCache {
    state: RwLock<CacheState>,
    revision: watch::Sender<u64>,
}

impl Default for DataCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DataCache {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            revision: watch::channel(0).0,
        }
    }

    /// Replaces one collection with the given snapshot.
    pub async fn apply(&self, collection: Collection, docs: &[Document]) {
        let mut state = self.state.write().await;
        match collection {
            Collection::Products => state.products = decode_logged(collection, docs),
            Collection::Categories => state.categories = decode_logged(collection, docs),
            Collection::Sales => {
                let mut sales: Vec<Sale> = decode_logged(collection, docs);
                sales.sort_by(|a, b| b.date.cmp(&a.date));
                state.sales = sales;
            }
            Collection::Clients => state.clients = decode_logged(collection, docs),
            Collection::Suppliers => state.suppliers = decode_logged(collection, docs),
            Collection::Expenses => state.expenses = decode_logged(collection, docs),
            Collection::Config => state.config = decode_config(docs),
            Collection::ClientPayments | Collection::Counters => {
                debug!(%collection, "Collection is not cached");
                return;
            }
        }
        drop(state);
        self.revision.send_modify(|r| *r += 1);
        debug!(%collection, docs = docs.len(), "Cache collection replaced");
    }

    /// Re-reads the given collections from `store`. A failed read is
    /// logged and leaves that collection as it was.
    pub async fn reload(&self, store: &dyn DocumentStore, collections: &[Collection]) {
        for collection in collections {
            match store.list(*collection).await {
                Ok(docs) => self.apply(*collection, &docs).await,
                Err(e) => warn!(%collection, error = %e, "Cache reload failed"),
            }
        }
    }

    pub async fn clear(&self) {
        *self.state.write().await = CacheState::default();
        self.revision.send_modify(|r| *r += 1);
    }

    /// Increases on every applied change.
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    pub fn watch(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    // =========================================================================
    // Readers
    // =========================================================================

    pub async fn products(&self) -> Vec<Product> {
        self.state.read().await.products.clone()
    }

    pub async fn categories(&self) -> Vec<Category> {
        self.state.read().await.categories.clone()
    }

    pub async fn sales(&self) -> Vec<Sale> {
        self.state.read().await.sales.clone()
    }

    pub async fn clients(&self) -> Vec<Client> {
        self.state.read().await.clients.clone()
    }

    pub async fn suppliers(&self) -> Vec<Supplier> {
        self.state.read().await.suppliers.clone()
    }

    pub async fn expenses(&self) -> Vec<Expense> {
        self.state.read().await.expenses.clone()
    }

    pub async fn config(&self) -> AppConfig {
        self.state.read().await.config.clone()
    }

    pub async fn product(&self, id: &str) -> Option<Product> {
        self.state
            .read()
            .await
            .products
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    pub async fn client(&self, id: &str) -> Option<Client> {
        self.state
            .read()
            .await
            .clients
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }
}

fn decode_logged<T: DeserializeOwned>(collection: Collection, docs: &[Document]) -> Vec<T> {
    let (records, failed) = decode_all(docs);
    for (id, error) in failed {
        warn!(%collection, %id, %error, "Skipping undecodable document");
    }
    records
}

fn decode_config(docs: &[Document]) -> AppConfig {
    let stored = docs
        .iter()
        .find(|d| d.id == CONFIG_DOC_ID)
        .map(|d| Value::Object(d.data.clone()));
    merge_over_defaults(stored.as_ref()).unwrap_or_else(|e| {
        warn!(error = %e, "Stored config unreadable, using defaults");
        AppConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn doc(id: &str, v: Value) -> Document {
        Document {
            id: id.to_string(),
            version: 1,
            data: v.as_object().cloned().unwrap_or_else(Map::new),
        }
    }

    #[tokio::test]
    async fn test_apply_replaces_wholesale() {
        let cache = DataCache::new();
        cache
            .apply(
                Collection::Categories,
                &[doc("a", json!({"name": "A"})), doc("b", json!({"name": "B"}))],
            )
            .await;
        assert_eq!(cache.categories().await.len(), 2);

        cache
            .apply(Collection::Categories, &[doc("c", json!({"name": "C"}))])
            .await;
        let categories = cache.categories().await;
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].id, "c");
    }

    #[tokio::test]
    async fn test_sales_sorted_newest_first() {
        let cache = DataCache::new();
        let sale = |id: &str, date: &str| {
            doc(
                id,
                json!({
                    "number": id, "date": date, "total": 1.0, "total_local": 45.0,
                    "exchange_rate": 45.0, "payment_method": "cash_usd", "items": []
                }),
            )
        };
        cache
            .apply(
                Collection::Sales,
                &[
                    sale("old", "2026-01-01T10:00:00Z"),
                    sale("new", "2026-03-01T10:00:00Z"),
                    sale("mid", "2026-02-01T10:00:00Z"),
                ],
            )
            .await;
        let ids: Vec<String> = cache.sales().await.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_config_merges_over_defaults() {
        let cache = DataCache::new();
        cache
            .apply(
                Collection::Config,
                &[doc("main", json!({"tax_rate": 16.0, "permissions": {"can_view_costs": true}}))],
            )
            .await;
        let config = cache.config().await;
        assert_eq!(config.tax_rate, 16.0);
        assert_eq!(config.exchange_rate, 45.0);
        assert!(config.permissions.can_view_costs);
        assert!(config.permissions.can_manage_clients);
    }

    #[tokio::test]
    async fn test_bad_documents_are_skipped() {
        let cache = DataCache::new();
        cache
            .apply(
                Collection::Clients,
                &[doc("c1", json!({"name": "Ana"})), doc("c2", json!({"debt": "lots"}))],
            )
            .await;
        let clients = cache.clients().await;
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].id, "c1");
    }

    #[tokio::test]
    async fn test_revision_advances() {
        let cache = DataCache::new();
        let before = cache.revision();
        cache.apply(Collection::Expenses, &[]).await;
        cache.clear().await;
        assert_eq!(cache.revision(), before + 2);
    }
}
