//! # Catalog Maintenance
//!
//! Create, edit and delete for the reference collections, plus the
//! business configuration document.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Record      update never writes   create / edit gate   delete gate     │
//! │  ─────────   ───────────────────   ──────────────────   ─────────────   │
//! │  Product     id, stock             edit_products        delete_items    │
//! │  Category    id                    edit_products        delete_items    │
//! │  Client      id, debt              manage_clients       manage_clients  │
//! │                                                         (not "general") │
//! │  Supplier    id                    owner                owner           │
//! │  Expense     -                     access_cashbox       delete_items    │
//! │  AppConfig   wholesale Set         owner                -               │
//! │                                                                         │
//! │  Creates carry an Absent precondition: a taken id is a Conflict.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock and debt only move through conditional commits: sales, payments
//! and [`Catalog::adjust_stock`]. A plain edit racing a sale would
//! otherwise overwrite the sale's decrement.

use mercado_core::validation::{validate_amount, validate_name, validate_product};
use mercado_core::{
    AppConfig, Capability, Category, Client, CoreError, Expense, Product, Role, Supplier,
    ValidationError, WALK_IN_CLIENT_ID,
};
use mercado_store::{
    to_body, Collection, Commit, CommitReceipt, Precondition, StoreError, Transaction,
    CONFIG_DOC_ID,
};
use mercado_sync::{SessionContext, Severity};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::EngineResult;
use crate::retry::with_conflict_retry;

/// Fields an edit form may never overwrite, per collection.
const PRODUCT_GUARDED: &[&str] = &["id", "stock"];
const CLIENT_GUARDED: &[&str] = &["id", "debt"];
const PLAIN_GUARDED: &[&str] = &["id"];

fn assign_id(id: &mut String) {
    if id.trim().is_empty() {
        *id = Uuid::new_v4().to_string();
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    ctx: SessionContext,
}

impl Catalog {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    // =========================================================================
    // Products
    // =========================================================================

    pub async fn create_product(&self, product: Product) -> EngineResult<Product> {
        let result = self.try_create_product(product).await;
        self.report(result, "Producto creado", "No se pudo crear el producto")
    }

    async fn try_create_product(&self, mut product: Product) -> EngineResult<Product> {
        self.ctx.require(Capability::EditProducts).await?;
        validate_product(&product)?;
        assign_id(&mut product.id);
        self.insert(Collection::Products, &product.id, &product).await?;
        Ok(product)
    }

    /// Saves edited product fields. `stock` is left untouched.
    pub async fn update_product(&self, product: &Product) -> EngineResult<()> {
        let result = self.try_update_product(product).await;
        self.report(result, "Producto actualizado", "No se pudo actualizar el producto")
    }

    async fn try_update_product(&self, product: &Product) -> EngineResult<()> {
        self.ctx.require(Capability::EditProducts).await?;
        validate_product(product)?;
        self.patch(Collection::Products, &product.id, product, PRODUCT_GUARDED)
            .await
    }

    pub async fn delete_product(&self, id: &str) -> EngineResult<()> {
        let result = self.try_delete(Collection::Products, id).await;
        self.report(result, "Producto eliminado", "No se pudo eliminar el producto")
    }

    /// Manual inventory correction by `delta` units. Returns the new stock.
    ///
    /// Goes through the same read-then-commit path as a sale, so a
    /// correction and a concurrent sale both land.
    pub async fn adjust_stock(&self, product_id: &str, delta: i64) -> EngineResult<i64> {
        let result = self.try_adjust_stock(product_id, delta).await;
        self.report(result, "Inventario ajustado", "No se pudo ajustar el inventario")
    }

    async fn try_adjust_stock(&self, product_id: &str, delta: i64) -> EngineResult<i64> {
        self.ctx.require(Capability::EditProducts).await?;
        let allow_negative = self.ctx.config().await.enable_negative_stock;

        let (stock, receipt) = with_conflict_retry(self.ctx.engine(), "adjust_stock", || {
            self.adjust_attempt(product_id, delta, allow_negative)
        })
        .await?;

        self.ctx.after_commit(&receipt).await;
        info!(product_id, delta, stock, "Stock adjusted");
        Ok(stock)
    }

    async fn adjust_attempt(
        &self,
        product_id: &str,
        delta: i64,
        allow_negative: bool,
    ) -> EngineResult<(i64, CommitReceipt)> {
        let mut tx = Transaction::new(self.ctx.store());
        let product: Product = tx
            .get_record(Collection::Products, product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        let stock = mercado_core::decimal::add_units(product.stock, delta);
        if stock < 0 && !allow_negative {
            return Err(CoreError::InsufficientStock {
                product: product.name,
                available: product.stock,
                requested: delta.saturating_neg(),
            }
            .into());
        }

        tx.update_field(Collection::Products, product_id, "stock", stock);
        let receipt = tx.commit().await?;
        Ok((stock, receipt))
    }

    // =========================================================================
    // Categories
    // =========================================================================

    pub async fn create_category(&self, name: &str, color: &str) -> EngineResult<Category> {
        let result = self.try_create_category(name, color).await;
        self.report(result, "Categoria creada", "No se pudo crear la categoria")
    }

    async fn try_create_category(&self, name: &str, color: &str) -> EngineResult<Category> {
        self.ctx.require(Capability::EditProducts).await?;
        validate_name("name", name)?;
        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            color: color.to_string(),
        };
        self.insert(Collection::Categories, &category.id, &category)
            .await?;
        Ok(category)
    }

    pub async fn update_category(&self, category: &Category) -> EngineResult<()> {
        let result = self.try_update_category(category).await;
        self.report(result, "Categoria actualizada", "No se pudo actualizar la categoria")
    }

    async fn try_update_category(&self, category: &Category) -> EngineResult<()> {
        self.ctx.require(Capability::EditProducts).await?;
        validate_name("name", &category.name)?;
        self.patch(Collection::Categories, &category.id, category, PLAIN_GUARDED)
            .await
    }

    pub async fn delete_category(&self, id: &str) -> EngineResult<()> {
        let result = self.try_delete(Collection::Categories, id).await;
        self.report(result, "Categoria eliminada", "No se pudo eliminar la categoria")
    }

    // =========================================================================
    // Clients
    // =========================================================================

    pub async fn create_client(&self, client: Client) -> EngineResult<Client> {
        let result = self.try_create_client(client).await;
        self.report(result, "Cliente registrado", "No se pudo registrar el cliente")
    }

    async fn try_create_client(&self, mut client: Client) -> EngineResult<Client> {
        self.ctx.require(Capability::ManageClients).await?;
        validate_name("name", &client.name)?;
        validate_amount("debt", client.debt)?;
        validate_amount("credit_limit", client.credit_limit)?;
        assign_id(&mut client.id);
        self.insert(Collection::Clients, &client.id, &client).await?;
        Ok(client)
    }

    /// Saves edited client details. `debt` is left untouched.
    pub async fn update_client(&self, client: &Client) -> EngineResult<()> {
        let result = self.try_update_client(client).await;
        self.report(result, "Cliente actualizado", "No se pudo actualizar el cliente")
    }

    async fn try_update_client(&self, client: &Client) -> EngineResult<()> {
        self.ctx.require(Capability::ManageClients).await?;
        validate_name("name", &client.name)?;
        validate_amount("credit_limit", client.credit_limit)?;
        self.patch(Collection::Clients, &client.id, client, CLIENT_GUARDED)
            .await
    }

    pub async fn delete_client(&self, id: &str) -> EngineResult<()> {
        let result = self.try_delete_client(id).await;
        self.report(result, "Cliente eliminado", "No se pudo eliminar el cliente")
    }

    async fn try_delete_client(&self, id: &str) -> EngineResult<()> {
        if id == WALK_IN_CLIENT_ID {
            return Err(CoreError::ProtectedClient {
                action: "deleted".to_string(),
            }
            .into());
        }
        self.ctx.require(Capability::ManageClients).await?;
        self.try_delete(Collection::Clients, id).await
    }

    /// Creates the walk-in client if it is missing. Returns whether it was
    /// created.
    pub async fn ensure_walk_in_client(&self) -> EngineResult<bool> {
        let store = self.ctx.store();
        let current = store.get(Collection::Clients, WALK_IN_CLIENT_ID).await?;
        if current.is_some() {
            return Ok(false);
        }

        let commit = Commit::new()
            .require(Precondition::from_read(Collection::Clients, WALK_IN_CLIENT_ID, None))
            .set(Collection::Clients, WALK_IN_CLIENT_ID, to_body(&Client::walk_in())?);
        match store.commit(commit).await {
            Ok(receipt) => {
                self.ctx.after_commit(&receipt).await;
                debug!("Walk-in client created");
                Ok(true)
            }
            // Someone else created it first.
            Err(StoreError::Conflict { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Suppliers
    // =========================================================================

    pub async fn create_supplier(&self, supplier: Supplier) -> EngineResult<Supplier> {
        let result = self.try_create_supplier(supplier).await;
        self.report(result, "Proveedor registrado", "No se pudo registrar el proveedor")
    }

    async fn try_create_supplier(&self, mut supplier: Supplier) -> EngineResult<Supplier> {
        self.require_owner("manage_suppliers")?;
        validate_name("name", &supplier.name)?;
        assign_id(&mut supplier.id);
        self.insert(Collection::Suppliers, &supplier.id, &supplier)
            .await?;
        Ok(supplier)
    }

    pub async fn update_supplier(&self, supplier: &Supplier) -> EngineResult<()> {
        let result = self.try_update_supplier(supplier).await;
        self.report(result, "Proveedor actualizado", "No se pudo actualizar el proveedor")
    }

    async fn try_update_supplier(&self, supplier: &Supplier) -> EngineResult<()> {
        self.require_owner("manage_suppliers")?;
        validate_name("name", &supplier.name)?;
        self.patch(Collection::Suppliers, &supplier.id, supplier, PLAIN_GUARDED)
            .await
    }

    pub async fn delete_supplier(&self, id: &str) -> EngineResult<()> {
        let result = match self.require_owner("manage_suppliers") {
            Ok(()) => self.remove(Collection::Suppliers, id).await,
            Err(e) => Err(e),
        };
        self.report(result, "Proveedor eliminado", "No se pudo eliminar el proveedor")
    }

    // =========================================================================
    // Expenses
    // =========================================================================

    /// Records a cash-box expense.
    pub async fn add_expense(&self, expense: Expense) -> EngineResult<Expense> {
        let result = self.try_add_expense(expense).await;
        self.report(result, "Gasto registrado", "No se pudo registrar el gasto")
    }

    async fn try_add_expense(&self, mut expense: Expense) -> EngineResult<Expense> {
        self.ctx.require(Capability::AccessCashbox).await?;
        validate_name("description", &expense.description)?;
        validate_amount("amount", expense.amount)?;
        if expense.amount == 0.0 {
            return Err(ValidationError::MustBePositive {
                field: "amount".to_string(),
            }
            .into());
        }
        assign_id(&mut expense.id);
        self.insert(Collection::Expenses, &expense.id, &expense)
            .await?;
        Ok(expense)
    }

    pub async fn delete_expense(&self, id: &str) -> EngineResult<()> {
        let result = self.try_delete(Collection::Expenses, id).await;
        self.report(result, "Gasto eliminado", "No se pudo eliminar el gasto")
    }

    // =========================================================================
    // Business configuration
    // =========================================================================

    /// Replaces the configuration document as a whole.
    pub async fn save_config(&self, config: &AppConfig) -> EngineResult<()> {
        let result = self.try_save_config(config).await;
        self.report(result, "Configuracion guardada", "No se pudo guardar la configuracion")
    }

    async fn try_save_config(&self, config: &AppConfig) -> EngineResult<()> {
        self.require_owner("edit_settings")?;
        validate_amount("exchange_rate", config.exchange_rate)?;
        validate_amount("cop_exchange_rate", config.cop_exchange_rate)?;
        validate_amount("tax_rate", config.tax_rate)?;

        let commit = Commit::new().set(Collection::Config, CONFIG_DOC_ID, to_body(config)?);
        self.apply(commit).await?;
        info!(
            exchange_rate = config.exchange_rate,
            tax_rate = config.tax_rate,
            negative_stock = config.enable_negative_stock,
            "Configuration saved"
        );
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn require_owner(&self, capability: &str) -> EngineResult<()> {
        if self.ctx.role() == Role::Owner {
            Ok(())
        } else {
            Err(CoreError::PermissionDenied {
                capability: capability.to_string(),
            }
            .into())
        }
    }

    async fn try_delete(&self, collection: Collection, id: &str) -> EngineResult<()> {
        self.ctx.require(Capability::DeleteItems).await?;
        self.remove(collection, id).await
    }

    /// Writes a new record; fails with `Conflict` if the id is taken.
    async fn insert<T: Serialize>(&self, collection: Collection, id: &str, record: &T) -> EngineResult<()> {
        let commit = Commit::new()
            .require(Precondition::from_read(collection, id, None))
            .set(collection, id, to_body(record)?);
        self.apply(commit).await
    }

    /// Shallow-merges a record's fields over the stored document, minus
    /// `guarded`. A missing document is `NotFound`.
    async fn patch<T: Serialize>(
        &self,
        collection: Collection,
        id: &str,
        record: &T,
        guarded: &[&str],
    ) -> EngineResult<()> {
        let mut fields = to_body(record)?;
        for field in guarded {
            fields.remove(*field);
        }
        self.apply(Commit::new().update(collection, id, fields)).await
    }

    async fn remove(&self, collection: Collection, id: &str) -> EngineResult<()> {
        self.apply(Commit::new().delete(collection, id)).await
    }

    async fn apply(&self, commit: Commit) -> EngineResult<()> {
        let receipt = self.ctx.store().commit(commit).await?;
        self.ctx.after_commit(&receipt).await;
        Ok(())
    }

    fn report<T>(&self, result: EngineResult<T>, success: &str, failure: &str) -> EngineResult<T> {
        match &result {
            Ok(_) => self.ctx.notify(Severity::Success, success),
            Err(e) => {
                warn!(code = e.code(), error = %e, "{failure}");
                self.ctx.notify(Severity::Error, format!("{failure}: {e}"));
            }
        }
        result
    }
}
