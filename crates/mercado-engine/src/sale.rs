//! # Sale Transaction Processor
//!
//! Turns a [`SaleDraft`] into a stored [`Sale`] as one atomic unit against
//! whichever store backs the session.
//!
//! ## Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate draft (no storage touched)                                    │
//! │  config snapshot ─► CartTotals (total, total_local, tax)                │
//! │                                                                         │
//! │  ┌──────────────────── Transaction (retried on Conflict) ─────────────┐ │
//! │  │  READ   products/<id> for every line ── missing? ─► NotFound        │ │
//! │  │         stock < qty and negative stock off? ─► InsufficientStock   │ │
//! │  │  READ   counters/sales ─► next sale number                          │ │
//! │  │  READ   clients/<id>    (credit only) ── missing? ─► NotFound       │ │
//! │  │  ─────────────────────────────────────────────────────────────────  │ │
//! │  │  WRITE  products/<id>.stock = sub_units(stock, qty)                 │ │
//! │  │  WRITE  sales/<uuid>          (nulls stripped)                      │ │
//! │  │  WRITE  counters/sales.value  += 1                                  │ │
//! │  │  WRITE  clients/<id>.debt     = add(debt, total)   (credit only)    │ │
//! │  │  COMMIT ── every read unchanged? apply all : apply nothing          │ │
//! │  └─────────────────────────────────────────────────────────────────────┘ │
//! │                                                                         │
//! │  notify "Venta V-000042 registrada"  |  notify the failure reason       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Exchange rate and totals are fixed at staging time and never re-derived.

use chrono::Utc;
use mercado_core::decimal;
use mercado_core::validation::validate_sale_draft;
use mercado_core::{AppConfig, CartTotals, Client, CoreError, Product, Sale, SaleDraft};
use mercado_store::{Collection, CommitReceipt, Transaction, SALES_COUNTER_ID};
use mercado_sync::{SessionContext, Severity};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::EngineResult;
use crate::retry::with_conflict_retry;

/// Field of `counters/sales` holding the last issued sequence.
const COUNTER_FIELD: &str = "value";

/// Formats a sale sequence as `V-000042`.
pub fn sale_number(sequence: u64) -> String {
    format!("V-{sequence:06}")
}

/// Credit sale that pushed a client past their limit. Advisory only.
#[derive(Debug, Clone)]
struct OverLimit {
    client: String,
    debt: f64,
    limit: f64,
}

#[derive(Debug)]
struct Staged {
    sale: Sale,
    receipt: CommitReceipt,
    over_limit: Option<OverLimit>,
}

#[derive(Debug, Clone)]
pub struct SaleProcessor {
    ctx: SessionContext,
}

impl SaleProcessor {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    /// Records a sale. On failure nothing is written and the reason is
    /// both returned and notified.
    pub async fn process(&self, draft: SaleDraft) -> EngineResult<Sale> {
        match self.try_process(&draft).await {
            Ok(sale) => {
                self.ctx
                    .notify(Severity::Success, format!("Venta {} registrada", sale.number));
                Ok(sale)
            }
            Err(e) => {
                warn!(code = e.code(), error = %e, "Sale failed");
                self.ctx
                    .notify(Severity::Error, format!("No se pudo registrar la venta: {e}"));
                Err(e)
            }
        }
    }

    async fn try_process(&self, draft: &SaleDraft) -> EngineResult<Sale> {
        validate_sale_draft(draft)?;

        let config = self.ctx.config().await;
        let totals = CartTotals::compute(&draft.items, &config);

        let staged = with_conflict_retry(self.ctx.engine(), "sale", || {
            self.attempt(draft, &config, &totals)
        })
        .await?;

        self.ctx.after_commit(&staged.receipt).await;

        if let Some(over) = &staged.over_limit {
            warn!(client = %over.client, debt = over.debt, limit = over.limit, "Credit limit exceeded");
            self.ctx.notify(
                Severity::Warning,
                format!(
                    "{} supera su limite de credito ({:.2} / {:.2})",
                    over.client, over.debt, over.limit
                ),
            );
        }

        info!(
            sale_id = %staged.sale.id,
            number = %staged.sale.number,
            total = staged.sale.total,
            items = staged.sale.items.len(),
            method = ?staged.sale.payment_method,
            store = %self.ctx.store_kind(),
            "Sale recorded"
        );
        Ok(staged.sale)
    }

    async fn attempt(
        &self,
        draft: &SaleDraft,
        config: &AppConfig,
        totals: &CartTotals,
    ) -> EngineResult<Staged> {
        let mut tx = Transaction::new(self.ctx.store());

        // Lines for the same product are checked against their combined quantity.
        let mut demand: Vec<(&str, i64)> = Vec::new();
        for item in &draft.items {
            match demand.iter_mut().find(|(id, _)| *id == item.product_id) {
                Some((_, qty)) => *qty = decimal::add_units(*qty, item.quantity),
                None => demand.push((item.product_id.as_str(), item.quantity)),
            }
        }

        let mut new_stock = Vec::with_capacity(demand.len());
        for (product_id, quantity) in demand {
            let product: Product = tx
                .get_record(Collection::Products, product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

            if !config.enable_negative_stock && product.stock < quantity {
                return Err(CoreError::InsufficientStock {
                    product: product.name,
                    available: product.stock,
                    requested: quantity,
                }
                .into());
            }
            new_stock.push((product_id.to_string(), decimal::sub_units(product.stock, quantity)));
        }

        let sequence = tx
            .get(Collection::Counters, SALES_COUNTER_ID)
            .await?
            .and_then(|doc| doc.data.get(COUNTER_FIELD).and_then(Value::as_u64))
            .unwrap_or(0)
            + 1;

        let client_id = draft
            .client_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        let debtor: Option<Client> = match (&client_id, draft.payment_method.is_credit()) {
            (Some(id), true) => {
                let mut client: Client = tx
                    .get_record(Collection::Clients, id)
                    .await?
                    .ok_or_else(|| CoreError::ClientNotFound(id.clone()))?;
                client.id = id.clone();
                Some(client)
            }
            (None, true) => return Err(CoreError::CreditRequiresClient.into()),
            _ => None,
        };

        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            number: sale_number(sequence),
            date: Utc::now(),
            total: totals.total,
            total_local: totals.total_local,
            exchange_rate: config.exchange_rate,
            payment_method: draft.payment_method,
            client_id,
            items: draft.items.clone(),
            tax_amount: (totals.tax > 0.0).then_some(totals.tax),
        };

        for (product_id, stock) in new_stock {
            tx.update_field(Collection::Products, product_id, "stock", stock);
        }
        tx.set_record(Collection::Sales, sale.id.clone(), &sale)?;
        tx.set(
            Collection::Counters,
            SALES_COUNTER_ID,
            serde_json::Map::from_iter([(COUNTER_FIELD.to_string(), Value::from(sequence))]),
        );

        let mut over_limit = None;
        if let Some(client) = debtor {
            let debt = decimal::add(client.debt, sale.total);
            if client.credit_limit > 0.0 && debt > client.credit_limit {
                over_limit = Some(OverLimit {
                    client: client.name.clone(),
                    debt,
                    limit: client.credit_limit,
                });
            }
            tx.update_field(Collection::Clients, client.id, "debt", debt);
        }

        let receipt = tx.commit().await?;
        Ok(Staged {
            sale,
            receipt,
            over_limit,
        })
    }
}
