//! # Cart & Totals
//!
//! The register's working cart and the totals derived from it.
//!
//! ## Totals Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  line_total  = mul(sale_price, quantity)          per line              │
//! │  subtotal    = Σ line_total                                             │
//! │  tax         = percent(subtotal, tax_rate)        only if tax_rate > 0  │
//! │  total       = add(subtotal, tax)                 hard currency         │
//! │  total_local = mul(total, exchange_rate)          snapshotted on sale   │
//! │  total_cop   = mul(total, cop_exchange_rate)      display only          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The same [`CartTotals::compute`] runs on the register for display and
//! inside the sale transaction, so the stored totals always derive from the
//! stored line items.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::decimal;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{AppConfig, LineItem, PaymentMethod, Product, SaleDraft};
use crate::validation::validate_quantity;
use crate::{MAX_ITEM_QUANTITY, MAX_SALE_ITEMS};

// =============================================================================
// Totals
// =============================================================================

/// Monetary totals of a cart or sale.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartTotals {
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
    pub total_local: f64,
    pub total_cop: f64,
}

impl CartTotals {
    /// Computes totals for `items` under the current config.
    pub fn compute(items: &[LineItem], config: &AppConfig) -> Self {
        let subtotal = items.iter().fold(0.0, |acc, item| {
            decimal::add(acc, line_total(item))
        });
        let tax = if config.tax_rate > 0.0 {
            decimal::percent(subtotal, config.tax_rate)
        } else {
            0.0
        };
        let total = decimal::add(subtotal, tax);
        Self {
            subtotal,
            tax,
            total,
            total_local: decimal::mul(total, config.exchange_rate),
            total_cop: decimal::mul(total, config.cop_exchange_rate),
        }
    }

    /// Change owed for an amount tendered in hard currency.
    pub fn change(&self, paid: f64) -> f64 {
        change(paid, self.total)
    }

    /// Change owed for an amount tendered in local currency.
    pub fn change_local(&self, paid: f64) -> f64 {
        change(paid, self.total_local)
    }

    /// Change owed for an amount tendered in COP.
    pub fn change_cop(&self, paid: f64) -> f64 {
        change(paid, self.total_cop)
    }
}

/// `sale_price × quantity` for one line.
#[inline]
pub fn line_total(item: &LineItem) -> f64 {
    decimal::mul(item.sale_price, item.quantity as f64)
}

/// `cost_price × quantity` for one line.
#[inline]
pub fn line_cost(item: &LineItem) -> f64 {
    decimal::mul(item.cost_price, item.quantity as f64)
}

/// `max(0, paid - due)`. Short payments owe no change.
pub fn change(paid: f64, due: f64) -> f64 {
    decimal::sub(paid, due).max(0.0)
}

// =============================================================================
// Cart
// =============================================================================

/// The cart being built at the register.
///
/// ## Invariants
/// - Items are unique by `product_id` (adding the same product increases quantity)
/// - Quantity is always > 0 (setting it to 0 removes the line)
/// - At most [`MAX_SALE_ITEMS`] lines, each at most [`MAX_ITEM_QUANTITY`] units
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<LineItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a product or increases its quantity.
    ///
    /// Prices are frozen when the product is first added.
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;

        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            let new_qty = decimal::add_units(item.quantity, quantity);
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(ValidationError::OutOfRange {
                    field: "quantity".to_string(),
                    min: 1,
                    max: MAX_ITEM_QUANTITY,
                }
                .into());
            }
            item.quantity = new_qty;
            return Ok(());
        }

        if self.items.len() >= MAX_SALE_ITEMS {
            return Err(ValidationError::OutOfRange {
                field: "items".to_string(),
                min: 1,
                max: MAX_SALE_ITEMS as i64,
            }
            .into());
        }

        self.items.push(LineItem::snapshot(product, quantity));
        Ok(())
    }

    /// Sets a line's quantity. Zero removes the line.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_item(product_id);
        }
        validate_quantity(quantity)?;

        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(item) => {
                item.quantity = quantity;
                Ok(())
            }
            None => Err(CoreError::ProductNotFound(product_id.to_string())),
        }
    }

    pub fn remove_item(&mut self, product_id: &str) -> CoreResult<()> {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before {
            return Err(CoreError::ProductNotFound(product_id.to_string()));
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn totals(&self, config: &AppConfig) -> CartTotals {
        CartTotals::compute(&self.items, config)
    }

    /// Turns the cart into a sale draft, emptying it.
    pub fn checkout(&mut self, payment_method: PaymentMethod, client_id: Option<String>) -> SaleDraft {
        SaleDraft {
            items: std::mem::take(&mut self.items),
            payment_method,
            client_id,
        }
    }
}
