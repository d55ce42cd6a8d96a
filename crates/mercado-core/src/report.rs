//! Cash-box and dashboard aggregates.
//!
//! Every sum here runs through [`crate::decimal`]; these loops cover whole
//! days of sales and are where float drift would show first.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::line_cost;
use crate::decimal;
use crate::types::{AppConfig, Client, Expense, PaymentMethod, Product, ProductStatus, Sale};

/// Sales total for one payment method.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MethodTotal {
    pub method: PaymentMethod,
    pub count: usize,
    pub total: f64,
}

/// Summary of one business day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashboxSummary {
    #[ts(as = "String")]
    pub day: NaiveDate,
    pub sales_count: usize,
    /// Hard-currency sales total.
    pub total: f64,
    /// Local-currency total, at each sale's own snapshotted rate.
    pub total_local: f64,
    /// Only methods with at least one sale, in [`PaymentMethod::ALL`] order.
    pub by_method: Vec<MethodTotal>,
    pub expenses_total: f64,
    /// `total - expenses_total`
    pub net: f64,
    /// `total - Σ cost × quantity`
    pub profit: f64,
}

impl CashboxSummary {
    /// Aggregates the sales and expenses dated on `day` (UTC).
    pub fn for_day(day: NaiveDate, sales: &[Sale], expenses: &[Expense]) -> Self {
        let todays: Vec<&Sale> = sales.iter().filter(|s| s.date.date_naive() == day).collect();

        let total = decimal::sum(todays.iter().map(|s| s.total));
        let total_local = decimal::sum(todays.iter().map(|s| s.total_local));
        let cost = decimal::sum(
            todays
                .iter()
                .flat_map(|s| s.items.iter())
                .map(line_cost),
        );

        let by_method = PaymentMethod::ALL
            .iter()
            .filter_map(|method| {
                let matching: Vec<&&Sale> =
                    todays.iter().filter(|s| s.payment_method == *method).collect();
                if matching.is_empty() {
                    return None;
                }
                Some(MethodTotal {
                    method: *method,
                    count: matching.len(),
                    total: decimal::sum(matching.iter().map(|s| s.total)),
                })
            })
            .collect();

        let expenses_total = decimal::sum(
            expenses
                .iter()
                .filter(|e| e.date.date_naive() == day)
                .map(|e| e.amount),
        );

        Self {
            day,
            sales_count: todays.len(),
            total,
            total_local,
            by_method,
            expenses_total,
            net: decimal::sub(total, expenses_total),
            profit: decimal::sub(total, cost),
        }
    }
}

/// Total debt owed by registered clients. The walk-in client is excluded.
pub fn outstanding_debt(clients: &[Client]) -> f64 {
    decimal::sum(
        clients
            .iter()
            .filter(|c| !c.is_walk_in())
            .map(|c| c.debt),
    )
}

/// Clients whose debt is over their configured limit.
pub fn over_credit_limit(clients: &[Client]) -> Vec<&Client> {
    clients
        .iter()
        .filter(|c| !c.is_walk_in() && c.credit_limit > 0.0 && c.debt > c.credit_limit)
        .collect()
}

/// Active products at or below their reorder point.
///
/// A product with `min_stock == 0` falls back to the store-wide threshold.
pub fn low_stock<'a>(products: &'a [Product], config: &AppConfig) -> Vec<&'a Product> {
    products
        .iter()
        .filter(|p| p.status == ProductStatus::Active)
        .filter(|p| {
            let threshold = if p.min_stock > 0 {
                p.min_stock
            } else {
                config.low_stock_threshold
            };
            p.stock <= threshold
        })
        .collect()
}

/// Inventory value at cost.
pub fn inventory_value(products: &[Product]) -> f64 {
    decimal::sum(
        products
            .iter()
            .filter(|p| p.stock > 0)
            .map(|p| decimal::mul(p.cost_price, p.stock as f64)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExpensePaymentMethod, LineItem, WALK_IN_CLIENT_ID};
    use chrono::{TimeZone, Utc};

    fn sale(day: u32, total: f64, method: PaymentMethod) -> Sale {
        Sale {
            id: format!("s-{day}-{total}"),
            number: "V-000001".into(),
            date: Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap(),
            total,
            total_local: decimal::mul(total, 40.0),
            exchange_rate: 40.0,
            payment_method: method,
            client_id: None,
            items: vec![LineItem {
                product_id: "p".into(),
                name: "P".into(),
                quantity: 2,
                sale_price: decimal::div(total, 2.0),
                cost_price: 0.1,
                unit: "und".into(),
            }],
            tax_amount: None,
        }
    }

    #[test]
    fn test_cashbox_summary() {
        let sales = vec![
            sale(1, 0.1, PaymentMethod::CashUsd),
            sale(1, 0.2, PaymentMethod::CashUsd),
            sale(1, 5.0, PaymentMethod::Card),
            sale(2, 100.0, PaymentMethod::Card),
        ];
        let expenses = vec![Expense {
            id: "e1".into(),
            description: "Hielo".into(),
            amount: 1.1,
            category: String::new(),
            date: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
            payment_method: ExpensePaymentMethod::CashUsd,
        }];
        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let summary = CashboxSummary::for_day(day, &sales, &expenses);

        assert_eq!(summary.sales_count, 3);
        assert_eq!(summary.total, 5.3);
        assert_eq!(summary.net, 4.2);
        assert_eq!(summary.profit, 4.7);
        assert_eq!(summary.by_method.len(), 2);
        assert_eq!(summary.by_method[0].method, PaymentMethod::CashUsd);
        assert_eq!(summary.by_method[0].total, 0.3);
    }

    #[test]
    fn test_outstanding_debt_excludes_walk_in() {
        let clients = vec![
            Client {
                id: WALK_IN_CLIENT_ID.into(),
                debt: 99.0,
                ..Client::default()
            },
            Client {
                id: "c1".into(),
                debt: 10.1,
                credit_limit: 10.0,
                ..Client::default()
            },
            Client {
                id: "c2".into(),
                debt: 0.2,
                ..Client::default()
            },
        ];
        assert_eq!(outstanding_debt(&clients), 10.3);
        assert_eq!(over_credit_limit(&clients).len(), 1);
    }

    #[test]
    fn test_low_stock() {
        let products = vec![
            Product {
                id: "a".into(),
                stock: 5,
                ..Product::default()
            },
            Product {
                id: "b".into(),
                stock: 6,
                ..Product::default()
            },
            Product {
                id: "c".into(),
                stock: 0,
                status: ProductStatus::Inactive,
                ..Product::default()
            },
        ];
        let low = low_stock(&products, &AppConfig::default());
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].id, "a");
        assert_eq!(inventory_value(&products), 0.0);
    }
}
