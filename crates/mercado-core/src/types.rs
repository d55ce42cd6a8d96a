//! # Domain Types
//!
//! Core domain types used throughout Mercado POS.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │     Client      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  code (business)│   │  number V-000001│   │  debt           │       │
//! │  │  stock (i64)    │   │  items snapshot │   │  credit_limit   │       │
//! │  │  sale_price     │   │  exchange_rate  │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Category     │   │    AppConfig    │   │  ClientPayment  │       │
//! │  │  name, color    │   │  singleton      │   │  history entry  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Schema Drift
//! Stored records are JSON documents written by older versions of the app.
//! Every record type carries `#[serde(default)]`, so a field added after a
//! record was saved deserializes to its default instead of failing.
//!
//! ## Money
//! Monetary fields are `f64` on the wire. They are never combined with
//! native operators; see [`crate::decimal`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Fixed id of the walk-in ("general") client.
///
/// Represents unregistered buyers. Cannot be deleted and is excluded from
/// debt reporting.
pub const WALK_IN_CLIENT_ID: &str = "general";

/// Default reorder threshold for new products.
pub const DEFAULT_MIN_STOCK: i64 = 5;

/// Default display unit for new products.
pub const DEFAULT_UNIT: &str = "und";

// =============================================================================
// Product
// =============================================================================

/// Whether a product is offered at the register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
}

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display/business identifier (barcode, SKU). Unique by convention.
    pub code: String,

    pub name: String,

    /// Category reference. Empty when uncategorised.
    pub category_id: String,

    pub cost_price: f64,
    pub sale_price: f64,

    /// Units on hand. Negative only when negative stock is enabled.
    pub stock: i64,

    /// Reorder threshold.
    pub min_stock: i64,

    pub unit: String,
    pub status: ProductStatus,
}

impl Default for Product {
    fn default() -> Self {
        Self {
            id: String::new(),
            code: String::new(),
            name: String::new(),
            category_id: String::new(),
            cost_price: 0.0,
            sale_price: 0.0,
            stock: 0,
            min_stock: DEFAULT_MIN_STOCK,
            unit: DEFAULT_UNIT.to_string(),
            status: ProductStatus::Active,
        }
    }
}

impl Product {
    /// True when stock is at or below the reorder threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }
}

// =============================================================================
// Category
// =============================================================================

/// A product category. Names are unique case-insensitively by convention only.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Display colour, `#rrggbb`.
    pub color: String,
}

// =============================================================================
// Client
// =============================================================================

/// A customer who may buy on credit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub identity_card: String,
    pub phone: String,
    /// Outstanding balance. Never negative.
    pub debt: f64,
    /// Advisory ceiling for `debt`. Zero means no limit is configured.
    pub credit_limit: f64,
}

impl Client {
    /// The sentinel record for unregistered buyers.
    pub fn walk_in() -> Self {
        Self {
            id: WALK_IN_CLIENT_ID.to_string(),
            name: "Cliente General".to_string(),
            ..Self::default()
        }
    }

    #[inline]
    pub fn is_walk_in(&self) -> bool {
        self.id == WALK_IN_CLIENT_ID
    }
}

/// Immutable record of a debt payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClientPayment {
    pub id: String,
    pub client_id: String,
    pub amount: f64,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub old_debt: f64,
    pub new_debt: f64,
}

// =============================================================================
// Supplier & Expense
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub contact: String,
    pub phone: String,
    pub email: String,
    pub address: String,
}

/// How an expense was paid out of the cash box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ExpensePaymentMethod {
    CashBs,
    #[default]
    CashUsd,
    CashCop,
    Transfer,
    MobilePay,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub amount: f64,
    #[serde(default)]
    pub category: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub payment_method: ExpensePaymentMethod,
}

// =============================================================================
// Sale
// =============================================================================

/// Tender used for a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CashUsd,
    CashBs,
    CashCop,
    MobilePay,
    Transfer,
    Card,
    /// Deferred payment, added to the client's debt.
    Credit,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 7] = [
        PaymentMethod::CashUsd,
        PaymentMethod::CashBs,
        PaymentMethod::CashCop,
        PaymentMethod::MobilePay,
        PaymentMethod::Transfer,
        PaymentMethod::Card,
        PaymentMethod::Credit,
    ];

    #[inline]
    pub fn is_credit(&self) -> bool {
        matches!(self, PaymentMethod::Credit)
    }
}

/// A line of a sale.
///
/// Snapshot pattern: product name, prices and unit are frozen at the moment
/// of sale. Editing the product later does not rewrite history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub sale_price: f64,
    pub cost_price: f64,
    pub unit: String,
}

impl LineItem {
    /// Captures a product at its current prices.
    pub fn snapshot(product: &Product, quantity: i64) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            quantity,
            sale_price: product.sale_price,
            cost_price: product.cost_price,
            unit: product.unit.clone(),
        }
    }
}

/// A recorded sale. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// Human-readable sequence number, `V-000042`.
    pub number: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    /// Total in hard currency.
    pub total: f64,
    /// `total × exchange_rate`, frozen at sale time.
    pub total_local: f64,
    /// Exchange rate snapshot.
    pub exchange_rate: f64,
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub items: Vec<LineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_amount: Option<f64>,
}

/// An unsaved sale as submitted by the register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDraft {
    pub items: Vec<LineItem>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub client_id: Option<String>,
}

impl SaleDraft {
    pub fn new(items: Vec<LineItem>, payment_method: PaymentMethod) -> Self {
        Self {
            items,
            payment_method,
            client_id: None,
        }
    }

    pub fn with_client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }
}

// =============================================================================
// Roles & Permissions
// =============================================================================

/// Role supplied by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Employee,
}

/// Gated capabilities for the employee role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ViewCosts,
    EditProducts,
    ViewDashboardStats,
    ManageClients,
    AccessCashbox,
    DeleteItems,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Capability::ViewCosts => "view_costs",
            Capability::EditProducts => "edit_products",
            Capability::ViewDashboardStats => "view_dashboard_stats",
            Capability::ManageClients => "manage_clients",
            Capability::AccessCashbox => "access_cashbox",
            Capability::DeleteItems => "delete_items",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct Permissions {
    pub can_view_costs: bool,
    pub can_edit_products: bool,
    pub can_view_dashboard_stats: bool,
    pub can_manage_clients: bool,
    pub can_access_cashbox: bool,
    pub can_delete_items: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            can_view_costs: false,
            can_edit_products: false,
            can_view_dashboard_stats: false,
            can_manage_clients: true,
            can_access_cashbox: true,
            can_delete_items: false,
        }
    }
}

impl Permissions {
    /// Owners can do everything; employees only what is switched on.
    pub fn allows(&self, role: Role, capability: Capability) -> bool {
        if role == Role::Owner {
            return true;
        }
        match capability {
            Capability::ViewCosts => self.can_view_costs,
            Capability::EditProducts => self.can_edit_products,
            Capability::ViewDashboardStats => self.can_view_dashboard_stats,
            Capability::ManageClients => self.can_manage_clients,
            Capability::AccessCashbox => self.can_access_cashbox,
            Capability::DeleteItems => self.can_delete_items,
        }
    }
}

// =============================================================================
// App Config
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum PaperSize {
    #[default]
    #[serde(rename = "58mm")]
    Mm58,
    #[serde(rename = "80mm")]
    Mm80,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct ReceiptConfig {
    pub header_text: String,
    pub footer_text: String,
    pub paper_size: PaperSize,
    pub show_tax: bool,
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            header_text: "Gracias por su compra".to_string(),
            footer_text: String::new(),
            paper_size: PaperSize::Mm58,
            show_tax: false,
        }
    }
}

/// Store-wide business settings. A singleton document.
///
/// Saved wholesale; read by merging the stored fields over
/// [`AppConfig::default`] (see [`crate::document::merge_over_defaults`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct AppConfig {
    pub business_name: String,
    pub address: String,
    /// Local currency units per hard-currency unit.
    pub exchange_rate: f64,
    /// Secondary (COP) units per hard-currency unit.
    pub cop_exchange_rate: f64,
    pub currency_code: String,
    pub currency_symbol: String,
    pub theme: Theme,
    pub show_cop: bool,
    /// Percentage, e.g. `16.0`.
    pub tax_rate: f64,
    pub enable_negative_stock: bool,
    pub low_stock_threshold: i64,
    pub permissions: Permissions,
    pub receipt: ReceiptConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            business_name: "Mi Negocio".to_string(),
            address: String::new(),
            exchange_rate: 45.0,
            cop_exchange_rate: 4200.0,
            currency_code: "USD".to_string(),
            currency_symbol: "$".to_string(),
            theme: Theme::Light,
            show_cop: false,
            tax_rate: 0.0,
            enable_negative_stock: true,
            low_stock_threshold: 5,
            permissions: Permissions::default(),
            receipt: ReceiptConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_defaults_fill_missing_fields() {
        let p: Product =
            serde_json::from_str(r#"{"id":"p1","name":"Arroz","sale_price":1.2}"#).unwrap();
        assert_eq!(p.min_stock, DEFAULT_MIN_STOCK);
        assert_eq!(p.unit, "und");
        assert_eq!(p.status, ProductStatus::Active);
    }

    #[test]
    fn test_sale_omits_absent_optionals() {
        let sale = Sale {
            id: "s1".into(),
            number: "V-000001".into(),
            date: Utc::now(),
            total: 1.0,
            total_local: 45.0,
            exchange_rate: 45.0,
            payment_method: PaymentMethod::CashUsd,
            client_id: None,
            items: vec![],
            tax_amount: None,
        };
        let json = serde_json::to_value(&sale).unwrap();
        assert!(json.get("client_id").is_none());
        assert!(json.get("tax_amount").is_none());
        assert_eq!(json["payment_method"], "cash_usd");
    }

    #[test]
    fn test_permissions() {
        let perms = Permissions::default();
        assert!(perms.allows(Role::Owner, Capability::ViewCosts));
        assert!(!perms.allows(Role::Employee, Capability::ViewCosts));
        assert!(perms.allows(Role::Employee, Capability::AccessCashbox));
    }

    #[test]
    fn test_paper_size_wire_format() {
        assert_eq!(serde_json::to_string(&PaperSize::Mm80).unwrap(), "\"80mm\"");
    }

    #[test]
    fn test_walk_in_client() {
        assert!(Client::walk_in().is_walk_in());
        assert!(!Client::default().is_walk_in());
    }
}
