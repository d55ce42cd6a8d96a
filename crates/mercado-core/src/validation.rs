//! # Validation Module
//!
//! Input validation run before any store is touched.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: UI collaborator       basic format checks, instant feedback   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE           business rule validation                │
//! │           │                     (fails with ValidationError/CoreError)  │
//! │           ▼                                                             │
//! │  Layer 3: Conditional commit    stock/debt re-checked against the       │
//! │                                 versions read inside the transaction    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{Product, SaleDraft, WALK_IN_CLIENT_ID};
use crate::{MAX_ITEM_QUANTITY, MAX_NAME_LEN, MAX_SALE_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a required display name (product, client, category).
///
/// ```rust
/// use mercado_core::validation::validate_name;
///
/// assert!(validate_name("name", "Arroz 1kg").is_ok());
/// assert!(validate_name("name", "   ").is_err());
/// ```
pub fn validate_name(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if value.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }
    Ok(())
}

/// Validates a sale or adjustment quantity.
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    if quantity > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a price, debt or limit: finite and `>= 0`.
pub fn validate_amount(field: &str, amount: f64) -> ValidationResult<()> {
    if !amount.is_finite() {
        return Err(ValidationError::NotFinite {
            field: field.to_string(),
        });
    }
    if amount < 0.0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a payment amount: finite and `> 0`.
pub fn validate_payment_amount(amount: f64) -> ValidationResult<()> {
    validate_amount("amount", amount)?;
    if amount == 0.0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    Ok(())
}

/// Validates a product before it is created or edited.
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    validate_name("name", &product.name)?;
    validate_amount("sale_price", product.sale_price)?;
    validate_amount("cost_price", product.cost_price)?;
    if product.min_stock < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "min_stock".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Sale Validators
// =============================================================================

/// Rejects a sale draft before it reaches the transaction.
///
/// ## Rules
/// - at least one line item, at most [`MAX_SALE_ITEMS`]
/// - every quantity positive and bounded
/// - every snapshot price finite and non-negative
/// - credit sales carry a registered (non walk-in) client
pub fn validate_sale_draft(draft: &SaleDraft) -> CoreResult<()> {
    if draft.items.is_empty() {
        return Err(CoreError::EmptySale);
    }
    if draft.items.len() > MAX_SALE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_SALE_ITEMS as i64,
        }
        .into());
    }
    for item in &draft.items {
        if item.product_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "product_id".to_string(),
            }
            .into());
        }
        validate_quantity(item.quantity)?;
        validate_amount("sale_price", item.sale_price)?;
        validate_amount("cost_price", item.cost_price)?;
    }
    if draft.payment_method.is_credit() {
        match draft.client_id.as_deref().map(str::trim) {
            None | Some("") | Some(WALK_IN_CLIENT_ID) => {
                return Err(CoreError::CreditRequiresClient)
            }
            Some(_) => {}
        }
    }
    Ok(())
}
