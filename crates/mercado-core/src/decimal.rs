//! # Exact Decimal Arithmetic
//!
//! Every combination of two monetary or quantity values in Mercado goes
//! through this module. Inputs and outputs are plain `f64` (that is what the
//! stored documents and the UI carry), but the arithmetic itself happens in
//! [`rust_decimal::Decimal`] with 28 significant digits.
//!
//! ## Why Not Plain Floats?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  f64:      0.1 + 0.2            = 0.30000000000000004   ❌              │
//! │  decimal:  add(0.1, 0.2)        = 0.3                   ✅              │
//! │                                                                         │
//! │  f64:      Σ 0.01 (x 10_000)    = 100.00000000000425    ❌              │
//! │  decimal:  Σ 0.01 (x 10_000)    = 100                   ✅              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Flow of a Single Operation
//! ```text
//!   f64 ──► Decimal::from_f64 ──► exact op ──► Decimal::to_f64 ──► f64
//!            (NaN/∞ → 0)                        (nearest f64)
//! ```
//!
//! ## Non-Throwing Policy
//! None of these functions fail. Division by zero yields `0`, non-finite
//! inputs are read as `0`, and an overflow past the decimal range yields
//! `0`. Aggregation loops over thousands of sales must never abort halfway.
//!
//! ## Example
//! ```rust
//! use mercado_core::decimal;
//!
//! let subtotal = decimal::mul(1.20, 3.0);
//! let tax = decimal::percent(subtotal, 16.0);
//! let total = decimal::round(decimal::add(subtotal, tax));
//! assert_eq!(total, 4.18);
//! ```

use rust_decimal::prelude::*;

/// Decimal places used by [`round`].
pub const DECIMAL_PLACES: u32 = 2;

// =============================================================================
// Conversions
// =============================================================================

/// Converts an `f64` into a `Decimal`.
///
/// NaN and infinities become zero.
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Converts a `Decimal` back into the nearest `f64`.
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value.normalize().to_f64().unwrap_or_default()
}

// =============================================================================
// Operations
// =============================================================================

/// `a + b`
pub fn add(a: f64, b: f64) -> f64 {
    to_f64(
        to_decimal(a)
            .checked_add(to_decimal(b))
            .unwrap_or_default(),
    )
}

/// `a - b`
pub fn sub(a: f64, b: f64) -> f64 {
    to_f64(
        to_decimal(a)
            .checked_sub(to_decimal(b))
            .unwrap_or_default(),
    )
}

/// `a × b`
pub fn mul(a: f64, b: f64) -> f64 {
    to_f64(
        to_decimal(a)
            .checked_mul(to_decimal(b))
            .unwrap_or_default(),
    )
}

/// `a ÷ b`, or `0` when `b` is zero.
pub fn div(a: f64, b: f64) -> f64 {
    let divisor = to_decimal(b);
    if divisor.is_zero() {
        return 0.0;
    }
    to_f64(to_decimal(a).checked_div(divisor).unwrap_or_default())
}

/// `amount × pct / 100`
///
/// ```rust
/// use mercado_core::decimal::percent;
/// assert_eq!(percent(200.0, 16.0), 32.0);
/// ```
pub fn percent(amount: f64, pct: f64) -> f64 {
    let product = to_decimal(amount)
        .checked_mul(to_decimal(pct))
        .unwrap_or_default();
    to_f64(
        product
            .checked_div(Decimal::ONE_HUNDRED)
            .unwrap_or_default(),
    )
}

/// Rounds to two decimal places, midpoint away from zero (half-up).
///
/// ```rust
/// use mercado_core::decimal::round;
/// assert_eq!(round(0.125), 0.13);
/// assert_eq!(round(-0.125), -0.13);
/// ```
pub fn round(value: f64) -> f64 {
    to_f64(
        to_decimal(value)
            .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero),
    )
}

/// Sums any number of values without intermediate float conversion.
pub fn sum<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let total = values
        .into_iter()
        .map(to_decimal)
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
        .unwrap_or_default();
    to_f64(total)
}

/// Integer quantity subtraction (stock levels).
///
/// Stock counts never leave the integer domain, but they still go through
/// the decimal type so that no stock path uses native arithmetic.
pub fn sub_units(a: i64, b: i64) -> i64 {
    Decimal::from(a)
        .checked_sub(Decimal::from(b))
        .and_then(|d| d.to_i64())
        .unwrap_or_default()
}

/// Integer quantity addition (manual stock corrections).
pub fn add_units(a: i64, b: i64) -> i64 {
    Decimal::from(a)
        .checked_add(Decimal::from(b))
        .and_then(|d| d.to_i64())
        .unwrap_or_default()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_has_no_float_drift() {
        assert_eq!(add(0.1, 0.2), 0.3);
        assert_eq!(add(25.50, 10.00), 35.5);
    }

    #[test]
    fn test_sub() {
        assert_eq!(sub(0.3, 0.1), 0.2);
        assert_eq!(sub(10.0, 25.5), -15.5);
    }

    #[test]
    fn test_mul() {
        assert_eq!(mul(1.1, 3.0), 3.3);
        assert_eq!(mul(19.99, 45.0), 899.55);
    }

    #[test]
    fn test_div_by_zero_is_zero() {
        assert_eq!(div(10.0, 0.0), 0.0);
        assert_eq!(div(10.0, 4.0), 2.5);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(100.0, 16.0), 16.0);
        assert_eq!(percent(12.5, 8.0), 1.0);
        assert_eq!(percent(0.0, 16.0), 0.0);
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round(0.125), 0.13);
        assert_eq!(round(1.004), 1.0);
        assert_eq!(round(2.5), 2.5);
        assert_eq!(round(div(10.0, 3.0)), 3.33);
    }

    #[test]
    fn test_non_finite_inputs_read_as_zero() {
        assert_eq!(add(f64::NAN, 1.0), 1.0);
        assert_eq!(mul(f64::INFINITY, 2.0), 0.0);
    }

    #[test]
    fn test_accumulation_precision() {
        let mut total = 0.0;
        for _ in 0..10_000 {
            total = add(total, 0.01);
        }
        assert_eq!(total, 100.0);
    }

    #[test]
    fn test_many_small_items() {
        let prices = [0.10, 0.20, 0.30, 0.15, 0.05, 1.99, 2.01];
        let mut total = 0.0;
        for _ in 0..1_000 {
            for p in prices {
                total = add(total, mul(p, 3.0));
            }
        }
        assert_eq!(total, 14_400.0);
        assert_eq!(sum(prices.iter().copied()), 4.8);
    }

    #[test]
    fn test_mixed_sequence_matches_exact_result() {
        // 19.99 * 3 - 5.97 + 0.01 = 54.01
        let v = add(sub(mul(19.99, 3.0), 5.97), 0.01);
        assert_eq!(round(v), 54.01);
    }

    #[test]
    fn test_unit_arithmetic() {
        assert_eq!(sub_units(10, 10), 0);
        assert_eq!(sub_units(0, 1), -1);
        assert_eq!(add_units(-3, 5), 2);
    }
}
