//! Money calculation utilities using rust_decimal for precision
//!
//! Prices travel as `f64` on the wire. Sums are computed with `Decimal`
//! and converted back, rounded half-up to 2 decimal places.

use super::types::OrderItem;
use rust_decimal::prelude::*;

const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed price per item
pub const MAX_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per item
pub const MAX_QUANTITY: u32 = 9999;

#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// price × quantity
pub fn line_total(item: &OrderItem) -> Decimal {
    to_decimal(item.price) * Decimal::from(item.quantity)
}

/// Σ price × quantity over all items
pub fn compute_total(items: &[OrderItem]) -> f64 {
    to_f64(items.iter().map(line_total).sum())
}

/// Round a caller-supplied amount to money precision
pub fn normalize(amount: f64) -> f64 {
    to_f64(to_decimal(amount))
}
