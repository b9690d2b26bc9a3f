//! Money calculation utilities using rust_decimal for precision
//!
//! All calculations are done using `Decimal` internally, then converted to
//! `f64` for storage/serialization.

use rust_decimal::prelude::*;
use shared::error::AppError;
use shared::models::{OrderItemInput, Product};


/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed price per item
const MAX_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per line
const MAX_QUANTITY: i64 = 9999;

/// Convert f64 to Decimal for calculation
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_else(|| {
        tracing::error!(value = ?value, "Non-finite f64 in monetary calculation, defaulting to zero");
        Decimal::ZERO
    })
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .expect("Decimal rounded to 2dp is always representable as f64")
}

/// Round a Decimal to monetary precision
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Validate an order line before pricing
pub fn validate_line(input: &OrderItemInput, product: &Product) -> Result<(), AppError> {
    if input.quantity <= 0 {
        return Err(AppError::validation(format!(
            "quantity must be positive, got {}",
            input.quantity
        )));
    }
    if input.quantity > MAX_QUANTITY {
        return Err(AppError::validation(format!(
            "quantity exceeds maximum allowed ({}), got {}",
            MAX_QUANTITY, input.quantity
        )));
    }
    let price = product.effective_price();
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::validation(format!(
            "product {} has invalid price {}",
            product.id, price
        )));
    }
    if price > MAX_PRICE {
        return Err(AppError::validation(format!(
            "price exceeds maximum allowed ({}), got {}",
            MAX_PRICE, price
        )));
    }
    Ok(())
}

/// Line total: effective unit price x quantity
pub fn line_total(unit_price: f64, quantity: i64) -> Decimal {
    round_money(to_decimal(unit_price) * Decimal::from(quantity))
}

/// Order totals computed from line totals and the configured flat tax rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderTotals {
    pub subtotal: f64,
    pub tax: f64,
    pub discount: f64,
    pub total: f64,
}

/// Sum line totals, apply the flat tax rate, and produce storable totals.
///
/// total = subtotal + tax - discount; all fields non-negative.
pub fn order_totals(line_totals: &[Decimal], tax_rate: f64, discount: Decimal) -> OrderTotals {
    let subtotal: Decimal = line_totals.iter().copied().sum();
    let tax = round_money(subtotal * to_decimal(tax_rate));
    let discount = round_money(discount.max(Decimal::ZERO));
    let total = (subtotal + tax - discount).max(Decimal::ZERO);
    OrderTotals {
        subtotal: to_f64(subtotal),
        tax: to_f64(tax),
        discount: to_f64(discount),
        total: to_f64(total),
    }
}
