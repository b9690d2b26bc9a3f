//! Cart Model
//!
//! The cart is the storefront's staging area; order creation reads it,
//! converts its lines, and clears it once the order is durable.

use serde::{Deserialize, Serialize};

/// Cart entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Cart {
    pub id: i64,
    pub customer_id: i64,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Cart line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct CartItem {
    pub id: i64,
    pub cart_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub created_at: i64,
}
