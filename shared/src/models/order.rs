//! Order Model
//!
//! Orders carry three independent status axes (order / payment /
//! fulfillment). The order axis follows a fixed transition table; the
//! combination of axes is cross-validated on every mutation.

use serde::{Deserialize, Serialize};

/// Order status axis
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// Transition table. Cancelled and Refunded are terminal.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Cancelled)
                | (Processing, Completed)
                | (Processing, Cancelled)
                | (Completed, Refunded)
        )
    }

    /// No transitions leave a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Refunded)
    }
}

/// Payment status axis of an order
///
/// Distinct from [`super::payment::PaymentStatus`], which tracks a single
/// payment attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum OrderPaymentStatus {
    #[default]
    Pending,
    Authorized,
    Paid,
    PartiallyRefunded,
    FullyRefunded,
    Failed,
}

/// Fulfillment status axis of an order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum FulfillmentStatus {
    #[default]
    Unfulfilled,
    PartiallyFulfilled,
    Fulfilled,
    Delivered,
}

/// Cross-axis invariant check, run on every order mutation.
///
/// The table governs the order axis; this guards combinations the table
/// alone cannot see.
pub fn validate_status_axes(
    status: OrderStatus,
    payment: OrderPaymentStatus,
    fulfillment: FulfillmentStatus,
) -> Result<(), String> {
    if status == OrderStatus::Completed && payment != OrderPaymentStatus::Paid {
        return Err("a completed order must be fully paid".to_string());
    }
    if matches!(
        fulfillment,
        FulfillmentStatus::Fulfilled | FulfillmentStatus::Delivered
    ) && !matches!(
        payment,
        OrderPaymentStatus::Paid
            | OrderPaymentStatus::PartiallyRefunded
            | OrderPaymentStatus::FullyRefunded
    ) {
        return Err("fulfillment cannot outrun payment".to_string());
    }
    if status == OrderStatus::Refunded
        && !matches!(
            payment,
            OrderPaymentStatus::Paid
                | OrderPaymentStatus::PartiallyRefunded
                | OrderPaymentStatus::FullyRefunded
        )
    {
        return Err("a refunded order must have been paid".to_string());
    }
    Ok(())
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    /// Human-readable unique number (`ORD-YYYYMMDD-XXXXXX`)
    pub order_number: String,
    pub customer_id: Option<i64>,
    /// Contact snapshot, immune to later customer edits
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    /// Money in currency unit; total = subtotal + tax - discount
    pub subtotal: f64,
    pub tax: f64,
    pub discount: f64,
    pub total: f64,
    pub status: OrderStatus,
    pub payment_status: OrderPaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub paid_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub cancelled_at: Option<i64>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Order line with its price snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    /// Product name at order time
    pub product_name: String,
    pub quantity: i64,
    /// Unit price at order time
    pub unit_price: f64,
    /// Discounted unit price at order time (when the product carried one)
    pub discount_price: Option<f64>,
    /// (discount_price ?? unit_price) * quantity
    pub line_total: f64,
    /// Mirrors the digital access counter for digital lines
    pub downloads_used: i64,
    pub last_downloaded_at: Option<i64>,
    pub created_at: i64,
}

/// One requested line in an order-creation call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemInput {
    pub product_id: i64,
    pub quantity: i64,
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub customer_id: Option<i64>,
    /// Explicit contact fields win over the customer profile
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub items: Vec<OrderItemInput>,
    /// When set (and not Manual), an initial Pending payment is created
    pub payment_method: Option<super::payment::PaymentMethod>,
}

/// Update status payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

/// Order with its lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table_allows_documented_edges() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Cancelled));
        assert!(Completed.can_transition_to(Refunded));
    }

    #[test]
    fn test_transition_table_rejects_everything_else() {
        use OrderStatus::*;
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Refunded));
        assert!(!Processing.can_transition_to(Pending));
        assert!(!Processing.can_transition_to(Refunded));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Pending));
        // Terminal states go nowhere
        for next in [Pending, Processing, Completed, Cancelled, Refunded] {
            assert!(!Cancelled.can_transition_to(next));
            assert!(!Refunded.can_transition_to(next));
        }
    }

    #[test]
    fn test_no_self_transitions() {
        use OrderStatus::*;
        for s in [Pending, Processing, Completed, Cancelled, Refunded] {
            assert!(!s.can_transition_to(s));
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Refunded.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
        assert!(!OrderStatus::Completed.is_terminal());
    }

    #[test]
    fn test_axes_completed_requires_paid() {
        assert!(validate_status_axes(
            OrderStatus::Completed,
            OrderPaymentStatus::Paid,
            FulfillmentStatus::Fulfilled,
        )
        .is_ok());
        assert!(validate_status_axes(
            OrderStatus::Completed,
            OrderPaymentStatus::Pending,
            FulfillmentStatus::Fulfilled,
        )
        .is_err());
    }

    #[test]
    fn test_axes_fulfillment_requires_payment() {
        assert!(validate_status_axes(
            OrderStatus::Processing,
            OrderPaymentStatus::Pending,
            FulfillmentStatus::Fulfilled,
        )
        .is_err());
        assert!(validate_status_axes(
            OrderStatus::Processing,
            OrderPaymentStatus::Paid,
            FulfillmentStatus::Unfulfilled,
        )
        .is_ok());
    }

    #[test]
    fn test_status_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&OrderStatus::Processing).unwrap();
        assert_eq!(json, "\"PROCESSING\"");
        let json = serde_json::to_string(&OrderPaymentStatus::PartiallyRefunded).unwrap();
        assert_eq!(json, "\"PARTIALLY_REFUNDED\"");
    }
}
