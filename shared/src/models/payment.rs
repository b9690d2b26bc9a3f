//! Payment Model
//!
//! One row per payment attempt. Several attempts may reference the same
//! order; at most one reaches Paid. The gateway session id is the
//! correlation key for webhook reconciliation.

use serde::{Deserialize, Serialize};

/// How the money moves
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum PaymentMethod {
    Gateway,
    BankTransfer,
    CashDeposit,
    Manual,
}

impl PaymentMethod {
    /// Gateway payments reconcile asynchronously; everything else is
    /// settled by an approver.
    pub fn payment_type(&self) -> PaymentType {
        match self {
            PaymentMethod::Gateway => PaymentType::Online,
            PaymentMethod::BankTransfer | PaymentMethod::CashDeposit | PaymentMethod::Manual => {
                PaymentType::Offline
            }
        }
    }
}

/// Online (gateway) vs offline (approver-settled)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum PaymentType {
    Online,
    Offline,
}

/// State of a single payment attempt
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    /// Once settled, a payment never moves again; callbacks targeting a
    /// settled payment are no-ops.
    pub fn is_settled(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

/// Payment entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: i64,
    /// Unique reference (`PAY-XXXXXXXXXXXX`)
    pub reference: String,
    pub order_id: i64,
    pub customer_id: Option<i64>,
    pub method: PaymentMethod,
    pub payment_type: PaymentType,
    pub status: PaymentStatus,
    /// Amount in currency unit
    pub amount: f64,
    pub currency: String,
    /// External session/transaction id; idempotency key for webhooks
    pub gateway_session_id: Option<String>,
    /// Gateway failure or rejection note
    pub failure_message: Option<String>,
    // Offline fields
    pub bank_name: Option<String>,
    pub account_name: Option<String>,
    pub transaction_id: Option<String>,
    /// Proof-of-deposit reference (uploaded slip, wire receipt, ...)
    pub deposit_proof: Option<String>,
    pub approved_by: Option<String>,
    pub approved_at: Option<i64>,
    /// When the payment reached a settled state
    pub processed_at: Option<i64>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Submit offline payment payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflinePaymentSubmit {
    pub order_id: i64,
    pub customer_id: Option<i64>,
    /// BankTransfer or CashDeposit
    pub method: PaymentMethod,
    pub bank_name: Option<String>,
    pub account_name: Option<String>,
    pub transaction_id: Option<String>,
    pub deposit_proof: Option<String>,
}

/// Approve/reject offline payment payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentApproval {
    pub approve: bool,
    pub approver: String,
    pub note: Option<String>,
}

/// Start checkout payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutStart {
    pub order_id: i64,
}

/// Hosted checkout session handed back to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub payment_reference: String,
    pub session_id: String,
    pub redirect_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_to_type() {
        assert_eq!(PaymentMethod::Gateway.payment_type(), PaymentType::Online);
        assert_eq!(
            PaymentMethod::BankTransfer.payment_type(),
            PaymentType::Offline
        );
        assert_eq!(
            PaymentMethod::CashDeposit.payment_type(),
            PaymentType::Offline
        );
        assert_eq!(PaymentMethod::Manual.payment_type(), PaymentType::Offline);
    }

    #[test]
    fn test_settled_states() {
        assert!(!PaymentStatus::Pending.is_settled());
        assert!(PaymentStatus::Paid.is_settled());
        assert!(PaymentStatus::Failed.is_settled());
    }
}
