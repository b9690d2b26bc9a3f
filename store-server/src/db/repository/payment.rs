//! Payment Repository
//!
//! One row per payment attempt. The settle functions are compare-and-set
//! on `status = 'PENDING'`: whichever reconciliation path runs first wins,
//! the loser's write affects zero rows.

use super::RepoResult;
use shared::models::Payment;
use sqlx::{SqliteConnection, SqlitePool};

const PAYMENT_SELECT: &str = "SELECT id, reference, order_id, customer_id, method, payment_type, status, amount, currency, gateway_session_id, failure_message, bank_name, account_name, transaction_id, deposit_proof, approved_by, approved_at, processed_at, is_active, created_at, updated_at FROM payment";

pub async fn insert(conn: &mut SqliteConnection, payment: &Payment) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO payment (id, reference, order_id, customer_id, method, payment_type, status, amount, currency, gateway_session_id, failure_message, bank_name, account_name, transaction_id, deposit_proof, approved_by, approved_at, processed_at, is_active, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(payment.id)
    .bind(&payment.reference)
    .bind(payment.order_id)
    .bind(payment.customer_id)
    .bind(payment.method)
    .bind(payment.payment_type)
    .bind(payment.status)
    .bind(payment.amount)
    .bind(&payment.currency)
    .bind(&payment.gateway_session_id)
    .bind(&payment.failure_message)
    .bind(&payment.bank_name)
    .bind(&payment.account_name)
    .bind(&payment.transaction_id)
    .bind(&payment.deposit_proof)
    .bind(&payment.approved_by)
    .bind(payment.approved_at)
    .bind(payment.processed_at)
    .bind(payment.created_at)
    .bind(payment.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Payment>> {
    let sql = format!("{} WHERE id = ? AND is_active = 1", PAYMENT_SELECT);
    let row = sqlx::query_as::<_, Payment>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_reference(pool: &SqlitePool, reference: &str) -> RepoResult<Option<Payment>> {
    let sql = format!("{} WHERE reference = ? AND is_active = 1", PAYMENT_SELECT);
    let row = sqlx::query_as::<_, Payment>(&sql)
        .bind(reference)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Correlation-id lookup: a webhook is matched to a payment purely by the
/// gateway session id, never by order id (an order may carry several
/// attempts).
pub async fn find_by_session(pool: &SqlitePool, session_id: &str) -> RepoResult<Option<Payment>> {
    let sql = format!(
        "{} WHERE gateway_session_id = ? AND is_active = 1",
        PAYMENT_SELECT
    );
    let row = sqlx::query_as::<_, Payment>(&sql)
        .bind(session_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn list_by_order(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<Payment>> {
    let sql = format!(
        "{} WHERE order_id = ? AND is_active = 1 ORDER BY created_at ASC",
        PAYMENT_SELECT
    );
    let rows = sqlx::query_as::<_, Payment>(&sql)
        .bind(order_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Compare-and-set settle to PAID. Returns false when the payment had
/// already left PENDING (duplicate callback, lost race) — the caller
/// treats that as a no-op.
pub async fn settle_paid(
    conn: &mut SqliteConnection,
    payment_id: i64,
    approver: Option<&str>,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE payment SET \
            status = 'PAID', \
            processed_at = ?1, \
            approved_by = COALESCE(?2, approved_by), \
            approved_at = CASE WHEN ?2 IS NOT NULL THEN ?1 ELSE approved_at END, \
            updated_at = ?1 \
         WHERE id = ?3 AND status = 'PENDING' AND is_active = 1",
    )
    .bind(now)
    .bind(approver)
    .bind(payment_id)
    .execute(&mut *conn)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Compare-and-set settle to FAILED with the gateway/approver message.
/// Same no-op semantics as [`settle_paid`].
pub async fn settle_failed(
    conn: &mut SqliteConnection,
    payment_id: i64,
    message: Option<&str>,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE payment SET \
            status = 'FAILED', \
            failure_message = ?1, \
            processed_at = ?2, \
            updated_at = ?2 \
         WHERE id = ?3 AND status = 'PENDING' AND is_active = 1",
    )
    .bind(message)
    .bind(now)
    .bind(payment_id)
    .execute(&mut *conn)
    .await?;
    Ok(rows.rows_affected() > 0)
}
