//! Order Repository
//!
//! Orders and their lines. Writes that belong to a lifecycle transition
//! take the open transaction connection; reads take the pool. Orders are
//! never physically deleted.

use super::RepoResult;
use shared::models::{Order, OrderItem};
use sqlx::{SqliteConnection, SqlitePool};

const ORDER_SELECT: &str = "SELECT id, order_number, customer_id, contact_name, contact_email, contact_phone, subtotal, tax, discount, total, status, payment_status, fulfillment_status, paid_at, completed_at, cancelled_at, is_active, created_at, updated_at FROM customer_order";

const ITEM_SELECT: &str = "SELECT id, order_id, product_id, product_name, quantity, unit_price, discount_price, line_total, downloads_used, last_downloaded_at, created_at FROM order_item";

/// Insert the order header inside the creation transaction
pub async fn insert(conn: &mut SqliteConnection, order: &Order) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO customer_order (id, order_number, customer_id, contact_name, contact_email, contact_phone, subtotal, tax, discount, total, status, payment_status, fulfillment_status, paid_at, completed_at, cancelled_at, is_active, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(order.id)
    .bind(&order.order_number)
    .bind(order.customer_id)
    .bind(&order.contact_name)
    .bind(&order.contact_email)
    .bind(&order.contact_phone)
    .bind(order.subtotal)
    .bind(order.tax)
    .bind(order.discount)
    .bind(order.total)
    .bind(order.status)
    .bind(order.payment_status)
    .bind(order.fulfillment_status)
    .bind(order.paid_at)
    .bind(order.completed_at)
    .bind(order.cancelled_at)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Insert one line inside the creation transaction
pub async fn insert_item(conn: &mut SqliteConnection, item: &OrderItem) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO order_item (id, order_id, product_id, product_name, quantity, unit_price, discount_price, line_total, downloads_used, last_downloaded_at, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, NULL, ?)",
    )
    .bind(item.id)
    .bind(item.order_id)
    .bind(item.product_id)
    .bind(&item.product_name)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.discount_price)
    .bind(item.line_total)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Order>> {
    let sql = format!("{} WHERE id = ? AND is_active = 1", ORDER_SELECT);
    let row = sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_id_tx(conn: &mut SqliteConnection, id: i64) -> RepoResult<Option<Order>> {
    let sql = format!("{} WHERE id = ? AND is_active = 1", ORDER_SELECT);
    let row = sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn find_by_number(pool: &SqlitePool, order_number: &str) -> RepoResult<Option<Order>> {
    let sql = format!("{} WHERE order_number = ? AND is_active = 1", ORDER_SELECT);
    let row = sqlx::query_as::<_, Order>(&sql)
        .bind(order_number)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn list_by_customer(pool: &SqlitePool, customer_id: i64) -> RepoResult<Vec<Order>> {
    let sql = format!(
        "{} WHERE customer_id = ? AND is_active = 1 ORDER BY created_at DESC",
        ORDER_SELECT
    );
    let rows = sqlx::query_as::<_, Order>(&sql)
        .bind(customer_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Orders created in [from, to], newest first, paginated
pub async fn list_by_date_range(
    pool: &SqlitePool,
    from: i64,
    to: i64,
    limit: i64,
    offset: i64,
) -> RepoResult<Vec<Order>> {
    let sql = format!(
        "{} WHERE created_at >= ? AND created_at <= ? AND is_active = 1 ORDER BY created_at DESC LIMIT ? OFFSET ?",
        ORDER_SELECT
    );
    let rows = sqlx::query_as::<_, Order>(&sql)
        .bind(from)
        .bind(to)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn items_by_order(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<OrderItem>> {
    let sql = format!("{} WHERE order_id = ? ORDER BY id ASC", ITEM_SELECT);
    let rows = sqlx::query_as::<_, OrderItem>(&sql)
        .bind(order_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn items_by_order_tx(
    conn: &mut SqliteConnection,
    order_id: i64,
) -> RepoResult<Vec<OrderItem>> {
    let sql = format!("{} WHERE order_id = ? ORDER BY id ASC", ITEM_SELECT);
    let rows = sqlx::query_as::<_, OrderItem>(&sql)
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

pub async fn find_item(pool: &SqlitePool, item_id: i64) -> RepoResult<Option<OrderItem>> {
    let sql = format!("{} WHERE id = ?", ITEM_SELECT);
    let row = sqlx::query_as::<_, OrderItem>(&sql)
        .bind(item_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Persist the status axes and lifecycle timestamps computed by the
/// lifecycle manager
pub async fn update_status_fields(conn: &mut SqliteConnection, order: &Order) -> RepoResult<()> {
    let now = shared::util::now_millis();
    sqlx::query(
        "UPDATE customer_order SET status = ?, payment_status = ?, fulfillment_status = ?, paid_at = ?, completed_at = ?, cancelled_at = ?, updated_at = ? WHERE id = ? AND is_active = 1",
    )
    .bind(order.status)
    .bind(order.payment_status)
    .bind(order.fulfillment_status)
    .bind(order.paid_at)
    .bind(order.completed_at)
    .bind(order.cancelled_at)
    .bind(now)
    .bind(order.id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Payment-success stamp: payment axis to PAID, order axis Pending ->
/// Processing, everything else untouched.
pub async fn mark_paid(conn: &mut SqliteConnection, order_id: i64, now: i64) -> RepoResult<()> {
    sqlx::query(
        "UPDATE customer_order SET \
            payment_status = 'PAID', \
            paid_at = COALESCE(paid_at, ?1), \
            status = CASE WHEN status = 'PENDING' THEN 'PROCESSING' ELSE status END, \
            updated_at = ?1 \
         WHERE id = ?2 AND is_active = 1",
    )
    .bind(now)
    .bind(order_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Mirror the digital access counter onto the order line
pub async fn record_item_download(
    conn: &mut SqliteConnection,
    item_id: i64,
    now: i64,
) -> RepoResult<()> {
    sqlx::query(
        "UPDATE order_item SET downloads_used = downloads_used + 1, last_downloaded_at = ? WHERE id = ?",
    )
    .bind(now)
    .bind(item_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
