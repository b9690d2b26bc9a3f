//! Product Repository + Stock Ledger
//!
//! The order core reads products and owns the stock counter. Stock moves
//! are single guarded UPDATEs so the insufficient-stock check and the
//! adjustment are one atomic statement inside the caller's transaction.

use super::RepoResult;
use shared::models::Product;
use sqlx::{SqliteConnection, SqlitePool};

const PRODUCT_SELECT: &str = "SELECT id, name, format, status, price, discount_price, stock_quantity, digital_file_path, max_downloads, download_expiry_days, is_active, created_at, updated_at FROM product";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Product>> {
    let sql = format!("{} WHERE id = ? AND is_active = 1", PRODUCT_SELECT);
    let row = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Read inside an open transaction (order creation snapshots prices here)
pub async fn find_by_id_tx(conn: &mut SqliteConnection, id: i64) -> RepoResult<Option<Product>> {
    let sql = format!("{} WHERE id = ? AND is_active = 1", PRODUCT_SELECT);
    let row = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

/// Reserve print stock: decrement the counter, flipping the product to
/// OUT_OF_STOCK when it reaches zero.
///
/// Returns false (and changes nothing) when the remaining stock cannot
/// cover the quantity; the caller must abort its transaction.
pub async fn reserve_stock(
    conn: &mut SqliteConnection,
    product_id: i64,
    quantity: i64,
) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE product SET \
            stock_quantity = stock_quantity - ?1, \
            status = CASE WHEN stock_quantity - ?1 <= 0 THEN 'OUT_OF_STOCK' ELSE status END, \
            updated_at = ?2 \
         WHERE id = ?3 AND is_active = 1 AND format = 'PRINT' AND stock_quantity >= ?1",
    )
    .bind(quantity)
    .bind(now)
    .bind(product_id)
    .execute(&mut *conn)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Restore print stock (cancellation compensation): increment the counter,
/// flipping an OUT_OF_STOCK product back to PUBLISHED once it rises above
/// zero.
///
/// Returns false when the product row is gone; the caller logs and moves
/// on rather than failing the cancellation.
pub async fn restore_stock(
    conn: &mut SqliteConnection,
    product_id: i64,
    quantity: i64,
) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE product SET \
            stock_quantity = stock_quantity + ?1, \
            status = CASE WHEN status = 'OUT_OF_STOCK' AND stock_quantity + ?1 > 0 THEN 'PUBLISHED' ELSE status END, \
            updated_at = ?2 \
         WHERE id = ?3 AND is_active = 1 AND format = 'PRINT'",
    )
    .bind(quantity)
    .bind(now)
    .bind(product_id)
    .execute(&mut *conn)
    .await?;
    Ok(rows.rows_affected() > 0)
}
