//! Cart Repository
//!
//! Order creation reads the cart and clears it once the order is durable.

use super::RepoResult;
use shared::models::{Cart, CartItem};
use sqlx::SqlitePool;

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Cart>> {
    let row = sqlx::query_as::<_, Cart>(
        "SELECT id, customer_id, is_active, created_at, updated_at FROM cart WHERE id = ? AND is_active = 1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn items(pool: &SqlitePool, cart_id: i64) -> RepoResult<Vec<CartItem>> {
    let rows = sqlx::query_as::<_, CartItem>(
        "SELECT id, cart_id, product_id, quantity, created_at FROM cart_item WHERE cart_id = ? ORDER BY created_at ASC",
    )
    .bind(cart_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Remove all lines. Called only after the order commit.
pub async fn clear(pool: &SqlitePool, cart_id: i64) -> RepoResult<u64> {
    let now = shared::util::now_millis();
    let rows = sqlx::query("DELETE FROM cart_item WHERE cart_id = ?")
        .bind(cart_id)
        .execute(pool)
        .await?;
    sqlx::query("UPDATE cart SET updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(cart_id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected())
}
