//! Digital Access Repository
//!
//! Grants are unique per (order_item, customer); the UNIQUE index backs
//! idempotent grant. The download increment is a guarded UPDATE so the cap
//! check and the increment are one statement. Records are deactivated,
//! never deleted.

use super::RepoResult;
use shared::models::DigitalAccess;
use sqlx::{SqliteConnection, SqlitePool};

const ACCESS_SELECT: &str = "SELECT id, order_item_id, product_id, customer_id, granted_at, expires_at, download_count, max_downloads, token, token_issued_at, token_expires_at, last_downloaded_at, is_active, created_at, updated_at FROM digital_access";

pub async fn insert(pool: &SqlitePool, access: &DigitalAccess) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO digital_access (id, order_item_id, product_id, customer_id, granted_at, expires_at, download_count, max_downloads, token, token_issued_at, token_expires_at, last_downloaded_at, is_active, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(access.id)
    .bind(access.order_item_id)
    .bind(access.product_id)
    .bind(access.customer_id)
    .bind(access.granted_at)
    .bind(access.expires_at)
    .bind(access.download_count)
    .bind(access.max_downloads)
    .bind(&access.token)
    .bind(access.token_issued_at)
    .bind(access.token_expires_at)
    .bind(access.last_downloaded_at)
    .bind(access.created_at)
    .bind(access.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<DigitalAccess>> {
    let sql = format!("{} WHERE id = ?", ACCESS_SELECT);
    let row = sqlx::query_as::<_, DigitalAccess>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Grant-idempotency lookup. Includes deactivated rows: a revoked grant is
/// still "the" grant for its (item, customer) pair.
pub async fn find_by_item_customer(
    pool: &SqlitePool,
    order_item_id: i64,
    customer_id: i64,
) -> RepoResult<Option<DigitalAccess>> {
    let sql = format!(
        "{} WHERE order_item_id = ? AND customer_id = ?",
        ACCESS_SELECT
    );
    let row = sqlx::query_as::<_, DigitalAccess>(&sql)
        .bind(order_item_id)
        .bind(customer_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_token(pool: &SqlitePool, token: &str) -> RepoResult<Option<DigitalAccess>> {
    let sql = format!("{} WHERE token = ?", ACCESS_SELECT);
    let row = sqlx::query_as::<_, DigitalAccess>(&sql)
        .bind(token)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn list_by_customer(
    pool: &SqlitePool,
    customer_id: i64,
) -> RepoResult<Vec<DigitalAccess>> {
    let sql = format!(
        "{} WHERE customer_id = ? AND is_active = 1 ORDER BY granted_at DESC",
        ACCESS_SELECT
    );
    let rows = sqlx::query_as::<_, DigitalAccess>(&sql)
        .bind(customer_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Access rows whose hard expiry has passed or whose cap is exhausted but
/// which are still marked active (cleanup candidates)
pub async fn list_expired(pool: &SqlitePool, now: i64) -> RepoResult<Vec<DigitalAccess>> {
    let sql = format!(
        "{} WHERE is_active = 1 AND ((expires_at IS NOT NULL AND expires_at <= ?) OR download_count >= max_downloads) ORDER BY granted_at ASC",
        ACCESS_SELECT
    );
    let rows = sqlx::query_as::<_, DigitalAccess>(&sql)
        .bind(now)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Admin adjustment of cap / hard expiry / active flag
pub async fn update(
    pool: &SqlitePool,
    access_id: i64,
    data: &shared::models::DigitalAccessUpdate,
) -> RepoResult<Option<DigitalAccess>> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE digital_access SET \
            max_downloads = COALESCE(?1, max_downloads), \
            expires_at = COALESCE(?2, expires_at), \
            is_active = COALESCE(?3, is_active), \
            updated_at = ?4 \
         WHERE id = ?5",
    )
    .bind(data.max_downloads)
    .bind(data.expires_at)
    .bind(data.is_active)
    .bind(now)
    .bind(access_id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Ok(None);
    }
    find_by_id(pool, access_id).await
}

/// Rotate the token window. Touches nothing else: not the counter, not the
/// hard expiry.
pub async fn set_token(
    pool: &SqlitePool,
    access_id: i64,
    token: &str,
    issued_at: i64,
    expires_at: i64,
) -> RepoResult<()> {
    sqlx::query(
        "UPDATE digital_access SET token = ?, token_issued_at = ?, token_expires_at = ?, updated_at = ? WHERE id = ? AND is_active = 1",
    )
    .bind(token)
    .bind(issued_at)
    .bind(expires_at)
    .bind(issued_at)
    .bind(access_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Guarded download increment: only succeeds while the grant is active,
/// inside its hard expiry, and under the cap. Returns false otherwise with
/// no counter movement.
pub async fn record_download(
    conn: &mut SqliteConnection,
    access_id: i64,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE digital_access SET \
            download_count = download_count + 1, \
            last_downloaded_at = ?1, \
            updated_at = ?1 \
         WHERE id = ?2 AND is_active = 1 \
           AND download_count < max_downloads \
           AND (expires_at IS NULL OR expires_at > ?1)",
    )
    .bind(now)
    .bind(access_id)
    .execute(&mut *conn)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Revocation: deactivate and drop the current token. The row stays for
/// audit.
pub async fn deactivate(pool: &SqlitePool, access_id: i64) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE digital_access SET is_active = 0, token = NULL, token_issued_at = NULL, token_expires_at = NULL, updated_at = ? WHERE id = ? AND is_active = 1",
    )
    .bind(now)
    .bind(access_id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Bulk-deactivate every expired or exhausted grant. Idempotent: already
/// inactive rows are not touched, so repeated runs return 0.
pub async fn cleanup_expired(pool: &SqlitePool, now: i64) -> RepoResult<u64> {
    let rows = sqlx::query(
        "UPDATE digital_access SET is_active = 0, token = NULL, token_issued_at = NULL, token_expires_at = NULL, updated_at = ?1 \
         WHERE is_active = 1 AND ((expires_at IS NOT NULL AND expires_at <= ?1) OR download_count >= max_downloads)",
    )
    .bind(now)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected())
}
