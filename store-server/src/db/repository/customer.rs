//! Customer Repository (read-side slice)

use super::RepoResult;
use shared::models::Customer;
use sqlx::SqlitePool;

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Customer>> {
    let row = sqlx::query_as::<_, Customer>(
        "SELECT id, name, email, phone, is_active, created_at, updated_at FROM customer WHERE id = ? AND is_active = 1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
