//! Shared test harness: in-memory database, mock collaborators, seeders.

// Each test binary uses its own subset of these helpers.
#![allow(dead_code)]

use std::sync::Arc;

use store_server::db::DbService;
use store_server::services::{LocalFileStorage, LogMailer, MockGateway};
use store_server::{Config, ServerState};

/// Everything a test needs, with concrete handles on the mocks
pub struct TestContext {
    pub state: ServerState,
    pub gateway: Arc<MockGateway>,
    // Kept alive for the duration of the test
    pub storage_dir: tempfile::TempDir,
}

/// Fresh in-memory database + mock collaborators. Config values are pinned
/// so tests do not depend on ambient environment variables.
pub async fn setup() -> TestContext {
    let storage_dir = tempfile::tempdir().expect("tempdir");

    let mut config = Config::with_overrides(storage_dir.path().to_string_lossy(), 0);
    config.currency = "EUR".to_string();
    config.tax_rate = 0.10;
    config.default_max_downloads = 5;
    config.download_token_ttl_minutes = 30;
    config.token_rotation_margin_secs = 300;
    config.public_base_url = "http://localhost:3000".to_string();
    config.gateway_webhook_secret = None;

    let db = DbService::new_in_memory().await.expect("in-memory database");
    let gateway = Arc::new(MockGateway::new());
    let storage = Arc::new(LocalFileStorage::new(
        storage_dir.path(),
        config.public_base_url.clone(),
    ));

    let state = ServerState::new(
        config,
        db.pool,
        gateway.clone(),
        storage,
        Arc::new(LogMailer),
    );

    TestContext {
        state,
        gateway,
        storage_dir,
    }
}

pub async fn seed_customer(state: &ServerState, name: &str, email: &str) -> i64 {
    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO customer (id, name, email, phone, is_active, created_at, updated_at) VALUES (?, ?, ?, NULL, 1, ?, ?)",
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await
    .expect("seed customer");
    id
}

pub async fn seed_print_product(state: &ServerState, name: &str, price: f64, stock: i64) -> i64 {
    seed_product(state, name, "PRINT", price, None, stock, None, None, None).await
}

pub async fn seed_digital_product(
    state: &ServerState,
    name: &str,
    price: f64,
    file_path: &str,
    max_downloads: Option<i64>,
    expiry_days: Option<i64>,
) -> i64 {
    seed_product(
        state,
        name,
        "DIGITAL",
        price,
        None,
        0,
        Some(file_path),
        max_downloads,
        expiry_days,
    )
    .await
}

#[allow(clippy::too_many_arguments)]
pub async fn seed_product(
    state: &ServerState,
    name: &str,
    format: &str,
    price: f64,
    discount_price: Option<f64>,
    stock: i64,
    file_path: Option<&str>,
    max_downloads: Option<i64>,
    expiry_days: Option<i64>,
) -> i64 {
    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO product (id, name, format, status, price, discount_price, stock_quantity, digital_file_path, max_downloads, download_expiry_days, is_active, created_at, updated_at) \
         VALUES (?, ?, ?, 'PUBLISHED', ?, ?, ?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(id)
    .bind(name)
    .bind(format)
    .bind(price)
    .bind(discount_price)
    .bind(stock)
    .bind(file_path)
    .bind(max_downloads)
    .bind(expiry_days)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await
    .expect("seed product");
    id
}

pub async fn seed_cart(state: &ServerState, customer_id: i64, lines: &[(i64, i64)]) -> i64 {
    let cart_id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO cart (id, customer_id, is_active, created_at, updated_at) VALUES (?, ?, 1, ?, ?)",
    )
    .bind(cart_id)
    .bind(customer_id)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await
    .expect("seed cart");

    for (product_id, quantity) in lines {
        sqlx::query(
            "INSERT INTO cart_item (id, cart_id, product_id, quantity, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(shared::util::snowflake_id())
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .execute(&state.pool)
        .await
        .expect("seed cart item");
    }

    cart_id
}

pub async fn count_rows(state: &ServerState, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(&state.pool)
        .await
        .expect("count rows")
}
