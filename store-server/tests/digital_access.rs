//! Digital access: grants, rotating tokens, download caps, revocation,
//! and cleanup.

mod common;

use shared::error::ErrorCode;
use shared::models::{
    OrderCreate, OrderItemInput, OrderPaymentStatus, OrderStatus, PaymentApproval, PaymentMethod,
    OfflinePaymentSubmit,
};
use store_server::db::repository::{digital_access, order as order_repo};
use store_server::services::FileStorage;
use store_server::services::{digital_service, order_service, payment_service};

/// Seed a digital product (with its file in storage), order it, and pay
/// via the offline approval path. Returns (order id, order item id,
/// access id).
async fn paid_digital_order(
    ctx: &common::TestContext,
    max_downloads: Option<i64>,
    expiry_days: Option<i64>,
) -> (i64, i64, i64) {
    let customer = common::seed_customer(&ctx.state, "Ada Reader", "ada@example.com").await;
    let ebook = common::seed_digital_product(
        &ctx.state,
        "Field Notes",
        1000.0,
        "books/field-notes.pdf",
        max_downloads,
        expiry_days,
    )
    .await;
    ctx.state
        .storage
        .save("books/field-notes.pdf", b"%PDF-1.4 field notes")
        .await
        .unwrap();

    let detail = order_service::create_order(
        &ctx.state,
        OrderCreate {
            customer_id: Some(customer),
            contact_name: None,
            contact_email: None,
            contact_phone: None,
            items: vec![OrderItemInput { product_id: ebook, quantity: 1 }],
            payment_method: None,
        },
    )
    .await
    .unwrap();

    let payment = payment_service::submit_offline_payment(
        &ctx.state,
        OfflinePaymentSubmit {
            order_id: detail.order.id,
            customer_id: Some(customer),
            method: PaymentMethod::BankTransfer,
            bank_name: Some("First National".to_string()),
            account_name: None,
            transaction_id: None,
            deposit_proof: None,
        },
    )
    .await
    .unwrap();

    payment_service::approve_offline_payment(
        &ctx.state,
        payment.id,
        PaymentApproval {
            approve: true,
            approver: "back-office".to_string(),
            note: None,
        },
    )
    .await
    .unwrap();

    let item_id = detail.items[0].id;
    let access = digital_access::find_by_item_customer(&ctx.state.pool, item_id, customer)
        .await
        .unwrap()
        .expect("access granted on payment");

    (detail.order.id, item_id, access.id)
}

#[tokio::test]
async fn scenario_digital_order_via_offline_approval() {
    let ctx = common::setup().await;
    let (order_id, _, access_id) = paid_digital_order(&ctx, None, None).await;

    // Totals per the configured 10% rate
    let order = order_service::get_order(&ctx.state, order_id).await.unwrap();
    assert_eq!(order.order.subtotal, 1000.0);
    assert_eq!(order.order.tax, 100.0);
    assert_eq!(order.order.total, 1100.0);
    assert_eq!(order.order.payment_status, OrderPaymentStatus::Paid);
    assert_eq!(order.order.status, OrderStatus::Processing);

    // Access created by the success transition, counter untouched
    let access = digital_service::get_access(&ctx.state, access_id).await.unwrap();
    assert!(access.is_active);
    assert_eq!(access.download_count, 0);
    assert_eq!(access.max_downloads, 5); // config default
    assert!(access.expires_at.is_none());
    assert!(access.token.is_some());
}

#[tokio::test]
async fn grant_is_idempotent_per_item_and_customer() {
    let ctx = common::setup().await;
    let (_, item_id, access_id) = paid_digital_order(&ctx, None, None).await;

    // Granting again returns the same record, no duplicate
    let again = digital_service::grant_access(&ctx.state, item_id).await.unwrap();
    assert_eq!(again.id, access_id);
    assert_eq!(common::count_rows(&ctx.state, "digital_access").await, 1);
}

#[tokio::test]
async fn grant_requires_a_paid_order() {
    let ctx = common::setup().await;
    let customer = common::seed_customer(&ctx.state, "Ada", "ada@example.com").await;
    let ebook = common::seed_digital_product(
        &ctx.state, "Field Notes", 50.0, "books/notes.pdf", None, None,
    )
    .await;

    let detail = order_service::create_order(
        &ctx.state,
        OrderCreate {
            customer_id: Some(customer),
            contact_name: None,
            contact_email: None,
            contact_phone: None,
            items: vec![OrderItemInput { product_id: ebook, quantity: 1 }],
            payment_method: None,
        },
    )
    .await
    .unwrap();

    let err = digital_service::grant_access(&ctx.state, detail.items[0].id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationFailed);
}

#[tokio::test]
async fn download_cap_is_enforced_and_counter_never_drifts() {
    let ctx = common::setup().await;
    let (_, item_id, access_id) = paid_digital_order(&ctx, Some(2), None).await;

    let link = digital_service::generate_download_link(&ctx.state, access_id)
        .await
        .unwrap();
    assert!(link.url.contains(&link.token));
    assert_eq!(link.downloads_remaining, 2);

    // Two downloads succeed and return the file
    let payload = digital_service::process_download(&ctx.state, &link.token)
        .await
        .unwrap();
    assert_eq!(payload.bytes, b"%PDF-1.4 field notes");
    assert_eq!(payload.file_name, "field-notes.pdf");
    assert_eq!(payload.content_type, "application/pdf");
    digital_service::process_download(&ctx.state, &link.token)
        .await
        .unwrap();

    // The third always fails and never moves the counter
    for _ in 0..3 {
        let err = digital_service::process_download(&ctx.state, &link.token)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DownloadLimitReached);
    }
    let access = digital_service::get_access(&ctx.state, access_id).await.unwrap();
    assert_eq!(access.download_count, 2);
    assert!(!access.has_downloads_remaining());

    // Order line mirrors the counter
    let item = order_repo::find_item(&ctx.state.pool, item_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.downloads_used, 2);
    assert!(item.last_downloaded_at.is_some());

    // Link generation for an exhausted grant is refused
    let err = digital_service::generate_download_link(&ctx.state, access_id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::DownloadLimitReached);
}

#[tokio::test]
async fn token_is_reused_while_valid_and_rotated_near_expiry() {
    let ctx = common::setup().await;
    let (_, _, access_id) = paid_digital_order(&ctx, None, None).await;

    // Fresh token: link generation reuses it
    let first = digital_service::generate_download_link(&ctx.state, access_id)
        .await
        .unwrap();
    let second = digital_service::generate_download_link(&ctx.state, access_id)
        .await
        .unwrap();
    assert_eq!(first.token, second.token);

    // Push the window inside the rotation margin
    let now = shared::util::now_millis();
    digital_access::set_token(&ctx.state.pool, access_id, &first.token, now, now + 1000)
        .await
        .unwrap();

    let rotated = digital_service::generate_download_link(&ctx.state, access_id)
        .await
        .unwrap();
    assert_ne!(rotated.token, first.token);

    // Rotation touched only the window: counter and hard expiry intact
    let access = digital_service::get_access(&ctx.state, access_id).await.unwrap();
    assert_eq!(access.download_count, 0);
    assert!(access.expires_at.is_none());
}

#[tokio::test]
async fn stale_token_is_rejected_without_spending_a_download() {
    let ctx = common::setup().await;
    let (_, _, access_id) = paid_digital_order(&ctx, None, None).await;

    let link = digital_service::generate_download_link(&ctx.state, access_id)
        .await
        .unwrap();

    // Expire the window outright
    let now = shared::util::now_millis();
    digital_access::set_token(&ctx.state.pool, access_id, &link.token, now - 10_000, now - 5_000)
        .await
        .unwrap();

    let err = digital_service::process_download(&ctx.state, &link.token)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::DownloadTokenExpired);

    let err = digital_service::validate_token(&ctx.state, "no-such-token")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::DownloadTokenInvalid);

    let access = digital_service::get_access(&ctx.state, access_id).await.unwrap();
    assert_eq!(access.download_count, 0);
}

#[tokio::test]
async fn hard_expiry_gates_downloads() {
    let ctx = common::setup().await;
    let (_, _, access_id) = paid_digital_order(&ctx, None, Some(30)).await;

    let access = digital_service::get_access(&ctx.state, access_id).await.unwrap();
    assert!(access.expires_at.is_some());

    let link = digital_service::generate_download_link(&ctx.state, access_id)
        .await
        .unwrap();

    // Time-travel the hard expiry into the past
    sqlx::query("UPDATE digital_access SET expires_at = ? WHERE id = ?")
        .bind(shared::util::now_millis() - 1000)
        .bind(access_id)
        .execute(&ctx.state.pool)
        .await
        .unwrap();

    let err = digital_service::process_download(&ctx.state, &link.token)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AccessExpired);

    let err = digital_service::generate_download_link(&ctx.state, access_id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AccessExpired);
}

#[tokio::test]
async fn revocation_deactivates_and_clears_the_token() {
    let ctx = common::setup().await;
    let (_, _, access_id) = paid_digital_order(&ctx, None, None).await;

    let link = digital_service::generate_download_link(&ctx.state, access_id)
        .await
        .unwrap();

    assert!(digital_service::revoke_access(&ctx.state, access_id).await.unwrap());
    // Second revocation is a no-op
    assert!(!digital_service::revoke_access(&ctx.state, access_id).await.unwrap());

    // Token gone, record preserved
    let access = digital_service::get_access(&ctx.state, access_id).await.unwrap();
    assert!(!access.is_active);
    assert!(access.token.is_none());

    let err = digital_service::process_download(&ctx.state, &link.token)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::DownloadTokenInvalid);

    let err = digital_service::generate_download_link(&ctx.state, access_id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AccessRevoked);
}

#[tokio::test]
async fn cleanup_deactivates_expired_and_exhausted_grants() {
    let ctx = common::setup().await;
    let (_, _, expired_id) = paid_digital_order(&ctx, None, Some(30)).await;
    let (_, _, exhausted_id) = {
        let customer = common::seed_customer(&ctx.state, "Ben", "ben@example.com").await;
        let ebook = common::seed_digital_product(
            &ctx.state, "Second Title", 20.0, "books/second.pdf", Some(1), None,
        )
        .await;
        ctx.state
            .storage
            .save("books/second.pdf", b"second")
            .await
            .unwrap();
        let detail = order_service::create_order(
            &ctx.state,
            OrderCreate {
                customer_id: Some(customer),
                contact_name: None,
                contact_email: None,
                contact_phone: None,
                items: vec![OrderItemInput { product_id: ebook, quantity: 1 }],
                payment_method: None,
            },
        )
        .await
        .unwrap();
        let payment = payment_service::submit_offline_payment(
            &ctx.state,
            OfflinePaymentSubmit {
                order_id: detail.order.id,
                customer_id: Some(customer),
                method: PaymentMethod::CashDeposit,
                bank_name: None,
                account_name: None,
                transaction_id: None,
                deposit_proof: None,
            },
        )
        .await
        .unwrap();
        payment_service::approve_offline_payment(
            &ctx.state,
            payment.id,
            PaymentApproval {
                approve: true,
                approver: "back-office".to_string(),
                note: None,
            },
        )
        .await
        .unwrap();
        let access = digital_access::find_by_item_customer(&ctx.state.pool, detail.items[0].id, customer)
            .await
            .unwrap()
            .unwrap();
        (detail.order.id, detail.items[0].id, access.id)
    };

    // Expire the first grant; exhaust the second
    sqlx::query("UPDATE digital_access SET expires_at = ? WHERE id = ?")
        .bind(shared::util::now_millis() - 1000)
        .bind(expired_id)
        .execute(&ctx.state.pool)
        .await
        .unwrap();
    let link = digital_service::generate_download_link(&ctx.state, exhausted_id)
        .await
        .unwrap();
    digital_service::process_download(&ctx.state, &link.token)
        .await
        .unwrap();

    // Both show up as cleanup candidates
    let candidates = digital_service::list_expired_access(&ctx.state).await.unwrap();
    assert_eq!(candidates.len(), 2);

    // Cleanup deactivates both, keeps the rows, and is idempotent
    assert_eq!(digital_service::cleanup_expired_access(&ctx.state).await.unwrap(), 2);
    assert_eq!(digital_service::cleanup_expired_access(&ctx.state).await.unwrap(), 0);

    for id in [expired_id, exhausted_id] {
        let access = digital_service::get_access(&ctx.state, id).await.unwrap();
        assert!(!access.is_active);
    }
    assert_eq!(common::count_rows(&ctx.state, "digital_access").await, 2);
}
