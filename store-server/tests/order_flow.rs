//! Order lifecycle: creation, totals, stock reservation, the transition
//! table, and cancellation compensation.

mod common;

use shared::error::ErrorCode;
use shared::models::{
    FulfillmentStatus, OrderCreate, OrderItemInput, OrderPaymentStatus, OrderStatus,
    PaymentMethod, ProductStatus,
};
use store_server::db::repository::product;
use store_server::services::order_service;

fn order_request(customer_id: i64, items: Vec<OrderItemInput>) -> OrderCreate {
    OrderCreate {
        customer_id: Some(customer_id),
        contact_name: None,
        contact_email: None,
        contact_phone: None,
        items,
        payment_method: None,
    }
}

#[tokio::test]
async fn creates_order_with_computed_totals() {
    let ctx = common::setup().await;
    let customer = common::seed_customer(&ctx.state, "Ada Reader", "ada@example.com").await;
    let book = common::seed_print_product(&ctx.state, "City Atlas", 25.0, 10).await;

    let detail = order_service::create_order(
        &ctx.state,
        order_request(customer, vec![OrderItemInput { product_id: book, quantity: 2 }]),
    )
    .await
    .unwrap();

    assert_eq!(detail.order.subtotal, 50.0);
    assert_eq!(detail.order.tax, 5.0); // 10% flat rate
    assert_eq!(detail.order.discount, 0.0);
    assert_eq!(detail.order.total, 55.0);
    assert_eq!(detail.order.status, OrderStatus::Pending);
    assert_eq!(detail.order.payment_status, OrderPaymentStatus::Pending);
    assert_eq!(detail.order.fulfillment_status, FulfillmentStatus::Unfulfilled);
    assert!(detail.order.order_number.starts_with("ORD-"));
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].quantity, 2);
    assert_eq!(detail.items[0].line_total, 50.0);

    // Contact snapshot backfilled from the profile
    assert_eq!(detail.order.contact_name, "Ada Reader");
    assert_eq!(detail.order.contact_email, "ada@example.com");

    // total == subtotal + tax - discount
    assert_eq!(
        detail.order.total,
        detail.order.subtotal + detail.order.tax - detail.order.discount
    );
}

#[tokio::test]
async fn snapshots_discount_price_at_order_time() {
    let ctx = common::setup().await;
    let customer = common::seed_customer(&ctx.state, "Ada", "ada@example.com").await;
    let book = common::seed_product(
        &ctx.state, "Sale Title", "PRINT", 30.0, Some(19.5), 5, None, None, None,
    )
    .await;

    let detail = order_service::create_order(
        &ctx.state,
        order_request(customer, vec![OrderItemInput { product_id: book, quantity: 1 }]),
    )
    .await
    .unwrap();

    assert_eq!(detail.items[0].unit_price, 30.0);
    assert_eq!(detail.items[0].discount_price, Some(19.5));
    assert_eq!(detail.items[0].line_total, 19.5);
    assert_eq!(detail.order.subtotal, 19.5);
}

#[tokio::test]
async fn rejects_empty_order() {
    let ctx = common::setup().await;
    let customer = common::seed_customer(&ctx.state, "Ada", "ada@example.com").await;

    let err = order_service::create_order(&ctx.state, order_request(customer, vec![]))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::OrderEmpty);
}

#[tokio::test]
async fn rejects_unknown_and_unpublished_products() {
    let ctx = common::setup().await;
    let customer = common::seed_customer(&ctx.state, "Ada", "ada@example.com").await;

    let err = order_service::create_order(
        &ctx.state,
        order_request(customer, vec![OrderItemInput { product_id: 404, quantity: 1 }]),
    )
    .await
    .unwrap_err();
    assert_eq!(err.code, ErrorCode::ProductNotFound);

    let hidden = common::seed_print_product(&ctx.state, "Hidden", 10.0, 5).await;
    sqlx::query("UPDATE product SET status = 'UNPUBLISHED' WHERE id = ?")
        .bind(hidden)
        .execute(&ctx.state.pool)
        .await
        .unwrap();

    let err = order_service::create_order(
        &ctx.state,
        order_request(customer, vec![OrderItemInput { product_id: hidden, quantity: 1 }]),
    )
    .await
    .unwrap_err();
    assert_eq!(err.code, ErrorCode::ProductUnavailable);
}

#[tokio::test]
async fn insufficient_stock_rolls_back_everything() {
    let ctx = common::setup().await;
    let customer = common::seed_customer(&ctx.state, "Ada", "ada@example.com").await;
    let scarce = common::seed_print_product(&ctx.state, "Scarce", 12.0, 2).await;
    let plenty = common::seed_print_product(&ctx.state, "Plenty", 8.0, 50).await;

    let err = order_service::create_order(
        &ctx.state,
        order_request(
            customer,
            vec![
                OrderItemInput { product_id: plenty, quantity: 1 },
                OrderItemInput { product_id: scarce, quantity: 3 },
            ],
        ),
    )
    .await
    .unwrap_err();
    assert_eq!(err.code, ErrorCode::InsufficientStock);

    // Nothing survives the rollback: no order, no items, no stock movement
    assert_eq!(common::count_rows(&ctx.state, "customer_order").await, 0);
    assert_eq!(common::count_rows(&ctx.state, "order_item").await, 0);
    let p = product::find_by_id(&ctx.state.pool, plenty).await.unwrap().unwrap();
    assert_eq!(p.stock_quantity, 50);
    let s = product::find_by_id(&ctx.state.pool, scarce).await.unwrap().unwrap();
    assert_eq!(s.stock_quantity, 2);
}

#[tokio::test]
async fn scenario_print_stock_flips_and_cancellation_restores() {
    let ctx = common::setup().await;
    let customer = common::seed_customer(&ctx.state, "Ada", "ada@example.com").await;
    let book = common::seed_print_product(&ctx.state, "Limited Run", 40.0, 3).await;

    let detail = order_service::create_order(
        &ctx.state,
        order_request(customer, vec![OrderItemInput { product_id: book, quantity: 3 }]),
    )
    .await
    .unwrap();

    // Stock drained to zero flips the product out of stock
    let p = product::find_by_id(&ctx.state.pool, book).await.unwrap().unwrap();
    assert_eq!(p.stock_quantity, 0);
    assert_eq!(p.status, ProductStatus::OutOfStock);

    // Cancellation restores exactly the reserved quantity and flips back
    let cancelled = order_service::cancel_order(&ctx.state, detail.order.id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert!(cancelled.cancelled_at.is_some());

    let p = product::find_by_id(&ctx.state.pool, book).await.unwrap().unwrap();
    assert_eq!(p.stock_quantity, 3);
    assert_eq!(p.status, ProductStatus::Published);

    // Cancelling twice is an invalid transition and changes nothing
    let err = order_service::cancel_order(&ctx.state, detail.order.id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidStatusTransition);
    let p = product::find_by_id(&ctx.state.pool, book).await.unwrap().unwrap();
    assert_eq!(p.stock_quantity, 3);
}

#[tokio::test]
async fn transition_table_is_enforced() {
    let ctx = common::setup().await;
    let customer = common::seed_customer(&ctx.state, "Ada", "ada@example.com").await;
    let book = common::seed_print_product(&ctx.state, "Atlas", 25.0, 5).await;

    let detail = order_service::create_order(
        &ctx.state,
        order_request(customer, vec![OrderItemInput { product_id: book, quantity: 1 }]),
    )
    .await
    .unwrap();
    let id = detail.order.id;

    // Pending cannot jump straight to Completed
    let err = order_service::update_order_status(&ctx.state, id, OrderStatus::Completed)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidStatusTransition);

    // Status unchanged after the rejected transition
    let current = order_service::get_order(&ctx.state, id).await.unwrap();
    assert_eq!(current.order.status, OrderStatus::Pending);

    // Pending -> Processing is allowed
    let updated = order_service::update_order_status(&ctx.state, id, OrderStatus::Processing)
        .await
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Processing);

    // Completing an unpaid order violates the cross-axis invariant
    let err = order_service::update_order_status(&ctx.state, id, OrderStatus::Completed)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationFailed);

    // Pay it, then completion stamps fulfillment and time
    sqlx::query("UPDATE customer_order SET payment_status = 'PAID' WHERE id = ?")
        .bind(id)
        .execute(&ctx.state.pool)
        .await
        .unwrap();
    let completed = order_service::update_order_status(&ctx.state, id, OrderStatus::Completed)
        .await
        .unwrap();
    assert_eq!(completed.status, OrderStatus::Completed);
    assert_eq!(completed.fulfillment_status, FulfillmentStatus::Fulfilled);
    assert!(completed.completed_at.is_some());
}

#[tokio::test]
async fn creates_initial_payment_for_non_manual_methods() {
    let ctx = common::setup().await;
    let customer = common::seed_customer(&ctx.state, "Ada", "ada@example.com").await;
    let book = common::seed_print_product(&ctx.state, "Atlas", 25.0, 5).await;

    let mut request = order_request(customer, vec![OrderItemInput { product_id: book, quantity: 1 }]);
    request.payment_method = Some(PaymentMethod::BankTransfer);
    order_service::create_order(&ctx.state, request).await.unwrap();
    assert_eq!(common::count_rows(&ctx.state, "payment").await, 1);

    let mut request = order_request(customer, vec![OrderItemInput { product_id: book, quantity: 1 }]);
    request.payment_method = Some(PaymentMethod::Manual);
    order_service::create_order(&ctx.state, request).await.unwrap();
    // Manual method creates no payment record up front
    assert_eq!(common::count_rows(&ctx.state, "payment").await, 1);
}

#[tokio::test]
async fn cart_checkout_clears_cart_after_commit() {
    let ctx = common::setup().await;
    let customer = common::seed_customer(&ctx.state, "Ada", "ada@example.com").await;
    let book = common::seed_print_product(&ctx.state, "Atlas", 25.0, 5).await;
    let cart = common::seed_cart(&ctx.state, customer, &[(book, 2)]).await;

    let detail = order_service::create_order_from_cart(&ctx.state, cart, None)
        .await
        .unwrap();
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.order.customer_id, Some(customer));
    assert_eq!(common::count_rows(&ctx.state, "cart_item").await, 0);

    // Second conversion of the now-empty cart is rejected
    let err = order_service::create_order_from_cart(&ctx.state, cart, None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::CartEmpty);
}

#[tokio::test]
async fn empty_cart_leaves_no_order_behind() {
    let ctx = common::setup().await;
    let customer = common::seed_customer(&ctx.state, "Ada", "ada@example.com").await;
    let cart = common::seed_cart(&ctx.state, customer, &[]).await;

    let err = order_service::create_order_from_cart(&ctx.state, cart, None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::CartEmpty);
    assert_eq!(common::count_rows(&ctx.state, "customer_order").await, 0);
}

#[tokio::test]
async fn lists_orders_by_customer_and_date_range() {
    let ctx = common::setup().await;
    let ada = common::seed_customer(&ctx.state, "Ada", "ada@example.com").await;
    let ben = common::seed_customer(&ctx.state, "Ben", "ben@example.com").await;
    let book = common::seed_print_product(&ctx.state, "Atlas", 25.0, 50).await;

    for customer in [ada, ada, ben] {
        order_service::create_order(
            &ctx.state,
            order_request(customer, vec![OrderItemInput { product_id: book, quantity: 1 }]),
        )
        .await
        .unwrap();
    }

    let ada_orders = order_service::list_orders_by_customer(&ctx.state, ada)
        .await
        .unwrap();
    assert_eq!(ada_orders.len(), 2);

    let now = shared::util::now_millis();
    let all = order_service::list_orders_by_date_range(&ctx.state, 0, now + 1000, 50, 0)
        .await
        .unwrap();
    assert_eq!(all.len(), 3);

    let none = order_service::list_orders_by_date_range(&ctx.state, now + 10_000, now + 20_000, 50, 0)
        .await
        .unwrap();
    assert!(none.is_empty());

    let err = order_service::list_orders_by_date_range(&ctx.state, 100, 0, 50, 0)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationFailed);
}
