//! Order Lifecycle Manager
//!
//! Owns cart/item-list -> order conversion, the order status state
//! machine, and cancellation compensation (stock restore). Every mutation
//! runs as one transaction over the order's row set; partial application
//! is never observable.

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    validate_status_axes, FulfillmentStatus, Order, OrderCreate, OrderDetail, OrderItem,
    OrderItemInput, OrderPaymentStatus, OrderStatus, Payment, PaymentMethod, PaymentStatus,
    ProductFormat,
};
use shared::util;

use crate::core::ServerState;
use crate::db::repository::{cart, customer, order, payment, product};
use crate::money;
use crate::services::notification::{self, Notification};

/// Resolved contact snapshot for a new order
struct Contact {
    customer_id: Option<i64>,
    name: String,
    email: String,
    phone: Option<String>,
}

/// Create an order from an explicit item list.
///
/// One transaction: line validation, price snapshot, order + item insert,
/// print-stock reservation, and the initial pending payment. Any failure
/// rolls the whole thing back.
pub async fn create_order(state: &ServerState, request: OrderCreate) -> AppResult<OrderDetail> {
    if request.items.is_empty() {
        return Err(AppError::new(ErrorCode::OrderEmpty));
    }

    let contact = resolve_contact(state, &request).await?;
    let now = util::now_millis();

    let mut tx = state
        .pool
        .begin()
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    // Validate lines and snapshot prices inside the transaction
    let mut items: Vec<OrderItem> = Vec::with_capacity(request.items.len());
    let mut formats: Vec<ProductFormat> = Vec::with_capacity(request.items.len());
    let mut line_totals = Vec::with_capacity(request.items.len());
    let order_id = util::snowflake_id();

    for input in &request.items {
        let item = build_line(&mut tx, order_id, input, now, &mut formats, &mut line_totals).await?;
        items.push(item);
    }

    let totals = money::order_totals(&line_totals, state.config.tax_rate, rust_decimal::Decimal::ZERO);

    let order_row = Order {
        id: order_id,
        order_number: util::order_number(),
        customer_id: contact.customer_id,
        contact_name: contact.name,
        contact_email: contact.email,
        contact_phone: contact.phone,
        subtotal: totals.subtotal,
        tax: totals.tax,
        discount: totals.discount,
        total: totals.total,
        status: OrderStatus::Pending,
        payment_status: OrderPaymentStatus::Pending,
        fulfillment_status: FulfillmentStatus::Unfulfilled,
        paid_at: None,
        completed_at: None,
        cancelled_at: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    order::insert(&mut tx, &order_row).await?;
    for item in &items {
        order::insert_item(&mut tx, item).await?;
    }

    // Reserve print stock; the guarded UPDATE is the authoritative check
    for (item, format) in items.iter().zip(&formats) {
        if format.tracks_stock() {
            let reserved = product::reserve_stock(&mut tx, item.product_id, item.quantity).await?;
            if !reserved {
                return Err(AppError::with_message(
                    ErrorCode::InsufficientStock,
                    format!(
                        "Insufficient stock for \"{}\" (requested {})",
                        item.product_name, item.quantity
                    ),
                )
                .with_detail("product_id", item.product_id));
            }
        }
    }

    // Initial payment record for non-manual methods
    if let Some(method) = request.payment_method {
        if method != PaymentMethod::Manual {
            let payment_row = Payment {
                id: util::snowflake_id(),
                reference: util::payment_reference(),
                order_id,
                customer_id: contact.customer_id,
                method,
                payment_type: method.payment_type(),
                status: PaymentStatus::Pending,
                amount: totals.total,
                currency: state.config.currency.clone(),
                gateway_session_id: None,
                failure_message: None,
                bank_name: None,
                account_name: None,
                transaction_id: None,
                deposit_proof: None,
                approved_by: None,
                approved_at: None,
                processed_at: None,
                is_active: true,
                created_at: now,
                updated_at: now,
            };
            payment::insert(&mut tx, &payment_row).await?;
        }
    }

    tx.commit()
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    tracing::info!(
        order_id,
        order_number = %order_row.order_number,
        total = order_row.total,
        "Order created"
    );

    notification::notify(
        state.mailer.clone(),
        Notification::OrderConfirmed {
            email: order_row.contact_email.clone(),
            order_number: order_row.order_number.clone(),
            total: order_row.total,
            currency: state.config.currency.clone(),
        },
    );

    Ok(OrderDetail {
        order: order_row,
        items,
    })
}

/// Convert the customer's cart into an order, clearing it only after the
/// order is durable.
pub async fn create_order_from_cart(
    state: &ServerState,
    cart_id: i64,
    payment_method: Option<PaymentMethod>,
) -> AppResult<OrderDetail> {
    let cart_row = cart::find_by_id(&state.pool, cart_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::CartNotFound))?;

    let lines = cart::items(&state.pool, cart_id).await?;
    if lines.is_empty() {
        return Err(AppError::new(ErrorCode::CartEmpty));
    }

    let request = OrderCreate {
        customer_id: Some(cart_row.customer_id),
        contact_name: None,
        contact_email: None,
        contact_phone: None,
        items: lines
            .iter()
            .map(|l| OrderItemInput {
                product_id: l.product_id,
                quantity: l.quantity,
            })
            .collect(),
        payment_method,
    };

    let detail = create_order(state, request).await?;

    // The order is committed; a failed clear leaves a stale cart, not a
    // broken order.
    if let Err(e) = cart::clear(&state.pool, cart_id).await {
        tracing::warn!(cart_id, error = %e, "Failed to clear cart after order creation");
    }

    Ok(detail)
}

/// Drive the order status state machine.
///
/// Completed stamps completion and marks fulfillment done; Cancelled
/// stamps cancellation and restores print stock in the same transaction.
pub async fn update_order_status(
    state: &ServerState,
    order_id: i64,
    new_status: OrderStatus,
) -> AppResult<Order> {
    let now = util::now_millis();

    let mut tx = state
        .pool
        .begin()
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    let mut order_row = order::find_by_id_tx(&mut tx, order_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;

    if !order_row.status.can_transition_to(new_status) {
        return Err(AppError::with_message(
            ErrorCode::InvalidStatusTransition,
            format!(
                "Cannot transition order from {:?} to {:?}",
                order_row.status, new_status
            ),
        )
        .with_detail("from", format!("{:?}", order_row.status))
        .with_detail("to", format!("{:?}", new_status)));
    }

    order_row.status = new_status;
    match new_status {
        OrderStatus::Completed => {
            order_row.completed_at = Some(now);
            order_row.fulfillment_status = FulfillmentStatus::Fulfilled;
        }
        OrderStatus::Cancelled => {
            order_row.cancelled_at = Some(now);
            restore_print_stock(&mut tx, order_id).await?;
        }
        OrderStatus::Refunded => {
            order_row.payment_status = OrderPaymentStatus::FullyRefunded;
        }
        OrderStatus::Pending | OrderStatus::Processing => {}
    }

    validate_status_axes(
        order_row.status,
        order_row.payment_status,
        order_row.fulfillment_status,
    )
    .map_err(AppError::validation)?;

    order::update_status_fields(&mut tx, &order_row).await?;

    tx.commit()
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    tracing::info!(order_id, status = ?new_status, "Order status updated");

    Ok(order_row)
}

/// Cancel an order (terminal; the transition table rejects a second
/// attempt)
pub async fn cancel_order(state: &ServerState, order_id: i64) -> AppResult<Order> {
    update_order_status(state, order_id, OrderStatus::Cancelled).await
}

pub async fn get_order(state: &ServerState, order_id: i64) -> AppResult<OrderDetail> {
    let order_row = order::find_by_id(&state.pool, order_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    let items = order::items_by_order(&state.pool, order_id).await?;
    Ok(OrderDetail {
        order: order_row,
        items,
    })
}

pub async fn get_order_by_number(state: &ServerState, order_number: &str) -> AppResult<OrderDetail> {
    let order_row = order::find_by_number(&state.pool, order_number)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    let items = order::items_by_order(&state.pool, order_row.id).await?;
    Ok(OrderDetail {
        order: order_row,
        items,
    })
}

pub async fn list_orders_by_customer(
    state: &ServerState,
    customer_id: i64,
) -> AppResult<Vec<Order>> {
    Ok(order::list_by_customer(&state.pool, customer_id).await?)
}

pub async fn list_orders_by_date_range(
    state: &ServerState,
    from: i64,
    to: i64,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<Order>> {
    if from > to {
        return Err(AppError::validation("Date range start is after its end"));
    }
    Ok(order::list_by_date_range(&state.pool, from, to, limit.clamp(1, 500), offset.max(0)).await?)
}

// ==================== internals ====================

async fn resolve_contact(state: &ServerState, request: &OrderCreate) -> AppResult<Contact> {
    let profile = match request.customer_id {
        Some(id) => Some(
            customer::find_by_id(&state.pool, id)
                .await?
                .ok_or_else(|| AppError::new(ErrorCode::CustomerNotFound))?,
        ),
        None => None,
    };

    let name = request
        .contact_name
        .clone()
        .or_else(|| profile.as_ref().map(|c| c.name.clone()))
        .unwrap_or_default();
    let email = request
        .contact_email
        .clone()
        .or_else(|| profile.as_ref().map(|c| c.email.clone()))
        .unwrap_or_default();
    let phone = request
        .contact_phone
        .clone()
        .or_else(|| profile.as_ref().and_then(|c| c.phone.clone()));

    if name.trim().is_empty() || email.trim().is_empty() {
        return Err(AppError::validation(
            "Order contact name and email are required",
        ));
    }

    Ok(Contact {
        customer_id: request.customer_id,
        name,
        email,
        phone,
    })
}

/// Validate one requested line and snapshot its prices
async fn build_line(
    tx: &mut sqlx::SqliteConnection,
    order_id: i64,
    input: &OrderItemInput,
    now: i64,
    formats: &mut Vec<ProductFormat>,
    line_totals: &mut Vec<rust_decimal::Decimal>,
) -> AppResult<OrderItem> {
    let product_row = product::find_by_id_tx(tx, input.product_id)
        .await?
        .ok_or_else(|| {
            AppError::new(ErrorCode::ProductNotFound).with_detail("product_id", input.product_id)
        })?;

    money::validate_line(input, &product_row)?;

    if !product_row.is_available(input.quantity) {
        let code = if product_row.format.tracks_stock()
            && product_row.status != shared::models::ProductStatus::Unpublished
        {
            ErrorCode::InsufficientStock
        } else {
            ErrorCode::ProductUnavailable
        };
        return Err(AppError::with_message(
            code,
            format!("\"{}\" is not available in the requested quantity", product_row.name),
        )
        .with_detail("product_id", product_row.id));
    }

    let line_total = money::line_total(product_row.effective_price(), input.quantity);
    line_totals.push(line_total);
    formats.push(product_row.format);

    Ok(OrderItem {
        id: util::snowflake_id(),
        order_id,
        product_id: product_row.id,
        product_name: product_row.name.clone(),
        quantity: input.quantity,
        unit_price: product_row.price,
        discount_price: product_row.discount_price,
        line_total: money::to_f64(line_total),
        downloads_used: 0,
        last_downloaded_at: None,
        created_at: now,
    })
}

/// Compensating action for cancellation: put back exactly what the print
/// lines reserved. A vanished product row is logged, not fatal.
async fn restore_print_stock(tx: &mut sqlx::SqliteConnection, order_id: i64) -> AppResult<()> {
    let items = order::items_by_order_tx(tx, order_id).await?;
    for item in &items {
        match product::find_by_id_tx(tx, item.product_id).await? {
            Some(p) if p.format.tracks_stock() => {
                let restored = product::restore_stock(tx, item.product_id, item.quantity).await?;
                if !restored {
                    tracing::warn!(
                        order_id,
                        product_id = item.product_id,
                        "Stock restore affected no rows"
                    );
                }
            }
            Some(_) => {}
            None => {
                tracing::warn!(
                    order_id,
                    product_id = item.product_id,
                    "Product missing during stock restore"
                );
            }
        }
    }
    Ok(())
}
