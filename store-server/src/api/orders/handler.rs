//! Order API Handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::core::ServerState;
use crate::services::order_service;
use shared::error::AppResult;
use shared::models::{
    Order, OrderCreate, OrderDetail, OrderStatusUpdate, PaymentMethod,
};
use shared::util;

/// List query: by customer, or by creation date range (paginated)
#[derive(Deserialize)]
pub struct ListQuery {
    pub customer_id: Option<i64>,
    /// Millisecond timestamps
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize)]
pub struct FromCartBody {
    pub payment_method: Option<PaymentMethod>,
}

/// POST /api/orders - 创建订单
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<OrderCreate>,
) -> AppResult<Json<OrderDetail>> {
    let detail = order_service::create_order(&state, payload).await?;
    Ok(Json(detail))
}

/// POST /api/orders/from-cart/{cart_id} - 购物车下单
pub async fn create_from_cart(
    State(state): State<ServerState>,
    Path(cart_id): Path<i64>,
    Json(payload): Json<FromCartBody>,
) -> AppResult<Json<OrderDetail>> {
    let detail =
        order_service::create_order_from_cart(&state, cart_id, payload.payment_method).await?;
    Ok(Json(detail))
}

/// GET /api/orders/{id} - 获取单个订单
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<OrderDetail>> {
    let detail = order_service::get_order(&state, id).await?;
    Ok(Json(detail))
}

/// GET /api/orders/number/{order_number} - 按订单号查询
pub async fn get_by_number(
    State(state): State<ServerState>,
    Path(order_number): Path<String>,
) -> AppResult<Json<OrderDetail>> {
    let detail = order_service::get_order_by_number(&state, &order_number).await?;
    Ok(Json(detail))
}

/// GET /api/orders - 订单列表 (按客户或时间范围)
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Order>>> {
    if let Some(customer_id) = query.customer_id {
        let orders = order_service::list_orders_by_customer(&state, customer_id).await?;
        return Ok(Json(orders));
    }

    let to = query.to.unwrap_or_else(util::now_millis);
    let from = query.from.unwrap_or(0);
    let orders = order_service::list_orders_by_date_range(
        &state,
        from,
        to,
        query.limit.unwrap_or(50),
        query.offset.unwrap_or(0),
    )
    .await?;
    Ok(Json(orders))
}

/// PUT /api/orders/{id}/status - 更新订单状态
pub async fn update_status(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<OrderStatusUpdate>,
) -> AppResult<Json<Order>> {
    let order = order_service::update_order_status(&state, id, payload.status).await?;
    Ok(Json(order))
}

/// POST /api/orders/{id}/cancel - 取消订单 (恢复库存)
pub async fn cancel(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Order>> {
    let order = order_service::cancel_order(&state, id).await?;
    Ok(Json(order))
}
