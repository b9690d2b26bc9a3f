//! Payment API Handlers

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::core::ServerState;
use crate::services::payment_service::{self, WebhookOutcome};
use shared::error::{AppError, AppResult};
use shared::models::{
    CheckoutSession, CheckoutStart, OfflinePaymentSubmit, Payment, PaymentApproval, PaymentMethod,
};

/// Offline submission with field constraints checked at the boundary
#[derive(Debug, Deserialize, Validate)]
pub struct OfflinePaymentRequest {
    pub order_id: i64,
    pub customer_id: Option<i64>,
    pub method: PaymentMethod,
    #[validate(length(min = 1, max = 100))]
    pub bank_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub account_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub transaction_id: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub deposit_proof: Option<String>,
}

#[derive(serde::Serialize)]
pub struct WebhookResponse {
    pub outcome: WebhookOutcome,
}

/// POST /api/payments/checkout - 创建托管结账会话
pub async fn start_checkout(
    State(state): State<ServerState>,
    Json(payload): Json<CheckoutStart>,
) -> AppResult<Json<CheckoutSession>> {
    let session = payment_service::start_checkout(&state, payload.order_id).await?;
    Ok(Json(session))
}

/// POST /api/payments/offline - 提交线下付款凭证
pub async fn submit_offline(
    State(state): State<ServerState>,
    Json(payload): Json<OfflinePaymentRequest>,
) -> AppResult<Json<Payment>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let payment = payment_service::submit_offline_payment(
        &state,
        OfflinePaymentSubmit {
            order_id: payload.order_id,
            customer_id: payload.customer_id,
            method: payload.method,
            bank_name: payload.bank_name,
            account_name: payload.account_name,
            transaction_id: payload.transaction_id,
            deposit_proof: payload.deposit_proof,
        },
    )
    .await?;
    Ok(Json(payment))
}

/// POST /api/payments/{id}/approve - 审批线下付款
pub async fn approve_offline(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<PaymentApproval>,
) -> AppResult<Json<Payment>> {
    if payload.approver.trim().is_empty() {
        return Err(AppError::validation("Approver is required"));
    }
    let payment = payment_service::approve_offline_payment(&state, id, payload).await?;
    Ok(Json(payment))
}

/// GET /api/payments/{id} - 获取支付记录
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Payment>> {
    let payment = payment_service::get_payment(&state, id).await?;
    Ok(Json(payment))
}

/// GET /api/payments/order/{order_id} - 按订单列出支付记录
pub async fn list_by_order(
    State(state): State<ServerState>,
    Path(order_id): Path<i64>,
) -> AppResult<Json<Vec<Payment>>> {
    let payments = payment_service::list_payments_by_order(&state, order_id).await?;
    Ok(Json(payments))
}

/// GET /api/payments/verify/{reference} - 按参考号回查网关并对账
pub async fn verify(
    State(state): State<ServerState>,
    Path(reference): Path<String>,
) -> AppResult<Json<Payment>> {
    let payment = payment_service::verify_payment(&state, &reference).await?;
    Ok(Json(payment))
}

/// POST /api/payments/webhook - 网关事件回调
///
/// 返回错误状态码会触发网关重试。
pub async fn webhook(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<WebhookResponse>> {
    let signature = headers
        .get("x-gateway-signature")
        .and_then(|v| v.to_str().ok());

    let outcome = payment_service::handle_webhook(&state, &body, signature).await?;
    Ok(Json(WebhookResponse { outcome }))
}
