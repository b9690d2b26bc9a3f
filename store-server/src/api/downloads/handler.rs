//! Digital Download API Handlers

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::core::ServerState;
use crate::services::digital_service;
use shared::error::{AppError, AppResult};
use shared::models::{DigitalAccess, DownloadLink};

#[derive(Deserialize)]
pub struct AccessQuery {
    pub customer_id: i64,
}

#[derive(Serialize)]
pub struct CleanupResponse {
    pub deactivated: u64,
}

#[derive(Serialize)]
pub struct RevokeResponse {
    pub revoked: bool,
}

/// GET /api/downloads/access?customer_id= - 客户的有效访问授权
pub async fn list_access(
    State(state): State<ServerState>,
    Query(query): Query<AccessQuery>,
) -> AppResult<Json<Vec<DigitalAccess>>> {
    let access = digital_service::list_access_by_customer(&state, query.customer_id).await?;
    Ok(Json(access))
}

/// GET /api/downloads/access/{id} - 获取访问授权
pub async fn get_access(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<DigitalAccess>> {
    let access = digital_service::get_access(&state, id).await?;
    Ok(Json(access))
}

/// PUT /api/downloads/access/{id} - 调整授权 (上限/过期/启用)
pub async fn update_access(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<shared::models::DigitalAccessUpdate>,
) -> AppResult<Json<DigitalAccess>> {
    let access = digital_service::update_access(&state, id, payload).await?;
    Ok(Json(access))
}

/// POST /api/downloads/access/{id}/revoke - 撤销访问授权
pub async fn revoke_access(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<RevokeResponse>> {
    let revoked = digital_service::revoke_access(&state, id).await?;
    Ok(Json(RevokeResponse { revoked }))
}

/// POST /api/downloads/grant/{order_item_id} - 手动授予访问 (幂等)
pub async fn grant(
    State(state): State<ServerState>,
    Path(order_item_id): Path<i64>,
) -> AppResult<Json<DigitalAccess>> {
    let access = digital_service::grant_access(&state, order_item_id).await?;
    Ok(Json(access))
}

/// GET /api/downloads/link/{access_id} - 生成下载链接 (必要时轮换令牌)
pub async fn link(
    State(state): State<ServerState>,
    Path(access_id): Path<i64>,
) -> AppResult<Json<DownloadLink>> {
    let link = digital_service::generate_download_link(&state, access_id).await?;
    Ok(Json(link))
}

/// GET /api/downloads/file/{token} - 按令牌下载文件 (消耗一次下载)
pub async fn download(
    State(state): State<ServerState>,
    Path(token): Path<String>,
) -> AppResult<impl IntoResponse> {
    let payload = digital_service::process_download(&state, &token).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&payload.content_type)
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    let disposition = format!("attachment; filename=\"{}\"", payload.file_name);
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .map_err(|_| AppError::internal("Invalid file name for download"))?,
    );

    Ok((headers, payload.bytes))
}

/// GET /api/downloads/validate/{token} - 校验令牌 (不消耗下载次数)
pub async fn validate(
    State(state): State<ServerState>,
    Path(token): Path<String>,
) -> AppResult<Json<DigitalAccess>> {
    let access = digital_service::validate_token(&state, &token).await?;
    Ok(Json(access))
}

/// GET /api/downloads/expired - 清理候选列表
pub async fn list_expired(
    State(state): State<ServerState>,
) -> AppResult<Json<Vec<DigitalAccess>>> {
    let access = digital_service::list_expired_access(&state).await?;
    Ok(Json(access))
}

/// POST /api/downloads/cleanup - 批量停用过期/用尽的授权 (幂等)
pub async fn cleanup(State(state): State<ServerState>) -> AppResult<Json<CleanupResponse>> {
    let deactivated = digital_service::cleanup_expired_access(&state).await?;
    Ok(Json(CleanupResponse { deactivated }))
}
