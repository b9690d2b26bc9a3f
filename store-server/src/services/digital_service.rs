//! Digital Access Controller
//!
//! Grants, rotates, and validates download access for paid digital order
//! lines. One grant per (order item, customer); tokens are short-lived and
//! reissued on demand; the download counter moves only through
//! [`process_download`].

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{DigitalAccess, DownloadLink, TokenWindow};
use shared::util;

use crate::core::ServerState;
use crate::db::repository::{digital_access, order, product, RepoError};
use crate::services::notification::{self, Notification};

/// A file ready to stream back to the customer
#[derive(Debug, Clone)]
pub struct DownloadPayload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Grant download access for a paid digital order line.
///
/// Idempotent: an existing (order item, customer) grant is returned
/// unchanged, revoked or not.
pub async fn grant_access(state: &ServerState, order_item_id: i64) -> AppResult<DigitalAccess> {
    let item = order::find_item(&state.pool, order_item_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderItemNotFound))?;

    let order_row = order::find_by_id(&state.pool, item.order_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;

    if order_row.payment_status != shared::models::OrderPaymentStatus::Paid {
        return Err(AppError::validation(
            "Digital access requires a paid order",
        ));
    }
    let Some(customer_id) = order_row.customer_id else {
        return Err(AppError::validation(
            "Digital access requires a customer account on the order",
        ));
    };

    if let Some(existing) =
        digital_access::find_by_item_customer(&state.pool, order_item_id, customer_id).await?
    {
        return Ok(existing);
    }

    let product_row = product::find_by_id(&state.pool, item.product_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
    if !product_row.has_digital_file() {
        return Err(AppError::new(ErrorCode::DigitalFileMissing)
            .with_detail("product_id", product_row.id));
    }

    let now = util::now_millis();
    let access = DigitalAccess {
        id: util::snowflake_id(),
        order_item_id,
        product_id: product_row.id,
        customer_id,
        granted_at: now,
        expires_at: product_row
            .download_expiry_days
            .map(|days| now + days * 24 * 60 * 60 * 1000),
        download_count: 0,
        max_downloads: product_row
            .max_downloads
            .unwrap_or(state.config.default_max_downloads),
        token: Some(util::download_token()),
        token_issued_at: Some(now),
        token_expires_at: Some(now + state.config.token_ttl_ms()),
        last_downloaded_at: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    match digital_access::insert(&state.pool, &access).await {
        Ok(()) => {
            tracing::info!(
                access_id = access.id,
                order_item_id,
                customer_id,
                "Digital access granted"
            );
            Ok(access)
        }
        // Concurrent grant lost the UNIQUE race; the winner's row is the
        // grant.
        Err(RepoError::Duplicate(_)) => {
            digital_access::find_by_item_customer(&state.pool, order_item_id, customer_id)
                .await?
                .ok_or_else(|| AppError::new(ErrorCode::AccessNotFound))
        }
        Err(e) => Err(e.into()),
    }
}

/// Grant access for every digital line of a freshly paid order and send
/// the download links. Called post-commit by the reconciliation engine.
pub async fn grant_for_paid_order(
    state: &ServerState,
    order_id: i64,
) -> AppResult<Vec<DigitalAccess>> {
    let order_row = order::find_by_id(&state.pool, order_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    let items = order::items_by_order(&state.pool, order_id).await?;

    let mut granted = Vec::new();
    for item in &items {
        let product_row = match product::find_by_id(&state.pool, item.product_id).await? {
            Some(p) => p,
            None => {
                tracing::warn!(
                    order_id,
                    product_id = item.product_id,
                    "Product missing during digital grant"
                );
                continue;
            }
        };
        if !product_row.has_digital_file() {
            continue;
        }

        match grant_access(state, item.id).await {
            Ok(access) => {
                if let Ok(link) = generate_download_link(state, access.id).await {
                    notification::notify(
                        state.mailer.clone(),
                        Notification::DownloadReady {
                            email: order_row.contact_email.clone(),
                            product_name: product_row.name.clone(),
                            download_url: link.url,
                        },
                    );
                }
                granted.push(access);
            }
            Err(e) => {
                tracing::warn!(
                    order_id,
                    order_item_id = item.id,
                    error = %e,
                    "Digital grant failed for order line"
                );
            }
        }
    }

    Ok(granted)
}

/// Build a customer-facing download link, rotating the token if its window
/// is missing or about to close.
pub async fn generate_download_link(
    state: &ServerState,
    access_id: i64,
) -> AppResult<DownloadLink> {
    let access = digital_access::find_by_id(&state.pool, access_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::AccessNotFound))?;

    let now = util::now_millis();
    check_access_usable(&access, now)?;

    let window = ensure_token(state, &access, now).await?;

    Ok(DownloadLink {
        access_id: access.id,
        url: format!(
            "{}/api/downloads/file/{}",
            state.config.public_base_url, window.token
        ),
        token: window.token,
        expires_at: window.expires_at,
        downloads_remaining: access.max_downloads - access.download_count,
    })
}

/// Resolve a token and stream the file, counting the download.
///
/// This is the only path that increments the counter; link generation and
/// validation never do.
pub async fn process_download(state: &ServerState, token: &str) -> AppResult<DownloadPayload> {
    let access = resolve_token(state, token).await?;
    let now = util::now_millis();

    let product_row = product::find_by_id(&state.pool, access.product_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
    let file_path = product_row
        .digital_file_path
        .clone()
        .ok_or_else(|| AppError::new(ErrorCode::DigitalFileMissing))?;

    // Fetch first: a storage failure must not consume a download
    let bytes = state.storage.retrieve(&file_path).await?;

    let mut tx = state
        .pool
        .begin()
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    let counted = digital_access::record_download(&mut tx, access.id, now).await?;
    if !counted {
        // Lost a race to the last remaining download
        return Err(AppError::new(ErrorCode::DownloadLimitReached));
    }
    order::record_item_download(&mut tx, access.order_item_id, now).await?;
    tx.commit()
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    tracing::info!(
        access_id = access.id,
        download = access.download_count + 1,
        max = access.max_downloads,
        "Download served"
    );

    let file_name = file_path
        .rsplit('/')
        .next()
        .unwrap_or("download")
        .to_string();
    let content_type = mime_guess::from_path(&file_name)
        .first_or_octet_stream()
        .to_string();

    Ok(DownloadPayload {
        file_name,
        content_type,
        bytes,
    })
}

/// Validate a token without consuming a download
pub async fn validate_token(state: &ServerState, token: &str) -> AppResult<DigitalAccess> {
    resolve_token(state, token).await
}

pub async fn get_access(state: &ServerState, access_id: i64) -> AppResult<DigitalAccess> {
    digital_access::find_by_id(&state.pool, access_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::AccessNotFound))
}

pub async fn list_access_by_customer(
    state: &ServerState,
    customer_id: i64,
) -> AppResult<Vec<DigitalAccess>> {
    Ok(digital_access::list_by_customer(&state.pool, customer_id).await?)
}

/// Admin adjustment of an existing grant (cap, hard expiry, active flag)
pub async fn update_access(
    state: &ServerState,
    access_id: i64,
    data: shared::models::DigitalAccessUpdate,
) -> AppResult<DigitalAccess> {
    if let Some(max) = data.max_downloads {
        if max <= 0 {
            return Err(AppError::validation("max_downloads must be positive"));
        }
    }
    digital_access::update(&state.pool, access_id, &data)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::AccessNotFound))
}

/// List grants that cleanup would deactivate
pub async fn list_expired_access(state: &ServerState) -> AppResult<Vec<DigitalAccess>> {
    Ok(digital_access::list_expired(&state.pool, util::now_millis()).await?)
}

/// Deactivate a grant and clear its token. The record remains for audit.
pub async fn revoke_access(state: &ServerState, access_id: i64) -> AppResult<bool> {
    let revoked = digital_access::deactivate(&state.pool, access_id).await?;
    if revoked {
        tracing::info!(access_id, "Digital access revoked");
    }
    Ok(revoked)
}

/// Bulk-deactivate hard-expired and exhausted grants. Safe to run
/// repeatedly.
pub async fn cleanup_expired_access(state: &ServerState) -> AppResult<u64> {
    let count = digital_access::cleanup_expired(&state.pool, util::now_millis()).await?;
    if count > 0 {
        tracing::info!(count, "Expired digital access deactivated");
    }
    Ok(count)
}

// ==================== internals ====================

/// Shared usability checks; order matters so the caller gets the most
/// specific failure.
fn check_access_usable(access: &DigitalAccess, now: i64) -> AppResult<()> {
    if !access.is_active {
        return Err(AppError::new(ErrorCode::AccessRevoked));
    }
    if access.is_expired(now) {
        return Err(AppError::new(ErrorCode::AccessExpired));
    }
    if !access.has_downloads_remaining() {
        return Err(AppError::new(ErrorCode::DownloadLimitReached));
    }
    Ok(())
}

async fn resolve_token(state: &ServerState, token: &str) -> AppResult<DigitalAccess> {
    let access = digital_access::find_by_token(&state.pool, token)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::DownloadTokenInvalid))?;

    let now = util::now_millis();
    check_access_usable(&access, now)?;

    match access.token_window() {
        Some(window) if window.is_current(now) => Ok(access),
        _ => Err(AppError::new(ErrorCode::DownloadTokenExpired)),
    }
}

/// Reuse the current token while it is comfortably valid, otherwise
/// rotate. Rotation touches only the token window.
async fn ensure_token(
    state: &ServerState,
    access: &DigitalAccess,
    now: i64,
) -> AppResult<TokenWindow> {
    if let Some(current) = access.token_window() {
        if !TokenWindow::needs_rotation(
            Some(&current),
            now,
            state.config.token_rotation_margin_ms(),
        ) {
            return Ok(current);
        }
    }

    let window = TokenWindow {
        token: util::download_token(),
        issued_at: now,
        expires_at: now + state.config.token_ttl_ms(),
    };
    digital_access::set_token(
        &state.pool,
        access.id,
        &window.token,
        window.issued_at,
        window.expires_at,
    )
    .await?;

    tracing::debug!(access_id = access.id, "Download token rotated");

    Ok(window)
}
