//! Payment Reconciliation Engine
//!
//! Three independently-arriving signals converge on one order state: the
//! gateway webhook, manual approval of offline payments, and session
//! replay by reference. The sole correctness guard is the compare-and-set
//! on the payment row (`status = PENDING`); whoever settles first wins and
//! every later write is a no-op.

use serde::Serialize;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    CheckoutSession, OfflinePaymentSubmit, Order, OrderPaymentStatus, OrderStatus, Payment,
    PaymentApproval, PaymentMethod, PaymentStatus, PaymentType,
};
use shared::util;

use crate::core::ServerState;
use crate::db::repository::{order, payment};
use crate::services::digital_service;
use crate::services::gateway::{
    verify_webhook_signature, CheckoutSessionRequest, EventOutcome, GatewayEvent, SessionState,
};
use crate::services::notification::{self, Notification};

/// What a webhook delivery amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebhookOutcome {
    /// Payment settled to Paid by this delivery
    Processed,
    /// Payment settled to Failed by this delivery
    Failed,
    /// Payment had already left Pending; delivery was a no-op
    AlreadyProcessed,
    /// Event type this core does not react to
    Ignored,
}

/// Start the hosted checkout flow for an order.
///
/// Creates a Gateway/Online payment attempt and stores the session id as
/// the webhook correlation key.
pub async fn start_checkout(state: &ServerState, order_id: i64) -> AppResult<CheckoutSession> {
    let order_row = order::find_by_id(&state.pool, order_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    guard_order_payable(&order_row)?;

    let reference = util::payment_reference();
    let session = state
        .gateway
        .create_checkout_session(CheckoutSessionRequest {
            amount: order_row.total,
            currency: state.config.currency.clone(),
            order_number: order_row.order_number.clone(),
            payment_reference: reference.clone(),
        })
        .await?;

    let now = util::now_millis();
    let payment_row = Payment {
        id: util::snowflake_id(),
        reference: reference.clone(),
        order_id,
        customer_id: order_row.customer_id,
        method: PaymentMethod::Gateway,
        payment_type: PaymentType::Online,
        status: PaymentStatus::Pending,
        amount: order_row.total,
        currency: state.config.currency.clone(),
        gateway_session_id: Some(session.session_id.clone()),
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

    let mut conn = state
        .pool
        .acquire()
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    payment::insert(&mut conn, &payment_row).await?;

    tracing::info!(
        order_id,
        reference = %reference,
        session_id = %session.session_id,
        "Checkout session created"
    );

    Ok(CheckoutSession {
        payment_reference: reference,
        session_id: session.session_id,
        redirect_url: session.redirect_url,
    })
}

/// Record an offline payment submission (bank transfer / cash deposit).
/// The order's payment axis stays Pending until an approver decides.
pub async fn submit_offline_payment(
    state: &ServerState,
    submission: OfflinePaymentSubmit,
) -> AppResult<Payment> {
    if !matches!(
        submission.method,
        PaymentMethod::BankTransfer | PaymentMethod::CashDeposit
    ) {
        return Err(AppError::with_message(
            ErrorCode::PaymentInvalidMethod,
            "Offline submissions must be bank transfers or cash deposits",
        ));
    }

    let order_row = order::find_by_id(&state.pool, submission.order_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    guard_order_payable(&order_row)?;

    let now = util::now_millis();
    let payment_row = Payment {
        id: util::snowflake_id(),
        reference: util::payment_reference(),
        order_id: submission.order_id,
        customer_id: submission.customer_id.or(order_row.customer_id),
        method: submission.method,
        payment_type: PaymentType::Offline,
        status: PaymentStatus::Pending,
        amount: order_row.total,
        currency: state.config.currency.clone(),
        gateway_session_id: None,
        failure_message: None,
        bank_name: submission.bank_name,
        account_name: submission.account_name,
        transaction_id: submission.transaction_id,
        deposit_proof: submission.deposit_proof,
        approved_by: None,
        approved_at: None,
        processed_at: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    let mut conn = state
        .pool
        .acquire()
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    payment::insert(&mut conn, &payment_row).await?;

    tracing::info!(
        order_id = submission.order_id,
        reference = %payment_row.reference,
        method = ?payment_row.method,
        "Offline payment submitted"
    );

    Ok(payment_row)
}

/// Approve or reject a pending offline payment.
///
/// Approval runs the same success transition as the online path; deciding
/// an already-settled or non-offline payment is rejected.
pub async fn approve_offline_payment(
    state: &ServerState,
    payment_id: i64,
    decision: PaymentApproval,
) -> AppResult<Payment> {
    let payment_row = payment::find_by_id(&state.pool, payment_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::PaymentNotFound))?;

    if payment_row.payment_type != PaymentType::Offline {
        return Err(AppError::with_message(
            ErrorCode::PaymentInvalidMethod,
            "Only offline payments can be approved manually",
        ));
    }
    if payment_row.status.is_settled() {
        return Err(AppError::new(ErrorCode::PaymentAlreadySettled));
    }

    if decision.approve {
        // Another payment may have settled the order in the meantime
        let order_row = order::find_by_id(&state.pool, payment_row.order_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
        guard_order_payable(&order_row)?;

        let settled = settle_success(state, &payment_row, Some(&decision.approver)).await?;
        if !settled {
            return Err(AppError::new(ErrorCode::PaymentAlreadySettled));
        }
    } else {
        let now = util::now_millis();
        let mut tx = state
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;
        let settled = payment::settle_failed(
            &mut tx,
            payment_id,
            decision.note.as_deref().or(Some("Rejected by approver")),
            now,
        )
        .await?;
        tx.commit()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;
        if !settled {
            return Err(AppError::new(ErrorCode::PaymentAlreadySettled));
        }
        tracing::info!(payment_id, approver = %decision.approver, "Offline payment rejected");
    }

    payment::find_by_id(&state.pool, payment_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::PaymentNotFound))
}

/// Apply a gateway webhook delivery.
///
/// Matched purely by session id; duplicate or racing deliveries are
/// no-ops because the payment has already left Pending.
pub async fn handle_webhook(
    state: &ServerState,
    body: &[u8],
    signature: Option<&str>,
) -> AppResult<WebhookOutcome> {
    if let Some(secret) = &state.config.gateway_webhook_secret {
        verify_webhook_signature(secret, body, signature)?;
    }

    let event = GatewayEvent::parse(body)?;
    let outcome = event.outcome();

    if outcome == EventOutcome::Ignored {
        tracing::debug!(event_type = %event.event_type, "Ignoring gateway event");
        return Ok(WebhookOutcome::Ignored);
    }

    let payment_row = payment::find_by_session(&state.pool, &event.data.session_id)
        .await?
        .ok_or_else(|| {
            // Reported back to the gateway as a processing failure; its
            // retry loop will redeliver.
            AppError::with_message(
                ErrorCode::PaymentNotFound,
                format!("No payment for session {}", event.data.session_id),
            )
        })?;

    if payment_row.status.is_settled() {
        tracing::info!(
            payment_id = payment_row.id,
            session_id = %event.data.session_id,
            "Webhook for settled payment ignored"
        );
        return Ok(WebhookOutcome::AlreadyProcessed);
    }

    match outcome {
        EventOutcome::Success => {
            let settled = settle_success(state, &payment_row, None).await?;
            Ok(if settled {
                WebhookOutcome::Processed
            } else {
                WebhookOutcome::AlreadyProcessed
            })
        }
        EventOutcome::Failure(message) => {
            let now = util::now_millis();
            let mut tx = state
                .pool
                .begin()
                .await
                .map_err(|e| AppError::database(e.to_string()))?;
            let settled = payment::settle_failed(
                &mut tx,
                payment_row.id,
                message.as_deref().or(Some("Gateway reported failure")),
                now,
            )
            .await?;
            tx.commit()
                .await
                .map_err(|e| AppError::database(e.to_string()))?;
            // Order status untouched: another attempt may still succeed
            tracing::info!(
                payment_id = payment_row.id,
                "Gateway reported payment failure"
            );
            Ok(if settled {
                WebhookOutcome::Failed
            } else {
                WebhookOutcome::AlreadyProcessed
            })
        }
        EventOutcome::Ignored => unreachable!("handled above"),
    }
}

/// Replay the gateway session for a payment reference and reconcile it.
/// Third convergence path, same idempotent guard.
pub async fn verify_payment(state: &ServerState, reference: &str) -> AppResult<Payment> {
    let payment_row = payment::find_by_reference(&state.pool, reference)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::PaymentNotFound))?;

    if payment_row.status.is_settled() || payment_row.payment_type != PaymentType::Online {
        return Ok(payment_row);
    }

    let Some(session_id) = payment_row.gateway_session_id.as_deref() else {
        return Ok(payment_row);
    };

    match state.gateway.verify_session(session_id).await? {
        SessionState::Paid => {
            settle_success(state, &payment_row, None).await?;
        }
        SessionState::Failed(message) => {
            let now = util::now_millis();
            let mut tx = state
                .pool
                .begin()
                .await
                .map_err(|e| AppError::database(e.to_string()))?;
            payment::settle_failed(
                &mut tx,
                payment_row.id,
                message.as_deref().or(Some("Gateway reported failure")),
                now,
            )
            .await?;
            tx.commit()
                .await
                .map_err(|e| AppError::database(e.to_string()))?;
        }
        SessionState::Pending => {}
    }

    payment::find_by_id(&state.pool, payment_row.id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::PaymentNotFound))
}

pub async fn get_payment(state: &ServerState, payment_id: i64) -> AppResult<Payment> {
    payment::find_by_id(&state.pool, payment_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::PaymentNotFound))
}

pub async fn list_payments_by_order(
    state: &ServerState,
    order_id: i64,
) -> AppResult<Vec<Payment>> {
    Ok(payment::list_by_order(&state.pool, order_id).await?)
}

// ==================== internals ====================

/// Both ingestion paths reject attempts against settled or dead orders
fn guard_order_payable(order_row: &Order) -> AppResult<()> {
    if order_row.status == OrderStatus::Cancelled {
        return Err(AppError::new(ErrorCode::OrderAlreadyCancelled));
    }
    if order_row.payment_status == OrderPaymentStatus::Paid {
        return Err(AppError::new(ErrorCode::OrderAlreadyPaid));
    }
    Ok(())
}

/// The shared success transition.
///
/// Payment Pending -> Paid (compare-and-set; returns false to a loser),
/// order payment axis -> Paid, order Pending -> Processing. Digital
/// grants and the confirmation email run post-commit and never unwind the
/// transition.
async fn settle_success(
    state: &ServerState,
    payment_row: &Payment,
    approver: Option<&str>,
) -> AppResult<bool> {
    let now = util::now_millis();

    let mut tx = state
        .pool
        .begin()
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    let won = payment::settle_paid(&mut tx, payment_row.id, approver, now).await?;
    if !won {
        return Ok(false);
    }
    order::mark_paid(&mut tx, payment_row.order_id, now).await?;

    tx.commit()
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    tracing::info!(
        payment_id = payment_row.id,
        order_id = payment_row.order_id,
        approver = approver.unwrap_or("-"),
        "Payment settled"
    );

    // Post-commit side effects: logged, never fatal
    if let Err(e) = digital_service::grant_for_paid_order(state, payment_row.order_id).await {
        tracing::warn!(
            order_id = payment_row.order_id,
            error = %e,
            "Digital access grant after payment failed"
        );
    }

    if let Ok(Some(order_row)) = order::find_by_id(&state.pool, payment_row.order_id).await {
        notification::notify(
            state.mailer.clone(),
            Notification::PaymentConfirmed {
                email: order_row.contact_email,
                order_number: order_row.order_number,
                payment_reference: payment_row.reference.clone(),
            },
        );
    }

    Ok(true)
}
