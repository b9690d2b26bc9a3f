//! Payment Gateway Client
//!
//! Hosted-checkout integration boundary. The storefront creates a checkout
//! session for the order total and stores the session id on the payment
//! row; the gateway later reports the outcome through signed webhook
//! events and a session-replay endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared::error::{AppError, AppResult, ErrorCode};
use std::collections::HashMap;
use std::sync::Mutex;

/// Checkout session request
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSessionRequest {
    pub amount: f64,
    pub currency: String,
    pub order_number: String,
    pub payment_reference: String,
}

/// Hosted checkout session returned by the gateway
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySession {
    pub session_id: String,
    pub redirect_url: String,
}

/// Replayed state of a checkout session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Pending,
    Paid,
    Failed(Option<String>),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session for an amount/currency
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> AppResult<GatewaySession>;

    /// Replay a session by id (used by verify-by-reference)
    async fn verify_session(&self, session_id: &str) -> AppResult<SessionState>;
}

// ==================== Webhook events ====================

/// Parsed gateway callback
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayEvent {
    /// Event type string, e.g. `checkout.session.completed`
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: GatewayEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayEventData {
    pub session_id: String,
    pub failure_message: Option<String>,
}

/// What a callback means for the matched payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Success,
    Failure(Option<String>),
    /// Event types this core does not react to
    Ignored,
}

impl GatewayEvent {
    pub fn parse(body: &[u8]) -> AppResult<Self> {
        serde_json::from_slice(body).map_err(|e| {
            AppError::with_message(
                ErrorCode::WebhookPayloadInvalid,
                format!("Webhook payload could not be parsed: {e}"),
            )
        })
    }

    pub fn outcome(&self) -> EventOutcome {
        match self.event_type.as_str() {
            "checkout.session.completed"
            | "checkout.session.async_payment_succeeded"
            | "payment_intent.succeeded" => EventOutcome::Success,
            "checkout.session.async_payment_failed" | "payment_intent.payment_failed" => {
                EventOutcome::Failure(self.data.failure_message.clone())
            }
            _ => EventOutcome::Ignored,
        }
    }
}

/// Hex sha256 digest over `secret || body`; the scheme the gateway signs
/// webhook deliveries with.
pub fn webhook_signature(secret: &str, body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(body);
    hex::encode(hasher.finalize())
}

/// Verify a webhook delivery. A missing or mismatched signature is a typed
/// failure so the gateway's retry loop kicks in.
pub fn verify_webhook_signature(
    secret: &str,
    body: &[u8],
    signature: Option<&str>,
) -> AppResult<()> {
    let expected = webhook_signature(secret, body);
    match signature {
        Some(sig) if sig == expected => Ok(()),
        _ => Err(AppError::new(ErrorCode::WebhookSignatureInvalid)),
    }
}

// ==================== REST adapter ====================

/// Gateway client over the REST API
pub struct RestGateway {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct RestSessionStatus {
    status: String,
    failure_message: Option<String>,
}

impl RestGateway {
    pub fn new(base_url: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            secret_key: secret_key.into(),
        }
    }
}

#[async_trait]
impl PaymentGateway for RestGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> AppResult<GatewaySession> {
        let url = format!("{}/v1/checkout/sessions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::gateway(format!("Checkout session request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::gateway(format!(
                "Gateway rejected checkout session: {}",
                response.status()
            )));
        }

        response
            .json::<GatewaySession>()
            .await
            .map_err(|e| AppError::gateway(format!("Malformed gateway response: {e}")))
    }

    async fn verify_session(&self, session_id: &str) -> AppResult<SessionState> {
        let url = format!("{}/v1/checkout/sessions/{}", self.base_url, session_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| AppError::gateway(format!("Session verify request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::gateway(format!(
                "Gateway rejected session verify: {}",
                response.status()
            )));
        }

        let status = response
            .json::<RestSessionStatus>()
            .await
            .map_err(|e| AppError::gateway(format!("Malformed gateway response: {e}")))?;

        Ok(match status.status.as_str() {
            "paid" | "complete" => SessionState::Paid,
            "failed" | "expired" => SessionState::Failed(status.failure_message),
            _ => SessionState::Pending,
        })
    }
}

// ==================== Mock adapter ====================

/// In-process gateway for tests and gateway-less dev runs. Sessions are
/// held in memory; tests drive their state directly.
#[derive(Default)]
pub struct MockGateway {
    sessions: Mutex<HashMap<String, SessionState>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook: move a session to a terminal state
    pub fn set_session_state(&self, session_id: &str, state: SessionState) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session_id.to_string(), state);
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> AppResult<GatewaySession> {
        if request.amount <= 0.0 {
            return Err(AppError::gateway("Amount must be greater than zero"));
        }
        let session_id = format!("cs_mock_{}", shared::util::snowflake_id());
        self.sessions
            .lock()
            .unwrap()
            .insert(session_id.clone(), SessionState::Pending);
        Ok(GatewaySession {
            redirect_url: format!("https://gateway.invalid/pay/{session_id}"),
            session_id,
        })
    }

    async fn verify_session(&self, session_id: &str) -> AppResult<SessionState> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or_else(|| AppError::gateway(format!("Unknown session {session_id}")))
    }
}
