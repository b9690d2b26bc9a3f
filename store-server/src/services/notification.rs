//! Notification Service
//!
//! Fire-and-forget customer emails. Dispatch failures are logged and never
//! roll back the order/payment/access change that triggered them.

use async_trait::async_trait;
use shared::error::AppResult;
use std::sync::Arc;

/// Outbound notification kinds the order core emits
#[derive(Debug, Clone)]
pub enum Notification {
    OrderConfirmed {
        email: String,
        order_number: String,
        total: f64,
        currency: String,
    },
    PaymentConfirmed {
        email: String,
        order_number: String,
        payment_reference: String,
    },
    DownloadReady {
        email: String,
        product_name: String,
        download_url: String,
    },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::OrderConfirmed { .. } => "order_confirmed",
            Notification::PaymentConfirmed { .. } => "payment_confirmed",
            Notification::DownloadReady { .. } => "download_ready",
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            Notification::OrderConfirmed { email, .. }
            | Notification::PaymentConfirmed { email, .. }
            | Notification::DownloadReady { email, .. } => email,
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, notification: Notification) -> AppResult<()>;
}

/// Default mailer: writes the notification to the log. Real delivery is
/// the mail collaborator's job.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, notification: Notification) -> AppResult<()> {
        tracing::info!(
            kind = notification.kind(),
            recipient = notification.recipient(),
            "Notification dispatched"
        );
        Ok(())
    }
}

/// Dispatch without blocking the caller; failures are logged only.
pub fn notify(mailer: Arc<dyn Mailer>, notification: Notification) {
    tokio::spawn(async move {
        let kind = notification.kind();
        if let Err(e) = mailer.send(notification).await {
            tracing::warn!(kind, error = %e, "Notification delivery failed");
        }
    });
}
