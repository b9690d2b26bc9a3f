//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::OrderNotFound
            | Self::OrderItemNotFound
            | Self::PaymentNotFound
            | Self::ProductNotFound
            | Self::CartNotFound
            | Self::CustomerNotFound
            | Self::AccessNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::AlreadyExists
            | Self::OrderAlreadyPaid
            | Self::OrderAlreadyCancelled
            | Self::PaymentAlreadySettled => StatusCode::CONFLICT,

            // 422 Unprocessable Entity (state machine violations)
            Self::InvalidStatusTransition => StatusCode::UNPROCESSABLE_ENTITY,

            // 401 Unauthorized (stale download credential)
            Self::DownloadTokenInvalid | Self::DownloadTokenExpired => StatusCode::UNAUTHORIZED,

            // 403 Forbidden (access revoked or exhausted)
            Self::AccessRevoked | Self::DownloadLimitReached => StatusCode::FORBIDDEN,

            // 410 Gone (hard expiry passed)
            Self::AccessExpired => StatusCode::GONE,

            // 402 Payment Required
            Self::PaymentFailed => StatusCode::PAYMENT_REQUIRED,

            // 502 Bad Gateway (upstream payment gateway failure)
            Self::GatewayError => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable (transient errors, client can retry)
            Self::NetworkError | Self::TimeoutError => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::InternalError
            | Self::DatabaseError
            | Self::ConfigError
            | Self::FileStorageFailed
            | Self::NotificationFailed => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (default for validation/business errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
