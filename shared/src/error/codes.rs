//! Unified error codes for the Folio storefront
//!
//! This module defines all error codes used across the server and clients.
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Catalog / stock / cart errors
//! - 7xxx: Digital download errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order has already been paid
    OrderAlreadyPaid = 4002,
    /// Order has already been cancelled
    OrderAlreadyCancelled = 4003,
    /// Order has no items
    OrderEmpty = 4004,
    /// Order item not found
    OrderItemNotFound = 4005,
    /// Illegal order status transition
    InvalidStatusTransition = 4006,

    // ==================== 5xxx: Payment ====================
    /// Payment processing failed
    PaymentFailed = 5001,
    /// Payment not found
    PaymentNotFound = 5002,
    /// Payment has already been settled (paid or failed)
    PaymentAlreadySettled = 5003,
    /// Invalid payment method for this operation
    PaymentInvalidMethod = 5004,
    /// Payment gateway returned an error
    GatewayError = 5005,
    /// Webhook signature verification failed
    WebhookSignatureInvalid = 5006,
    /// Webhook payload could not be parsed
    WebhookPayloadInvalid = 5007,

    // ==================== 6xxx: Catalog / Stock / Cart ====================
    /// Product not found
    ProductNotFound = 6001,
    /// Product is not available for purchase
    ProductUnavailable = 6002,
    /// Insufficient stock for requested quantity
    InsufficientStock = 6003,
    /// Product carries no digital file
    DigitalFileMissing = 6004,
    /// Cart not found
    CartNotFound = 6101,
    /// Cart is empty
    CartEmpty = 6102,
    /// Customer not found
    CustomerNotFound = 6201,

    // ==================== 7xxx: Digital Download ====================
    /// Digital access record not found
    AccessNotFound = 7001,
    /// Digital access has been revoked
    AccessRevoked = 7002,
    /// Digital access has expired
    AccessExpired = 7003,
    /// Download limit reached
    DownloadLimitReached = 7004,
    /// Download token is invalid
    DownloadTokenInvalid = 7005,
    /// Download token has expired
    DownloadTokenExpired = 7006,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Operation timeout
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,

    // ==================== 94xx: Storage / Side Effects ====================
    /// File storage failed
    FileStorageFailed = 9401,
    /// Notification dispatch failed
    NotificationFailed = 9402,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderAlreadyPaid => "Order has already been paid",
            ErrorCode::OrderAlreadyCancelled => "Order has already been cancelled",
            ErrorCode::OrderEmpty => "Order has no items",
            ErrorCode::OrderItemNotFound => "Order item not found",
            ErrorCode::InvalidStatusTransition => "Illegal order status transition",

            // Payment
            ErrorCode::PaymentFailed => "Payment processing failed",
            ErrorCode::PaymentNotFound => "Payment not found",
            ErrorCode::PaymentAlreadySettled => "Payment has already been settled",
            ErrorCode::PaymentInvalidMethod => "Invalid payment method for this operation",
            ErrorCode::GatewayError => "Payment gateway error",
            ErrorCode::WebhookSignatureInvalid => "Webhook signature verification failed",
            ErrorCode::WebhookPayloadInvalid => "Webhook payload could not be parsed",

            // Catalog / Stock / Cart
            ErrorCode::ProductNotFound => "Product not found",
            ErrorCode::ProductUnavailable => "Product is not available for purchase",
            ErrorCode::InsufficientStock => "Insufficient stock for requested quantity",
            ErrorCode::DigitalFileMissing => "Product carries no digital file",
            ErrorCode::CartNotFound => "Cart not found",
            ErrorCode::CartEmpty => "Cart is empty",
            ErrorCode::CustomerNotFound => "Customer not found",

            // Digital Download
            ErrorCode::AccessNotFound => "Digital access record not found",
            ErrorCode::AccessRevoked => "Digital access has been revoked",
            ErrorCode::AccessExpired => "Digital access has expired",
            ErrorCode::DownloadLimitReached => "Download limit reached",
            ErrorCode::DownloadTokenInvalid => "Download token is invalid",
            ErrorCode::DownloadTokenExpired => "Download token has expired",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::FileStorageFailed => "File storage failed",
            ErrorCode::NotificationFailed => "Notification dispatch failed",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderAlreadyPaid),
            4003 => Ok(ErrorCode::OrderAlreadyCancelled),
            4004 => Ok(ErrorCode::OrderEmpty),
            4005 => Ok(ErrorCode::OrderItemNotFound),
            4006 => Ok(ErrorCode::InvalidStatusTransition),

            // Payment
            5001 => Ok(ErrorCode::PaymentFailed),
            5002 => Ok(ErrorCode::PaymentNotFound),
            5003 => Ok(ErrorCode::PaymentAlreadySettled),
            5004 => Ok(ErrorCode::PaymentInvalidMethod),
            5005 => Ok(ErrorCode::GatewayError),
            5006 => Ok(ErrorCode::WebhookSignatureInvalid),
            5007 => Ok(ErrorCode::WebhookPayloadInvalid),

            // Catalog / Stock / Cart
            6001 => Ok(ErrorCode::ProductNotFound),
            6002 => Ok(ErrorCode::ProductUnavailable),
            6003 => Ok(ErrorCode::InsufficientStock),
            6004 => Ok(ErrorCode::DigitalFileMissing),
            6101 => Ok(ErrorCode::CartNotFound),
            6102 => Ok(ErrorCode::CartEmpty),
            6201 => Ok(ErrorCode::CustomerNotFound),

            // Digital Download
            7001 => Ok(ErrorCode::AccessNotFound),
            7002 => Ok(ErrorCode::AccessRevoked),
            7003 => Ok(ErrorCode::AccessExpired),
            7004 => Ok(ErrorCode::DownloadLimitReached),
            7005 => Ok(ErrorCode::DownloadTokenInvalid),
            7006 => Ok(ErrorCode::DownloadTokenExpired),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),
            9401 => Ok(ErrorCode::FileStorageFailed),
            9402 => Ok(ErrorCode::NotificationFailed),

            other => Err(InvalidErrorCode(other)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.message())
    }
}
