//! Shared types for the Folio storefront
//!
//! Common types used across crates: domain models, the unified error
//! system, response structures, and small utilities.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
