//! Data models
//!
//! Shared between store-server and API clients.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY).

pub mod cart;
pub mod customer;
pub mod digital_access;
pub mod order;
pub mod payment;
pub mod product;

// Re-exports
pub use cart::*;
pub use customer::*;
pub use digital_access::*;
pub use order::*;
pub use payment::*;
pub use product::*;
