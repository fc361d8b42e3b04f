//! Data models
//!
//! Shared between the cloud service and the mobile app (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are UUID strings; timestamps are Unix milliseconds.

pub mod booking;
pub mod profile;
pub mod service;
pub mod shop;
pub mod staff;
pub mod subscription;

// Re-exports
pub use booking::*;
pub use profile::*;
pub use service::*;
pub use shop::*;
pub use staff::*;
pub use subscription::*;
