//! Shared types for HappyInline
//!
//! Common types used by the cloud service and its clients: error types,
//! response structures, domain models and small utilities.

pub mod deep_link;
pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};
