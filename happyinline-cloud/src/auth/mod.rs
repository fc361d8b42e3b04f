//! Authentication and authorization for user requests

pub mod rate_limit;
pub mod shop_access;
pub mod user_auth;

pub use rate_limit::RateLimiter;
pub use user_auth::UserIdentity;
