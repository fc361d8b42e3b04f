//! Database access layer

pub mod bookings;
pub mod email_verifications;
pub mod payments;
pub mod profiles;
pub mod services;
pub mod shops;
pub mod staff;
pub mod subscription_events;
pub mod webhook_events;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
