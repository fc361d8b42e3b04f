//! Subscription billing
//!
//! - [`plans`]: prices, tiers, upgrade options, barber quotas
//! - [`proration`]: flat 30-day upgrade proration
//! - [`lifecycle`]: refund window and cancellation decision
//! - [`service`]: orchestration over [`StripeGateway`](crate::stripe::StripeGateway)
//!   and [`BillingStore`](store::BillingStore)

pub mod lifecycle;
pub mod plans;
pub mod proration;
pub mod service;
pub mod store;

use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::{SubscriptionPlan, SubscriptionStatus};

pub use service::BillingService;

/// Subscription columns of a `profiles` row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BillingProfile {
    pub id: String,
    pub email: String,
    pub subscription_plan: String,
    pub subscription_status: String,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub stripe_payment_intent_id: Option<String>,
    pub payment_amount: Option<Decimal>,
    pub subscription_start_date: Option<i64>,
    pub refund_eligible_until: Option<i64>,
    pub next_billing_date: Option<i64>,
    pub access_until: Option<i64>,
}

impl BillingProfile {
    /// Stored plan; unknown values read as `None`
    pub fn plan(&self) -> SubscriptionPlan {
        SubscriptionPlan::from_db(&self.subscription_plan).unwrap_or(SubscriptionPlan::None)
    }

    /// Stored status; unknown values read as `None`
    pub fn status(&self) -> SubscriptionStatus {
        SubscriptionStatus::from_db(&self.subscription_status).unwrap_or(SubscriptionStatus::None)
    }

    /// Blank profile on the free tier
    #[cfg(test)]
    pub fn free(id: &str) -> Self {
        Self {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            subscription_plan: "none".to_string(),
            subscription_status: "none".to_string(),
            stripe_customer_id: None,
            stripe_subscription_id: None,
            stripe_payment_intent_id: None,
            payment_amount: None,
            subscription_start_date: None,
            refund_eligible_until: None,
            next_billing_date: None,
            access_until: None,
        }
    }
}
