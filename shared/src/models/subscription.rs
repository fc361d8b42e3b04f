//! Subscription and billing models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Subscription plan, ordered by tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
    None,
    Basic,
    Professional,
    Enterprise,
    Unlimited,
}

impl SubscriptionPlan {
    /// Every plan, lowest tier first
    pub const ALL: [SubscriptionPlan; 5] = [
        Self::None,
        Self::Basic,
        Self::Professional,
        Self::Enterprise,
        Self::Unlimited,
    ];

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Self::None),
            "basic" => Some(Self::Basic),
            "professional" => Some(Self::Professional),
            "enterprise" => Some(Self::Enterprise),
            "unlimited" => Some(Self::Unlimited),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Basic => "basic",
            Self::Professional => "professional",
            Self::Enterprise => "enterprise",
            Self::Unlimited => "unlimited",
        }
    }

    pub fn is_paid(&self) -> bool {
        *self != Self::None
    }
}

impl std::fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db())
    }
}

/// Subscription status stored on the profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Never subscribed
    None,
    /// Paid and current
    Active,
    /// Renewal payment failed
    PastDue,
    /// Cancelled after the refund window, access until period end
    Cancelled,
    /// Cancelled inside the refund window and refunded
    Refunded,
}

impl SubscriptionStatus {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Self::None),
            "active" => Some(Self::Active),
            "past_due" => Some(Self::PastDue),
            "cancelled" => Some(Self::Cancelled),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    /// Already ended by the user (no further cancel / refund possible)
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded)
    }
}

/// Kind of a `payment_history` row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    /// Initial or renewal charge
    Charge,
    /// Upgrade proration charge
    Proration,
    /// Refund (stored as a positive amount)
    Refund,
}

impl PaymentKind {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Charge => "charge",
            Self::Proration => "proration",
            Self::Refund => "refund",
        }
    }
}

/// Row of `payment_history`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct PaymentRecord {
    pub id: String,
    pub user_id: String,
    /// See [`PaymentKind`]
    pub kind: String,
    pub plan: String,
    pub amount: Decimal,
    pub currency: String,
    /// Stripe object id (payment intent, invoice or refund)
    pub stripe_reference: Option<String>,
    pub description: Option<String>,
    pub created_at: i64,
}

/// Row of `subscription_events`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct SubscriptionEvent {
    pub id: i64,
    pub user_id: String,
    pub event_type: String,
    pub detail: Option<serde_json::Value>,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_tier_order() {
        assert!(SubscriptionPlan::None < SubscriptionPlan::Basic);
        assert!(SubscriptionPlan::Basic < SubscriptionPlan::Professional);
        assert!(SubscriptionPlan::Professional < SubscriptionPlan::Enterprise);
        assert!(SubscriptionPlan::Enterprise < SubscriptionPlan::Unlimited);
        assert!(SubscriptionPlan::ALL.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_plan_db_round_trip() {
        for plan in SubscriptionPlan::ALL {
            assert_eq!(SubscriptionPlan::from_db(plan.as_db()), Some(plan));
        }
        assert_eq!(SubscriptionPlan::from_db("gold"), None);
        assert!(!SubscriptionPlan::None.is_paid());
        assert!(SubscriptionPlan::Basic.is_paid());
    }

    #[test]
    fn test_status_closed() {
        assert!(SubscriptionStatus::Cancelled.is_closed());
        assert!(SubscriptionStatus::Refunded.is_closed());
        assert!(!SubscriptionStatus::Active.is_closed());
        assert!(!SubscriptionStatus::PastDue.is_closed());
        assert_eq!(
            SubscriptionStatus::from_db("past_due"),
            Some(SubscriptionStatus::PastDue)
        );
    }
}
