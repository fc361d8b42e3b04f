//! Subscription lifecycle rules
//!
//! A subscription is charged immediately on creation (no trial) and is
//! refundable for 7 days. Cancelling inside that window cancels at once and
//! refunds the stored payment; cancelling after it keeps access until the
//! next billing date. Upgrading ends refund eligibility for good.

use rust_decimal::Decimal;
use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::util::DAY_MS;

use super::BillingProfile;

/// Refund window after purchase
pub const REFUND_WINDOW_MS: i64 = 7 * DAY_MS;

/// Length of one billing period
pub const BILLING_PERIOD_MS: i64 = 30 * DAY_MS;

pub fn refund_eligible_until(created_at: i64) -> i64 {
    created_at + REFUND_WINDOW_MS
}

/// `now` is strictly before the stored deadline
pub fn is_refund_eligible(refund_eligible_until: Option<i64>, now: i64) -> bool {
    refund_eligible_until.is_some_and(|until| now < until)
}

/// Milliseconds left in the refund window, if still open
pub fn refund_window_remaining(refund_eligible_until: Option<i64>, now: i64) -> Option<i64> {
    refund_eligible_until
        .filter(|until| now < *until)
        .map(|until| until - now)
}

/// What cancelling a subscription does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancellationPlan {
    /// No Stripe subscription on record: drop to the free plan locally
    LocalDowngrade,
    /// Inside the refund window: cancel now and refund the stored payment
    CancelAndRefund {
        subscription_id: String,
        payment_intent_id: String,
        amount: Option<Decimal>,
    },
    /// Outside the refund window: stop renewal, keep access until period end
    CancelAtPeriodEnd {
        subscription_id: String,
        access_until: Option<i64>,
    },
}

/// Outcome label reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationKind {
    LocalDowngrade,
    Refunded,
    CancelledAtPeriodEnd,
}

impl CancellationPlan {
    pub fn kind(&self) -> CancellationKind {
        match self {
            Self::LocalDowngrade => CancellationKind::LocalDowngrade,
            Self::CancelAndRefund { .. } => CancellationKind::Refunded,
            Self::CancelAtPeriodEnd { .. } => CancellationKind::CancelledAtPeriodEnd,
        }
    }
}

/// Decide how to cancel `profile`'s subscription at `now`
///
/// A refund needs the original payment intent; inside the window without one
/// the subscription is cancelled at period end instead.
pub fn plan_cancellation(profile: &BillingProfile, now: i64) -> Result<CancellationPlan, AppError> {
    if profile.status().is_closed() {
        return Err(AppError::new(ErrorCode::SubscriptionAlreadyCancelled));
    }

    let Some(subscription_id) = profile.stripe_subscription_id.clone() else {
        return Ok(CancellationPlan::LocalDowngrade);
    };

    if is_refund_eligible(profile.refund_eligible_until, now)
        && let Some(payment_intent_id) = profile.stripe_payment_intent_id.clone()
    {
        return Ok(CancellationPlan::CancelAndRefund {
            subscription_id,
            payment_intent_id,
            amount: profile.payment_amount,
        });
    }

    Ok(CancellationPlan::CancelAtPeriodEnd {
        subscription_id,
        access_until: profile.next_billing_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::util::MINUTE_MS;

    const HOUR_MS: i64 = 60 * MINUTE_MS;
    const CREATED: i64 = 1_760_000_000_000;

    fn subscribed() -> BillingProfile {
        BillingProfile {
            subscription_plan: "basic".to_string(),
            subscription_status: "active".to_string(),
            stripe_customer_id: Some("cus_1".to_string()),
            stripe_subscription_id: Some("sub_1".to_string()),
            stripe_payment_intent_id: Some("pi_1".to_string()),
            payment_amount: Some(Decimal::new(2499, 2)),
            subscription_start_date: Some(CREATED),
            refund_eligible_until: Some(refund_eligible_until(CREATED)),
            next_billing_date: Some(CREATED + BILLING_PERIOD_MS),
            ..BillingProfile::free("u1")
        }
    }

    #[test]
    fn test_refund_window_boundaries() {
        let until = Some(refund_eligible_until(CREATED));
        assert!(is_refund_eligible(until, CREATED + 6 * DAY_MS + 23 * HOUR_MS));
        assert!(!is_refund_eligible(until, CREATED + 7 * DAY_MS + HOUR_MS));
        assert!(!is_refund_eligible(until, CREATED + 7 * DAY_MS));
        assert!(!is_refund_eligible(None, CREATED));
    }

    #[test]
    fn test_refund_window_remaining() {
        let until = Some(refund_eligible_until(CREATED));
        assert_eq!(
            refund_window_remaining(until, CREATED + 6 * DAY_MS),
            Some(DAY_MS)
        );
        assert_eq!(refund_window_remaining(until, CREATED + 8 * DAY_MS), None);
    }

    #[test]
    fn test_cancel_inside_window_refunds() {
        let plan = plan_cancellation(&subscribed(), CREATED + 6 * DAY_MS + 23 * HOUR_MS).unwrap();
        assert_eq!(
            plan,
            CancellationPlan::CancelAndRefund {
                subscription_id: "sub_1".to_string(),
                payment_intent_id: "pi_1".to_string(),
                amount: Some(Decimal::new(2499, 2)),
            }
        );
    }

    #[test]
    fn test_cancel_after_window_keeps_access() {
        let plan = plan_cancellation(&subscribed(), CREATED + 7 * DAY_MS + HOUR_MS).unwrap();
        assert_eq!(
            plan,
            CancellationPlan::CancelAtPeriodEnd {
                subscription_id: "sub_1".to_string(),
                access_until: Some(CREATED + BILLING_PERIOD_MS),
            }
        );
    }

    #[test]
    fn test_cancel_without_subscription_id_is_local() {
        let profile = BillingProfile {
            stripe_subscription_id: None,
            ..subscribed()
        };
        assert_eq!(
            plan_cancellation(&profile, CREATED).unwrap(),
            CancellationPlan::LocalDowngrade
        );
    }

    #[test]
    fn test_upgraded_profile_is_never_refunded() {
        let profile = BillingProfile {
            refund_eligible_until: None,
            ..subscribed()
        };
        assert_eq!(
            plan_cancellation(&profile, CREATED + HOUR_MS).unwrap().kind(),
            CancellationKind::CancelledAtPeriodEnd
        );
    }

    #[test]
    fn test_cancel_twice_fails() {
        for status in ["cancelled", "refunded"] {
            let profile = BillingProfile {
                subscription_status: status.to_string(),
                ..subscribed()
            };
            assert_eq!(
                plan_cancellation(&profile, CREATED).unwrap_err().code,
                ErrorCode::SubscriptionAlreadyCancelled
            );
        }
    }
}
