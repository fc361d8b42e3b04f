//! Upgrade proration over a flat 30-day month

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::models::SubscriptionPlan;

use super::plans::{get_upgrade_options, monthly_price};

/// Days in a billing month
pub const BILLING_DAYS: i64 = 30;

/// Result of an upgrade proration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Proration {
    pub from: SubscriptionPlan,
    pub to: SubscriptionPlan,
    pub days_used: i64,
    pub days_remaining: i64,
    /// Unused value of the current plan
    pub credit: Decimal,
    /// Cost of the new plan for the remaining days
    pub charge: Decimal,
    /// Amount due now, rounded to cents
    pub proration_amount: Decimal,
}

/// Prorate an upgrade from `current` to `new` after `days_used` days of the period
///
/// `days_used` is clamped to `0..=30`.
pub fn calculate_upgrade_proration(
    current: SubscriptionPlan,
    new: SubscriptionPlan,
    days_used: i64,
) -> Result<Proration, AppError> {
    if !get_upgrade_options(current).contains(&new) {
        return Err(AppError::with_message(
            ErrorCode::InvalidPlanUpgrade,
            format!("Cannot upgrade from {current} to {new}"),
        ));
    }

    let days_used = days_used.clamp(0, BILLING_DAYS);
    let days_remaining = BILLING_DAYS - days_used;
    let month = Decimal::from(BILLING_DAYS);
    let remaining = Decimal::from(days_remaining);

    let credit = monthly_price(current) / month * remaining;
    let charge = monthly_price(new) / month * remaining;
    let proration_amount = (charge - credit)
        .max(Decimal::ZERO)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    Ok(Proration {
        from: current,
        to: new,
        days_used,
        days_remaining,
        credit,
        charge,
        proration_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_to_professional_mid_month() {
        let p = calculate_upgrade_proration(
            SubscriptionPlan::Basic,
            SubscriptionPlan::Professional,
            15,
        )
        .unwrap();
        assert_eq!(p.days_remaining, 15);
        assert_eq!(p.credit, Decimal::new(12495, 3));
        assert_eq!(p.charge, Decimal::new(49995, 3));
        assert_eq!(p.proration_amount, Decimal::new(3750, 2));
    }

    #[test]
    fn test_full_month_used_costs_nothing() {
        let p = calculate_upgrade_proration(
            SubscriptionPlan::Basic,
            SubscriptionPlan::Unlimited,
            45,
        )
        .unwrap();
        assert_eq!(p.days_used, 30);
        assert_eq!(p.days_remaining, 0);
        assert_eq!(p.proration_amount, Decimal::ZERO);
    }

    #[test]
    fn test_first_day_charges_full_difference() {
        let p = calculate_upgrade_proration(
            SubscriptionPlan::Professional,
            SubscriptionPlan::Enterprise,
            0,
        )
        .unwrap();
        assert_eq!(p.proration_amount, Decimal::new(5000, 2));
    }

    #[test]
    fn test_rounds_to_cents() {
        // 149.99 / 30 * 29 - 99.99 / 30 * 29 = 48.3333...
        let p = calculate_upgrade_proration(
            SubscriptionPlan::Professional,
            SubscriptionPlan::Enterprise,
            1,
        )
        .unwrap();
        assert_eq!(p.proration_amount, Decimal::new(4833, 2));
    }

    #[test]
    fn test_rejects_non_upgrade() {
        let err = calculate_upgrade_proration(
            SubscriptionPlan::Enterprise,
            SubscriptionPlan::Basic,
            3,
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPlanUpgrade);

        assert!(
            calculate_upgrade_proration(SubscriptionPlan::Basic, SubscriptionPlan::Basic, 3)
                .is_err()
        );
    }
}
