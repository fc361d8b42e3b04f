//! Plan catalog: monthly prices, tier order, barber quotas

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::SubscriptionPlan;

/// Monthly price in USD
pub fn monthly_price(plan: SubscriptionPlan) -> Decimal {
    match plan {
        SubscriptionPlan::None => Decimal::ZERO,
        SubscriptionPlan::Basic => Decimal::new(2499, 2),
        SubscriptionPlan::Professional => Decimal::new(9999, 2),
        SubscriptionPlan::Enterprise => Decimal::new(14999, 2),
        SubscriptionPlan::Unlimited => Decimal::new(19999, 2),
    }
}

/// Paid plans strictly above `current`, lowest tier first
pub fn get_upgrade_options(current: SubscriptionPlan) -> Vec<SubscriptionPlan> {
    SubscriptionPlan::ALL
        .into_iter()
        .filter(|p| p.is_paid() && *p > current)
        .collect()
}

/// Maximum active barbers per shop (`None` = unbounded)
pub fn plan_quota(plan: SubscriptionPlan) -> Option<u32> {
    match plan {
        SubscriptionPlan::None => Some(1),
        SubscriptionPlan::Basic => Some(2),
        SubscriptionPlan::Professional => Some(9),
        SubscriptionPlan::Enterprise => Some(14),
        SubscriptionPlan::Unlimited => None,
    }
}

/// Parse a wire plan name
pub fn parse_plan(s: &str) -> Result<SubscriptionPlan, AppError> {
    SubscriptionPlan::from_db(s.trim()).ok_or_else(|| {
        AppError::with_message(ErrorCode::PlanNotFound, format!("Unknown plan: {s}"))
    })
}

/// Parse a plan that can be purchased (anything but `none`)
pub fn parse_paid_plan(s: &str) -> Result<SubscriptionPlan, AppError> {
    let plan = parse_plan(s)?;
    if !plan.is_paid() {
        return Err(AppError::with_message(
            ErrorCode::PlanNotFound,
            "The free plan cannot be purchased",
        ));
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upgrade_options_from_professional() {
        assert_eq!(
            get_upgrade_options(SubscriptionPlan::Professional),
            vec![SubscriptionPlan::Enterprise, SubscriptionPlan::Unlimited]
        );
    }

    #[test]
    fn test_upgrade_options_edges() {
        assert_eq!(
            get_upgrade_options(SubscriptionPlan::None),
            vec![
                SubscriptionPlan::Basic,
                SubscriptionPlan::Professional,
                SubscriptionPlan::Enterprise,
                SubscriptionPlan::Unlimited,
            ]
        );
        assert!(get_upgrade_options(SubscriptionPlan::Unlimited).is_empty());
    }

    #[test]
    fn test_prices_increase_with_tier() {
        let prices: Vec<Decimal> = SubscriptionPlan::ALL.into_iter().map(monthly_price).collect();
        assert!(prices.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(monthly_price(SubscriptionPlan::Basic).to_string(), "24.99");
    }

    #[test]
    fn test_quota() {
        assert_eq!(plan_quota(SubscriptionPlan::None), Some(1));
        assert_eq!(plan_quota(SubscriptionPlan::Basic), Some(2));
        assert_eq!(plan_quota(SubscriptionPlan::Professional), Some(9));
        assert_eq!(plan_quota(SubscriptionPlan::Enterprise), Some(14));
        assert_eq!(plan_quota(SubscriptionPlan::Unlimited), None);
    }

    #[test]
    fn test_parse_plan() {
        assert_eq!(parse_plan(" enterprise ").unwrap(), SubscriptionPlan::Enterprise);
        assert_eq!(parse_plan("gold").unwrap_err().code, ErrorCode::PlanNotFound);
        assert!(parse_paid_plan("none").is_err());
        assert_eq!(parse_paid_plan("basic").unwrap(), SubscriptionPlan::Basic);
    }
}
