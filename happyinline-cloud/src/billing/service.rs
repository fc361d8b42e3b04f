//! Billing orchestration
//!
//! Every operation reads the profile from the [`BillingStore`], decides with
//! the pure rules in [`lifecycle`](super::lifecycle) and
//! [`proration`](super::proration), calls the [`StripeGateway`], then writes
//! the outcome back. When Stripe succeeds but the local write fails, the
//! service records a `reconciliation_required` event so the drift can be
//! repaired (Stripe webhooks also converge the profile afterwards).

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use shared::error::{AppError, ErrorCode};
use shared::models::{PaymentKind, SubscriptionPlan, SubscriptionStatus};
use shared::util::days_between;

use super::BillingProfile;
use super::lifecycle::{
    self, BILLING_PERIOD_MS, CancellationKind, CancellationPlan, is_refund_eligible,
    refund_window_remaining,
};
use super::plans::{get_upgrade_options, monthly_price, plan_quota};
use super::proration::{Proration, calculate_upgrade_proration};
use super::store::{ActivatedSubscription, BillingStore, NewPayment};
use crate::db::BoxError;
use crate::error::{ServiceError, ServiceResult};
use crate::stripe::{CancelMode, StripeGateway};

/// Subscription state shown to the owner
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionSummary {
    pub plan: SubscriptionPlan,
    pub status: SubscriptionStatus,
    pub monthly_price: Decimal,
    pub refund_eligible: bool,
    pub refund_eligible_until: Option<i64>,
    pub refund_window_remaining_ms: Option<i64>,
    pub subscription_start_date: Option<i64>,
    pub next_billing_date: Option<i64>,
    pub access_until: Option<i64>,
    pub upgrade_options: Vec<SubscriptionPlan>,
    /// Active barbers allowed per shop (`None` = unbounded)
    pub barber_limit: Option<u32>,
}

impl SubscriptionSummary {
    pub fn from_profile(profile: &BillingProfile, now: i64) -> Self {
        let plan = profile.plan();
        Self {
            plan,
            status: profile.status(),
            monthly_price: monthly_price(plan),
            refund_eligible: is_refund_eligible(profile.refund_eligible_until, now),
            refund_eligible_until: profile.refund_eligible_until,
            refund_window_remaining_ms: refund_window_remaining(profile.refund_eligible_until, now),
            subscription_start_date: profile.subscription_start_date,
            next_billing_date: profile.next_billing_date,
            access_until: profile.access_until,
            upgrade_options: get_upgrade_options(plan),
            barber_limit: plan_quota(plan),
        }
    }
}

/// Result of an upgrade
#[derive(Debug, Clone, Serialize)]
pub struct UpgradeOutcome {
    pub proration: Proration,
    pub subscription: SubscriptionSummary,
}

/// Result of a cancellation or refund
#[derive(Debug, Clone, Serialize)]
pub struct CancellationOutcome {
    pub kind: CancellationKind,
    pub refund_amount: Option<Decimal>,
    pub access_until: Option<i64>,
    pub subscription: SubscriptionSummary,
}

/// Start of the billing period `now` falls in
///
/// Renewals move `next_billing_date` forward, so the period starts one
/// billing period before it (never before the original purchase).
fn current_period_start(profile: &BillingProfile, now: i64) -> i64 {
    let start = profile.subscription_start_date.unwrap_or(now);
    profile
        .next_billing_date
        .map_or(start, |next| (next - BILLING_PERIOD_MS).max(start))
}

/// Billing helper over a Stripe gateway and a billing store
#[derive(Clone)]
pub struct BillingService {
    gateway: Arc<dyn StripeGateway>,
    store: Arc<dyn BillingStore>,
}

impl BillingService {
    pub fn new(gateway: Arc<dyn StripeGateway>, store: Arc<dyn BillingStore>) -> Self {
        Self { gateway, store }
    }

    async fn load(&self, user_id: &str) -> ServiceResult<BillingProfile> {
        self.store
            .load_profile(user_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound).into())
    }

    pub async fn subscription_summary(
        &self,
        user_id: &str,
        now: i64,
    ) -> ServiceResult<SubscriptionSummary> {
        let profile = self.load(user_id).await?;
        Ok(SubscriptionSummary::from_profile(&profile, now))
    }

    /// Start a paid subscription, charged immediately
    pub async fn create_subscription(
        &self,
        user_id: &str,
        plan: SubscriptionPlan,
        payment_method_id: &str,
        now: i64,
    ) -> ServiceResult<SubscriptionSummary> {
        if !plan.is_paid() {
            return Err(AppError::with_message(
                ErrorCode::PlanNotFound,
                "The free plan cannot be purchased",
            )
            .into());
        }
        if payment_method_id.trim().is_empty() {
            return Err(AppError::validation("payment_method_id is required").into());
        }

        let profile = self.load(user_id).await?;
        let has_access = match profile.status() {
            SubscriptionStatus::Active | SubscriptionStatus::PastDue => true,
            SubscriptionStatus::Cancelled => profile.access_until.is_some_and(|t| t > now),
            SubscriptionStatus::None | SubscriptionStatus::Refunded => false,
        };
        if has_access && profile.plan().is_paid() {
            return Err(AppError::new(ErrorCode::SubscriptionAlreadyActive).into());
        }

        let customer_id = match profile.stripe_customer_id.clone() {
            Some(id) => id,
            None => {
                let id = self
                    .gateway
                    .create_customer(&profile.email, user_id)
                    .await
                    .map_err(AppError::from)?;
                self.store.set_customer_id(user_id, &id, now).await?;
                id
            }
        };

        let created = self
            .gateway
            .create_subscription(&customer_id, plan, payment_method_id)
            .await
            .map_err(AppError::from)?;

        let amount = monthly_price(plan);
        let activated = ActivatedSubscription {
            plan,
            subscription_id: created.subscription_id.clone(),
            payment_intent_id: created.payment_intent_id.clone(),
            amount,
            start_date: now,
            refund_eligible_until: lifecycle::refund_eligible_until(now),
            next_billing_date: created
                .current_period_end
                .unwrap_or(now + BILLING_PERIOD_MS),
        };
        if let Err(e) = self.store.activate_subscription(user_id, &activated, now).await {
            let detail = json!({
                "operation": "create_subscription",
                "subscription_id": created.subscription_id,
                "plan": plan.as_db(),
            });
            return Err(self.reconciliation_required(user_id, detail, e, now).await);
        }

        self.record_payment(
            NewPayment {
                user_id: user_id.to_string(),
                kind: PaymentKind::Charge,
                plan,
                amount,
                stripe_reference: created.payment_intent_id.clone(),
                description: format!("{plan} plan subscription"),
            },
            now,
        )
        .await;
        self.record_event(
            user_id,
            "subscription_created",
            json!({ "plan": plan.as_db(), "subscription_id": created.subscription_id }),
            now,
        )
        .await;

        tracing::info!(
            user_id = %user_id,
            plan = %plan,
            subscription_id = %created.subscription_id,
            "Subscription created"
        );

        self.subscription_summary(user_id, now).await
    }

    /// Quote an upgrade without charging
    pub async fn preview_upgrade(
        &self,
        user_id: &str,
        new_plan: SubscriptionPlan,
        now: i64,
    ) -> ServiceResult<Proration> {
        let profile = self.load(user_id).await?;
        Ok(Self::prorate(&profile, new_plan, now)?)
    }

    fn prorate(
        profile: &BillingProfile,
        new_plan: SubscriptionPlan,
        now: i64,
    ) -> Result<Proration, AppError> {
        let days_used = days_between(current_period_start(profile, now), now);
        calculate_upgrade_proration(profile.plan(), new_plan, days_used)
    }

    /// Move to a higher plan; ends refund eligibility
    pub async fn upgrade_subscription(
        &self,
        user_id: &str,
        new_plan: SubscriptionPlan,
        now: i64,
    ) -> ServiceResult<UpgradeOutcome> {
        let profile = self.load(user_id).await?;
        if profile.status() != SubscriptionStatus::Active {
            return Err(AppError::new(ErrorCode::NoActiveSubscription).into());
        }
        let Some(subscription_id) = profile.stripe_subscription_id.clone() else {
            return Err(AppError::new(ErrorCode::NoActiveSubscription).into());
        };

        let proration = Self::prorate(&profile, new_plan, now)?;

        let invoice_id = self
            .gateway
            .upgrade_subscription(&subscription_id, new_plan)
            .await
            .map_err(AppError::from)?;

        if let Err(e) = self
            .store
            .apply_upgrade(user_id, new_plan, monthly_price(new_plan), now)
            .await
        {
            let detail = json!({
                "operation": "upgrade_subscription",
                "subscription_id": subscription_id,
                "plan": new_plan.as_db(),
            });
            return Err(self.reconciliation_required(user_id, detail, e, now).await);
        }

        if proration.proration_amount > Decimal::ZERO {
            self.record_payment(
                NewPayment {
                    user_id: user_id.to_string(),
                    kind: PaymentKind::Proration,
                    plan: new_plan,
                    amount: proration.proration_amount,
                    stripe_reference: invoice_id,
                    description: format!(
                        "Upgrade from {} to {} ({} days remaining)",
                        proration.from, proration.to, proration.days_remaining
                    ),
                },
                now,
            )
            .await;
        }
        self.record_event(
            user_id,
            "subscription_upgraded",
            json!({
                "from": proration.from.as_db(),
                "to": proration.to.as_db(),
                "days_used": proration.days_used,
                "proration_amount": proration.proration_amount.to_string(),
            }),
            now,
        )
        .await;

        tracing::info!(
            user_id = %user_id,
            from = %proration.from,
            to = %proration.to,
            amount = %proration.proration_amount,
            "Subscription upgraded"
        );

        Ok(UpgradeOutcome {
            proration,
            subscription: self.subscription_summary(user_id, now).await?,
        })
    }

    /// Cancel: local downgrade, refund inside the window, or stop at period end
    pub async fn cancel_subscription(
        &self,
        user_id: &str,
        now: i64,
    ) -> ServiceResult<CancellationOutcome> {
        let profile = self.load(user_id).await?;
        let decision = lifecycle::plan_cancellation(&profile, now)?;
        let kind = decision.kind();

        let (refund_amount, access_until) = match decision {
            CancellationPlan::LocalDowngrade => {
                self.store.local_downgrade(user_id, now).await?;
                self.record_event(
                    user_id,
                    "subscription_downgraded",
                    json!({ "from": profile.subscription_plan }),
                    now,
                )
                .await;
                (None, Some(now))
            }
            CancellationPlan::CancelAndRefund {
                subscription_id,
                payment_intent_id,
                amount,
            } => {
                self.cancel_and_refund(
                    &profile,
                    Some(&subscription_id),
                    &payment_intent_id,
                    amount,
                    now,
                )
                .await?;
                (amount, Some(now))
            }
            CancellationPlan::CancelAtPeriodEnd {
                subscription_id,
                access_until,
            } => {
                self.gateway
                    .cancel_subscription(&subscription_id, CancelMode::AtPeriodEnd)
                    .await
                    .map_err(AppError::from)?;
                if let Err(e) = self.store.mark_cancelled(user_id, access_until, now).await {
                    let detail = json!({
                        "operation": "cancel_subscription",
                        "subscription_id": subscription_id,
                    });
                    return Err(self.reconciliation_required(user_id, detail, e, now).await);
                }
                self.record_event(
                    user_id,
                    "subscription_cancelled",
                    json!({ "subscription_id": subscription_id, "access_until": access_until }),
                    now,
                )
                .await;
                (None, access_until)
            }
        };

        tracing::info!(user_id = %user_id, kind = ?kind, "Subscription cancelled");

        Ok(CancellationOutcome {
            kind,
            refund_amount,
            access_until,
            subscription: self.subscription_summary(user_id, now).await?,
        })
    }

    /// Explicit refund request; only inside the refund window
    ///
    /// A profile left `cancelled` by a refund that failed after the immediate
    /// cancellation can retry here; only the refund is repeated.
    pub async fn process_refund(
        &self,
        user_id: &str,
        now: i64,
    ) -> ServiceResult<CancellationOutcome> {
        let profile = self.load(user_id).await?;
        let status = profile.status();
        if status == SubscriptionStatus::Refunded {
            return Err(AppError::new(ErrorCode::SubscriptionAlreadyCancelled).into());
        }
        let Some(payment_intent_id) = profile.stripe_payment_intent_id.clone() else {
            return Err(AppError::new(ErrorCode::NoActiveSubscription).into());
        };
        let subscription_id = match status {
            SubscriptionStatus::Cancelled => None,
            _ => Some(
                profile
                    .stripe_subscription_id
                    .clone()
                    .ok_or_else(|| AppError::new(ErrorCode::NoActiveSubscription))?,
            ),
        };
        if !is_refund_eligible(profile.refund_eligible_until, now) {
            let code = if status == SubscriptionStatus::Cancelled {
                ErrorCode::SubscriptionAlreadyCancelled
            } else {
                ErrorCode::RefundWindowExpired
            };
            return Err(AppError::new(code).into());
        }

        let amount = profile.payment_amount;
        self.cancel_and_refund(
            &profile,
            subscription_id.as_deref(),
            &payment_intent_id,
            amount,
            now,
        )
        .await?;

        Ok(CancellationOutcome {
            kind: CancellationKind::Refunded,
            refund_amount: amount,
            access_until: Some(now),
            subscription: self.subscription_summary(user_id, now).await?,
        })
    }

    /// Cancel immediately (when `subscription_id` is still live) and refund
    ///
    /// When the refund fails the profile is left `cancelled` with its payment
    /// intent and refund deadline intact, so [`process_refund`](Self::process_refund)
    /// can retry.
    async fn cancel_and_refund(
        &self,
        profile: &BillingProfile,
        subscription_id: Option<&str>,
        payment_intent_id: &str,
        amount: Option<Decimal>,
        now: i64,
    ) -> ServiceResult<()> {
        let user_id = profile.id.as_str();

        if let Some(subscription_id) = subscription_id {
            self.gateway
                .cancel_subscription(subscription_id, CancelMode::Immediately)
                .await
                .map_err(AppError::from)?;
        }

        let refund_id = match self.gateway.process_refund(payment_intent_id, amount).await {
            Ok(id) => id,
            Err(e) => {
                let detail = json!({
                    "operation": "process_refund",
                    "subscription_id": subscription_id,
                    "payment_intent_id": payment_intent_id,
                });
                self.record_event(user_id, "reconciliation_required", detail, now)
                    .await;
                tracing::error!(user_id = %user_id, error = %e, "Refund failed after cancellation");
                if subscription_id.is_some()
                    && let Err(write_err) = self.store.mark_cancelled(user_id, Some(now), now).await
                {
                    tracing::error!(
                        user_id = %user_id,
                        error = %write_err,
                        "Failed to mark profile cancelled after refund failure"
                    );
                }
                return Err(AppError::from(e).into());
            }
        };

        if let Err(e) = self.store.mark_refunded(user_id, now).await {
            let detail = json!({
                "operation": "process_refund",
                "subscription_id": subscription_id,
                "refund_id": refund_id,
            });
            return Err(self.reconciliation_required(user_id, detail, e, now).await);
        }

        self.record_payment(
            NewPayment {
                user_id: user_id.to_string(),
                kind: PaymentKind::Refund,
                plan: profile.plan(),
                amount: amount.unwrap_or(Decimal::ZERO),
                stripe_reference: Some(refund_id.clone()),
                description: "Refund within 7-day window".to_string(),
            },
            now,
        )
        .await;
        self.record_event(
            user_id,
            "subscription_refunded",
            json!({ "subscription_id": subscription_id, "refund_id": refund_id }),
            now,
        )
        .await;
        Ok(())
    }

    /// Stripe changed but the profile did not: log, record, surface an internal error
    async fn reconciliation_required(
        &self,
        user_id: &str,
        detail: serde_json::Value,
        cause: BoxError,
        now: i64,
    ) -> ServiceError {
        tracing::error!(
            user_id = %user_id,
            detail = %detail,
            error = %cause,
            "Stripe call succeeded but profile update failed"
        );
        self.record_event(user_id, "reconciliation_required", detail, now)
            .await;
        ServiceError::Db(cause)
    }

    async fn record_payment(&self, payment: NewPayment, now: i64) {
        if let Err(e) = self.store.record_payment(&payment, now).await {
            tracing::error!(
                user_id = %payment.user_id,
                kind = payment.kind.as_db(),
                error = %e,
                "Failed to record payment history"
            );
        }
    }

    async fn record_event(
        &self,
        user_id: &str,
        event_type: &str,
        detail: serde_json::Value,
        now: i64,
    ) {
        if let Err(e) = self
            .store
            .record_event(user_id, event_type, Some(detail), now)
            .await
        {
            tracing::warn!(user_id = %user_id, event_type, error = %e, "Failed to record subscription event");
        }
    }
}
