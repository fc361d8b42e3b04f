//! Persistence seam for billing state

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{PaymentKind, SubscriptionPlan};
use sqlx::PgPool;

use super::BillingProfile;
use crate::db::{self, BoxError};

/// Columns written when a subscription starts
#[derive(Debug, Clone)]
pub struct ActivatedSubscription {
    pub plan: SubscriptionPlan,
    pub subscription_id: String,
    pub payment_intent_id: Option<String>,
    pub amount: Decimal,
    pub start_date: i64,
    pub refund_eligible_until: i64,
    pub next_billing_date: i64,
}

/// New `payment_history` row
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub user_id: String,
    pub kind: PaymentKind,
    pub plan: SubscriptionPlan,
    pub amount: Decimal,
    pub stripe_reference: Option<String>,
    pub description: String,
}

/// Billing persistence used by [`BillingService`](super::BillingService)
#[async_trait]
pub trait BillingStore: Send + Sync {
    async fn load_profile(&self, user_id: &str) -> Result<Option<BillingProfile>, BoxError>;

    async fn set_customer_id(&self, user_id: &str, customer_id: &str, now: i64)
    -> Result<(), BoxError>;

    async fn activate_subscription(
        &self,
        user_id: &str,
        sub: &ActivatedSubscription,
        now: i64,
    ) -> Result<(), BoxError>;

    /// Switch plan and clear refund eligibility
    async fn apply_upgrade(
        &self,
        user_id: &str,
        plan: SubscriptionPlan,
        amount: Decimal,
        now: i64,
    ) -> Result<(), BoxError>;

    /// Plan `none`, status `refunded`, access ends now
    async fn mark_refunded(&self, user_id: &str, now: i64) -> Result<(), BoxError>;

    /// Status `cancelled`, access kept until `access_until`
    async fn mark_cancelled(
        &self,
        user_id: &str,
        access_until: Option<i64>,
        now: i64,
    ) -> Result<(), BoxError>;

    /// Plan `none` without any Stripe state
    async fn local_downgrade(&self, user_id: &str, now: i64) -> Result<(), BoxError>;

    async fn record_payment(&self, payment: &NewPayment, now: i64) -> Result<(), BoxError>;

    async fn record_event(
        &self,
        user_id: &str,
        event_type: &str,
        detail: Option<serde_json::Value>,
        now: i64,
    ) -> Result<(), BoxError>;
}

/// Postgres-backed store
#[derive(Clone)]
pub struct PgBillingStore {
    pool: PgPool,
}

impl PgBillingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BillingStore for PgBillingStore {
    async fn load_profile(&self, user_id: &str) -> Result<Option<BillingProfile>, BoxError> {
        db::profiles::find_billing(&self.pool, user_id).await
    }

    async fn set_customer_id(
        &self,
        user_id: &str,
        customer_id: &str,
        now: i64,
    ) -> Result<(), BoxError> {
        db::profiles::set_stripe_customer(&self.pool, user_id, customer_id, now).await
    }

    async fn activate_subscription(
        &self,
        user_id: &str,
        sub: &ActivatedSubscription,
        now: i64,
    ) -> Result<(), BoxError> {
        db::profiles::activate_subscription(&self.pool, user_id, sub, now).await
    }

    async fn apply_upgrade(
        &self,
        user_id: &str,
        plan: SubscriptionPlan,
        amount: Decimal,
        now: i64,
    ) -> Result<(), BoxError> {
        db::profiles::apply_upgrade(&self.pool, user_id, plan, amount, now).await
    }

    async fn mark_refunded(&self, user_id: &str, now: i64) -> Result<(), BoxError> {
        db::profiles::mark_refunded(&self.pool, user_id, now).await
    }

    async fn mark_cancelled(
        &self,
        user_id: &str,
        access_until: Option<i64>,
        now: i64,
    ) -> Result<(), BoxError> {
        db::profiles::mark_cancelled(&self.pool, user_id, access_until, now).await
    }

    async fn local_downgrade(&self, user_id: &str, now: i64) -> Result<(), BoxError> {
        db::profiles::local_downgrade(&self.pool, user_id, now).await
    }

    async fn record_payment(&self, payment: &NewPayment, now: i64) -> Result<(), BoxError> {
        db::payments::insert(&self.pool, payment, now).await
    }

    async fn record_event(
        &self,
        user_id: &str,
        event_type: &str,
        detail: Option<serde_json::Value>,
        now: i64,
    ) -> Result<(), BoxError> {
        db::subscription_events::log(&self.pool, user_id, event_type, detail.as_ref(), now).await
    }
}

/// In-memory store for service tests
#[cfg(test)]
pub mod memory {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use shared::models::SubscriptionStatus;

    use super::*;

    #[derive(Default)]
    pub struct MemoryBillingStore {
        pub profiles: Mutex<HashMap<String, BillingProfile>>,
        pub payments: Mutex<Vec<NewPayment>>,
        pub events: Mutex<Vec<(String, String)>>,
        /// When set, every profile write fails
        pub fail_profile_writes: AtomicBool,
    }

    impl MemoryBillingStore {
        pub fn with_profile(profile: BillingProfile) -> Self {
            let store = Self::default();
            store
                .profiles
                .lock()
                .unwrap()
                .insert(profile.id.clone(), profile);
            store
        }

        pub fn profile(&self, user_id: &str) -> BillingProfile {
            self.profiles.lock().unwrap()[user_id].clone()
        }

        pub fn event_types(&self) -> Vec<String> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(|(_, t)| t.clone())
                .collect()
        }

        fn update(
            &self,
            user_id: &str,
            f: impl FnOnce(&mut BillingProfile),
        ) -> Result<(), BoxError> {
            if self.fail_profile_writes.load(Ordering::SeqCst) {
                return Err("profile write failed".into());
            }
            let mut profiles = self.profiles.lock().unwrap();
            let profile = profiles.get_mut(user_id).ok_or("profile not found")?;
            f(profile);
            Ok(())
        }
    }

    #[async_trait]
    impl BillingStore for MemoryBillingStore {
        async fn load_profile(&self, user_id: &str) -> Result<Option<BillingProfile>, BoxError> {
            Ok(self.profiles.lock().unwrap().get(user_id).cloned())
        }

        async fn set_customer_id(
            &self,
            user_id: &str,
            customer_id: &str,
            _now: i64,
        ) -> Result<(), BoxError> {
            self.update(user_id, |p| p.stripe_customer_id = Some(customer_id.to_string()))
        }

        async fn activate_subscription(
            &self,
            user_id: &str,
            sub: &ActivatedSubscription,
            _now: i64,
        ) -> Result<(), BoxError> {
            self.update(user_id, |p| {
                p.subscription_plan = sub.plan.as_db().to_string();
                p.subscription_status = SubscriptionStatus::Active.as_db().to_string();
                p.stripe_subscription_id = Some(sub.subscription_id.clone());
                p.stripe_payment_intent_id = sub.payment_intent_id.clone();
                p.payment_amount = Some(sub.amount);
                p.subscription_start_date = Some(sub.start_date);
                p.refund_eligible_until = Some(sub.refund_eligible_until);
                p.next_billing_date = Some(sub.next_billing_date);
                p.access_until = None;
            })
        }

        async fn apply_upgrade(
            &self,
            user_id: &str,
            plan: SubscriptionPlan,
            amount: Decimal,
            _now: i64,
        ) -> Result<(), BoxError> {
            self.update(user_id, |p| {
                p.subscription_plan = plan.as_db().to_string();
                p.payment_amount = Some(amount);
                p.refund_eligible_until = None;
            })
        }

        async fn mark_refunded(&self, user_id: &str, now: i64) -> Result<(), BoxError> {
            self.update(user_id, |p| {
                p.subscription_plan = SubscriptionPlan::None.as_db().to_string();
                p.subscription_status = SubscriptionStatus::Refunded.as_db().to_string();
                p.refund_eligible_until = None;
                p.next_billing_date = None;
                p.access_until = Some(now);
            })
        }

        async fn mark_cancelled(
            &self,
            user_id: &str,
            access_until: Option<i64>,
            _now: i64,
        ) -> Result<(), BoxError> {
            self.update(user_id, |p| {
                p.subscription_status = SubscriptionStatus::Cancelled.as_db().to_string();
                p.access_until = access_until;
            })
        }

        async fn local_downgrade(&self, user_id: &str, now: i64) -> Result<(), BoxError> {
            self.update(user_id, |p| {
                p.subscription_plan = SubscriptionPlan::None.as_db().to_string();
                p.subscription_status = SubscriptionStatus::Cancelled.as_db().to_string();
                p.refund_eligible_until = None;
                p.next_billing_date = None;
                p.access_until = Some(now);
            })
        }

        async fn record_payment(&self, payment: &NewPayment, _now: i64) -> Result<(), BoxError> {
            self.payments.lock().unwrap().push(payment.clone());
            Ok(())
        }

        async fn record_event(
            &self,
            user_id: &str,
            event_type: &str,
            _detail: Option<serde_json::Value>,
            _now: i64,
        ) -> Result<(), BoxError> {
            self.events
                .lock()
                .unwrap()
                .push((user_id.to_string(), event_type.to_string()));
            Ok(())
        }
    }
}
