//! Profile rows: identity, credentials and subscription columns

use rust_decimal::Decimal;
use shared::models::{Profile, ProfileUpdate, SubscriptionPlan};
use sqlx::PgPool;

use super::BoxError;
use crate::billing::BillingProfile;
use crate::billing::store::ActivatedSubscription;

const PROFILE_COLUMNS: &str = "id, email, full_name, phone, avatar_url, \
     subscription_plan, subscription_status, created_at, updated_at";

const BILLING_COLUMNS: &str = "id, email, subscription_plan, subscription_status, \
     stripe_customer_id, stripe_subscription_id, stripe_payment_intent_id, payment_amount, \
     subscription_start_date, refund_eligible_until, next_billing_date, access_until";

/// Login lookup
#[derive(sqlx::FromRow)]
pub struct Credentials {
    pub id: String,
    pub email: String,
    pub hashed_password: Option<String>,
}

pub async fn create(
    pool: &PgPool,
    email: &str,
    hashed_password: Option<&str>,
    full_name: Option<&str>,
    now: i64,
) -> Result<Profile, BoxError> {
    let id = shared::util::new_id();
    let profile: Profile = sqlx::query_as(&format!(
        "INSERT INTO profiles (id, email, hashed_password, full_name, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $5)
         RETURNING {PROFILE_COLUMNS}"
    ))
    .bind(&id)
    .bind(email)
    .bind(hashed_password)
    .bind(full_name)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(profile)
}

/// Profile for `email`, created without a password when missing
///
/// Returns whether this call created it. Concurrent first sign-ins converge
/// on the same row.
pub async fn find_or_create(
    pool: &PgPool,
    email: &str,
    now: i64,
) -> Result<(Profile, bool), BoxError> {
    let inserted: Option<Profile> = sqlx::query_as(&format!(
        "INSERT INTO profiles (id, email, created_at, updated_at)
         VALUES ($1, $2, $3, $3)
         ON CONFLICT (email) DO NOTHING
         RETURNING {PROFILE_COLUMNS}"
    ))
    .bind(shared::util::new_id())
    .bind(email)
    .bind(now)
    .fetch_optional(pool)
    .await?;
    if let Some(profile) = inserted {
        return Ok((profile, true));
    }
    let profile = find_by_email(pool, email)
        .await?
        .ok_or_else(|| format!("profile for {email} vanished after conflict"))?;
    Ok((profile, false))
}

pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Profile>, BoxError> {
    let row = sqlx::query_as(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Profile>, BoxError> {
    let row = sqlx::query_as(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn find_credentials(
    pool: &PgPool,
    email: &str,
) -> Result<Option<Credentials>, BoxError> {
    let row = sqlx::query_as("SELECT id, email, hashed_password FROM profiles WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn update(
    pool: &PgPool,
    id: &str,
    data: &ProfileUpdate,
    now: i64,
) -> Result<Option<Profile>, BoxError> {
    let row = sqlx::query_as(&format!(
        "UPDATE profiles SET
            full_name = COALESCE($2, full_name),
            phone = COALESCE($3, phone),
            avatar_url = COALESCE($4, avatar_url),
            updated_at = $5
         WHERE id = $1
         RETURNING {PROFILE_COLUMNS}"
    ))
    .bind(id)
    .bind(&data.full_name)
    .bind(&data.phone)
    .bind(&data.avatar_url)
    .bind(now)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

// ── Billing ──

pub async fn find_billing(pool: &PgPool, id: &str) -> Result<Option<BillingProfile>, BoxError> {
    let row = sqlx::query_as(&format!(
        "SELECT {BILLING_COLUMNS} FROM profiles WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn find_billing_by_subscription(
    pool: &PgPool,
    subscription_id: &str,
) -> Result<Option<BillingProfile>, BoxError> {
    let row = sqlx::query_as(&format!(
        "SELECT {BILLING_COLUMNS} FROM profiles WHERE stripe_subscription_id = $1"
    ))
    .bind(subscription_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn find_billing_by_customer(
    pool: &PgPool,
    customer_id: &str,
) -> Result<Option<BillingProfile>, BoxError> {
    let row = sqlx::query_as(&format!(
        "SELECT {BILLING_COLUMNS} FROM profiles WHERE stripe_customer_id = $1"
    ))
    .bind(customer_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Current plan of a user (free tier when the profile is missing)
pub async fn plan_of(pool: &PgPool, id: &str) -> Result<SubscriptionPlan, BoxError> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT subscription_plan FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(row
        .and_then(|(plan,)| SubscriptionPlan::from_db(&plan))
        .unwrap_or(SubscriptionPlan::None))
}

pub async fn set_stripe_customer(
    pool: &PgPool,
    id: &str,
    customer_id: &str,
    now: i64,
) -> Result<(), BoxError> {
    sqlx::query("UPDATE profiles SET stripe_customer_id = $2, updated_at = $3 WHERE id = $1")
        .bind(id)
        .bind(customer_id)
        .bind(now)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn activate_subscription(
    pool: &PgPool,
    id: &str,
    sub: &ActivatedSubscription,
    now: i64,
) -> Result<(), BoxError> {
    sqlx::query(
        "UPDATE profiles SET
            subscription_plan = $2,
            subscription_status = 'active',
            stripe_subscription_id = $3,
            stripe_payment_intent_id = $4,
            payment_amount = $5,
            subscription_start_date = $6,
            refund_eligible_until = $7,
            next_billing_date = $8,
            access_until = NULL,
            updated_at = $9
         WHERE id = $1",
    )
    .bind(id)
    .bind(sub.plan.as_db())
    .bind(&sub.subscription_id)
    .bind(&sub.payment_intent_id)
    .bind(sub.amount)
    .bind(sub.start_date)
    .bind(sub.refund_eligible_until)
    .bind(sub.next_billing_date)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn apply_upgrade(
    pool: &PgPool,
    id: &str,
    plan: SubscriptionPlan,
    amount: Decimal,
    now: i64,
) -> Result<(), BoxError> {
    sqlx::query(
        "UPDATE profiles SET
            subscription_plan = $2,
            payment_amount = $3,
            refund_eligible_until = NULL,
            updated_at = $4
         WHERE id = $1",
    )
    .bind(id)
    .bind(plan.as_db())
    .bind(amount)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_refunded(pool: &PgPool, id: &str, now: i64) -> Result<(), BoxError> {
    sqlx::query(
        "UPDATE profiles SET
            subscription_plan = 'none',
            subscription_status = 'refunded',
            refund_eligible_until = NULL,
            next_billing_date = NULL,
            access_until = $2,
            updated_at = $2
         WHERE id = $1",
    )
    .bind(id)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_cancelled(
    pool: &PgPool,
    id: &str,
    access_until: Option<i64>,
    now: i64,
) -> Result<(), BoxError> {
    sqlx::query(
        "UPDATE profiles SET
            subscription_status = 'cancelled',
            access_until = $2,
            updated_at = $3
         WHERE id = $1",
    )
    .bind(id)
    .bind(access_until)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn local_downgrade(pool: &PgPool, id: &str, now: i64) -> Result<(), BoxError> {
    sqlx::query(
        "UPDATE profiles SET
            subscription_plan = 'none',
            subscription_status = 'cancelled',
            refund_eligible_until = NULL,
            next_billing_date = NULL,
            access_until = $2,
            updated_at = $2
         WHERE id = $1",
    )
    .bind(id)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

// ── Webhook convergence ──

/// invoice.paid: renewal succeeded
pub async fn renew_by_subscription(
    pool: &PgPool,
    subscription_id: &str,
    next_billing_date: Option<i64>,
    now: i64,
) -> Result<u64, BoxError> {
    let result = sqlx::query(
        "UPDATE profiles SET
            subscription_status = 'active',
            next_billing_date = COALESCE($2, next_billing_date),
            updated_at = $3
         WHERE stripe_subscription_id = $1
           AND subscription_status IN ('active', 'past_due')",
    )
    .bind(subscription_id)
    .bind(next_billing_date)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// invoice.payment_failed: renewal failed
pub async fn mark_past_due_by_subscription(
    pool: &PgPool,
    subscription_id: &str,
    now: i64,
) -> Result<u64, BoxError> {
    let result = sqlx::query(
        "UPDATE profiles SET subscription_status = 'past_due', updated_at = $2
         WHERE stripe_subscription_id = $1 AND subscription_status = 'active'",
    )
    .bind(subscription_id)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// customer.subscription.deleted: subscription is gone on Stripe
///
/// Drops to the free plan and detaches the Stripe subscription. A refunded
/// status is kept as is. The payment intent and refund deadline stay so a
/// refund that failed after an immediate cancel can still be retried.
pub async fn end_subscription(
    pool: &PgPool,
    subscription_id: &str,
    now: i64,
) -> Result<u64, BoxError> {
    let result = sqlx::query(
        "UPDATE profiles SET
            subscription_plan = 'none',
            subscription_status = CASE WHEN subscription_status = 'refunded'
                                       THEN 'refunded' ELSE 'cancelled' END,
            stripe_subscription_id = NULL,
            next_billing_date = NULL,
            access_until = LEAST(COALESCE(access_until, $2), $2),
            updated_at = $2
         WHERE stripe_subscription_id = $1",
    )
    .bind(subscription_id)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
