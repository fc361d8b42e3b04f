//! Payment history

use shared::models::PaymentRecord;
use sqlx::PgPool;

use super::BoxError;
use crate::billing::store::NewPayment;

pub async fn insert(pool: &PgPool, payment: &NewPayment, now: i64) -> Result<(), BoxError> {
    sqlx::query(
        "INSERT INTO payment_history
            (id, user_id, kind, plan, amount, currency, stripe_reference, description, created_at)
         VALUES ($1, $2, $3, $4, $5, 'usd', $6, $7, $8)",
    )
    .bind(shared::util::new_id())
    .bind(&payment.user_id)
    .bind(payment.kind.as_db())
    .bind(payment.plan.as_db())
    .bind(payment.amount)
    .bind(&payment.stripe_reference)
    .bind(&payment.description)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

/// Newest first
pub async fn list_for_user(
    pool: &PgPool,
    user_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<PaymentRecord>, BoxError> {
    let rows = sqlx::query_as(
        "SELECT id, user_id, kind, plan, amount, currency, stripe_reference, description, created_at
         FROM payment_history
         WHERE user_id = $1
         ORDER BY created_at DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
