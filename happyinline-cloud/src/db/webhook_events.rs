//! Stripe webhook idempotency

use sqlx::PgPool;

use super::BoxError;

/// Record an event id; `false` when it was already processed
///
/// Insert-first so two concurrent deliveries cannot both proceed.
pub async fn try_record(
    pool: &PgPool,
    event_id: &str,
    event_type: &str,
    now: i64,
) -> Result<bool, BoxError> {
    let result = sqlx::query(
        "INSERT INTO processed_webhook_events (event_id, event_type, processed_at)
         VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
    )
    .bind(event_id)
    .bind(event_type)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Forget an event so Stripe's retry is processed again
pub async fn forget(pool: &PgPool, event_id: &str) -> Result<(), BoxError> {
    sqlx::query("DELETE FROM processed_webhook_events WHERE event_id = $1")
        .bind(event_id)
        .execute(pool)
        .await?;
    Ok(())
}
