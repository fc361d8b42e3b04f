//! Append-only subscription event log

use shared::models::SubscriptionEvent;
use sqlx::PgPool;

use super::BoxError;

pub async fn log(
    pool: &PgPool,
    user_id: &str,
    event_type: &str,
    detail: Option<&serde_json::Value>,
    now: i64,
) -> Result<(), BoxError> {
    sqlx::query(
        "INSERT INTO subscription_events (user_id, event_type, detail, created_at)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(user_id)
    .bind(event_type)
    .bind(detail)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_for_user(
    pool: &PgPool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<SubscriptionEvent>, BoxError> {
    let rows = sqlx::query_as(
        "SELECT id, user_id, event_type, detail, created_at
         FROM subscription_events
         WHERE user_id = $1
         ORDER BY created_at DESC, id DESC
         LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
