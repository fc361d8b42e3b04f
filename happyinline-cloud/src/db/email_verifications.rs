use sqlx::PgPool;

use super::BoxError;

/// Purpose of a one-time code
pub const PURPOSE_SIGN_IN: &str = "sign_in";

#[derive(sqlx::FromRow)]
pub struct EmailVerification {
    pub email: String,
    pub purpose: String,
    /// argon2 hash of the code
    pub code: String,
    pub attempts: i32,
    pub expires_at: i64,
    pub created_at: i64,
}

pub async fn upsert(
    pool: &PgPool,
    email: &str,
    purpose: &str,
    code_hash: &str,
    expires_at: i64,
    now: i64,
) -> Result<(), BoxError> {
    sqlx::query(
        "INSERT INTO email_verifications (email, purpose, code, attempts, expires_at, created_at)
         VALUES ($1, $2, $3, 0, $4, $5)
         ON CONFLICT (email, purpose) DO UPDATE SET
            code = $3, attempts = 0, expires_at = $4, created_at = $5",
    )
    .bind(email)
    .bind(purpose)
    .bind(code_hash)
    .bind(expires_at)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find(
    pool: &PgPool,
    email: &str,
    purpose: &str,
) -> Result<Option<EmailVerification>, BoxError> {
    let row = sqlx::query_as(
        "SELECT email, purpose, code, attempts, expires_at, created_at
         FROM email_verifications WHERE email = $1 AND purpose = $2",
    )
    .bind(email)
    .bind(purpose)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Count one attempt on a live code; `None` when the code is missing,
/// expired or out of attempts
pub async fn claim_attempt(
    pool: &PgPool,
    email: &str,
    purpose: &str,
    max_attempts: i32,
    now: i64,
) -> Result<Option<EmailVerification>, BoxError> {
    let row = sqlx::query_as(
        "UPDATE email_verifications SET attempts = attempts + 1
         WHERE email = $1 AND purpose = $2 AND attempts < $3 AND expires_at >= $4
         RETURNING email, purpose, code, attempts, expires_at, created_at",
    )
    .bind(email)
    .bind(purpose)
    .bind(max_attempts)
    .bind(now)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn delete(pool: &PgPool, email: &str, purpose: &str) -> Result<(), BoxError> {
    sqlx::query("DELETE FROM email_verifications WHERE email = $1 AND purpose = $2")
        .bind(email)
        .bind(purpose)
        .execute(pool)
        .await?;
    Ok(())
}
