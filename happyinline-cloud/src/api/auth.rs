//! Sign-up and sign-in: password and email one-time code

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::Profile;
use shared::util::MINUTE_MS;

use crate::auth::user_auth::create_token;
use crate::db::{self, email_verifications::EmailVerification, email_verifications::PURPOSE_SIGN_IN};
use crate::state::AppState;
use crate::util::{generate_code, hash_password, is_valid_email, normalize_email, verify_password};

use super::ApiResult;

const MIN_PASSWORD_LEN: usize = 8;
const CODE_TTL_MS: i64 = 5 * MINUTE_MS;
const MAX_CODE_ATTEMPTS: i32 = 3;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct OtpRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct OtpVerifyRequest {
    pub email: String,
    pub code: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub profile: Profile,
}

fn issue_token(state: &AppState, profile: Profile) -> ApiResult<AuthResponse> {
    let token = create_token(&profile.id, &profile.email, &state.jwt_secret).map_err(|e| {
        tracing::error!("JWT creation failed: {e}");
        AppError::new(ErrorCode::InternalError)
    })?;
    Ok(Json(AuthResponse { token, profile }))
}

fn checked_email(raw: &str) -> Result<String, AppError> {
    let email = normalize_email(raw);
    if !is_valid_email(&email) {
        return Err(AppError::validation("Invalid email"));
    }
    Ok(email)
}

/// Why no attempt could be claimed on the stored code
fn code_rejection(record: Option<&EmailVerification>, now: i64) -> AppError {
    let code = match record {
        Some(r) if now > r.expires_at => ErrorCode::VerificationCodeExpired,
        Some(r) if r.attempts >= MAX_CODE_ATTEMPTS => ErrorCode::TooManyAttempts,
        _ => ErrorCode::VerificationCodeInvalid,
    };
    AppError::new(code)
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<AuthResponse> {
    let email = checked_email(&req.email)?;
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::new(ErrorCode::PasswordTooShort).into());
    }
    if db::profiles::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(AppError::new(ErrorCode::EmailAlreadyRegistered).into());
    }

    let hashed = hash_password(&req.password).map_err(|e| {
        tracing::error!(%e, "Password hash error");
        AppError::new(ErrorCode::InternalError)
    })?;
    let full_name = req.full_name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let profile = db::profiles::create(
        &state.pool,
        &email,
        Some(&hashed),
        full_name,
        shared::util::now_millis(),
    )
    .await?;

    tracing::info!(user_id = %profile.id, "Profile registered");
    issue_token(&state, profile)
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<AuthResponse> {
    let email = normalize_email(&req.email);
    let credentials = db::profiles::find_credentials(&state.pool, &email)
        .await?
        .ok_or_else(AppError::invalid_credentials)?;

    // Code-only accounts have no password
    let valid = credentials
        .hashed_password
        .as_deref()
        .is_some_and(|hash| verify_password(&req.password, hash));
    if !valid {
        return Err(AppError::invalid_credentials().into());
    }

    let profile = db::profiles::find_by_id(&state.pool, &credentials.id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound))?;
    issue_token(&state, profile)
}

/// POST /api/auth/otp/request
pub async fn request_otp(
    State(state): State<AppState>,
    Json(req): Json<OtpRequest>,
) -> ApiResult<serde_json::Value> {
    let email = checked_email(&req.email)?;
    let code = generate_code();
    let code_hash = hash_password(&code).map_err(|e| {
        tracing::error!(%e, "Code hash error");
        AppError::new(ErrorCode::InternalError)
    })?;

    let now = shared::util::now_millis();
    db::email_verifications::upsert(
        &state.pool,
        &email,
        PURPOSE_SIGN_IN,
        &code_hash,
        now + CODE_TTL_MS,
        now,
    )
    .await?;

    state
        .email
        .send_verification_code(&email, &code)
        .await
        .map_err(|e| {
            tracing::error!(%e, "Failed to send verification email");
            AppError::upstream("Failed to send email")
        })?;

    Ok(Json(serde_json::json!({
        "message": "Verification code sent to your email"
    })))
}

/// POST /api/auth/otp/verify
///
/// First successful verification for an address creates its profile.
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(req): Json<OtpVerifyRequest>,
) -> ApiResult<AuthResponse> {
    let email = normalize_email(&req.email);
    let now = shared::util::now_millis();

    // Counting the attempt and checking the limit is one statement
    let Some(record) = db::email_verifications::claim_attempt(
        &state.pool,
        &email,
        PURPOSE_SIGN_IN,
        MAX_CODE_ATTEMPTS,
        now,
    )
    .await?
    else {
        let existing = db::email_verifications::find(&state.pool, &email, PURPOSE_SIGN_IN).await?;
        return Err(code_rejection(existing.as_ref(), now).into());
    };

    if !verify_password(req.code.trim(), &record.code) {
        return Err(AppError::new(ErrorCode::VerificationCodeInvalid).into());
    }
    db::email_verifications::delete(&state.pool, &email, PURPOSE_SIGN_IN).await?;

    let (profile, created) = db::profiles::find_or_create(&state.pool, &email, now).await?;
    if created {
        tracing::info!(user_id = %profile.id, "Profile created on first sign in");
    }
    issue_token(&state, profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(attempts: i32, expires_at: i64) -> EmailVerification {
        EmailVerification {
            email: "a@b.co".into(),
            purpose: PURPOSE_SIGN_IN.into(),
            code: "hash".into(),
            attempts,
            expires_at,
            created_at: 0,
        }
    }

    #[test]
    fn test_code_rejection() {
        assert_eq!(
            code_rejection(None, 500).code,
            ErrorCode::VerificationCodeInvalid
        );
        assert_eq!(
            code_rejection(Some(&record(0, 1000)), 1001).code,
            ErrorCode::VerificationCodeExpired
        );
        assert_eq!(
            code_rejection(Some(&record(MAX_CODE_ATTEMPTS, 1000)), 500).code,
            ErrorCode::TooManyAttempts
        );
        // Still claimable when re-read: the code was replaced meanwhile
        assert_eq!(
            code_rejection(Some(&record(1, 1000)), 1000).code,
            ErrorCode::VerificationCodeInvalid
        );
    }

    #[test]
    fn test_checked_email() {
        assert_eq!(checked_email("  Jo@Example.COM ").unwrap(), "jo@example.com");
        assert_eq!(
            checked_email("nope").unwrap_err().code,
            ErrorCode::ValidationFailed
        );
    }
}
