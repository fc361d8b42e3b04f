//! Signed-in user's profile

use axum::routing::get;
use axum::{Extension, Json, Router, extract::State};
use shared::error::{AppError, ErrorCode};
use shared::models::{Profile, ProfileUpdate};

use crate::auth::UserIdentity;
use crate::db;
use crate::state::AppState;

use super::ApiResult;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/profile", get(get_profile).put(update_profile))
}

/// GET /api/profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<Profile> {
    let profile = db::profiles::find_by_id(&state.pool, &identity.user_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound))?;
    Ok(Json(profile))
}

/// PUT /api/profile
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(req): Json<ProfileUpdate>,
) -> ApiResult<Profile> {
    let profile = db::profiles::update(
        &state.pool,
        &identity.user_id,
        &req,
        shared::util::now_millis(),
    )
    .await?
    .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound))?;
    Ok(Json(profile))
}
