//! Shop management, discovery and signup links

use axum::extract::{Path, Query, State};
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use shared::deep_link;
use shared::error::{AppError, ErrorCode};
use shared::models::{Shop, ShopCreate, ShopQuery, ShopService, ShopStaff, ShopUpdate, StaffRole};
use sqlx::PgPool;

use crate::auth::UserIdentity;
use crate::auth::shop_access::{require_role, require_staff};
use crate::db;
use crate::error::ServiceResult;
use crate::state::AppState;

use super::{ApiResult, page};

/// Routes open to anonymous customers
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/api/shops", get(list_shops))
        .route("/api/shops/{id}", get(get_shop))
        .route("/api/shops/resolve-link", post(resolve_link))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/shops", post(create_shop))
        .route("/api/shops/mine", get(my_shops))
        .route("/api/shops/{id}", put(update_shop).delete(delete_shop))
        .route("/api/shops/{id}/signup-link", get(signup_link))
}

/// Shop with what a customer needs to book
#[derive(Serialize)]
pub struct ShopDetails {
    pub shop: Shop,
    pub services: Vec<ShopService>,
    pub staff: Vec<ShopStaff>,
}

#[derive(Serialize)]
pub struct SignupLink {
    pub shop_id: String,
    pub link: String,
}

#[derive(Deserialize)]
pub struct ResolveLinkRequest {
    pub link: String,
}

pub(crate) async fn load_shop(pool: &PgPool, id: &str) -> ServiceResult<Shop> {
    Ok(db::shops::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ShopNotFound))?)
}

pub(crate) async fn load_active_shop(pool: &PgPool, id: &str) -> ServiceResult<Shop> {
    let shop = load_shop(pool, id).await?;
    if !shop.is_active {
        return Err(AppError::new(ErrorCode::ShopInactive).into());
    }
    Ok(shop)
}

async fn details(pool: &PgPool, shop: Shop) -> ServiceResult<ShopDetails> {
    let services = db::services::list_for_shop(pool, &shop.id, false).await?;
    let staff = db::staff::list(pool, &shop.id, false).await?;
    Ok(ShopDetails {
        shop,
        services,
        staff,
    })
}

fn validate_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::with_message(
            ErrorCode::RequiredField,
            "Shop name is required",
        ));
    }
    Ok(())
}

/// GET /api/shops?q=&limit=&offset=
pub async fn list_shops(
    State(state): State<AppState>,
    Query(query): Query<ShopQuery>,
) -> ApiResult<Vec<Shop>> {
    let (limit, offset) = page(query.limit, query.offset);
    let shops = db::shops::search_active(&state.pool, query.q.as_deref(), limit, offset).await?;
    Ok(Json(shops))
}

/// GET /api/shops/{id}
pub async fn get_shop(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ShopDetails> {
    let shop = load_active_shop(&state.pool, &id).await?;
    Ok(Json(details(&state.pool, shop).await?))
}

/// POST /api/shops/resolve-link
pub async fn resolve_link(
    State(state): State<AppState>,
    Json(req): Json<ResolveLinkRequest>,
) -> ApiResult<ShopDetails> {
    let shop_id = deep_link::parse_shop_signup_link(&req.link)
        .ok_or_else(|| AppError::new(ErrorCode::InvalidShopLink))?;
    let shop = load_active_shop(&state.pool, shop_id).await?;
    Ok(Json(details(&state.pool, shop).await?))
}

/// POST /api/shops
pub async fn create_shop(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(req): Json<ShopCreate>,
) -> ApiResult<Shop> {
    validate_name(&req.name)?;
    let shop =
        db::shops::create(&state.pool, &identity.user_id, &req, shared::util::now_millis()).await?;
    tracing::info!(shop_id = %shop.id, owner_id = %identity.user_id, "Shop created");
    Ok(Json(shop))
}

/// GET /api/shops/mine
pub async fn my_shops(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<Vec<Shop>> {
    Ok(Json(
        db::shops::list_for_member(&state.pool, &identity.user_id).await?,
    ))
}

/// PUT /api/shops/{id} (owner or admin)
pub async fn update_shop(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(id): Path<String>,
    Json(req): Json<ShopUpdate>,
) -> ApiResult<Shop> {
    load_shop(&state.pool, &id).await?;
    require_role(&state.pool, &id, &identity.user_id, StaffRole::Admin).await?;
    if let Some(name) = &req.name {
        validate_name(name)?;
    }

    let shop = db::shops::update(&state.pool, &id, &req, shared::util::now_millis())
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ShopNotFound))?;
    Ok(Json(shop))
}

/// DELETE /api/shops/{id} (owner only, soft delete)
pub async fn delete_shop(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    load_shop(&state.pool, &id).await?;
    require_role(&state.pool, &id, &identity.user_id, StaffRole::Owner).await?;

    if !db::shops::deactivate(&state.pool, &id, shared::util::now_millis()).await? {
        return Err(AppError::new(ErrorCode::ShopInactive).into());
    }
    tracing::info!(shop_id = %id, "Shop deactivated");
    Ok(Json(serde_json::json!({ "message": "Shop deactivated" })))
}

/// GET /api/shops/{id}/signup-link
pub async fn signup_link(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(id): Path<String>,
) -> ApiResult<SignupLink> {
    load_active_shop(&state.pool, &id).await?;
    require_staff(&state.pool, &id, &identity.user_id).await?;
    Ok(Json(SignupLink {
        link: deep_link::shop_signup_link(&id),
        shop_id: id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Fade Factory").is_ok());
        assert_eq!(
            validate_name("   ").unwrap_err().code,
            ErrorCode::RequiredField
        );
    }
}
