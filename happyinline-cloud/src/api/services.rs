//! Service catalog and per-shop services

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{CatalogService, ShopService, ShopServiceCreate, ShopServiceUpdate, StaffRole};

use crate::auth::UserIdentity;
use crate::auth::shop_access::require_role;
use crate::db::{self, services::NewShopService};
use crate::state::AppState;

use super::ApiResult;
use super::shops::{load_active_shop, load_shop};

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/api/services/catalog", get(list_catalog))
        .route("/api/shops/{id}/services", get(list_shop_services))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/shops/{id}/services", post(create_shop_service))
        .route(
            "/api/shops/{id}/services/{service_id}",
            put(update_shop_service).delete(delete_shop_service),
        )
}

/// Fields of a new shop service, template defaults applied
#[derive(Debug, PartialEq)]
struct ResolvedService {
    name: String,
    description: Option<String>,
    price: Decimal,
    duration_minutes: i32,
}

fn validate_price(price: Decimal) -> Result<(), AppError> {
    if price <= Decimal::ZERO {
        return Err(AppError::new(ErrorCode::ServiceInvalidPrice));
    }
    Ok(())
}

fn validate_duration(minutes: i32) -> Result<(), AppError> {
    if minutes <= 0 {
        return Err(AppError::new(ErrorCode::ServiceInvalidDuration));
    }
    Ok(())
}

/// Request values win over the catalog template
fn resolve_service(
    template: Option<&CatalogService>,
    req: &ShopServiceCreate,
) -> Result<ResolvedService, AppError> {
    let name = req
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .or_else(|| template.map(|t| t.name.clone()))
        .ok_or_else(|| AppError::with_message(ErrorCode::RequiredField, "Service name is required"))?;
    let price = req
        .price
        .or(template.map(|t| t.default_price))
        .ok_or_else(|| AppError::with_message(ErrorCode::RequiredField, "Price is required"))?;
    let duration_minutes = req
        .duration_minutes
        .or(template.map(|t| t.default_duration_minutes))
        .ok_or_else(|| AppError::with_message(ErrorCode::RequiredField, "Duration is required"))?;

    validate_price(price)?;
    validate_duration(duration_minutes)?;

    Ok(ResolvedService {
        name,
        description: req
            .description
            .clone()
            .or_else(|| template.and_then(|t| t.description.clone())),
        price,
        duration_minutes,
    })
}

/// GET /api/services/catalog
pub async fn list_catalog(State(state): State<AppState>) -> ApiResult<Vec<CatalogService>> {
    Ok(Json(db::services::list_catalog(&state.pool).await?))
}

/// GET /api/shops/{id}/services (active services)
pub async fn list_shop_services(
    State(state): State<AppState>,
    Path(shop_id): Path<String>,
) -> ApiResult<Vec<ShopService>> {
    load_active_shop(&state.pool, &shop_id).await?;
    Ok(Json(
        db::services::list_for_shop(&state.pool, &shop_id, false).await?,
    ))
}

/// POST /api/shops/{id}/services (manager and above)
pub async fn create_shop_service(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(shop_id): Path<String>,
    Json(req): Json<ShopServiceCreate>,
) -> ApiResult<ShopService> {
    load_active_shop(&state.pool, &shop_id).await?;
    require_role(&state.pool, &shop_id, &identity.user_id, StaffRole::Manager).await?;

    let template = match req.service_id.as_deref() {
        Some(id) => Some(
            db::services::find_catalog(&state.pool, id)
                .await?
                .ok_or_else(|| AppError::new(ErrorCode::CatalogServiceNotFound))?,
        ),
        None => None,
    };
    let resolved = resolve_service(template.as_ref(), &req)?;

    let service = db::services::create(
        &state.pool,
        &NewShopService {
            shop_id: &shop_id,
            service_id: req.service_id.as_deref(),
            name: &resolved.name,
            description: resolved.description.as_deref(),
            price: resolved.price,
            duration_minutes: resolved.duration_minutes,
        },
        shared::util::now_millis(),
    )
    .await?;

    tracing::info!(shop_id = %shop_id, service_id = %service.id, "Shop service created");
    Ok(Json(service))
}

/// PUT /api/shops/{id}/services/{service_id}
pub async fn update_shop_service(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((shop_id, service_id)): Path<(String, String)>,
    Json(req): Json<ShopServiceUpdate>,
) -> ApiResult<ShopService> {
    load_shop(&state.pool, &shop_id).await?;
    require_role(&state.pool, &shop_id, &identity.user_id, StaffRole::Manager).await?;
    if let Some(price) = req.price {
        validate_price(price)?;
    }
    if let Some(minutes) = req.duration_minutes {
        validate_duration(minutes)?;
    }
    if req.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(
            AppError::with_message(ErrorCode::RequiredField, "Service name is required").into(),
        );
    }

    let service = db::services::update(
        &state.pool,
        &shop_id,
        &service_id,
        &req,
        shared::util::now_millis(),
    )
    .await?
    .ok_or_else(|| AppError::new(ErrorCode::ServiceNotFound))?;
    Ok(Json(service))
}

/// DELETE /api/shops/{id}/services/{service_id} (soft delete)
pub async fn delete_shop_service(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((shop_id, service_id)): Path<(String, String)>,
) -> ApiResult<serde_json::Value> {
    load_shop(&state.pool, &shop_id).await?;
    require_role(&state.pool, &shop_id, &identity.user_id, StaffRole::Manager).await?;

    let now = shared::util::now_millis();
    if !db::services::deactivate(&state.pool, &shop_id, &service_id, now).await? {
        return Err(AppError::new(ErrorCode::ServiceNotFound).into());
    }
    Ok(Json(serde_json::json!({ "message": "Service deactivated" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn haircut() -> CatalogService {
        CatalogService {
            id: "cat-haircut".into(),
            name: "Haircut".into(),
            description: Some("Classic cut".into()),
            category: Some("hair".into()),
            default_price: Decimal::new(2500, 2),
            default_duration_minutes: 30,
        }
    }

    fn request() -> ShopServiceCreate {
        ShopServiceCreate {
            service_id: None,
            name: None,
            description: None,
            price: None,
            duration_minutes: None,
        }
    }

    #[test]
    fn test_template_defaults() {
        let resolved = resolve_service(Some(&haircut()), &request()).unwrap();
        assert_eq!(resolved.name, "Haircut");
        assert_eq!(resolved.price, Decimal::new(2500, 2));
        assert_eq!(resolved.duration_minutes, 30);
        assert_eq!(resolved.description.as_deref(), Some("Classic cut"));
    }

    #[test]
    fn test_overrides_win() {
        let req = ShopServiceCreate {
            name: Some("Skin fade".into()),
            price: Some(Decimal::new(3500, 2)),
            ..request()
        };
        let resolved = resolve_service(Some(&haircut()), &req).unwrap();
        assert_eq!(resolved.name, "Skin fade");
        assert_eq!(resolved.price, Decimal::new(3500, 2));
        assert_eq!(resolved.duration_minutes, 30);
    }

    #[test]
    fn test_custom_service_needs_all_fields() {
        assert_eq!(
            resolve_service(None, &request()).unwrap_err().code,
            ErrorCode::RequiredField
        );
    }

    #[test]
    fn test_rejects_non_positive_values() {
        let free = ShopServiceCreate {
            price: Some(Decimal::ZERO),
            ..request()
        };
        assert_eq!(
            resolve_service(Some(&haircut()), &free).unwrap_err().code,
            ErrorCode::ServiceInvalidPrice
        );

        let instant = ShopServiceCreate {
            duration_minutes: Some(0),
            ..request()
        };
        assert_eq!(
            resolve_service(Some(&haircut()), &instant).unwrap_err().code,
            ErrorCode::ServiceInvalidDuration
        );
    }
}
