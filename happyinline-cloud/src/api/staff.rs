//! Shop staff management
//!
//! Owners manage every non-owner role; admins manage managers and barbers.
//! The owner row is never changed through these routes and nobody edits their
//! own role or membership.

use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Extension, Json, Router};
use shared::error::{AppError, ErrorCode};
use shared::models::{ShopStaff, StaffCreate, StaffRole, StaffUpdate, SubscriptionPlan};
use sqlx::PgPool;

use crate::auth::UserIdentity;
use crate::auth::shop_access::{ShopMember, require_role, require_staff};
use crate::billing::plans::plan_quota;
use crate::db;
use crate::db::staff::StaffWrite;
use crate::error::ServiceResult;
use crate::state::AppState;

use super::ApiResult;
use super::shops::{load_active_shop, load_shop};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/shops/{id}/staff", get(list_staff).post(add_staff))
        .route(
            "/api/shops/{id}/staff/{user_id}",
            put(update_staff).delete(remove_staff),
        )
}

fn forbidden_role(target: StaffRole) -> AppError {
    AppError::with_message(
        ErrorCode::PermissionDenied,
        format!("Your role cannot manage {target} staff"),
    )
}

/// Whether `actor` may change or remove `target`'s membership
fn check_can_manage(actor: &ShopMember, target: &ShopStaff) -> Result<StaffRole, AppError> {
    let target_role = target
        .role()
        .ok_or_else(|| AppError::internal(format!("unknown staff role {}", target.role)))?;
    if target_role == StaffRole::Owner {
        return Err(AppError::new(ErrorCode::CannotModifyOwner));
    }
    if target.user_id == actor.staff.user_id {
        return Err(AppError::new(ErrorCode::CannotModifySelf));
    }
    if !actor.role.can_assign(target_role) {
        return Err(forbidden_role(target_role));
    }
    Ok(target_role)
}

/// Validate an update; returns whether it results in an additional active barber
fn check_update(
    actor: &ShopMember,
    target: &ShopStaff,
    update: &StaffUpdate,
) -> Result<bool, AppError> {
    let current = check_can_manage(actor, target)?;
    if let Some(role) = update.role
        && !actor.role.can_assign(role)
    {
        return Err(forbidden_role(role));
    }

    let becomes_active = update.is_active.unwrap_or(target.is_active);
    let new_role = update.role.unwrap_or(current);
    let was_active_barber = target.is_active && current == StaffRole::Barber;
    Ok(becomes_active && new_role == StaffRole::Barber && !was_active_barber)
}

/// Barber seats allowed by the shop owner's plan; `None` when unbounded
async fn barber_seat_limit(
    pool: &PgPool,
    owner_id: &str,
) -> ServiceResult<Option<(SubscriptionPlan, u32)>> {
    let plan = db::profiles::plan_of(pool, owner_id).await?;
    Ok(plan_quota(plan).map(|limit| (plan, limit)))
}

fn plan_limit_reached(seats: Option<(SubscriptionPlan, u32)>) -> AppError {
    let err = AppError::new(ErrorCode::PlanLimitReached);
    match seats {
        Some((plan, limit)) => err
            .with_detail("plan", plan.as_db())
            .with_detail("limit", limit),
        None => err,
    }
}

/// Map a seat-limited write to the response or its error
fn staff_written(
    write: StaffWrite,
    seats: Option<(SubscriptionPlan, u32)>,
    unchanged: ErrorCode,
) -> Result<ShopStaff, AppError> {
    match write {
        StaffWrite::Saved(staff) => Ok(staff),
        StaffWrite::Unchanged => Err(AppError::new(unchanged)),
        StaffWrite::SeatLimitReached => Err(plan_limit_reached(seats)),
    }
}

/// GET /api/shops/{id}/staff (any staff; includes removed members)
pub async fn list_staff(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(shop_id): Path<String>,
) -> ApiResult<Vec<ShopStaff>> {
    load_shop(&state.pool, &shop_id).await?;
    let member = require_staff(&state.pool, &shop_id, &identity.user_id).await?;
    let include_inactive = member.role.can_manage_staff();
    Ok(Json(
        db::staff::list(&state.pool, &shop_id, include_inactive).await?,
    ))
}

/// POST /api/shops/{id}/staff
pub async fn add_staff(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(shop_id): Path<String>,
    Json(req): Json<StaffCreate>,
) -> ApiResult<ShopStaff> {
    let shop = load_active_shop(&state.pool, &shop_id).await?;
    let actor = require_role(&state.pool, &shop_id, &identity.user_id, StaffRole::Admin).await?;
    if !actor.role.can_assign(req.role) {
        return Err(forbidden_role(req.role).into());
    }

    let email = crate::util::normalize_email(&req.email);
    let profile = db::profiles::find_by_email(&state.pool, &email)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound))?;

    let seats = if req.role == StaffRole::Barber {
        barber_seat_limit(&state.pool, &shop.owner_id).await?
    } else {
        None
    };

    let write = db::staff::add(
        &state.pool,
        &shop_id,
        &profile.id,
        req.role,
        req.bio.as_deref(),
        seats.map(|(_, limit)| limit),
        shared::util::now_millis(),
    )
    .await?;
    let staff = staff_written(write, seats, ErrorCode::StaffAlreadyExists)?;

    tracing::info!(shop_id = %shop_id, user_id = %profile.id, role = %req.role, "Staff added");
    Ok(Json(staff))
}

/// PUT /api/shops/{id}/staff/{user_id}
pub async fn update_staff(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((shop_id, user_id)): Path<(String, String)>,
    Json(req): Json<StaffUpdate>,
) -> ApiResult<ShopStaff> {
    let shop = load_shop(&state.pool, &shop_id).await?;
    let actor = require_role(&state.pool, &shop_id, &identity.user_id, StaffRole::Admin).await?;
    let target = db::staff::find(&state.pool, &shop_id, &user_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::StaffNotFound))?;

    let seats = if check_update(&actor, &target, &req)? {
        barber_seat_limit(&state.pool, &shop.owner_id).await?
    } else {
        None
    };

    let write = db::staff::update(
        &state.pool,
        &shop_id,
        &user_id,
        &req,
        seats.map(|(_, limit)| limit),
        shared::util::now_millis(),
    )
    .await?;
    Ok(Json(staff_written(write, seats, ErrorCode::StaffNotFound)?))
}

/// DELETE /api/shops/{id}/staff/{user_id} (soft delete)
pub async fn remove_staff(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((shop_id, user_id)): Path<(String, String)>,
) -> ApiResult<serde_json::Value> {
    load_shop(&state.pool, &shop_id).await?;
    let actor = require_role(&state.pool, &shop_id, &identity.user_id, StaffRole::Admin).await?;
    let target = db::staff::find(&state.pool, &shop_id, &user_id)
        .await?
        .filter(|s| s.is_active)
        .ok_or_else(|| AppError::new(ErrorCode::StaffNotFound))?;
    check_can_manage(&actor, &target)?;

    db::staff::deactivate(&state.pool, &shop_id, &user_id, shared::util::now_millis()).await?;
    tracing::info!(shop_id = %shop_id, user_id = %user_id, "Staff removed");
    Ok(Json(serde_json::json!({ "message": "Staff removed" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staff(user_id: &str, role: StaffRole, is_active: bool) -> ShopStaff {
        ShopStaff {
            id: format!("st-{user_id}"),
            shop_id: "shop1".into(),
            user_id: user_id.into(),
            role: role.as_db().into(),
            is_active,
            bio: None,
            full_name: None,
            email: format!("{user_id}@example.com"),
            avatar_url: None,
            created_at: 0,
        }
    }

    fn actor(role: StaffRole) -> ShopMember {
        ShopMember {
            staff: staff("actor", role, true),
            role,
        }
    }

    fn role_change(role: StaffRole) -> StaffUpdate {
        StaffUpdate {
            role: Some(role),
            is_active: None,
            bio: None,
        }
    }

    #[test]
    fn test_owner_row_is_immutable() {
        let err = check_can_manage(&actor(StaffRole::Owner), &staff("o", StaffRole::Owner, true))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::CannotModifyOwner);
    }

    #[test]
    fn test_cannot_modify_self() {
        let me = actor(StaffRole::Admin);
        let err = check_update(&me, &me.staff, &role_change(StaffRole::Manager)).unwrap_err();
        assert_eq!(err.code, ErrorCode::CannotModifySelf);
    }

    #[test]
    fn test_admin_cannot_touch_admin_or_promote_to_admin() {
        let admin = actor(StaffRole::Admin);
        let peer = staff("peer", StaffRole::Admin, true);
        assert_eq!(
            check_can_manage(&admin, &peer).unwrap_err().code,
            ErrorCode::PermissionDenied
        );

        let barber = staff("b", StaffRole::Barber, true);
        assert_eq!(
            check_update(&admin, &barber, &role_change(StaffRole::Admin))
                .unwrap_err()
                .code,
            ErrorCode::PermissionDenied
        );
        assert!(check_update(&admin, &barber, &role_change(StaffRole::Manager)).is_ok());
    }

    #[test]
    fn test_owner_manages_admins() {
        let owner = actor(StaffRole::Owner);
        let admin = staff("a", StaffRole::Admin, true);
        assert!(check_update(&owner, &admin, &role_change(StaffRole::Manager)).is_ok());
    }

    #[test]
    fn test_barber_seat_needed() {
        let owner = actor(StaffRole::Owner);

        let manager = staff("m", StaffRole::Manager, true);
        assert!(check_update(&owner, &manager, &role_change(StaffRole::Barber)).unwrap());

        let removed_barber = staff("b", StaffRole::Barber, false);
        let reactivate = StaffUpdate {
            role: None,
            is_active: Some(true),
            bio: None,
        };
        assert!(check_update(&owner, &removed_barber, &reactivate).unwrap());

        let active_barber = staff("b2", StaffRole::Barber, true);
        let bio_only = StaffUpdate {
            role: None,
            is_active: None,
            bio: Some("Fades".into()),
        };
        assert!(!check_update(&owner, &active_barber, &bio_only).unwrap());
    }

    #[test]
    fn test_staff_written_maps_seat_limit() {
        let seats = Some((SubscriptionPlan::Basic, 2));
        let err = staff_written(StaffWrite::SeatLimitReached, seats, ErrorCode::StaffNotFound)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PlanLimitReached);
        let details = err.details.unwrap();
        assert_eq!(details["plan"], "basic");
        assert_eq!(details["limit"], 2);

        let err = staff_written(StaffWrite::Unchanged, None, ErrorCode::StaffAlreadyExists)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::StaffAlreadyExists);

        let saved = staff_written(
            StaffWrite::Saved(staff("b", StaffRole::Barber, true)),
            seats,
            ErrorCode::StaffNotFound,
        )
        .unwrap();
        assert_eq!(saved.user_id, "b");
    }
}
