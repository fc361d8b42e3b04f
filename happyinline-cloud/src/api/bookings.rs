//! Booking creation, listing and lifecycle actions

use std::collections::BTreeSet;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    Booking, BookingCreate, BookingStatus, BookingStatusChange, ShopService, StaffRole,
};

use crate::auth::UserIdentity;
use crate::auth::shop_access::{ShopMember, authorize, require_staff};
use crate::db::{self, bookings::BookingFilter, bookings::NewBooking};
use crate::error::ServiceResult;
use crate::state::AppState;

use super::shops::{load_active_shop, load_shop};
use super::{ApiResult, page};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/bookings", get(list_my_bookings).post(create_booking))
        .route("/api/bookings/{id}", get(get_booking))
        .route("/api/bookings/{id}/confirm", post(confirm_booking))
        .route("/api/bookings/{id}/reject", post(reject_booking))
        .route("/api/bookings/{id}/complete", post(complete_booking))
        .route("/api/bookings/{id}/cancel", post(cancel_booking))
        .route("/api/shops/{id}/bookings", get(list_shop_bookings))
}

#[derive(Debug, Default, Deserialize)]
pub struct BookingListQuery {
    pub status: Option<BookingStatus>,
    pub barber_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingAction {
    Confirm,
    Reject,
    Complete,
    Cancel,
}

impl BookingAction {
    fn target(self) -> BookingStatus {
        match self {
            Self::Confirm => BookingStatus::Confirmed,
            Self::Reject => BookingStatus::Rejected,
            Self::Complete => BookingStatus::Completed,
            Self::Cancel => BookingStatus::Cancelled,
        }
    }
}

/// Total price and duration of the requested services
///
/// Every requested id must be an active service of the shop.
fn summarize(requested: &[String], found: &[ShopService]) -> Result<(Decimal, i32), AppError> {
    let unique: BTreeSet<&str> = requested.iter().map(String::as_str).collect();
    if unique.is_empty() {
        return Err(AppError::new(ErrorCode::BookingEmpty));
    }
    if let Some(missing) = unique
        .iter()
        .find(|id| !found.iter().any(|s| s.id == **id))
    {
        return Err(AppError::new(ErrorCode::ServiceInactive).with_detail("service_id", *missing));
    }

    let total: Decimal = found.iter().map(|s| s.price).sum();
    let duration: i32 = found.iter().map(|s| s.duration_minutes).sum();
    Ok((total, duration))
}

/// Whether `user_id` may perform `action` on `booking`; returns the current status
///
/// Managers and above act on every booking of the shop, barbers only on their
/// own. Customers may only cancel, and only before the appointment starts.
fn check_action(
    booking: &Booking,
    action: BookingAction,
    user_id: &str,
    member: Option<&ShopMember>,
    now: i64,
) -> Result<BookingStatus, AppError> {
    let current = booking
        .status()
        .ok_or_else(|| AppError::internal(format!("unknown booking status {}", booking.status)))?;
    if current.is_terminal() {
        return Err(AppError::new(ErrorCode::BookingInvalidTransition)
            .with_detail("from", current.as_db())
            .with_detail("to", action.target().as_db()));
    }

    let staff_allowed = member.is_some_and(|m| {
        m.role.can_manage_all_bookings() || booking.barber_id.as_deref() == Some(user_id)
    });

    if !staff_allowed {
        let is_customer = booking.customer_id == user_id;
        if action != BookingAction::Cancel || !is_customer {
            return Err(match member {
                Some(_) => AppError::permission_denied("Booking is assigned to another barber"),
                None if is_customer => AppError::permission_denied("Only the shop can do this"),
                None => AppError::new(ErrorCode::NotShopStaff),
            });
        }
        if now >= booking.appointment_at {
            return Err(AppError::new(ErrorCode::BookingAlreadyStarted));
        }
    }

    let target = action.target();
    if !current.can_transition_to(target) {
        return Err(AppError::new(ErrorCode::BookingInvalidTransition)
            .with_detail("from", current.as_db())
            .with_detail("to", target.as_db()));
    }
    Ok(current)
}

async fn load_booking(state: &AppState, id: &str) -> ServiceResult<Booking> {
    Ok(db::bookings::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::BookingNotFound))?)
}

/// Active membership of `user_id` in the booking's shop, if any
async fn membership(
    state: &AppState,
    shop_id: &str,
    user_id: &str,
) -> ServiceResult<Option<ShopMember>> {
    let staff = db::staff::find(&state.pool, shop_id, user_id).await?;
    Ok(authorize(staff, StaffRole::Barber).ok())
}

/// POST /api/bookings
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(req): Json<BookingCreate>,
) -> ApiResult<Booking> {
    let now = shared::util::now_millis();
    load_active_shop(&state.pool, &req.shop_id).await?;
    if req.appointment_at <= now {
        return Err(AppError::new(ErrorCode::BookingInPast).into());
    }

    let services =
        db::services::find_active_by_ids(&state.pool, &req.shop_id, &req.service_ids).await?;
    let (total_amount, duration_minutes) = summarize(&req.service_ids, &services)?;

    if let Some(barber_id) = req.barber_id.as_deref() {
        db::staff::find(&state.pool, &req.shop_id, barber_id)
            .await?
            .filter(|s| s.is_active)
            .ok_or_else(|| {
                AppError::with_message(ErrorCode::StaffNotFound, "Barber is not staff of this shop")
            })?;
    }

    let service_ids: Vec<String> = services.iter().map(|s| s.id.clone()).collect();
    let notes = req
        .customer_notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let booking = db::bookings::insert(
        &state.pool,
        &NewBooking {
            shop_id: &req.shop_id,
            customer_id: &identity.user_id,
            barber_id: req.barber_id.as_deref(),
            service_ids: &service_ids,
            appointment_at: req.appointment_at,
            duration_minutes,
            total_amount,
            customer_notes: notes,
        },
        now,
    )
    .await?
    .ok_or_else(|| AppError::new(ErrorCode::BookingSlotTaken))?;

    tracing::info!(
        booking_id = %booking.id,
        reference = %booking.reference,
        shop_id = %booking.shop_id,
        "Booking created"
    );
    Ok(Json(booking))
}

/// GET /api/bookings (the caller's own bookings)
pub async fn list_my_bookings(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Query(query): Query<BookingListQuery>,
) -> ApiResult<Vec<Booking>> {
    let (limit, offset) = page(query.limit, query.offset);
    let filter = BookingFilter {
        status: query.status,
        barber_id: None,
        limit,
        offset,
    };
    Ok(Json(
        db::bookings::list_for_customer(&state.pool, &identity.user_id, &filter).await?,
    ))
}

/// GET /api/shops/{id}/bookings (barbers see only their own)
pub async fn list_shop_bookings(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(shop_id): Path<String>,
    Query(query): Query<BookingListQuery>,
) -> ApiResult<Vec<Booking>> {
    load_shop(&state.pool, &shop_id).await?;
    let member = require_staff(&state.pool, &shop_id, &identity.user_id).await?;
    let barber_id = if member.role.can_manage_all_bookings() {
        query.barber_id.as_deref()
    } else {
        Some(identity.user_id.as_str())
    };

    let (limit, offset) = page(query.limit, query.offset);
    let filter = BookingFilter {
        status: query.status,
        barber_id,
        limit,
        offset,
    };
    Ok(Json(
        db::bookings::list_for_shop(&state.pool, &shop_id, &filter).await?,
    ))
}

/// GET /api/bookings/{id} (customer or shop staff)
pub async fn get_booking(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(id): Path<String>,
) -> ApiResult<Booking> {
    let booking = load_booking(&state, &id).await?;
    if booking.customer_id != identity.user_id
        && membership(&state, &booking.shop_id, &identity.user_id)
            .await?
            .is_none()
    {
        return Err(AppError::new(ErrorCode::BookingNotFound).into());
    }
    Ok(Json(booking))
}

async fn apply_action(
    state: &AppState,
    identity: &UserIdentity,
    id: &str,
    action: BookingAction,
    reason: Option<String>,
) -> ApiResult<Booking> {
    let now = shared::util::now_millis();
    let booking = load_booking(state, id).await?;
    let member = membership(state, &booking.shop_id, &identity.user_id).await?;
    let current = check_action(&booking, action, &identity.user_id, member.as_ref(), now)?;

    let reason = reason.as_deref().map(str::trim).filter(|r| !r.is_empty());
    let updated = db::bookings::transition(
        &state.pool,
        id,
        current,
        action.target(),
        reason,
        &identity.user_id,
        now,
    )
    .await?
    .ok_or_else(|| {
        // Another request moved the booking first
        AppError::new(ErrorCode::BookingInvalidTransition)
    })?;

    tracing::info!(
        booking_id = %updated.id,
        from = %current,
        to = %updated.status,
        actor = %identity.user_id,
        "Booking status changed"
    );

    if matches!(action, BookingAction::Confirm | BookingAction::Reject) {
        notify_customer(state, &updated, action).await;
    }
    Ok(Json(updated))
}

/// Best effort: a failed email never fails the action
async fn notify_customer(state: &AppState, booking: &Booking, action: BookingAction) {
    let lookup = async {
        let customer = db::profiles::find_by_id(&state.pool, &booking.customer_id).await?;
        let shop = db::shops::find_by_id(&state.pool, &booking.shop_id).await?;
        Ok::<_, db::BoxError>(customer.zip(shop))
    };
    let (customer, shop) = match lookup.await {
        Ok(Some(found)) => found,
        Ok(None) => return,
        Err(e) => {
            tracing::warn!(booking_id = %booking.id, error = %e, "Booking email lookup failed");
            return;
        }
    };

    let result = match action {
        BookingAction::Confirm => {
            state
                .email
                .send_booking_confirmed(&customer.email, booking, &shop.name)
                .await
        }
        _ => {
            state
                .email
                .send_booking_rejected(&customer.email, booking, &shop.name)
                .await
        }
    };
    if let Err(e) = result {
        tracing::warn!(booking_id = %booking.id, error = %e, "Booking email failed");
    }
}

/// POST /api/bookings/{id}/confirm
pub async fn confirm_booking(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(id): Path<String>,
) -> ApiResult<Booking> {
    apply_action(&state, &identity, &id, BookingAction::Confirm, None).await
}

/// POST /api/bookings/{id}/reject
pub async fn reject_booking(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(id): Path<String>,
    body: Option<Json<BookingStatusChange>>,
) -> ApiResult<Booking> {
    let reason = body.and_then(|Json(b)| b.reason);
    apply_action(&state, &identity, &id, BookingAction::Reject, reason).await
}

/// POST /api/bookings/{id}/complete
pub async fn complete_booking(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(id): Path<String>,
) -> ApiResult<Booking> {
    apply_action(&state, &identity, &id, BookingAction::Complete, None).await
}

/// POST /api/bookings/{id}/cancel
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(id): Path<String>,
    body: Option<Json<BookingStatusChange>>,
) -> ApiResult<Booking> {
    let reason = body.and_then(|Json(b)| b.reason);
    apply_action(&state, &identity, &id, BookingAction::Cancel, reason).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::ShopStaff;

    const START: i64 = 1_800_000_000_000;

    fn booking(status: BookingStatus, barber_id: Option<&str>) -> Booking {
        Booking {
            id: "b1".into(),
            reference: "HI-AAAAAA".into(),
            shop_id: "shop1".into(),
            customer_id: "customer".into(),
            barber_id: barber_id.map(str::to_string),
            service_ids: vec!["svc1".into()],
            appointment_at: START,
            duration_minutes: 30,
            total_amount: Decimal::new(2500, 2),
            status: status.as_db().into(),
            customer_notes: None,
            rejection_reason: None,
            cancellation_reason: None,
            cancelled_by: None,
            confirmed_at: None,
            completed_at: None,
            cancelled_at: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn member(user_id: &str, role: StaffRole) -> ShopMember {
        ShopMember {
            staff: ShopStaff {
                id: format!("st-{user_id}"),
                shop_id: "shop1".into(),
                user_id: user_id.into(),
                role: role.as_db().into(),
                is_active: true,
                bio: None,
                full_name: None,
                email: format!("{user_id}@example.com"),
                avatar_url: None,
                created_at: 0,
            },
            role,
        }
    }

    fn service(id: &str, cents: i64, minutes: i32) -> ShopService {
        ShopService {
            id: id.into(),
            shop_id: "shop1".into(),
            service_id: None,
            name: id.into(),
            description: None,
            price: Decimal::new(cents, 2),
            duration_minutes: minutes,
            is_active: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_summarize_sums_services() {
        let found = [service("cut", 2500, 30), service("beard", 1500, 15)];
        let requested = vec!["cut".to_string(), "beard".to_string(), "cut".to_string()];
        let (total, minutes) = summarize(&requested, &found).unwrap();
        assert_eq!(total, Decimal::new(4000, 2));
        assert_eq!(minutes, 45);
    }

    #[test]
    fn test_summarize_rejects_empty_and_inactive() {
        assert_eq!(
            summarize(&[], &[]).unwrap_err().code,
            ErrorCode::BookingEmpty
        );
        let found = [service("cut", 2500, 30)];
        let requested = vec!["cut".to_string(), "gone".to_string()];
        assert_eq!(
            summarize(&requested, &found).unwrap_err().code,
            ErrorCode::ServiceInactive
        );
    }

    #[test]
    fn test_assigned_barber_confirms() {
        let b = booking(BookingStatus::Pending, Some("barber"));
        let m = member("barber", StaffRole::Barber);
        assert_eq!(
            check_action(&b, BookingAction::Confirm, "barber", Some(&m), 0).unwrap(),
            BookingStatus::Pending
        );
    }

    #[test]
    fn test_other_barber_is_denied() {
        let b = booking(BookingStatus::Pending, Some("barber"));
        let m = member("other", StaffRole::Barber);
        let err = check_action(&b, BookingAction::Confirm, "other", Some(&m), 0).unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
    }

    #[test]
    fn test_manager_acts_on_any_booking() {
        let b = booking(BookingStatus::Confirmed, None);
        let m = member("mgr", StaffRole::Manager);
        assert!(check_action(&b, BookingAction::Complete, "mgr", Some(&m), 0).is_ok());
    }

    #[test]
    fn test_customer_cancels_before_start_only() {
        let b = booking(BookingStatus::Confirmed, Some("barber"));
        assert!(check_action(&b, BookingAction::Cancel, "customer", None, START - 1).is_ok());
        assert_eq!(
            check_action(&b, BookingAction::Cancel, "customer", None, START)
                .unwrap_err()
                .code,
            ErrorCode::BookingAlreadyStarted
        );
    }

    #[test]
    fn test_customer_cannot_confirm() {
        let b = booking(BookingStatus::Pending, None);
        let err = check_action(&b, BookingAction::Confirm, "customer", None, 0).unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);

        let err = check_action(&b, BookingAction::Confirm, "stranger", None, 0).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotShopStaff);
    }

    #[test]
    fn test_invalid_transitions() {
        let m = member("mgr", StaffRole::Manager);
        let pending = booking(BookingStatus::Pending, None);
        assert_eq!(
            check_action(&pending, BookingAction::Complete, "mgr", Some(&m), 0)
                .unwrap_err()
                .code,
            ErrorCode::BookingInvalidTransition
        );

        let done = booking(BookingStatus::Completed, None);
        for action in [
            BookingAction::Confirm,
            BookingAction::Reject,
            BookingAction::Complete,
            BookingAction::Cancel,
        ] {
            assert_eq!(
                check_action(&done, action, "mgr", Some(&m), 0)
                    .unwrap_err()
                    .code,
                ErrorCode::BookingInvalidTransition
            );
        }
    }

    #[test]
    fn test_closed_booking_reports_transition_before_start_time() {
        let cancelled = booking(BookingStatus::Cancelled, Some("barber"));
        let err = check_action(&cancelled, BookingAction::Cancel, "customer", None, START + 1)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BookingInvalidTransition);
    }
}
