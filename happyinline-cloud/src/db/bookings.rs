//! Booking rows

use rust_decimal::Decimal;
use shared::models::{Booking, BookingStatus};
use sqlx::PgPool;

use super::BoxError;

const BOOKING_COLUMNS: &str = "id, reference, shop_id, customer_id, barber_id, service_ids, \
     appointment_at, duration_minutes, total_amount, status, customer_notes, rejection_reason, \
     cancellation_reason, cancelled_by, confirmed_at, completed_at, cancelled_at, \
     created_at, updated_at";

/// Values of a new booking after services are resolved
pub struct NewBooking<'a> {
    pub shop_id: &'a str,
    pub customer_id: &'a str,
    pub barber_id: Option<&'a str>,
    pub service_ids: &'a [String],
    pub appointment_at: i64,
    pub duration_minutes: i32,
    pub total_amount: Decimal,
    pub customer_notes: Option<&'a str>,
}

/// Filters for booking lists
#[derive(Debug, Default)]
pub struct BookingFilter<'a> {
    pub status: Option<BookingStatus>,
    pub barber_id: Option<&'a str>,
    pub limit: i64,
    pub offset: i64,
}

/// Insert a pending booking; `None` when the barber already holds an
/// overlapping pending or confirmed booking
///
/// The overlap check and insert run under a per-barber advisory lock.
pub async fn insert(
    pool: &PgPool,
    data: &NewBooking<'_>,
    now: i64,
) -> Result<Option<Booking>, BoxError> {
    let mut tx = pool.begin().await?;
    let ends_at = data.appointment_at + i64::from(data.duration_minutes) * 60_000;

    if let Some(barber_id) = data.barber_id {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(barber_id)
            .execute(&mut *tx)
            .await?;

        let (overlapping,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM bookings
             WHERE barber_id = $1
               AND status = ANY($4)
               AND appointment_at < $3
               AND appointment_at + duration_minutes::BIGINT * 60000 > $2",
        )
        .bind(barber_id)
        .bind(data.appointment_at)
        .bind(ends_at)
        .bind(BookingStatus::slot_holding())
        .fetch_one(&mut *tx)
        .await?;

        if overlapping > 0 {
            return Ok(None);
        }
    }

    let booking: Booking = sqlx::query_as(&format!(
        "INSERT INTO bookings (
            id, reference, shop_id, customer_id, barber_id, service_ids,
            appointment_at, duration_minutes, total_amount, status, customer_notes,
            created_at, updated_at
         )
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending', $10, $11, $11)
         RETURNING {BOOKING_COLUMNS}"
    ))
    .bind(shared::util::new_id())
    .bind(shared::models::generate_reference())
    .bind(data.shop_id)
    .bind(data.customer_id)
    .bind(data.barber_id)
    .bind(data.service_ids)
    .bind(data.appointment_at)
    .bind(data.duration_minutes)
    .bind(data.total_amount)
    .bind(data.customer_notes)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Some(booking))
}

pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Booking>, BoxError> {
    let row = sqlx::query_as(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// A customer's bookings, latest appointment first
pub async fn list_for_customer(
    pool: &PgPool,
    customer_id: &str,
    filter: &BookingFilter<'_>,
) -> Result<Vec<Booking>, BoxError> {
    let rows = sqlx::query_as(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE customer_id = $1 AND ($2::TEXT IS NULL OR status = $2)
         ORDER BY appointment_at DESC
         LIMIT $3 OFFSET $4"
    ))
    .bind(customer_id)
    .bind(filter.status.map(|s| s.as_db()))
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// A shop's bookings, soonest appointment first
pub async fn list_for_shop(
    pool: &PgPool,
    shop_id: &str,
    filter: &BookingFilter<'_>,
) -> Result<Vec<Booking>, BoxError> {
    let rows = sqlx::query_as(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE shop_id = $1
           AND ($2::TEXT IS NULL OR status = $2)
           AND ($3::TEXT IS NULL OR barber_id = $3)
         ORDER BY appointment_at ASC
         LIMIT $4 OFFSET $5"
    ))
    .bind(shop_id)
    .bind(filter.status.map(|s| s.as_db()))
    .bind(filter.barber_id)
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Move a booking from `from` to `to`; `None` if it is no longer in `from`
///
/// `reason` lands in `rejection_reason` or `cancellation_reason` depending on
/// the target status.
pub async fn transition(
    pool: &PgPool,
    id: &str,
    from: BookingStatus,
    to: BookingStatus,
    reason: Option<&str>,
    actor_id: &str,
    now: i64,
) -> Result<Option<Booking>, BoxError> {
    let row = sqlx::query_as(&format!(
        "UPDATE bookings SET
            status = $3,
            confirmed_at = CASE WHEN $3 = 'confirmed' THEN $6 ELSE confirmed_at END,
            completed_at = CASE WHEN $3 = 'completed' THEN $6 ELSE completed_at END,
            cancelled_at = CASE WHEN $3 = 'cancelled' THEN $6 ELSE cancelled_at END,
            rejection_reason = CASE WHEN $3 = 'rejected' THEN $4 ELSE rejection_reason END,
            cancellation_reason = CASE WHEN $3 = 'cancelled' THEN $4 ELSE cancellation_reason END,
            cancelled_by = CASE WHEN $3 = 'cancelled' THEN $5 ELSE cancelled_by END,
            updated_at = $6
         WHERE id = $1 AND status = $2
         RETURNING {BOOKING_COLUMNS}"
    ))
    .bind(id)
    .bind(from.as_db())
    .bind(to.as_db())
    .bind(reason)
    .bind(actor_id)
    .bind(now)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
