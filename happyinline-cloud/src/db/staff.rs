//! Shop staff rows (joined with the member's profile)

use shared::models::{ShopStaff, StaffRole, StaffUpdate};
use sqlx::{PgConnection, PgExecutor, PgPool};

use super::BoxError;

const STAFF_SELECT: &str = "SELECT st.id, st.shop_id, st.user_id, st.role, st.is_active, st.bio,
            p.full_name, p.email, p.avatar_url, st.created_at
     FROM shop_staff st
     JOIN profiles p ON p.id = st.user_id";

/// Result of a staff write limited by the plan's barber seats
#[derive(Debug)]
pub enum StaffWrite {
    Saved(ShopStaff),
    /// Nothing written: already active on add, no such row on update
    Unchanged,
    SeatLimitReached,
}

pub async fn find<'e>(
    executor: impl PgExecutor<'e>,
    shop_id: &str,
    user_id: &str,
) -> Result<Option<ShopStaff>, BoxError> {
    let row = sqlx::query_as(&format!(
        "{STAFF_SELECT} WHERE st.shop_id = $1 AND st.user_id = $2"
    ))
    .bind(shop_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await?;
    Ok(row)
}

/// Active staff first by rank, then by name
pub async fn list(
    pool: &PgPool,
    shop_id: &str,
    include_inactive: bool,
) -> Result<Vec<ShopStaff>, BoxError> {
    let rows = sqlx::query_as(&format!(
        "{STAFF_SELECT}
         WHERE st.shop_id = $1 AND ($2 OR st.is_active = TRUE)
         ORDER BY CASE st.role
                    WHEN 'owner' THEN 0 WHEN 'admin' THEN 1
                    WHEN 'manager' THEN 2 ELSE 3 END,
                  p.full_name NULLS LAST"
    ))
    .bind(shop_id)
    .bind(include_inactive)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Whether one more active barber fits under `limit`
pub fn seat_available(active_barbers: i64, limit: u32) -> bool {
    active_barbers < i64::from(limit)
}

/// With a limit: take the per-shop lock, then count active barbers
///
/// Must run inside the transaction that performs the write.
async fn claim_seat(
    conn: &mut PgConnection,
    shop_id: &str,
    seat_limit: Option<u32>,
) -> Result<bool, BoxError> {
    let Some(limit) = seat_limit else {
        return Ok(true);
    };
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(shop_id)
        .execute(&mut *conn)
        .await?;
    let (active,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM shop_staff
         WHERE shop_id = $1 AND is_active = TRUE AND role = 'barber'",
    )
    .bind(shop_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(seat_available(active, limit))
}

/// Insert a member, or re-activate a removed one
///
/// `seat_limit` is set when the write takes a barber seat; the count and the
/// insert then share one transaction.
pub async fn add(
    pool: &PgPool,
    shop_id: &str,
    user_id: &str,
    role: StaffRole,
    bio: Option<&str>,
    seat_limit: Option<u32>,
    now: i64,
) -> Result<StaffWrite, BoxError> {
    let mut tx = pool.begin().await?;
    if !claim_seat(&mut tx, shop_id, seat_limit).await? {
        return Ok(StaffWrite::SeatLimitReached);
    }

    let inserted: Option<(String,)> = sqlx::query_as(
        "INSERT INTO shop_staff (id, shop_id, user_id, role, is_active, bio, created_at, updated_at)
         VALUES ($1, $2, $3, $4, TRUE, $5, $6, $6)
         ON CONFLICT (shop_id, user_id) DO UPDATE SET
            role = EXCLUDED.role, is_active = TRUE, bio = EXCLUDED.bio,
            updated_at = EXCLUDED.updated_at
         WHERE shop_staff.is_active = FALSE
         RETURNING id",
    )
    .bind(shared::util::new_id())
    .bind(shop_id)
    .bind(user_id)
    .bind(role.as_db())
    .bind(bio)
    .bind(now)
    .fetch_optional(&mut *tx)
    .await?;

    if inserted.is_none() {
        return Ok(StaffWrite::Unchanged);
    }
    let staff = find(&mut *tx, shop_id, user_id).await?;
    tx.commit().await?;
    Ok(staff.map_or(StaffWrite::Unchanged, StaffWrite::Saved))
}

pub async fn update(
    pool: &PgPool,
    shop_id: &str,
    user_id: &str,
    data: &StaffUpdate,
    seat_limit: Option<u32>,
    now: i64,
) -> Result<StaffWrite, BoxError> {
    let mut tx = pool.begin().await?;
    if !claim_seat(&mut tx, shop_id, seat_limit).await? {
        return Ok(StaffWrite::SeatLimitReached);
    }

    let result = sqlx::query(
        "UPDATE shop_staff SET
            role = COALESCE($3, role),
            is_active = COALESCE($4, is_active),
            bio = COALESCE($5, bio),
            updated_at = $6
         WHERE shop_id = $1 AND user_id = $2",
    )
    .bind(shop_id)
    .bind(user_id)
    .bind(data.role.map(|r| r.as_db()))
    .bind(data.is_active)
    .bind(&data.bio)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(StaffWrite::Unchanged);
    }
    let staff = find(&mut *tx, shop_id, user_id).await?;
    tx.commit().await?;
    Ok(staff.map_or(StaffWrite::Unchanged, StaffWrite::Saved))
}

/// Soft delete
pub async fn deactivate(
    pool: &PgPool,
    shop_id: &str,
    user_id: &str,
    now: i64,
) -> Result<bool, BoxError> {
    let result = sqlx::query(
        "UPDATE shop_staff SET is_active = FALSE, updated_at = $3
         WHERE shop_id = $1 AND user_id = $2 AND is_active = TRUE",
    )
    .bind(shop_id)
    .bind(user_id)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_available_below_limit_only() {
        assert!(seat_available(0, 1));
        assert!(seat_available(1, 2));
        assert!(!seat_available(2, 2));
        assert!(!seat_available(3, 2));
    }
}
