//! Shop rows

use shared::models::{Shop, ShopCreate, ShopUpdate, StaffRole};
use sqlx::PgPool;

use super::BoxError;

const SHOP_COLUMNS: &str = "id, owner_id, name, description, address, city, phone, email, \
     logo_url, cover_image_url, is_active, created_at, updated_at";

/// Create a shop and its owner staff row in one transaction
pub async fn create(
    pool: &PgPool,
    owner_id: &str,
    data: &ShopCreate,
    now: i64,
) -> Result<Shop, BoxError> {
    let mut tx = pool.begin().await?;

    let shop: Shop = sqlx::query_as(&format!(
        "INSERT INTO shops (
            id, owner_id, name, description, address, city, phone, email,
            logo_url, cover_image_url, is_active, created_at, updated_at
         )
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, TRUE, $11, $11)
         RETURNING {SHOP_COLUMNS}"
    ))
    .bind(shared::util::new_id())
    .bind(owner_id)
    .bind(data.name.trim())
    .bind(&data.description)
    .bind(&data.address)
    .bind(&data.city)
    .bind(&data.phone)
    .bind(&data.email)
    .bind(&data.logo_url)
    .bind(&data.cover_image_url)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO shop_staff (id, shop_id, user_id, role, is_active, created_at, updated_at)
         VALUES ($1, $2, $3, $4, TRUE, $5, $5)",
    )
    .bind(shared::util::new_id())
    .bind(&shop.id)
    .bind(owner_id)
    .bind(StaffRole::Owner.as_db())
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(shop)
}

pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Shop>, BoxError> {
    let row = sqlx::query_as(&format!("SELECT {SHOP_COLUMNS} FROM shops WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Active shops, optionally filtered by name or city
pub async fn search_active(
    pool: &PgPool,
    query: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Shop>, BoxError> {
    let pattern = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(|q| format!("%{}%", escape_like(q)));
    let rows = sqlx::query_as(&format!(
        "SELECT {SHOP_COLUMNS} FROM shops
         WHERE is_active = TRUE
           AND ($1::TEXT IS NULL OR name ILIKE $1 OR city ILIKE $1)
         ORDER BY name
         LIMIT $2 OFFSET $3"
    ))
    .bind(pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Shops where the user is active staff
pub async fn list_for_member(pool: &PgPool, user_id: &str) -> Result<Vec<Shop>, BoxError> {
    let rows = sqlx::query_as(
        "SELECT s.id, s.owner_id, s.name, s.description, s.address, s.city, s.phone,
                s.email, s.logo_url, s.cover_image_url, s.is_active, s.created_at, s.updated_at
         FROM shops s
         JOIN shop_staff st ON st.shop_id = s.id
         WHERE st.user_id = $1 AND st.is_active = TRUE
         ORDER BY s.name",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn update(
    pool: &PgPool,
    id: &str,
    data: &ShopUpdate,
    now: i64,
) -> Result<Option<Shop>, BoxError> {
    let row = sqlx::query_as(&format!(
        "UPDATE shops SET
            name = COALESCE($2, name),
            description = COALESCE($3, description),
            address = COALESCE($4, address),
            city = COALESCE($5, city),
            phone = COALESCE($6, phone),
            email = COALESCE($7, email),
            logo_url = COALESCE($8, logo_url),
            cover_image_url = COALESCE($9, cover_image_url),
            updated_at = $10
         WHERE id = $1
         RETURNING {SHOP_COLUMNS}"
    ))
    .bind(id)
    .bind(data.name.as_deref().map(str::trim))
    .bind(&data.description)
    .bind(&data.address)
    .bind(&data.city)
    .bind(&data.phone)
    .bind(&data.email)
    .bind(&data.logo_url)
    .bind(&data.cover_image_url)
    .bind(now)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn deactivate(pool: &PgPool, id: &str, now: i64) -> Result<bool, BoxError> {
    let result = sqlx::query(
        "UPDATE shops SET is_active = FALSE, updated_at = $2 WHERE id = $1 AND is_active = TRUE",
    )
    .bind(id)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Escape `%`, `_` and `\` for a LIKE pattern
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("Fade_Bar 100%"), "Fade\\_Bar 100\\%");
        assert_eq!(escape_like("plain"), "plain");
    }
}
