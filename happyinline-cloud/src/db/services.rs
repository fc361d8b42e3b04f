//! Service catalog and shop service rows

use rust_decimal::Decimal;
use shared::models::{CatalogService, ShopService, ShopServiceUpdate};
use sqlx::PgPool;

use super::BoxError;

const SHOP_SERVICE_COLUMNS: &str = "id, shop_id, service_id, name, description, price, \
     duration_minutes, is_active, created_at, updated_at";

/// Values of a new shop service after template defaults are applied
pub struct NewShopService<'a> {
    pub shop_id: &'a str,
    pub service_id: Option<&'a str>,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub price: Decimal,
    pub duration_minutes: i32,
}

pub async fn list_catalog(pool: &PgPool) -> Result<Vec<CatalogService>, BoxError> {
    let rows = sqlx::query_as(
        "SELECT id, name, description, category, default_price, default_duration_minutes
         FROM services ORDER BY category NULLS LAST, name",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_catalog(pool: &PgPool, id: &str) -> Result<Option<CatalogService>, BoxError> {
    let row = sqlx::query_as(
        "SELECT id, name, description, category, default_price, default_duration_minutes
         FROM services WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn list_for_shop(
    pool: &PgPool,
    shop_id: &str,
    include_inactive: bool,
) -> Result<Vec<ShopService>, BoxError> {
    let rows = sqlx::query_as(&format!(
        "SELECT {SHOP_SERVICE_COLUMNS} FROM shop_services
         WHERE shop_id = $1 AND ($2 OR is_active = TRUE)
         ORDER BY name"
    ))
    .bind(shop_id)
    .bind(include_inactive)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Active services of a shop among `ids`
pub async fn find_active_by_ids(
    pool: &PgPool,
    shop_id: &str,
    ids: &[String],
) -> Result<Vec<ShopService>, BoxError> {
    let rows = sqlx::query_as(&format!(
        "SELECT {SHOP_SERVICE_COLUMNS} FROM shop_services
         WHERE shop_id = $1 AND id = ANY($2) AND is_active = TRUE"
    ))
    .bind(shop_id)
    .bind(ids)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn create(
    pool: &PgPool,
    data: &NewShopService<'_>,
    now: i64,
) -> Result<ShopService, BoxError> {
    let row = sqlx::query_as(&format!(
        "INSERT INTO shop_services (
            id, shop_id, service_id, name, description, price,
            duration_minutes, is_active, created_at, updated_at
         )
         VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, $8, $8)
         RETURNING {SHOP_SERVICE_COLUMNS}"
    ))
    .bind(shared::util::new_id())
    .bind(data.shop_id)
    .bind(data.service_id)
    .bind(data.name)
    .bind(data.description)
    .bind(data.price)
    .bind(data.duration_minutes)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn update(
    pool: &PgPool,
    shop_id: &str,
    id: &str,
    data: &ShopServiceUpdate,
    now: i64,
) -> Result<Option<ShopService>, BoxError> {
    let row = sqlx::query_as(&format!(
        "UPDATE shop_services SET
            name = COALESCE($3, name),
            description = COALESCE($4, description),
            price = COALESCE($5, price),
            duration_minutes = COALESCE($6, duration_minutes),
            is_active = COALESCE($7, is_active),
            updated_at = $8
         WHERE shop_id = $1 AND id = $2
         RETURNING {SHOP_SERVICE_COLUMNS}"
    ))
    .bind(shop_id)
    .bind(id)
    .bind(data.name.as_deref().map(str::trim))
    .bind(&data.description)
    .bind(data.price)
    .bind(data.duration_minutes)
    .bind(data.is_active)
    .bind(now)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Soft delete; past bookings keep referencing the row
pub async fn deactivate(
    pool: &PgPool,
    shop_id: &str,
    id: &str,
    now: i64,
) -> Result<bool, BoxError> {
    let result = sqlx::query(
        "UPDATE shop_services SET is_active = FALSE, updated_at = $3
         WHERE shop_id = $1 AND id = $2 AND is_active = TRUE",
    )
    .bind(shop_id)
    .bind(id)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
