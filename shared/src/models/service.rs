//! Service catalog Model
//!
//! `CatalogService` rows are global templates; `ShopService` rows are what a
//! shop actually offers, with its own price and duration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Global service template
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct CatalogService {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub default_price: Decimal,
    pub default_duration_minutes: i32,
}

/// Service offered by a shop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ShopService {
    pub id: String,
    pub shop_id: String,
    /// Catalog template this offering was created from
    pub service_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub duration_minutes: i32,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create shop service payload
///
/// With `service_id` set, missing fields fall back to the catalog template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopServiceCreate {
    pub service_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub duration_minutes: Option<i32>,
}

/// Update shop service payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShopServiceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub duration_minutes: Option<i32>,
    pub is_active: Option<bool>,
}
