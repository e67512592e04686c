//! Lookups against the product and location reference tables.
//!
//! The ledger consumes these entities by identity and status only; creating
//! and editing them belongs to the surrounding CRUD layer.

use crate::entities::{
    location::{self, Entity as Location, LocationStatus},
    product::{self, Entity as Product, ProductStatus},
};
use crate::errors::ServiceError;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};

/// Fetch a product regardless of status, failing when it does not exist.
pub async fn find_product<C: ConnectionTrait>(
    conn: &C,
    product_id: i64,
) -> Result<product::Model, ServiceError> {
    Product::find_by_id(product_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or(ServiceError::InvalidProduct(product_id))
}

/// Fetch an active product, taking its row lock.
///
/// The lock doubles as the per-product serialization point for every unit of
/// work that checks and then changes stock.
pub async fn lock_active_product<C: ConnectionTrait>(
    conn: &C,
    product_id: i64,
) -> Result<product::Model, ServiceError> {
    let found = Product::find_by_id(product_id)
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?;

    match found {
        Some(product) if product.is_active() => Ok(product),
        _ => Err(ServiceError::InvalidProduct(product_id)),
    }
}

pub async fn find_active_location<C: ConnectionTrait>(
    conn: &C,
    location_id: i64,
) -> Result<location::Model, ServiceError> {
    let found = Location::find_by_id(location_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?;

    match found {
        Some(location) if location.is_active() => Ok(location),
        _ => Err(ServiceError::InvalidLocation(location_id)),
    }
}

pub async fn list_active_products<C: ConnectionTrait>(
    conn: &C,
) -> Result<Vec<product::Model>, ServiceError> {
    Product::find()
        .filter(product::Column::Status.eq(ProductStatus::Active.as_str()))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)
}

pub async fn list_active_locations<C: ConnectionTrait>(
    conn: &C,
) -> Result<Vec<location::Model>, ServiceError> {
    Location::find()
        .filter(location::Column::Status.eq(LocationStatus::Active.as_str()))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)
}
