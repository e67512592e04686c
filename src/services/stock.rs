//! The stock projection: current on-hand quantity derived from the movement
//! log.
//!
//! `current_quantity` is the signed fold over movements — entries add at the
//! destination, exits subtract at the source, transfers do both. It is generic
//! over the connection so the coordinator can evaluate it inside the same
//! transaction that appends the movement.

use crate::db::DbPool;
use crate::entities::stock_movement::{self, Entity as StockMovement, MovementKind};
use crate::errors::ServiceError;
use crate::services::catalog;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

/// Current on-hand quantity for a product at a location.
pub async fn current_quantity<C: ConnectionTrait>(
    conn: &C,
    product_id: i64,
    location_id: i64,
) -> Result<i64, ServiceError> {
    let received = sum_quantity(
        conn,
        product_id,
        stock_movement::Column::DestLocationId,
        location_id,
        &[MovementKind::Entry, MovementKind::Transfer],
    )
    .await?;
    let issued = sum_quantity(
        conn,
        product_id,
        stock_movement::Column::SourceLocationId,
        location_id,
        &[MovementKind::Exit, MovementKind::Transfer],
    )
    .await?;

    Ok(received - issued)
}

async fn sum_quantity<C: ConnectionTrait>(
    conn: &C,
    product_id: i64,
    location_column: stock_movement::Column,
    location_id: i64,
    kinds: &[MovementKind],
) -> Result<i64, ServiceError> {
    let kind_names: Vec<&str> = kinds.iter().map(MovementKind::as_str).collect();

    let total: Option<Option<i64>> = StockMovement::find()
        .select_only()
        .column_as(stock_movement::Column::Quantity.sum(), "total")
        .filter(stock_movement::Column::ProductId.eq(product_id))
        .filter(location_column.eq(location_id))
        .filter(stock_movement::Column::Kind.is_in(kind_names))
        .into_tuple()
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?;

    Ok(total.flatten().unwrap_or(0))
}

/// Optional narrowing of the `all_stock` grid.
#[derive(Debug, Clone, Default)]
pub struct StockFilters {
    pub product_id: Option<i64>,
    pub location_id: Option<i64>,
}

/// One cell of the stock grid, with display names resolved.
#[derive(Debug, Clone, Serialize)]
pub struct StockLevel {
    pub product_id: i64,
    pub product_name: String,
    pub location_id: i64,
    pub location_name: String,
    pub quantity: i64,
}

/// Plain read access to the projection.
#[derive(Clone)]
pub struct StockService {
    db: Arc<DbPool>,
}

impl StockService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn current_quantity(
        &self,
        product_id: i64,
        location_id: i64,
    ) -> Result<i64, ServiceError> {
        current_quantity(self.db.as_ref(), product_id, location_id).await
    }

    /// The (product, location) → quantity grid for active reference data,
    /// restricted to cells with stock on hand.
    #[instrument(skip(self))]
    pub async fn all_stock(&self, filters: StockFilters) -> Result<Vec<StockLevel>, ServiceError> {
        let db = self.db.as_ref();

        let mut products = catalog::list_active_products(db).await?;
        if let Some(product_id) = filters.product_id {
            products.retain(|p| p.id == product_id);
        }
        let mut locations = catalog::list_active_locations(db).await?;
        if let Some(location_id) = filters.location_id {
            locations.retain(|l| l.id == location_id);
        }

        let mut query = StockMovement::find();
        if let Some(product_id) = filters.product_id {
            query = query.filter(stock_movement::Column::ProductId.eq(product_id));
        }
        let movements = query.all(db).await.map_err(ServiceError::db_error)?;

        let mut grid: HashMap<(i64, i64), i64> = HashMap::new();
        for movement in &movements {
            let Some(kind) = movement.kind() else {
                continue;
            };
            let quantity = i64::from(movement.quantity);
            match kind {
                MovementKind::Entry => {
                    if let Some(dest) = movement.dest_location_id {
                        *grid.entry((movement.product_id, dest)).or_default() += quantity;
                    }
                }
                MovementKind::Exit => {
                    if let Some(source) = movement.source_location_id {
                        *grid.entry((movement.product_id, source)).or_default() -= quantity;
                    }
                }
                MovementKind::Transfer => {
                    if let Some(source) = movement.source_location_id {
                        *grid.entry((movement.product_id, source)).or_default() -= quantity;
                    }
                    if let Some(dest) = movement.dest_location_id {
                        *grid.entry((movement.product_id, dest)).or_default() += quantity;
                    }
                }
            }
        }

        let mut levels = Vec::new();
        for product in &products {
            for location in &locations {
                let quantity = grid.get(&(product.id, location.id)).copied().unwrap_or(0);
                if quantity > 0 {
                    levels.push(StockLevel {
                        product_id: product.id,
                        product_name: product.name.clone(),
                        location_id: location.id,
                        location_name: location.name.clone(),
                        quantity,
                    });
                }
            }
        }
        levels.sort_by(|a, b| {
            (a.product_id, a.location_id).cmp(&(b.product_id, b.location_id))
        });

        Ok(levels)
    }
}
