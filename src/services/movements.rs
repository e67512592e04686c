//! The movement store: an append-only log of stock movements.
//!
//! Rows are inserted by the ledger's units of work and never changed again;
//! everything else in this module is read-only history access.

use crate::db::DbPool;
use crate::entities::stock_movement::{self, Entity as StockMovement, MovementKind};
use crate::errors::ServiceError;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::instrument;

/// A movement about to be appended to the log.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub kind: MovementKind,
    pub product_id: i64,
    pub lot_id: Option<i64>,
    pub source_location_id: Option<i64>,
    pub dest_location_id: Option<i64>,
    pub quantity: i32,
    pub actor_id: Option<i64>,
    pub note: Option<String>,
}

impl NewMovement {
    /// Enforce the kind/location matrix and the positive-quantity rule.
    fn validate(&self) -> Result<(), ServiceError> {
        if self.quantity <= 0 {
            return Err(ServiceError::InvalidMovement(
                "quantity must be greater than zero".to_string(),
            ));
        }
        match self.kind {
            MovementKind::Entry => {
                if self.dest_location_id.is_none() || self.source_location_id.is_some() {
                    return Err(ServiceError::InvalidMovement(
                        "an entry carries a destination location only".to_string(),
                    ));
                }
            }
            MovementKind::Exit => {
                if self.source_location_id.is_none() || self.dest_location_id.is_some() {
                    return Err(ServiceError::InvalidMovement(
                        "an exit carries a source location only".to_string(),
                    ));
                }
            }
            MovementKind::Transfer => match (self.source_location_id, self.dest_location_id) {
                (Some(source), Some(dest)) if source != dest => {}
                (Some(_), Some(_)) => {
                    return Err(ServiceError::InvalidMovement(
                        "transfer source and destination must differ".to_string(),
                    ));
                }
                _ => {
                    return Err(ServiceError::InvalidMovement(
                        "a transfer carries both source and destination locations".to_string(),
                    ));
                }
            },
        }
        Ok(())
    }
}

/// Append a movement to the log on the given connection.
///
/// Callable inside a transaction so the write shares the unit of work with
/// the stock check and any lot adjustment. The timestamp is server-assigned.
pub async fn append<C: ConnectionTrait>(
    conn: &C,
    new: NewMovement,
) -> Result<stock_movement::Model, ServiceError> {
    new.validate()?;

    let row = stock_movement::ActiveModel {
        kind: Set(new.kind.as_str().to_string()),
        product_id: Set(new.product_id),
        lot_id: Set(new.lot_id),
        source_location_id: Set(new.source_location_id),
        dest_location_id: Set(new.dest_location_id),
        quantity: Set(new.quantity),
        actor_id: Set(new.actor_id),
        note: Set(new.note),
        ..Default::default()
    };

    row.insert(conn).await.map_err(ServiceError::db_error)
}

/// Read-only access to movement history.
#[derive(Clone)]
pub struct MovementService {
    db: Arc<DbPool>,
}

impl MovementService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, movement_id: i64) -> Result<stock_movement::Model, ServiceError> {
        StockMovement::find_by_id(movement_id)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("movement {}", movement_id)))
    }

    #[instrument(skip(self))]
    pub async fn list_by_product(
        &self,
        product_id: i64,
    ) -> Result<Vec<stock_movement::Model>, ServiceError> {
        StockMovement::find()
            .filter(stock_movement::Column::ProductId.eq(product_id))
            .order_by_desc(stock_movement::Column::CreatedAt)
            .order_by_desc(stock_movement::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn list_by_location(
        &self,
        location_id: i64,
    ) -> Result<Vec<stock_movement::Model>, ServiceError> {
        StockMovement::find()
            .filter(
                Condition::any()
                    .add(stock_movement::Column::SourceLocationId.eq(location_id))
                    .add(stock_movement::Column::DestLocationId.eq(location_id)),
            )
            .order_by_desc(stock_movement::Column::CreatedAt)
            .order_by_desc(stock_movement::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movement(kind: MovementKind, source: Option<i64>, dest: Option<i64>) -> NewMovement {
        NewMovement {
            kind,
            product_id: 1,
            lot_id: None,
            source_location_id: source,
            dest_location_id: dest,
            quantity: 5,
            actor_id: None,
            note: None,
        }
    }

    #[test]
    fn entry_requires_destination_only() {
        assert!(movement(MovementKind::Entry, None, Some(1)).validate().is_ok());
        assert!(movement(MovementKind::Entry, Some(1), Some(2)).validate().is_err());
        assert!(movement(MovementKind::Entry, None, None).validate().is_err());
    }

    #[test]
    fn exit_requires_source_only() {
        assert!(movement(MovementKind::Exit, Some(1), None).validate().is_ok());
        assert!(movement(MovementKind::Exit, None, Some(1)).validate().is_err());
    }

    #[test]
    fn transfer_requires_distinct_endpoints() {
        assert!(movement(MovementKind::Transfer, Some(1), Some(2)).validate().is_ok());
        assert!(movement(MovementKind::Transfer, Some(1), Some(1)).validate().is_err());
        assert!(movement(MovementKind::Transfer, Some(1), None).validate().is_err());
    }

    #[test]
    fn quantity_must_be_positive() {
        let mut m = movement(MovementKind::Entry, None, Some(1));
        m.quantity = 0;
        assert!(m.validate().is_err());
        m.quantity = -3;
        assert!(m.validate().is_err());
    }
}
