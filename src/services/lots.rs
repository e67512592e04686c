//! The lot ledger: batch-level quantity, expiry and location tracking.
//!
//! The `*_in` functions are generic over the connection so the transaction
//! coordinator can fold lot side effects into the same unit of work as the
//! movement append. The `LotService` wrappers run them standalone.

use crate::db::DbPool;
use crate::entities::lot::{self, Entity as Lot};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::catalog;
use chrono::{Duration, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{error, info, instrument};
use validator::Validate;

/// Payload for creating a batch record.
#[derive(Debug, Clone, Validate)]
pub struct NewLot {
    pub product_id: i64,
    #[validate(length(min = 1, max = 50))]
    pub lot_number: String,
    pub quantity: i32,
    pub expiry_date: Option<NaiveDate>,
    pub manufacture_date: Option<NaiveDate>,
    pub location_id: Option<i64>,
}

pub async fn get_in<C: ConnectionTrait>(conn: &C, lot_id: i64) -> Result<lot::Model, ServiceError> {
    Lot::find_by_id(lot_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("lot {}", lot_id)))
}

/// Create a lot on the given connection.
pub async fn create_lot_in<C: ConnectionTrait>(
    conn: &C,
    new: NewLot,
) -> Result<lot::Model, ServiceError> {
    new.validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
    if new.quantity < 0 {
        return Err(ServiceError::ValidationError(
            "lot quantity must not be negative".to_string(),
        ));
    }
    if let (Some(manufacture_date), Some(expiry_date)) = (new.manufacture_date, new.expiry_date) {
        if manufacture_date > expiry_date {
            return Err(ServiceError::InvalidDates {
                manufacture_date,
                expiry_date,
            });
        }
    }

    catalog::find_product(conn, new.product_id).await?;

    let existing = Lot::find()
        .filter(lot::Column::ProductId.eq(new.product_id))
        .filter(lot::Column::LotNumber.eq(new.lot_number.as_str()))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?;
    if existing.is_some() {
        return Err(ServiceError::DuplicateLot {
            product_id: new.product_id,
            lot_number: new.lot_number,
        });
    }

    let now = Utc::now();
    let row = lot::ActiveModel {
        product_id: Set(new.product_id),
        lot_number: Set(new.lot_number),
        quantity: Set(new.quantity),
        expiry_date: Set(new.expiry_date),
        manufacture_date: Set(new.manufacture_date),
        location_id: Set(new.location_id),
        entry_date: Set(now.date_naive()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    row.insert(conn).await.map_err(ServiceError::db_error)
}

/// Apply a signed quantity delta, refusing to go below zero.
pub async fn adjust_quantity_in<C: ConnectionTrait>(
    conn: &C,
    lot_id: i64,
    delta: i32,
) -> Result<lot::Model, ServiceError> {
    let current = Lot::find_by_id(lot_id)
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("lot {}", lot_id)))?;

    let new_quantity = current.quantity + delta;
    if new_quantity < 0 {
        return Err(ServiceError::NegativeLotQuantity {
            lot_id,
            current: current.quantity,
            delta,
        });
    }

    let mut active: lot::ActiveModel = current.into();
    active.quantity = Set(new_quantity);
    active.updated_at = Set(Utc::now());
    active.update(conn).await.map_err(ServiceError::db_error)
}

/// Overwrite the lot's location. The batch moves wholesale.
pub async fn relocate_in<C: ConnectionTrait>(
    conn: &C,
    lot_id: i64,
    new_location_id: i64,
) -> Result<lot::Model, ServiceError> {
    let current = get_in(conn, lot_id).await?;

    let mut active: lot::ActiveModel = current.into();
    active.location_id = Set(Some(new_location_id));
    active.updated_at = Set(Utc::now());
    active.update(conn).await.map_err(ServiceError::db_error)
}

/// Lots whose expiry falls inside [today, today + window], with stock on hand.
/// Lots already past their expiry are excluded; those belong to
/// `find_expired_in`.
pub async fn find_near_expiry_in<C: ConnectionTrait>(
    conn: &C,
    window_days: i64,
) -> Result<Vec<lot::Model>, ServiceError> {
    let today = Utc::now().date_naive();
    let horizon = today + Duration::days(window_days);

    Lot::find()
        .filter(lot::Column::ExpiryDate.is_not_null())
        .filter(lot::Column::ExpiryDate.gte(today))
        .filter(lot::Column::ExpiryDate.lte(horizon))
        .filter(lot::Column::Quantity.gt(0))
        .order_by_asc(lot::Column::ExpiryDate)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)
}

/// Lots past their expiry date that still hold stock.
pub async fn find_expired_in<C: ConnectionTrait>(
    conn: &C,
) -> Result<Vec<lot::Model>, ServiceError> {
    let today = Utc::now().date_naive();

    Lot::find()
        .filter(lot::Column::ExpiryDate.is_not_null())
        .filter(lot::Column::ExpiryDate.lt(today))
        .filter(lot::Column::Quantity.gt(0))
        .order_by_asc(lot::Column::ExpiryDate)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)
}

#[derive(Clone)]
pub struct LotService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl LotService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn create_lot(&self, new: NewLot) -> Result<lot::Model, ServiceError> {
        let created = self
            .db
            .transaction::<_, lot::Model, ServiceError>(move |txn| {
                Box::pin(async move { create_lot_in(txn, new).await })
            })
            .await
            .map_err(ServiceError::from)?;

        info!(
            lot_id = created.id,
            product_id = created.product_id,
            lot_number = %created.lot_number,
            "lot created"
        );
        self.publish(Event::LotCreated {
            lot_id: created.id,
            product_id: created.product_id,
            lot_number: created.lot_number.clone(),
        })
        .await;

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn adjust_quantity(
        &self,
        lot_id: i64,
        delta: i32,
    ) -> Result<lot::Model, ServiceError> {
        let updated = self
            .db
            .transaction::<_, lot::Model, ServiceError>(move |txn| {
                Box::pin(async move { adjust_quantity_in(txn, lot_id, delta).await })
            })
            .await
            .map_err(ServiceError::from)?;

        self.publish(Event::LotAdjusted {
            lot_id: updated.id,
            delta,
            new_quantity: updated.quantity,
        })
        .await;

        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn relocate(
        &self,
        lot_id: i64,
        new_location_id: i64,
    ) -> Result<lot::Model, ServiceError> {
        let updated = self
            .db
            .transaction::<_, lot::Model, ServiceError>(move |txn| {
                Box::pin(async move { relocate_in(txn, lot_id, new_location_id).await })
            })
            .await
            .map_err(ServiceError::from)?;

        self.publish(Event::LotRelocated {
            lot_id: updated.id,
            location_id: new_location_id,
        })
        .await;

        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, lot_id: i64) -> Result<lot::Model, ServiceError> {
        get_in(self.db.as_ref(), lot_id).await
    }

    #[instrument(skip(self))]
    pub async fn list_by_product(&self, product_id: i64) -> Result<Vec<lot::Model>, ServiceError> {
        Lot::find()
            .filter(lot::Column::ProductId.eq(product_id))
            .order_by_desc(lot::Column::EntryDate)
            .order_by_desc(lot::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn list_by_product_location(
        &self,
        product_id: i64,
        location_id: i64,
    ) -> Result<Vec<lot::Model>, ServiceError> {
        Lot::find()
            .filter(lot::Column::ProductId.eq(product_id))
            .filter(lot::Column::LocationId.eq(location_id))
            .order_by_desc(lot::Column::EntryDate)
            .order_by_desc(lot::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Administrative removal. Lots are never deleted implicitly.
    #[instrument(skip(self))]
    pub async fn remove(&self, lot_id: i64) -> Result<(), ServiceError> {
        let lot = self.get(lot_id).await?;
        lot.delete(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        info!(lot_id, "lot removed");
        self.publish(Event::LotRemoved { lot_id }).await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn find_near_expiry(
        &self,
        window_days: i64,
    ) -> Result<Vec<lot::Model>, ServiceError> {
        find_near_expiry_in(self.db.as_ref(), window_days).await
    }

    #[instrument(skip(self))]
    pub async fn find_expired(&self) -> Result<Vec<lot::Model>, ServiceError> {
        find_expired_in(self.db.as_ref()).await
    }

    async fn publish(&self, event: Event) {
        if let Err(err) = self.event_sender.send(event).await {
            error!(error = %err, "failed to publish lot event");
        }
    }
}
