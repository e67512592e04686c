//! The threshold scanner: low-stock, near-expiry and expired alerts.
//!
//! The scanner reads the projection and the lot ledger and conditionally
//! inserts alert rows. It never mutates movements or lots. An alert is only
//! raised while no unacknowledged alert with the same (product, kind[, lot])
//! exists.

use crate::db::DbPool;
use crate::entities::alert::{self, AlertKind, Entity as Alert};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::{catalog, lots, stock};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use tracing::{error, info, instrument};

pub const DEFAULT_NEAR_EXPIRY_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Default)]
pub struct AlertFilters {
    pub kind: Option<AlertKind>,
    pub product_id: Option<i64>,
    pub lot_id: Option<i64>,
}

/// Alerts created by one full scan, per category.
#[derive(Debug, Default)]
pub struct ScanSummary {
    pub low_stock: Vec<alert::Model>,
    pub near_expiry: Vec<alert::Model>,
    pub expired: Vec<alert::Model>,
}

impl ScanSummary {
    pub fn total(&self) -> usize {
        self.low_stock.len() + self.near_expiry.len() + self.expired.len()
    }
}

#[derive(Clone)]
pub struct AlertService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl AlertService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Sweep every active product × active location pair and raise a
    /// low-stock alert where on-hand is at or below the product's minimum.
    #[instrument(skip(self))]
    pub async fn scan_low_stock(&self) -> Result<Vec<alert::Model>, ServiceError> {
        let db = self.db.as_ref();
        let products = catalog::list_active_products(db).await?;
        let locations = catalog::list_active_locations(db).await?;

        let mut created = Vec::new();
        for product in &products {
            if product.minimum_stock <= 0 {
                continue;
            }
            for location in &locations {
                let quantity = stock::current_quantity(db, product.id, location.id).await?;
                if quantity > i64::from(product.minimum_stock) {
                    continue;
                }
                if self
                    .open_alert(product.id, AlertKind::LowStock, None)
                    .await?
                    .is_some()
                {
                    continue;
                }
                let message = format!(
                    "product {:?} at location {:?} is low on stock ({} on hand, minimum {})",
                    product.name, location.name, quantity, product.minimum_stock
                );
                created.push(
                    self.raise(AlertKind::LowStock, product.id, None, message)
                        .await?,
                );
            }
        }
        Ok(created)
    }

    /// Raise near-expiry alerts for lots running out of shelf life within the
    /// window. Already-expired lots are left to `scan_expired`.
    #[instrument(skip(self))]
    pub async fn scan_near_expiry(
        &self,
        window_days: i64,
    ) -> Result<Vec<alert::Model>, ServiceError> {
        let db = self.db.as_ref();
        let today = Utc::now().date_naive();

        let mut created = Vec::new();
        for lot in lots::find_near_expiry_in(db, window_days).await? {
            let product = catalog::find_product(db, lot.product_id).await?;
            if !product.is_active() {
                continue;
            }
            if self
                .open_alert(lot.product_id, AlertKind::NearExpiry, Some(lot.id))
                .await?
                .is_some()
            {
                continue;
            }
            let expiry = match lot.expiry_date {
                Some(date) => date,
                None => continue,
            };
            let days_left = (expiry - today).num_days();
            let message = format!(
                "lot {:?} of product {:?} expires in {} day(s) ({})",
                lot.lot_number, product.name, days_left, expiry
            );
            created.push(
                self.raise(AlertKind::NearExpiry, lot.product_id, Some(lot.id), message)
                    .await?,
            );
        }
        Ok(created)
    }

    /// Raise expired alerts for lots past their expiry date with stock left.
    #[instrument(skip(self))]
    pub async fn scan_expired(&self) -> Result<Vec<alert::Model>, ServiceError> {
        let db = self.db.as_ref();

        let mut created = Vec::new();
        for lot in lots::find_expired_in(db).await? {
            let product = catalog::find_product(db, lot.product_id).await?;
            if !product.is_active() {
                continue;
            }
            if self
                .open_alert(lot.product_id, AlertKind::Expired, Some(lot.id))
                .await?
                .is_some()
            {
                continue;
            }
            let expiry = match lot.expiry_date {
                Some(date) => date,
                None => continue,
            };
            let message = format!(
                "lot {:?} of product {:?} expired on {} with {} unit(s) on hand",
                lot.lot_number, product.name, expiry, lot.quantity
            );
            created.push(
                self.raise(AlertKind::Expired, lot.product_id, Some(lot.id), message)
                    .await?,
            );
        }
        Ok(created)
    }

    /// Run all three scans.
    #[instrument(skip(self))]
    pub async fn run_scan(&self, window_days: i64) -> Result<ScanSummary, ServiceError> {
        let summary = ScanSummary {
            low_stock: self.scan_low_stock().await?,
            near_expiry: self.scan_near_expiry(window_days).await?,
            expired: self.scan_expired().await?,
        };
        info!(total = summary.total(), "alert scan finished");
        Ok(summary)
    }

    /// Mark an alert as acknowledged. Acknowledging twice is a no-op.
    #[instrument(skip(self))]
    pub async fn acknowledge(&self, alert_id: i64) -> Result<alert::Model, ServiceError> {
        let found = Alert::find_by_id(alert_id)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("alert {}", alert_id)))?;

        if found.acknowledged {
            return Ok(found);
        }

        let mut active: alert::ActiveModel = found.into();
        active.acknowledged = Set(true);
        let updated = active
            .update(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        info!(alert_id, "alert acknowledged");
        if let Err(err) = self
            .event_sender
            .send(Event::AlertAcknowledged { alert_id })
            .await
        {
            error!(error = %err, "failed to publish alert event");
        }

        Ok(updated)
    }

    /// Unacknowledged alerts, newest first.
    #[instrument(skip(self))]
    pub async fn list_active(
        &self,
        filters: AlertFilters,
    ) -> Result<Vec<alert::Model>, ServiceError> {
        let mut query = Alert::find().filter(alert::Column::Acknowledged.eq(false));
        if let Some(kind) = filters.kind {
            query = query.filter(alert::Column::Kind.eq(kind.as_str()));
        }
        if let Some(product_id) = filters.product_id {
            query = query.filter(alert::Column::ProductId.eq(product_id));
        }
        if let Some(lot_id) = filters.lot_id {
            query = query.filter(alert::Column::LotId.eq(lot_id));
        }
        query
            .order_by_desc(alert::Column::CreatedAt)
            .order_by_desc(alert::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// The most recent unacknowledged alerts, for display surfaces.
    #[instrument(skip(self))]
    pub async fn recent(&self, limit: u64) -> Result<Vec<alert::Model>, ServiceError> {
        Alert::find()
            .filter(alert::Column::Acknowledged.eq(false))
            .order_by_desc(alert::Column::CreatedAt)
            .order_by_desc(alert::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    async fn open_alert(
        &self,
        product_id: i64,
        kind: AlertKind,
        lot_id: Option<i64>,
    ) -> Result<Option<alert::Model>, ServiceError> {
        let mut query = Alert::find()
            .filter(alert::Column::ProductId.eq(product_id))
            .filter(alert::Column::Kind.eq(kind.as_str()))
            .filter(alert::Column::Acknowledged.eq(false));
        if let Some(lot_id) = lot_id {
            query = query.filter(alert::Column::LotId.eq(lot_id));
        }
        query
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    async fn raise(
        &self,
        kind: AlertKind,
        product_id: i64,
        lot_id: Option<i64>,
        message: String,
    ) -> Result<alert::Model, ServiceError> {
        let row = alert::ActiveModel {
            kind: Set(kind.as_str().to_string()),
            product_id: Set(product_id),
            lot_id: Set(lot_id),
            message: Set(message),
            acknowledged: Set(false),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        let created = row
            .insert(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        info!(
            alert_id = created.id,
            kind = kind.as_str(),
            product_id,
            "alert raised"
        );
        if let Err(err) = self
            .event_sender
            .send(Event::AlertRaised {
                alert_id: created.id,
                kind: kind.as_str().to_string(),
                product_id,
            })
            .await
        {
            error!(error = %err, "failed to publish alert event");
        }

        Ok(created)
    }
}
