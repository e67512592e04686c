//! The transaction coordinator: entry, exit and transfer units of work.
//!
//! Each operation runs Validating → Checking → Committing inside one database
//! transaction. The product row lock taken during validation serializes
//! concurrent units of work on the same product, so the stock-sufficiency
//! check and the ledger writes cannot interleave with another writer. A
//! failure anywhere rolls the whole unit back; no partial movement/lot state
//! is ever observable.

use crate::db::DbPool;
use crate::entities::stock_movement::{self, MovementKind};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::lots::{self, NewLot};
use crate::services::movements::{self, NewMovement};
use crate::services::{catalog, stock};
use chrono::NaiveDate;
use lazy_static::lazy_static;
use prometheus::{IntCounterVec, Opts};
use sea_orm::TransactionTrait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use validator::Validate;

lazy_static! {
    static ref MOVEMENTS_RECORDED: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "stock_movements_recorded_total",
            "Stock movements committed to the ledger"
        ),
        &["kind"]
    )
    .expect("metric can be created");
    static ref MOVEMENT_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "stock_movement_failures_total",
            "Stock movement units of work rejected or aborted"
        ),
        &["kind", "error"]
    )
    .expect("metric can be created");
}

/// How an entry relates to the lot ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LotSpec {
    /// Top up an existing batch.
    Existing { lot_id: i64 },
    /// First receipt of a new batch; the lot is created at the entry's
    /// destination with the entry quantity.
    New {
        lot_number: String,
        expiry_date: Option<NaiveDate>,
        manufacture_date: Option<NaiveDate>,
    },
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EntryRequest {
    pub product_id: i64,
    pub location_id: i64,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub actor_id: Option<i64>,
    pub lot: Option<LotSpec>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ExitRequest {
    pub product_id: i64,
    pub location_id: i64,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub actor_id: Option<i64>,
    pub lot_id: Option<i64>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TransferRequest {
    pub product_id: i64,
    pub source_location_id: i64,
    pub dest_location_id: i64,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub actor_id: Option<i64>,
    pub lot_id: Option<i64>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

/// The committed movement plus derived state for caller display.
///
/// `previous_quantity`/`new_quantity` describe the checked location: the
/// destination for entries, the source for exits and transfers.
#[derive(Debug, Clone, Serialize)]
pub struct MovementOutcome {
    pub movement: stock_movement::Model,
    pub previous_quantity: i64,
    pub new_quantity: i64,
    pub lot_id: Option<i64>,
}

#[derive(Clone)]
pub struct StockLedgerService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl StockLedgerService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn register_entry(
        &self,
        request: EntryRequest,
    ) -> Result<MovementOutcome, ServiceError> {
        let outcome = match request
            .validate()
            .map_err(|e| ServiceError::InvalidMovement(e.to_string()))
        {
            Ok(()) => {
                let req = request;
                self.db
                    .transaction::<_, MovementOutcome, ServiceError>(move |txn| {
                        Box::pin(async move {
                            catalog::lock_active_product(txn, req.product_id).await?;
                            catalog::find_active_location(txn, req.location_id).await?;

                            let previous =
                                stock::current_quantity(txn, req.product_id, req.location_id)
                                    .await?;

                            let lot_id = match req.lot {
                                Some(LotSpec::Existing { lot_id }) => {
                                    let lot = lots::get_in(txn, lot_id).await?;
                                    if lot.product_id != req.product_id {
                                        return Err(ServiceError::InvalidMovement(format!(
                                            "lot {} does not belong to product {}",
                                            lot_id, req.product_id
                                        )));
                                    }
                                    lots::adjust_quantity_in(txn, lot_id, req.quantity).await?;
                                    Some(lot_id)
                                }
                                Some(LotSpec::New {
                                    lot_number,
                                    expiry_date,
                                    manufacture_date,
                                }) => {
                                    let lot = lots::create_lot_in(
                                        txn,
                                        NewLot {
                                            product_id: req.product_id,
                                            lot_number,
                                            quantity: req.quantity,
                                            expiry_date,
                                            manufacture_date,
                                            location_id: Some(req.location_id),
                                        },
                                    )
                                    .await?;
                                    Some(lot.id)
                                }
                                None => None,
                            };

                            let movement = movements::append(
                                txn,
                                NewMovement {
                                    kind: MovementKind::Entry,
                                    product_id: req.product_id,
                                    lot_id,
                                    source_location_id: None,
                                    dest_location_id: Some(req.location_id),
                                    quantity: req.quantity,
                                    actor_id: req.actor_id,
                                    note: req.note,
                                },
                            )
                            .await?;

                            Ok(MovementOutcome {
                                previous_quantity: previous,
                                new_quantity: previous + i64::from(movement.quantity),
                                lot_id,
                                movement,
                            })
                        })
                    })
                    .await
                    .map_err(ServiceError::from)
            }
            Err(err) => Err(err),
        };

        self.finish(MovementKind::Entry, outcome, |o| Event::StockEntryRecorded {
            movement_id: o.movement.id,
            product_id: o.movement.product_id,
            location_id: o.movement.dest_location_id.unwrap_or_default(),
            quantity: o.movement.quantity,
            lot_id: o.lot_id,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn register_exit(
        &self,
        request: ExitRequest,
    ) -> Result<MovementOutcome, ServiceError> {
        let outcome = match request
            .validate()
            .map_err(|e| ServiceError::InvalidMovement(e.to_string()))
        {
            Ok(()) => {
                let req = request;
                self.db
                    .transaction::<_, MovementOutcome, ServiceError>(move |txn| {
                        Box::pin(async move {
                            catalog::lock_active_product(txn, req.product_id).await?;
                            catalog::find_active_location(txn, req.location_id).await?;

                            let previous =
                                stock::current_quantity(txn, req.product_id, req.location_id)
                                    .await?;
                            let requested = i64::from(req.quantity);
                            if previous < requested {
                                return Err(ServiceError::InsufficientStock {
                                    product_id: req.product_id,
                                    location_id: req.location_id,
                                    available: previous,
                                    requested,
                                });
                            }

                            if let Some(lot_id) = req.lot_id {
                                let lot = lots::get_in(txn, lot_id).await?;
                                if lot.product_id != req.product_id {
                                    return Err(ServiceError::InvalidMovement(format!(
                                        "lot {} does not belong to product {}",
                                        lot_id, req.product_id
                                    )));
                                }
                                lots::adjust_quantity_in(txn, lot_id, -req.quantity).await?;
                            }

                            let movement = movements::append(
                                txn,
                                NewMovement {
                                    kind: MovementKind::Exit,
                                    product_id: req.product_id,
                                    lot_id: req.lot_id,
                                    source_location_id: Some(req.location_id),
                                    dest_location_id: None,
                                    quantity: req.quantity,
                                    actor_id: req.actor_id,
                                    note: req.note,
                                },
                            )
                            .await?;

                            Ok(MovementOutcome {
                                previous_quantity: previous,
                                new_quantity: previous - requested,
                                lot_id: req.lot_id,
                                movement,
                            })
                        })
                    })
                    .await
                    .map_err(ServiceError::from)
            }
            Err(err) => Err(err),
        };

        self.finish(MovementKind::Exit, outcome, |o| Event::StockExitRecorded {
            movement_id: o.movement.id,
            product_id: o.movement.product_id,
            location_id: o.movement.source_location_id.unwrap_or_default(),
            quantity: o.movement.quantity,
            lot_id: o.lot_id,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn transfer(
        &self,
        request: TransferRequest,
    ) -> Result<MovementOutcome, ServiceError> {
        let validated = request
            .validate()
            .map_err(|e| ServiceError::InvalidMovement(e.to_string()))
            .and_then(|()| {
                if request.source_location_id == request.dest_location_id {
                    Err(ServiceError::InvalidMovement(
                        "transfer source and destination must differ".to_string(),
                    ))
                } else {
                    Ok(())
                }
            });

        let outcome = match validated {
            Ok(()) => {
                let req = request;
                self.db
                    .transaction::<_, MovementOutcome, ServiceError>(move |txn| {
                        Box::pin(async move {
                            catalog::lock_active_product(txn, req.product_id).await?;
                            catalog::find_active_location(txn, req.source_location_id).await?;
                            catalog::find_active_location(txn, req.dest_location_id).await?;

                            let previous = stock::current_quantity(
                                txn,
                                req.product_id,
                                req.source_location_id,
                            )
                            .await?;
                            let requested = i64::from(req.quantity);
                            if previous < requested {
                                return Err(ServiceError::InsufficientStock {
                                    product_id: req.product_id,
                                    location_id: req.source_location_id,
                                    available: previous,
                                    requested,
                                });
                            }

                            if let Some(lot_id) = req.lot_id {
                                let lot = lots::get_in(txn, lot_id).await?;
                                if lot.product_id != req.product_id {
                                    return Err(ServiceError::InvalidMovement(format!(
                                        "lot {} does not belong to product {}",
                                        lot_id, req.product_id
                                    )));
                                }
                                // Wholesale relocation; the batch is assumed to
                                // move as one.
                                lots::relocate_in(txn, lot_id, req.dest_location_id).await?;
                            }

                            let movement = movements::append(
                                txn,
                                NewMovement {
                                    kind: MovementKind::Transfer,
                                    product_id: req.product_id,
                                    lot_id: req.lot_id,
                                    source_location_id: Some(req.source_location_id),
                                    dest_location_id: Some(req.dest_location_id),
                                    quantity: req.quantity,
                                    actor_id: req.actor_id,
                                    note: req.note,
                                },
                            )
                            .await?;

                            Ok(MovementOutcome {
                                previous_quantity: previous,
                                new_quantity: previous - requested,
                                lot_id: req.lot_id,
                                movement,
                            })
                        })
                    })
                    .await
                    .map_err(ServiceError::from)
            }
            Err(err) => Err(err),
        };

        self.finish(MovementKind::Transfer, outcome, |o| {
            Event::StockTransferred {
                movement_id: o.movement.id,
                product_id: o.movement.product_id,
                source_location_id: o.movement.source_location_id.unwrap_or_default(),
                dest_location_id: o.movement.dest_location_id.unwrap_or_default(),
                quantity: o.movement.quantity,
                lot_id: o.lot_id,
            }
        })
        .await
    }

    /// Record metrics, log and publish after the unit of work resolves.
    async fn finish(
        &self,
        kind: MovementKind,
        outcome: Result<MovementOutcome, ServiceError>,
        event: impl FnOnce(&MovementOutcome) -> Event,
    ) -> Result<MovementOutcome, ServiceError> {
        match outcome {
            Ok(outcome) => {
                MOVEMENTS_RECORDED.with_label_values(&[kind.as_str()]).inc();
                info!(
                    movement_id = outcome.movement.id,
                    kind = kind.as_str(),
                    product_id = outcome.movement.product_id,
                    previous_quantity = outcome.previous_quantity,
                    new_quantity = outcome.new_quantity,
                    "movement committed"
                );
                if let Err(err) = self.event_sender.send(event(&outcome)).await {
                    error!(error = %err, "failed to publish movement event");
                }
                Ok(outcome)
            }
            Err(err) => {
                MOVEMENT_FAILURES
                    .with_label_values(&[kind.as_str(), err.label()])
                    .inc();
                Err(err)
            }
        }
    }
}
