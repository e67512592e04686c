//! Multi-location stock ledger.
//!
//! An append-only movement log is the single source of truth for on-hand
//! quantities. Units of work wrap the stock-sufficiency check, the movement
//! append and any lot adjustment in one database transaction, so stock can
//! never go negative under concurrent writers. A read-only scanner raises
//! low-stock and expiry alerts on top of the same data.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod logging;
pub mod services;

use std::sync::Arc;

use db::DbPool;
use events::EventSender;

/// The core services wired over one connection pool and one event channel.
///
/// This is the composition root an embedding caller (an HTTP layer, a CLI, a
/// test) builds once and clones freely.
#[derive(Clone)]
pub struct AppServices {
    pub movements: services::movements::MovementService,
    pub stock: services::stock::StockService,
    pub lots: services::lots::LotService,
    pub ledger: services::stock_ledger::StockLedgerService,
    pub alerts: services::alerts::AlertService,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            movements: services::movements::MovementService::new(db.clone()),
            stock: services::stock::StockService::new(db.clone()),
            lots: services::lots::LotService::new(db.clone(), event_sender.clone()),
            ledger: services::stock_ledger::StockLedgerService::new(
                db.clone(),
                event_sender.clone(),
            ),
            alerts: services::alerts::AlertService::new(db, event_sender),
        }
    }
}
