use chrono::NaiveDate;
use sea_orm::error::DbErr;
use sea_orm::TransactionError;
use serde::Serialize;

/// Closed error taxonomy for the ledger core.
///
/// Every fallible operation surfaces one of these variants; callers are
/// expected to match exhaustively. Storage failures are wrapped verbatim and
/// always mean the surrounding unit of work was rolled back.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error("product {0} not found or inactive")]
    InvalidProduct(i64),

    #[error("location {0} not found or inactive")]
    InvalidLocation(i64),

    #[error("insufficient stock for product {product_id} at location {location_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: i64,
        location_id: i64,
        available: i64,
        requested: i64,
    },

    #[error("lot number {lot_number:?} already exists for product {product_id}")]
    DuplicateLot { product_id: i64, lot_number: String },

    #[error("adjusting lot {lot_id} by {delta} would drop its quantity below zero (current {current})")]
    NegativeLotQuantity { lot_id: i64, current: i32, delta: i32 },

    #[error("manufacture date {manufacture_date} is later than expiry date {expiry_date}")]
    InvalidDates {
        manufacture_date: NaiveDate,
        expiry_date: NaiveDate,
    },

    #[error("invalid movement: {0}")]
    InvalidMovement(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("event error: {0}")]
    EventError(String),
}

impl ServiceError {
    pub fn db_error(err: DbErr) -> Self {
        Self::DatabaseError(err)
    }

    /// Stable label used for failure counters.
    pub fn label(&self) -> &'static str {
        match self {
            ServiceError::DatabaseError(_) => "database",
            ServiceError::InvalidProduct(_) => "invalid_product",
            ServiceError::InvalidLocation(_) => "invalid_location",
            ServiceError::InsufficientStock { .. } => "insufficient_stock",
            ServiceError::DuplicateLot { .. } => "duplicate_lot",
            ServiceError::NegativeLotQuantity { .. } => "negative_lot_quantity",
            ServiceError::InvalidDates { .. } => "invalid_dates",
            ServiceError::InvalidMovement(_) => "invalid_movement",
            ServiceError::ValidationError(_) => "validation",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::EventError(_) => "event",
        }
    }
}

impl From<TransactionError<ServiceError>> for ServiceError {
    fn from(err: TransactionError<ServiceError>) -> Self {
        match err {
            TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
            TransactionError::Transaction(service_err) => service_err,
        }
    }
}
