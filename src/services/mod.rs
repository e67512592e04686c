// Ledger core
pub mod movements;
pub mod stock;
pub mod stock_ledger;

// Batch tracking
pub mod lots;

// Threshold alerts
pub mod alerts;

// Reference-data lookups (products and locations are owned by the CRUD layer)
pub mod catalog;
