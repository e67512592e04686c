pub mod alert;
pub mod location;
pub mod lot;
pub mod product;
pub mod stock_movement;
