pub use sea_orm_migration::prelude::*;

mod m20240315_000001_create_products_table;
mod m20240315_000002_create_locations_table;
mod m20240315_000003_create_lots_table;
mod m20240315_000004_create_stock_movements_table;
mod m20240315_000005_create_alerts_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240315_000001_create_products_table::Migration),
            Box::new(m20240315_000002_create_locations_table::Migration),
            Box::new(m20240315_000003_create_lots_table::Migration),
            Box::new(m20240315_000004_create_stock_movements_table::Migration),
            Box::new(m20240315_000005_create_alerts_table::Migration),
        ]
    }
}
