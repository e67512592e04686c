use sea_orm_migration::prelude::*;

use super::m20240315_000001_create_products_table::Products;
use super::m20240315_000002_create_locations_table::Locations;
use super::m20240315_000003_create_lots_table::Lots;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Append-only ledger; rows are never updated or deleted.
        manager
            .create_table(
                Table::create()
                    .table(StockMovements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockMovements::Id)
                            .big_integer()
                            .auto_increment()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockMovements::Kind).string().not_null())
                    .col(
                        ColumnDef::new(StockMovements::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockMovements::LotId).big_integer().null())
                    .col(
                        ColumnDef::new(StockMovements::SourceLocationId)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(StockMovements::DestLocationId)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(StockMovements::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockMovements::ActorId)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(StockMovements::Note).text().null())
                    .col(
                        ColumnDef::new(StockMovements::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-stock_movements-product_id")
                            .from(StockMovements::Table, StockMovements::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-stock_movements-lot_id")
                            .from(StockMovements::Table, StockMovements::LotId)
                            .to(Lots::Table, Lots::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-stock_movements-source_location_id")
                            .from(StockMovements::Table, StockMovements::SourceLocationId)
                            .to(Locations::Table, Locations::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-stock_movements-dest_location_id")
                            .from(StockMovements::Table, StockMovements::DestLocationId)
                            .to(Locations::Table, Locations::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-stock_movements-product-created_at")
                    .table(StockMovements::Table)
                    .col(StockMovements::ProductId)
                    .col(StockMovements::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-stock_movements-source_location")
                    .table(StockMovements::Table)
                    .col(StockMovements::SourceLocationId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-stock_movements-dest_location")
                    .table(StockMovements::Table)
                    .col(StockMovements::DestLocationId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StockMovements::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum StockMovements {
    Table,
    Id,
    Kind,
    ProductId,
    LotId,
    SourceLocationId,
    DestLocationId,
    Quantity,
    ActorId,
    Note,
    CreatedAt,
}
