use sea_orm_migration::prelude::*;

use super::m20240315_000001_create_products_table::Products;
use super::m20240315_000002_create_locations_table::Locations;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Lots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Lots::Id)
                            .big_integer()
                            .auto_increment()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Lots::ProductId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Lots::LotNumber)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Lots::Quantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Lots::ExpiryDate).date().null())
                    .col(ColumnDef::new(Lots::ManufactureDate).date().null())
                    .col(ColumnDef::new(Lots::LocationId).big_integer().null())
                    .col(ColumnDef::new(Lots::EntryDate).date().not_null())
                    .col(
                        ColumnDef::new(Lots::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Lots::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-lots-product_id")
                            .from(Lots::Table, Lots::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-lots-location_id")
                            .from(Lots::Table, Lots::LocationId)
                            .to(Locations::Table, Locations::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-lots-product-lot_number")
                    .table(Lots::Table)
                    .col(Lots::ProductId)
                    .col(Lots::LotNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-lots-expiry_date")
                    .table(Lots::Table)
                    .col(Lots::ExpiryDate)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Lots::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Lots {
    Table,
    Id,
    ProductId,
    LotNumber,
    Quantity,
    ExpiryDate,
    ManufactureDate,
    LocationId,
    EntryDate,
    CreatedAt,
    UpdatedAt,
}
