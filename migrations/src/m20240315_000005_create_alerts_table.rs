use sea_orm_migration::prelude::*;

use super::m20240315_000001_create_products_table::Products;
use super::m20240315_000003_create_lots_table::Lots;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alerts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alerts::Id)
                            .big_integer()
                            .auto_increment()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Alerts::Kind).string().not_null())
                    .col(ColumnDef::new(Alerts::ProductId).big_integer().not_null())
                    .col(ColumnDef::new(Alerts::LotId).big_integer().null())
                    .col(ColumnDef::new(Alerts::Message).text().not_null())
                    .col(
                        ColumnDef::new(Alerts::Acknowledged)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Alerts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-alerts-product_id")
                            .from(Alerts::Table, Alerts::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-alerts-lot_id")
                            .from(Alerts::Table, Alerts::LotId)
                            .to(Lots::Table, Lots::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-alerts-product-kind-acknowledged")
                    .table(Alerts::Table)
                    .col(Alerts::ProductId)
                    .col(Alerts::Kind)
                    .col(Alerts::Acknowledged)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alerts::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Alerts {
    Table,
    Id,
    Kind,
    ProductId,
    LotId,
    Message,
    Acknowledged,
    CreatedAt,
}
