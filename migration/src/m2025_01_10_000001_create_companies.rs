//! Migration to create the companies table.
//!
//! Companies are the tenants of the platform; each carries its subscription,
//! matching-program and settings documents as JSON columns.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Companies::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Companies::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Companies::Name).text().not_null())
                    .col(
                        ColumnDef::new(Companies::Domain)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Companies::Ein).text().not_null())
                    .col(ColumnDef::new(Companies::Address).json_binary().not_null())
                    .col(
                        ColumnDef::new(Companies::ContactInfo)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Companies::Subscription)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Companies::MatchingProgram)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Companies::Settings)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Companies::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Companies::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Companies::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Companies {
    Table,
    Id,
    Name,
    Domain,
    Ein,
    Address,
    ContactInfo,
    Subscription,
    MatchingProgram,
    Settings,
    IsActive,
    CreatedAt,
}
