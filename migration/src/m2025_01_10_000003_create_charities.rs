//! Migration to create the charities table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Charities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Charities::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Charities::Name).text().not_null())
                    .col(ColumnDef::new(Charities::Ein).text().not_null())
                    .col(ColumnDef::new(Charities::Description).text().not_null())
                    .col(ColumnDef::new(Charities::Category).text().not_null())
                    .col(ColumnDef::new(Charities::Subcategory).text().null())
                    .col(ColumnDef::new(Charities::Website).text().null())
                    .col(ColumnDef::new(Charities::Address).json_binary().not_null())
                    .col(ColumnDef::new(Charities::ContactInfo).json_binary().null())
                    .col(
                        ColumnDef::new(Charities::Verification)
                            .json_binary()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Charities::Impact).json_binary().null())
                    .col(
                        ColumnDef::new(Charities::DonationInfo)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Charities::IsFeatured)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Charities::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Charities::TotalDonations)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Charities::TotalDonors)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Charities::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_charities_category")
                    .table(Charities::Table)
                    .col(Charities::Category)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Charities::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Charities {
    Table,
    Id,
    Name,
    Ein,
    Description,
    Category,
    Subcategory,
    Website,
    Address,
    ContactInfo,
    Verification,
    Impact,
    DonationInfo,
    IsFeatured,
    IsActive,
    TotalDonations,
    TotalDonors,
    CreatedAt,
}
