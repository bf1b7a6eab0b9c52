//! Migration to create the tax_records table.
//!
//! One record per (user, tax year), enforced by a unique index; line items,
//! summary and document metadata live in JSON columns.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TaxRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TaxRecords::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TaxRecords::UserId).uuid().not_null())
                    .col(ColumnDef::new(TaxRecords::CompanyId).uuid().not_null())
                    .col(ColumnDef::new(TaxRecords::TaxYear).integer().not_null())
                    .col(
                        ColumnDef::new(TaxRecords::Donations)
                            .json_binary()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TaxRecords::Summary).json_binary().not_null())
                    .col(
                        ColumnDef::new(TaxRecords::Documents)
                            .json_binary()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TaxRecords::Status).text().not_null())
                    .col(
                        ColumnDef::new(TaxRecords::GeneratedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(TaxRecords::DownloadedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(TaxRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tax_records_user")
                            .from(TaxRecords::Table, TaxRecords::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tax_records_company")
                            .from(TaxRecords::Table, TaxRecords::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tax_records_user_year")
                    .table(TaxRecords::Table)
                    .col(TaxRecords::UserId)
                    .col(TaxRecords::TaxYear)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TaxRecords::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TaxRecords {
    Table,
    Id,
    UserId,
    CompanyId,
    TaxYear,
    Donations,
    Summary,
    Documents,
    Status,
    GeneratedAt,
    DownloadedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Companies {
    Table,
    Id,
}
