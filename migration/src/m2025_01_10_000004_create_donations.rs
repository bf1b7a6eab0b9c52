//! Migration to create the donations table.
//!
//! Donations reference their donor, company and charity; amount fields are
//! immutable after creation and the status column drives the state machine.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Donations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Donations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Donations::UserId).uuid().not_null())
                    .col(ColumnDef::new(Donations::CompanyId).uuid().not_null())
                    .col(ColumnDef::new(Donations::CharityId).uuid().not_null())
                    .col(ColumnDef::new(Donations::Amount).double().not_null())
                    .col(
                        ColumnDef::new(Donations::MatchingAmount)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(Donations::TotalAmount).double().not_null())
                    .col(ColumnDef::new(Donations::DonationType).text().not_null())
                    .col(ColumnDef::new(Donations::Frequency).text().null())
                    .col(ColumnDef::new(Donations::Status).text().not_null())
                    .col(ColumnDef::new(Donations::PaymentMethod).text().not_null())
                    .col(ColumnDef::new(Donations::PayrollInfo).json_binary().null())
                    .col(ColumnDef::new(Donations::Notes).text().null())
                    .col(
                        ColumnDef::new(Donations::IsAnonymous)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Donations::ProcessingInfo)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Donations::TaxInfo)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Donations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_donations_user")
                            .from(Donations::Table, Donations::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_donations_company")
                            .from(Donations::Table, Donations::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_donations_charity")
                            .from(Donations::Table, Donations::CharityId)
                            .to(Charities::Table, Charities::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_donations_user_status")
                    .table(Donations::Table)
                    .col(Donations::UserId)
                    .col(Donations::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_donations_company_status")
                    .table(Donations::Table)
                    .col(Donations::CompanyId)
                    .col(Donations::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Donations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Donations {
    Table,
    Id,
    UserId,
    CompanyId,
    CharityId,
    Amount,
    MatchingAmount,
    TotalAmount,
    DonationType,
    Frequency,
    Status,
    PaymentMethod,
    PayrollInfo,
    Notes,
    IsAnonymous,
    ProcessingInfo,
    TaxInfo,
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

#[derive(DeriveIden)]
enum Charities {
    Table,
    Id,
}
