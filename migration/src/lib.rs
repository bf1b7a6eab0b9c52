//! Database migrations for the GivingWorks API.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_01_10_000001_create_companies;
mod m2025_01_10_000002_create_users;
mod m2025_01_10_000003_create_charities;
mod m2025_01_10_000004_create_donations;
mod m2025_01_10_000005_create_tax_records;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_01_10_000001_create_companies::Migration),
            Box::new(m2025_01_10_000002_create_users::Migration),
            Box::new(m2025_01_10_000003_create_charities::Migration),
            Box::new(m2025_01_10_000004_create_donations::Migration),
            Box::new(m2025_01_10_000005_create_tax_records::Migration),
        ]
    }
}
