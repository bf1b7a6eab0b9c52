//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM
//! operations for database entities, providing a clean API for data access
//! with tenant-aware methods. Repositories return [`crate::error::ApiError`]
//! so domain rules (state transitions, validation) surface with the right
//! status code.

pub mod charity;
pub mod company;
pub mod donation;
pub mod tax_record;
pub mod user;

pub use charity::CharityRepository;
pub use company::CompanyRepository;
pub use donation::DonationRepository;
pub use tax_record::TaxRecordRepository;
pub use user::UserRepository;

/// One page of repository results plus the paging totals.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total matching rows across all pages.
    pub total: u64,
    /// Total page count at the requested page size.
    pub pages: u64,
}
