//! # Data Models
//!
//! This module contains all the entity models and their typed JSON
//! sub-documents used throughout the GivingWorks API.

use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod charity;
pub mod company;
pub mod donation;
pub mod tax_record;
pub mod user;

pub use charity::Entity as Charity;
pub use company::Entity as Company;
pub use donation::Entity as Donation;
pub use tax_record::Entity as TaxRecord;
pub use user::Entity as User;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "givingworks".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Postal address stored as a JSON sub-document on companies and charities.
#[derive(
    Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult, ToSchema,
)]
pub struct Address {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
}

/// Contact details stored as a JSON sub-document.
#[derive(
    Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult, ToSchema,
)]
pub struct ContactInfo {
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}
