//! Charity entity model
//!
//! Charities are shared read-many across tenants. Running totals are
//! incremented as a side effect of donation creation.

use sea_orm::ActiveModelBehavior;
use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Address, ContactInfo};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = Charity)]
#[sea_orm(table_name = "charities")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub name: String,

    pub ein: String,

    pub description: String,

    pub category: CharityCategory,

    #[sea_orm(nullable)]
    pub subcategory: Option<String>,

    #[sea_orm(nullable)]
    pub website: Option<String>,

    #[sea_orm(column_type = "JsonBinary")]
    pub address: Address,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub contact_info: Option<ContactInfo>,

    #[sea_orm(column_type = "JsonBinary")]
    pub verification: Verification,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub impact: Option<Impact>,

    #[sea_orm(column_type = "JsonBinary")]
    pub donation_info: DonationInfo,

    pub is_featured: bool,

    pub is_active: bool,

    /// Running sum of donation total amounts received.
    pub total_donations: f64,

    /// Running count of donations received.
    pub total_donors: i64,

    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::donation::Entity")]
    Donation,
}

impl Related<super::donation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Donation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Closed category taxonomy for charities.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum CharityCategory {
    #[sea_orm(string_value = "environment")]
    Environment,
    #[sea_orm(string_value = "education")]
    Education,
    #[sea_orm(string_value = "health")]
    Health,
    #[sea_orm(string_value = "animals")]
    Animals,
    #[sea_orm(string_value = "human_services")]
    HumanServices,
    #[sea_orm(string_value = "international")]
    International,
    #[sea_orm(string_value = "arts_culture")]
    ArtsCulture,
    #[sea_orm(string_value = "religion")]
    Religion,
    #[sea_orm(string_value = "other")]
    Other,
}

impl CharityCategory {
    /// All known categories, in display order.
    pub const ALL: [CharityCategory; 9] = [
        CharityCategory::Environment,
        CharityCategory::Education,
        CharityCategory::Health,
        CharityCategory::Animals,
        CharityCategory::HumanServices,
        CharityCategory::International,
        CharityCategory::ArtsCulture,
        CharityCategory::Religion,
        CharityCategory::Other,
    ];
}

/// Vetting metadata set by super admins.
#[derive(
    Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult, ToSchema,
)]
pub struct Verification {
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financial_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accountability_score: Option<f64>,
}

/// Self-reported impact metrics.
#[derive(
    Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult, ToSchema,
)]
pub struct Impact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beneficiaries_served: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_expense_ratio: Option<f64>,
}

/// Donation acceptance constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromJsonQueryResult, ToSchema)]
pub struct DonationInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_donation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_donation: Option<f64>,
    #[serde(default)]
    pub suggested_amounts: Vec<f64>,
    #[serde(default = "default_accepts_recurring")]
    pub accepts_recurring: bool,
}

impl Default for DonationInfo {
    fn default() -> Self {
        Self {
            min_donation: None,
            max_donation: None,
            suggested_amounts: Vec::new(),
            accepts_recurring: true,
        }
    }
}

fn default_accepts_recurring() -> bool {
    true
}
