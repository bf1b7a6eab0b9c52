//! Company entity model
//!
//! Companies are the tenants of the platform. Subscription, matching-program
//! and settings documents live in JSON columns with typed value objects so
//! partial updates are applied field by field rather than by blind merge.

use sea_orm::ActiveModelBehavior;
use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Address, ContactInfo};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = Company)]
#[sea_orm(table_name = "companies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub name: String,

    /// Login/registration key; globally unique.
    #[sea_orm(unique)]
    pub domain: String,

    pub ein: String,

    #[sea_orm(column_type = "JsonBinary")]
    pub address: Address,

    #[sea_orm(column_type = "JsonBinary")]
    pub contact_info: ContactInfo,

    #[sea_orm(column_type = "JsonBinary")]
    pub subscription: Subscription,

    #[sea_orm(column_type = "JsonBinary")]
    pub matching_program: MatchingProgram,

    #[sea_orm(column_type = "JsonBinary")]
    pub settings: CompanySettings,

    pub is_active: bool,

    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user::Entity")]
    User,
    #[sea_orm(has_many = "super::donation::Entity")]
    Donation,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::donation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Donation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Subscription plan details for a tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromJsonQueryResult, ToSchema)]
pub struct Subscription {
    /// Plan identifier, e.g. "basic", "premium", "enterprise".
    pub plan: String,
    /// Plan status, e.g. "active", "trial", "cancelled".
    pub status: String,
    pub max_employees: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<chrono::DateTime<chrono::Utc>>,
}

impl Default for Subscription {
    fn default() -> Self {
        Self {
            plan: "basic".to_string(),
            status: "active".to_string(),
            max_employees: 50,
            end_date: None,
        }
    }
}

/// How employer matching funds are computed for a donation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Percentage,
    Fixed,
    None,
}

/// Employer matching program configuration and its running annual budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromJsonQueryResult, ToSchema)]
pub struct MatchingProgram {
    pub enabled: bool,
    pub match_type: MatchType,
    /// Match rate in percent when `match_type` is `percentage`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    /// Flat match per donation when `match_type` is `fixed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_match_per_employee: Option<f64>,
    /// Aggregate matching budget per calendar year; unlimited when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_limit: Option<f64>,
    /// Matching funds already reserved against `annual_limit` this year.
    #[serde(default)]
    pub used_amount: f64,
    #[serde(default)]
    pub preferred_charities: Vec<Uuid>,
}

impl Default for MatchingProgram {
    fn default() -> Self {
        Self {
            enabled: false,
            match_type: MatchType::None,
            percentage: None,
            fixed_amount: None,
            max_match_per_employee: None,
            annual_limit: None,
            used_amount: 0.0,
            preferred_charities: Vec::new(),
        }
    }
}

/// Per-tenant behavioural settings.
#[derive(
    Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult, ToSchema,
)]
pub struct CompanySettings {
    /// When true, new donations start in `pending` instead of `approved`.
    #[serde(default)]
    pub require_approval_for_donations: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payroll_integration: Option<String>,
}
