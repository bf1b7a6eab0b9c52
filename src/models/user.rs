//! User entity model
//!
//! Users belong to a company. Notification/privacy preferences and the
//! derived gamification counters are typed JSON sub-documents.

use sea_orm::ActiveModelBehavior;
use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = User)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub email: String,

    #[serde(skip_serializing)]
    pub password_hash: String,

    pub first_name: String,

    pub last_name: String,

    pub role: UserRole,

    pub company_id: Uuid,

    /// Unique within a company when present.
    #[sea_orm(nullable)]
    pub employee_id: Option<String>,

    #[sea_orm(nullable)]
    pub department: Option<String>,

    #[sea_orm(nullable)]
    pub position: Option<String>,

    #[sea_orm(nullable)]
    pub phone: Option<String>,

    #[sea_orm(column_type = "JsonBinary")]
    pub preferences: Preferences,

    /// Derived counters, mutated only by completed-donation side effects.
    #[sea_orm(column_type = "JsonBinary")]
    pub gamification: Gamification,

    pub is_active: bool,

    pub is_verified: bool,

    #[sea_orm(nullable)]
    #[schema(value_type = String, format = DateTime)]
    pub last_login: Option<DateTimeWithTimeZone>,

    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::company::Entity",
        from = "Column::CompanyId",
        to = "super::company::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Company,
    #[sea_orm(has_many = "super::donation::Entity")]
    Donation,
}

impl Related<super::company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Company.def()
    }
}

impl Related<super::donation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Donation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Platform role controlling what a user may see and mutate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[sea_orm(string_value = "employee")]
    Employee,
    #[sea_orm(string_value = "hr_admin")]
    HrAdmin,
    #[sea_orm(string_value = "super_admin")]
    SuperAdmin,
}

impl UserRole {
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::HrAdmin | UserRole::SuperAdmin)
    }
}

/// Notification opt-ins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NotificationPreferences {
    #[serde(default = "default_true")]
    pub email: bool,
    #[serde(default = "default_true")]
    pub donation_receipts: bool,
    #[serde(default = "default_true")]
    pub matching_updates: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email: true,
            donation_receipts: true,
            matching_updates: true,
        }
    }
}

/// Leaderboard/privacy opt-ins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PrivacyPreferences {
    #[serde(default = "default_true")]
    pub show_on_leaderboard: bool,
    #[serde(default)]
    pub share_donation_history: bool,
}

impl Default for PrivacyPreferences {
    fn default() -> Self {
        Self {
            show_on_leaderboard: true,
            share_donation_history: false,
        }
    }
}

#[derive(
    Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult, ToSchema,
)]
pub struct Preferences {
    #[serde(default)]
    pub notifications: NotificationPreferences,
    #[serde(default)]
    pub privacy: PrivacyPreferences,
}

/// Derived, non-authoritative donation counters.
#[derive(
    Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult, ToSchema,
)]
pub struct Gamification {
    #[serde(default)]
    pub total_points: i64,
    #[serde(default)]
    pub total_donated: f64,
    #[serde(default)]
    pub level: i32,
    #[serde(default)]
    pub badges: Vec<String>,
    #[serde(default)]
    pub streak_days: i32,
}

fn default_true() -> bool {
    true
}
