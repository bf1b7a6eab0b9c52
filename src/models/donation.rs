//! Donation entity model
//!
//! The central state machine of the platform. Amount fields are immutable
//! after creation; only `status` and `processing_info` change afterwards.

use sea_orm::ActiveModelBehavior;
use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = Donation)]
#[sea_orm(table_name = "donations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    pub company_id: Uuid,

    pub charity_id: Uuid,

    /// Donor contribution.
    pub amount: f64,

    /// Employer match computed at creation.
    pub matching_amount: f64,

    /// `amount + matching_amount`.
    pub total_amount: f64,

    pub donation_type: DonationType,

    /// Required when `donation_type` is `recurring`.
    #[sea_orm(nullable)]
    pub frequency: Option<String>,

    pub status: DonationStatus,

    pub payment_method: PaymentMethod,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub payroll_info: Option<PayrollInfo>,

    #[sea_orm(nullable)]
    pub notes: Option<String>,

    pub is_anonymous: bool,

    #[sea_orm(column_type = "JsonBinary")]
    pub processing_info: ProcessingInfo,

    #[sea_orm(column_type = "JsonBinary")]
    pub tax_info: TaxInfo,

    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::company::Entity",
        from = "Column::CompanyId",
        to = "super::company::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Company,
    #[sea_orm(
        belongs_to = "super::charity::Entity",
        from = "Column::CharityId",
        to = "super::charity::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Charity,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Company.def()
    }
}

impl Related<super::charity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Charity.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Donation lifecycle states.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum DonationStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl DonationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DonationStatus::Completed | DonationStatus::Failed | DonationStatus::Cancelled
        )
    }

    /// Whether `self -> target` is a legal lifecycle transition.
    pub fn can_transition_to(&self, target: DonationStatus) -> bool {
        use DonationStatus::*;
        matches!(
            (*self, target),
            (Pending, Approved)
                | (Pending, Cancelled)
                | (Pending, Failed)
                | (Approved, Processing)
                | (Approved, Cancelled)
                | (Approved, Failed)
                | (Processing, Completed)
                | (Processing, Failed)
        )
    }

    /// Only pending or approved donations may be cancelled.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, DonationStatus::Pending | DonationStatus::Approved)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum DonationType {
    #[sea_orm(string_value = "one_time")]
    OneTime,
    #[sea_orm(string_value = "recurring")]
    Recurring,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "payroll_deduction")]
    PayrollDeduction,
    #[sea_orm(string_value = "direct_payment")]
    DirectPayment,
}

/// Payroll sub-fields, required when paying via payroll deduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromJsonQueryResult, ToSchema)]
pub struct PayrollInfo {
    pub deduction_type: String,
    pub deduction_value: f64,
}

/// Lifecycle bookkeeping updated on status changes.
#[derive(
    Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult, ToSchema,
)]
pub struct ProcessingInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_status_update: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Tax treatment for a donation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromJsonQueryResult, ToSchema)]
pub struct TaxInfo {
    #[serde(default = "default_tax_deductible")]
    pub tax_deductible: bool,
    #[serde(default)]
    pub receipt_sent: bool,
}

impl Default for TaxInfo {
    fn default() -> Self {
        Self {
            tax_deductible: true,
            receipt_sent: false,
        }
    }
}

fn default_tax_deductible() -> bool {
    true
}
