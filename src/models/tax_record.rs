//! Tax record entity model
//!
//! One record per (user, tax year), holding denormalized donation line items,
//! a rolled-up summary, and per-document generation metadata. Records are
//! fully replaced on regeneration.

use sea_orm::ActiveModelBehavior;
use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = TaxRecord)]
#[sea_orm(table_name = "tax_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    pub company_id: Uuid,

    pub tax_year: i32,

    #[sea_orm(column_type = "JsonBinary")]
    pub donations: TaxLineItems,

    #[sea_orm(column_type = "JsonBinary")]
    pub summary: TaxSummary,

    #[sea_orm(column_type = "JsonBinary")]
    pub documents: TaxDocuments,

    pub status: TaxRecordStatus,

    #[sea_orm(nullable)]
    #[schema(value_type = String, format = DateTime)]
    pub generated_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(nullable)]
    #[schema(value_type = String, format = DateTime)]
    pub downloaded_at: Option<DateTimeWithTimeZone>,

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
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum TaxRecordStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "generated")]
    Generated,
    #[sea_orm(string_value = "downloaded")]
    Downloaded,
}

/// One denormalized donation line on a tax record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TaxLineItem {
    pub donation_id: Uuid,
    pub charity_name: String,
    pub charity_ein: String,
    pub amount: f64,
    pub date: chrono::DateTime<chrono::Utc>,
    pub is_tax_deductible: bool,
}

/// Line item collection stored as a JSON array column.
#[derive(
    Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult, ToSchema,
)]
pub struct TaxLineItems(pub Vec<TaxLineItem>);

/// Rolled-up aggregates over the line items.
#[derive(
    Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult, ToSchema,
)]
pub struct TaxSummary {
    pub total_donations: f64,
    pub total_tax_deductible: f64,
    pub donation_count: i64,
    /// Count of distinct charity EINs.
    pub unique_charities: i64,
}

/// The three tax documents the platform can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaxDocumentKind {
    ScheduleA,
    Receipt,
    Summary,
}

impl TaxDocumentKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "schedule_a" | "scheduleA" => Some(TaxDocumentKind::ScheduleA),
            "receipt" => Some(TaxDocumentKind::Receipt),
            "summary" => Some(TaxDocumentKind::Summary),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaxDocumentKind::ScheduleA => "schedule_a",
            TaxDocumentKind::Receipt => "receipt",
            TaxDocumentKind::Summary => "summary",
        }
    }
}

/// Generation metadata for one document kind.
#[derive(
    Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult, ToSchema,
)]
pub struct DocumentState {
    #[serde(default)]
    pub generated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(
    Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult, ToSchema,
)]
pub struct TaxDocuments {
    #[serde(default)]
    pub schedule_a: DocumentState,
    #[serde(default)]
    pub receipt: DocumentState,
    #[serde(default)]
    pub summary: DocumentState,
}

impl TaxDocuments {
    /// Mark every document generated at `now`. The PDFs themselves are
    /// regenerated on demand at download time, not persisted.
    pub fn all_generated(now: chrono::DateTime<chrono::Utc>) -> Self {
        let state = DocumentState {
            generated: true,
            generated_at: Some(now),
        };
        Self {
            schedule_a: state.clone(),
            receipt: state.clone(),
            summary: state,
        }
    }

    pub fn state(&self, kind: TaxDocumentKind) -> &DocumentState {
        match kind {
            TaxDocumentKind::ScheduleA => &self.schedule_a,
            TaxDocumentKind::Receipt => &self.receipt,
            TaxDocumentKind::Summary => &self.summary,
        }
    }
}
