//! # Tax API Handlers
//!
//! Yearly tax record generation, metadata and on-demand PDF downloads.
//! PDFs are regenerated from the stored record on every download; nothing
//! is written to disk.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::RequestContext;
use crate::error::{ApiError, forbidden, not_found, validation_error};
use crate::handlers::types::ApiResponse;
use crate::models::donation::DonationStatus;
use crate::models::tax_record::{self, TaxDocumentKind, TaxSummary};
use crate::models::user::UserRole;
use crate::pdf;
use crate::repositories::{
    CharityRepository, DonationRepository, TaxRecordRepository, UserRepository,
};
use crate::server::AppState;
use crate::taxes::{build_line_items, compute_summary};

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateRequest {
    pub tax_year: i32,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TaxSummaryQuery {
    /// Tax year; defaults to the previous calendar year
    pub year: Option<i32>,
}

/// Result of a company-wide generation run
#[derive(Debug, Serialize, ToSchema)]
pub struct CompanyGenerationData {
    pub tax_year: i32,
    pub generated: u64,
    /// Employees with no completed donations in the year
    pub skipped: u64,
    pub failed: u64,
}

/// Download metadata for one document of a record
#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentDownloadData {
    pub record_id: Uuid,
    pub document_type: String,
    pub generated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Relative URL serving the PDF bytes
    pub file_url: String,
}

/// Live tax summary, computed without persisting a record
#[derive(Debug, Serialize, ToSchema)]
pub struct LiveTaxSummary {
    pub tax_year: i32,
    pub summary: TaxSummary,
}

fn require_record_access(
    ctx: &RequestContext,
    record: &tax_record::Model,
) -> Result<(), ApiError> {
    let allowed = record.user_id == ctx.user.id
        || (ctx.user.role != UserRole::Employee && ctx.can_access_company(record.company_id));
    if allowed {
        Ok(())
    } else {
        Err(forbidden(Some("Access to this tax record is not allowed")))
    }
}

async fn load_record(state: &AppState, record_id: Uuid) -> Result<tax_record::Model, ApiError> {
    TaxRecordRepository::new(&state.db)
        .find_by_id(record_id)
        .await?
        .ok_or_else(|| not_found("Tax record not found"))
}

/// Tax years start when the platform's records do and cannot lie in the
/// future.
fn validate_tax_year(tax_year: i32) -> Result<(), ApiError> {
    use chrono::Datelike;
    let current = Utc::now().year();
    if (2000..=current).contains(&tax_year) {
        Ok(())
    } else {
        Err(validation_error(
            "Invalid tax year",
            serde_json::json!({
                "tax_year": format!("Tax year must be between 2000 and {current}")
            }),
        ))
    }
}

fn parse_document_kind(value: &str) -> Result<TaxDocumentKind, ApiError> {
    TaxDocumentKind::parse(value).ok_or_else(|| {
        validation_error(
            "Unknown document type",
            serde_json::json!({ "document_type": "Expected schedule_a, receipt or summary" }),
        )
    })
}

fn pdf_response(filename: String, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// The caller's tax records, newest year first
#[utoipa::path(
    get,
    path = "/api/tax/records",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Tax records", body = ApiResponse<Vec<tax_record::Model>>)
    ),
    tag = "tax"
)]
pub async fn list_records(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Json<ApiResponse<Vec<tax_record::Model>>>, ApiError> {
    let records = TaxRecordRepository::new(&state.db)
        .list_for_user(ctx.user.id)
        .await?;
    Ok(Json(ApiResponse::data(records)))
}

/// Fetch one tax record
#[utoipa::path(
    get,
    path = "/api/tax/records/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Tax record id")),
    responses(
        (status = 200, description = "Tax record", body = ApiResponse<tax_record::Model>),
        (status = 403, description = "Access to this tax record is not allowed", body = ApiError),
        (status = 404, description = "Tax record not found", body = ApiError)
    ),
    tag = "tax"
)]
pub async fn get_record(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(record_id): Path<Uuid>,
) -> Result<Json<ApiResponse<tax_record::Model>>, ApiError> {
    let record = load_record(&state, record_id).await?;
    require_record_access(&ctx, &record)?;
    Ok(Json(ApiResponse::data(record)))
}

/// Generate (or regenerate) the caller's record for one tax year
#[utoipa::path(
    post,
    path = "/api/tax/records/generate",
    security(("bearer_auth" = [])),
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Record generated", body = ApiResponse<tax_record::Model>),
        (status = 400, description = "Invalid tax year", body = ApiError),
        (status = 404, description = "No completed donations found for the year", body = ApiError)
    ),
    tag = "tax"
)]
pub async fn generate_record(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<ApiResponse<tax_record::Model>>, ApiError> {
    validate_tax_year(request.tax_year)?;

    let donations = DonationRepository::new(&state.db)
        .completed_for_user_in_year(ctx.user.id, request.tax_year)
        .await?;
    if donations.is_empty() {
        return Err(not_found(&format!(
            "No completed donations found for tax year {}",
            request.tax_year
        )));
    }

    let charities = CharityRepository::new(&state.db)
        .find_by_ids(donations.iter().map(|d| d.charity_id))
        .await?;
    let record = TaxRecordRepository::new(&state.db)
        .generate(&ctx.user, request.tax_year, &donations, &charities)
        .await?;

    Ok(Json(ApiResponse::with_message(record, "Tax record generated")))
}

/// Generate records for every employee of the caller's company
/// (HR or super admin). Employees without completed donations in the year
/// are skipped; individual failures do not abort the run.
#[utoipa::path(
    post,
    path = "/api/tax/records/generate-company",
    security(("bearer_auth" = [])),
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Generation run finished", body = ApiResponse<CompanyGenerationData>),
        (status = 400, description = "Invalid tax year", body = ApiError),
        (status = 403, description = "Insufficient role", body = ApiError)
    ),
    tag = "tax"
)]
pub async fn generate_company_records(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<ApiResponse<CompanyGenerationData>>, ApiError> {
    ctx.require_role(&[UserRole::HrAdmin, UserRole::SuperAdmin])?;
    validate_tax_year(request.tax_year)?;

    let users = UserRepository::new(&state.db);
    let donations = DonationRepository::new(&state.db);
    let charities = CharityRepository::new(&state.db);
    let records = TaxRecordRepository::new(&state.db);

    let mut generated = 0u64;
    let mut skipped = 0u64;
    let mut failed = 0u64;

    let mut page = 1u64;
    loop {
        let employees = users
            .list_by_company(ctx.user.company_id, None, page, 200)
            .await?;
        for employee in &employees.items {
            if !employee.is_active {
                continue;
            }
            let completed = donations
                .completed_for_user_in_year(employee.id, request.tax_year)
                .await?;
            if completed.is_empty() {
                skipped += 1;
                continue;
            }
            let names = charities
                .find_by_ids(completed.iter().map(|d| d.charity_id))
                .await?;
            match records
                .generate(employee, request.tax_year, &completed, &names)
                .await
            {
                Ok(_) => generated += 1,
                Err(err) => {
                    tracing::warn!(
                        user_id = %employee.id,
                        tax_year = request.tax_year,
                        error = %err,
                        "tax record generation failed for employee"
                    );
                    failed += 1;
                }
            }
        }
        if page >= employees.pages.max(1) {
            break;
        }
        page += 1;
    }

    Ok(Json(ApiResponse::data(CompanyGenerationData {
        tax_year: request.tax_year,
        generated,
        skipped,
        failed,
    })))
}

/// Download metadata for one document of a record
#[utoipa::path(
    get,
    path = "/api/tax/records/{id}/download/{document_type}",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Tax record id"),
        ("document_type" = String, Path, description = "schedule_a, receipt or summary")
    ),
    responses(
        (status = 200, description = "Download metadata", body = ApiResponse<DocumentDownloadData>),
        (status = 400, description = "Unknown document type", body = ApiError),
        (status = 404, description = "Tax record not found", body = ApiError)
    ),
    tag = "tax"
)]
pub async fn document_metadata(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((record_id, document_type)): Path<(Uuid, String)>,
) -> Result<Json<ApiResponse<DocumentDownloadData>>, ApiError> {
    let kind = parse_document_kind(&document_type)?;
    let record = load_record(&state, record_id).await?;
    require_record_access(&ctx, &record)?;

    let docstate = record.documents.state(kind);
    Ok(Json(ApiResponse::data(DocumentDownloadData {
        record_id: record.id,
        document_type: kind.as_str().to_string(),
        generated: docstate.generated,
        generated_at: docstate.generated_at,
        file_url: format!(
            "/api/tax/records/{}/download/{}/file",
            record.id,
            kind.as_str()
        ),
    })))
}

/// The PDF bytes for one document of a record
#[utoipa::path(
    get,
    path = "/api/tax/records/{id}/download/{document_type}/file",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Tax record id"),
        ("document_type" = String, Path, description = "schedule_a, receipt or summary")
    ),
    responses(
        (status = 200, description = "PDF document", content_type = "application/pdf"),
        (status = 400, description = "Unknown document type", body = ApiError),
        (status = 404, description = "Tax record not found", body = ApiError)
    ),
    tag = "tax"
)]
pub async fn document_file(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((record_id, document_type)): Path<(Uuid, String)>,
) -> Result<Response, ApiError> {
    let kind = parse_document_kind(&document_type)?;
    let record = load_record(&state, record_id).await?;
    require_record_access(&ctx, &record)?;

    let owner = UserRepository::new(&state.db)
        .find_by_id(record.user_id)
        .await?
        .ok_or_else(|| not_found("User not found"))?;
    let owner_name = owner.full_name();

    let bytes = match kind {
        TaxDocumentKind::ScheduleA => pdf::schedule_a(&record, &owner_name)?,
        TaxDocumentKind::Receipt => pdf::annual_receipt(&record, &owner_name)?,
        TaxDocumentKind::Summary => pdf::annual_summary(&record, &owner_name)?,
    };

    Ok(pdf_response(
        format!("{}-{}.pdf", kind.as_str(), record.tax_year),
        bytes,
    ))
}

/// Receipt PDF for one completed donation (donor only)
#[utoipa::path(
    get,
    path = "/api/tax/donations/{id}/receipt",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Donation id")),
    responses(
        (status = 200, description = "PDF receipt", content_type = "application/pdf"),
        (status = 403, description = "Not the donor", body = ApiError),
        (status = 404, description = "Donation not found", body = ApiError),
        (status = 409, description = "Donation is not completed", body = ApiError)
    ),
    tag = "tax"
)]
pub async fn donation_receipt(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(donation_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let donation = DonationRepository::new(&state.db)
        .find_by_id(donation_id)
        .await?
        .ok_or_else(|| not_found("Donation not found"))?;

    if donation.user_id != ctx.user.id {
        return Err(forbidden(Some("Access to this donation is not allowed")));
    }
    if donation.status != DonationStatus::Completed {
        return Err(crate::error::conflict(
            "Receipts are only available for completed donations",
        ));
    }

    let charity = CharityRepository::new(&state.db)
        .find_by_id(donation.charity_id)
        .await?
        .ok_or_else(|| not_found("Charity not found"))?;

    let bytes = pdf::donation_receipt(
        &donation,
        &charity.name,
        &charity.ein,
        &ctx.user.full_name(),
    )?;

    Ok(pdf_response(format!("receipt-{}.pdf", donation.id), bytes))
}

/// Live tax summary for one year, computed without persisting a record
#[utoipa::path(
    get,
    path = "/api/tax/summary",
    security(("bearer_auth" = [])),
    params(TaxSummaryQuery),
    responses(
        (status = 200, description = "Summary", body = ApiResponse<LiveTaxSummary>)
    ),
    tag = "tax"
)]
pub async fn tax_summary(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<TaxSummaryQuery>,
) -> Result<Json<ApiResponse<LiveTaxSummary>>, ApiError> {
    use chrono::Datelike;
    let year = query.year.unwrap_or_else(|| Utc::now().year() - 1);

    let donations = DonationRepository::new(&state.db)
        .completed_for_user_in_year(ctx.user.id, year)
        .await?;
    let charities = CharityRepository::new(&state.db)
        .find_by_ids(donations.iter().map(|d| d.charity_id))
        .await?;

    let items = build_line_items(&donations, &charities);
    Ok(Json(ApiResponse::data(LiveTaxSummary {
        tax_year: year,
        summary: compute_summary(&items),
    })))
}

/// Years for which the caller has completed donations, newest first
#[utoipa::path(
    get,
    path = "/api/tax/years",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Years", body = ApiResponse<Vec<i32>>)
    ),
    tag = "tax"
)]
pub async fn available_years(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Json<ApiResponse<Vec<i32>>>, ApiError> {
    let years = DonationRepository::new(&state.db)
        .years_with_completed_donations(ctx.user.id)
        .await?;
    Ok(Json(ApiResponse::data(years)))
}

/// Record that the caller downloaded their documents
#[utoipa::path(
    put,
    path = "/api/tax/records/{id}/downloaded",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Tax record id")),
    responses(
        (status = 200, description = "Record updated", body = ApiResponse<tax_record::Model>),
        (status = 404, description = "Tax record not found", body = ApiError)
    ),
    tag = "tax"
)]
pub async fn mark_downloaded(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(record_id): Path<Uuid>,
) -> Result<Json<ApiResponse<tax_record::Model>>, ApiError> {
    let record = load_record(&state, record_id).await?;
    require_record_access(&ctx, &record)?;

    let updated = TaxRecordRepository::new(&state.db)
        .mark_downloaded(record)
        .await?;
    Ok(Json(ApiResponse::with_message(
        updated,
        "Tax record marked downloaded",
    )))
}
