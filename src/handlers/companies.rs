//! # Companies API Handlers
//!
//! Tenant directory, matching-program configuration, dashboard and report
//! endpoints.

use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::RequestContext;
use crate::error::{ApiError, not_found};
use crate::handlers::types::{ApiResponse, ListResponse};
use crate::matching::round_cents;
use crate::models::company::{self, CompanySettings, MatchingProgram, Subscription};
use crate::models::donation::DonationStatus;
use crate::models::user::{self, UserRole};
use crate::models::{Address, ContactInfo};
use crate::reports::{self, DonationTotals, GroupTotals, MonthlyBucket};
use crate::repositories::company::{CompanyFilter, CreateCompanyData, UpdateCompanyData};
use crate::repositories::donation::DonationFilter;
use crate::repositories::{CharityRepository, CompanyRepository, DonationRepository, UserRepository};
use crate::server::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListCompaniesQuery {
    /// Substring match against company name or domain
    pub search: Option<String>,
    /// Subscription status, e.g. `active` or `trial`
    pub subscription_status: Option<String>,
    /// 1-based page number
    pub page: Option<u64>,
    /// Page size, capped at 100
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCompanyRequest {
    pub name: String,
    pub domain: String,
    pub ein: String,
    pub address: Option<Address>,
    pub contact_info: Option<ContactInfo>,
    pub subscription: Option<Subscription>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCompanyRequest {
    pub name: Option<String>,
    pub address: Option<Address>,
    pub contact_info: Option<ContactInfo>,
    pub settings: Option<CompanySettings>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EmployeesQuery {
    pub department: Option<String>,
    /// 1-based page number
    pub page: Option<u64>,
    /// Page size, capped at 100
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DashboardQuery {
    /// Calendar year; defaults to the current year
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReportQuery {
    /// `json` (default) or `csv`
    pub format: Option<String>,
    pub year: Option<i32>,
}

/// Matching-program state for the dashboard
#[derive(Debug, Serialize, ToSchema)]
pub struct MatchingStatus {
    pub program: MatchingProgram,
    /// Remaining annual budget; absent when no limit is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_budget: Option<f64>,
}

/// Tenant dashboard aggregates
#[derive(Debug, Serialize, ToSchema)]
pub struct CompanyDashboard {
    pub year: i32,
    pub totals: DonationTotals,
    pub active_employees: u64,
    /// Share of active employees who donated this year, 0..=1
    pub participation_rate: f64,
    pub top_charities: Vec<GroupTotals>,
    pub monthly: Vec<MonthlyBucket>,
    pub matching: MatchingStatus,
}

/// Company report payload for the JSON format
#[derive(Debug, Serialize, ToSchema)]
pub struct CompanyReport {
    pub summary: DonationTotals,
    pub donations: Vec<crate::models::donation::Model>,
}

async fn load_company(
    state: &AppState,
    ctx: &RequestContext,
    company_id: Uuid,
) -> Result<company::Model, ApiError> {
    ctx.require_company_access(company_id)?;
    CompanyRepository::new(&state.db)
        .find_by_id(company_id)
        .await?
        .ok_or_else(|| not_found("Company not found"))
}

/// List companies (super admin)
#[utoipa::path(
    get,
    path = "/api/companies",
    security(("bearer_auth" = [])),
    params(ListCompaniesQuery),
    responses(
        (status = 200, description = "Companies", body = ListResponse<company::Model>),
        (status = 403, description = "Insufficient role", body = ApiError)
    ),
    tag = "companies"
)]
pub async fn list_companies(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<ListCompaniesQuery>,
) -> Result<Json<ListResponse<company::Model>>, ApiError> {
    ctx.require_role(&[UserRole::SuperAdmin])?;

    let current = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let page = CompanyRepository::new(&state.db)
        .list(
            CompanyFilter {
                search: query.search,
                subscription_status: query.subscription_status,
            },
            current,
            limit,
        )
        .await?;

    Ok(Json(ListResponse::from_page(page, current)))
}

/// Fetch one company
#[utoipa::path(
    get,
    path = "/api/companies/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Company id")),
    responses(
        (status = 200, description = "Company", body = ApiResponse<company::Model>),
        (status = 403, description = "Access to this company is not allowed", body = ApiError),
        (status = 404, description = "Company not found", body = ApiError)
    ),
    tag = "companies"
)]
pub async fn get_company(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(company_id): Path<Uuid>,
) -> Result<Json<ApiResponse<company::Model>>, ApiError> {
    let company = load_company(&state, &ctx, company_id).await?;
    Ok(Json(ApiResponse::data(company)))
}

/// Create a company (super admin)
#[utoipa::path(
    post,
    path = "/api/companies",
    security(("bearer_auth" = [])),
    request_body = CreateCompanyRequest,
    responses(
        (status = 201, description = "Company created", body = ApiResponse<company::Model>),
        (status = 403, description = "Insufficient role", body = ApiError),
        (status = 409, description = "Domain already registered", body = ApiError)
    ),
    tag = "companies"
)]
pub async fn create_company(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(request): Json<CreateCompanyRequest>,
) -> Result<(StatusCode, Json<ApiResponse<company::Model>>), ApiError> {
    ctx.require_role(&[UserRole::SuperAdmin])?;

    let company = CompanyRepository::new(&state.db)
        .create(CreateCompanyData {
            name: request.name,
            domain: request.domain.trim().to_lowercase(),
            ein: request.ein,
            address: request.address.unwrap_or_default(),
            contact_info: request.contact_info.unwrap_or_default(),
            subscription: request.subscription,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(company, "Company created")),
    ))
}

/// Update a company (field-by-field overlay)
#[utoipa::path(
    put,
    path = "/api/companies/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Company id")),
    request_body = UpdateCompanyRequest,
    responses(
        (status = 200, description = "Company updated", body = ApiResponse<company::Model>),
        (status = 403, description = "Access to this company is not allowed", body = ApiError),
        (status = 404, description = "Company not found", body = ApiError)
    ),
    tag = "companies"
)]
pub async fn update_company(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(company_id): Path<Uuid>,
    Json(request): Json<UpdateCompanyRequest>,
) -> Result<Json<ApiResponse<company::Model>>, ApiError> {
    ctx.require_role(&[UserRole::HrAdmin, UserRole::SuperAdmin])?;
    let company = load_company(&state, &ctx, company_id).await?;

    let updated = CompanyRepository::new(&state.db)
        .update(
            company,
            UpdateCompanyData {
                name: request.name,
                address: request.address,
                contact_info: request.contact_info,
                settings: request.settings,
            },
        )
        .await?;

    Ok(Json(ApiResponse::with_message(updated, "Company updated")))
}

/// Replace the matching-program configuration
#[utoipa::path(
    put,
    path = "/api/companies/{id}/matching",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Company id")),
    request_body = MatchingProgram,
    responses(
        (status = 200, description = "Matching program updated", body = ApiResponse<company::Model>),
        (status = 403, description = "Access to this company is not allowed", body = ApiError),
        (status = 404, description = "Company not found", body = ApiError)
    ),
    tag = "companies"
)]
pub async fn update_matching_program(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(company_id): Path<Uuid>,
    Json(program): Json<MatchingProgram>,
) -> Result<Json<ApiResponse<company::Model>>, ApiError> {
    ctx.require_role(&[UserRole::HrAdmin, UserRole::SuperAdmin])?;
    let company = load_company(&state, &ctx, company_id).await?;

    let updated = CompanyRepository::new(&state.db)
        .set_matching_program(company, program)
        .await?;

    Ok(Json(ApiResponse::with_message(
        updated,
        "Matching program updated",
    )))
}

/// Tenant dashboard: year totals, participation, trends, matching status
#[utoipa::path(
    get,
    path = "/api/companies/{id}/dashboard",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Company id"),
        DashboardQuery
    ),
    responses(
        (status = 200, description = "Dashboard aggregates", body = ApiResponse<CompanyDashboard>),
        (status = 403, description = "Access to this company is not allowed", body = ApiError),
        (status = 404, description = "Company not found", body = ApiError)
    ),
    tag = "companies"
)]
pub async fn company_dashboard(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(company_id): Path<Uuid>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<ApiResponse<CompanyDashboard>>, ApiError> {
    ctx.require_role(&[UserRole::HrAdmin, UserRole::SuperAdmin])?;
    let company = load_company(&state, &ctx, company_id).await?;
    let year = query.year.unwrap_or_else(|| Utc::now().year());

    let donations: Vec<_> = DonationRepository::new(&state.db)
        .list_all(DonationFilter {
            company_id: Some(company.id),
            year: Some(year),
            ..Default::default()
        })
        .await?
        .into_iter()
        .filter(|d| !matches!(d.status, DonationStatus::Cancelled | DonationStatus::Failed))
        .collect();

    let totals = DonationTotals::collect(&donations);
    let active_employees = UserRepository::new(&state.db)
        .count_active_by_company(company.id)
        .await?;
    let participation_rate = if active_employees == 0 {
        0.0
    } else {
        totals.unique_donors as f64 / active_employees as f64
    };

    let charity_ids: Vec<Uuid> = donations.iter().map(|d| d.charity_id).collect();
    let charities = CharityRepository::new(&state.db)
        .find_by_ids(charity_ids)
        .await?;
    let top_charities = reports::top_groups(
        &donations,
        |d| d.charity_id,
        |id| {
            charities
                .get(&id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| "Unknown Charity".to_string())
        },
        5,
    );

    let remaining_budget = company
        .matching_program
        .annual_limit
        .map(|limit| round_cents((limit - company.matching_program.used_amount).max(0.0)));

    Ok(Json(ApiResponse::data(CompanyDashboard {
        year,
        totals,
        active_employees,
        participation_rate,
        top_charities,
        monthly: reports::monthly_breakdown(&donations),
        matching: MatchingStatus {
            program: company.matching_program,
            remaining_budget,
        },
    })))
}

/// List a company's employees
#[utoipa::path(
    get,
    path = "/api/companies/{id}/employees",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Company id"),
        EmployeesQuery
    ),
    responses(
        (status = 200, description = "Employees", body = ListResponse<user::Model>),
        (status = 403, description = "Access to this company is not allowed", body = ApiError)
    ),
    tag = "companies"
)]
pub async fn company_employees(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(company_id): Path<Uuid>,
    Query(query): Query<EmployeesQuery>,
) -> Result<Json<ListResponse<user::Model>>, ApiError> {
    ctx.require_role(&[UserRole::HrAdmin, UserRole::SuperAdmin])?;
    ctx.require_company_access(company_id)?;

    let current = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let page = UserRepository::new(&state.db)
        .list_by_company(company_id, query.department, current, limit)
        .await?;

    Ok(Json(ListResponse::from_page(page, current)))
}

/// Company donation report as JSON or CSV
#[utoipa::path(
    get,
    path = "/api/companies/{id}/reports",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Company id"),
        ReportQuery
    ),
    responses(
        (status = 200, description = "Report (JSON envelope or text/csv attachment)"),
        (status = 403, description = "Access to this company is not allowed", body = ApiError)
    ),
    tag = "companies"
)]
pub async fn company_reports(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(company_id): Path<Uuid>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ApiError> {
    ctx.require_role(&[UserRole::HrAdmin, UserRole::SuperAdmin])?;
    ctx.require_company_access(company_id)?;

    let donations = DonationRepository::new(&state.db)
        .list_all(DonationFilter {
            company_id: Some(company_id),
            status: Some(DonationStatus::Completed),
            year: query.year,
            ..Default::default()
        })
        .await?;

    if query.format.as_deref() == Some("csv") {
        let users = UserRepository::new(&state.db)
            .find_by_ids(donations.iter().map(|d| d.user_id))
            .await?;
        let charities = CharityRepository::new(&state.db)
            .find_by_ids(donations.iter().map(|d| d.charity_id))
            .await?;

        let rows = reports::csv_rows(&donations, &users, &charities);
        let csv = reports::donations_csv(&rows);
        return Ok((
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"donations-{company_id}.csv\""),
                ),
            ],
            csv,
        )
            .into_response());
    }

    Ok(Json(ApiResponse::data(CompanyReport {
        summary: DonationTotals::collect(&donations),
        donations,
    }))
    .into_response())
}
