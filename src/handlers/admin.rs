//! # Admin API Handlers
//!
//! Platform-wide views for super admins: cross-tenant dashboard, directory
//! listings, subscription management and system-wide reports.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::RequestContext;
use crate::error::{ApiError, not_found};
use crate::handlers::types::{ApiResponse, ListResponse};
use crate::models::charity;
use crate::models::company::{self, Subscription};
use crate::models::donation::DonationStatus;
use crate::models::user::{self, UserRole};
use crate::reports::{self, DonationTotals, GroupTotals, MonthlyBucket};
use crate::repositories::charity::CharityFilter;
use crate::repositories::company::CompanyFilter;
use crate::repositories::donation::DonationFilter;
use crate::repositories::{
    CharityRepository, CompanyRepository, DonationRepository, UserRepository,
};
use crate::server::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct AdminPageQuery {
    /// 1-based page number
    pub page: Option<u64>,
    /// Page size, capped at 100
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AdminReportQuery {
    /// `json` (default) or `csv`
    pub format: Option<String>,
    pub year: Option<i32>,
}

/// Platform-wide dashboard aggregates
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminDashboard {
    pub companies: u64,
    pub active_users: u64,
    pub active_charities: u64,
    pub totals: DonationTotals,
    pub monthly: Vec<MonthlyBucket>,
    pub top_companies: Vec<GroupTotals>,
    pub top_charities: Vec<GroupTotals>,
}

/// One company row of the admin directory
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminCompanyRow {
    pub company: company::Model,
    pub active_users: u64,
    pub totals: DonationTotals,
}

/// System-wide report payload for the JSON format
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminReport {
    pub summary: DonationTotals,
    pub donations: Vec<crate::models::donation::Model>,
}

fn company_name(companies: &HashMap<Uuid, company::Model>, id: Uuid) -> String {
    companies
        .get(&id)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| "Unknown Company".to_string())
}

/// Cross-tenant dashboard
#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard aggregates", body = ApiResponse<AdminDashboard>),
        (status = 403, description = "Insufficient role", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Json<ApiResponse<AdminDashboard>>, ApiError> {
    ctx.require_role(&[UserRole::SuperAdmin])?;

    let donations: Vec<_> = DonationRepository::new(&state.db)
        .list_all(DonationFilter::default())
        .await?
        .into_iter()
        .filter(|d| !matches!(d.status, DonationStatus::Cancelled | DonationStatus::Failed))
        .collect();

    let companies = CompanyRepository::new(&state.db)
        .find_by_ids(donations.iter().map(|d| d.company_id))
        .await?;
    let charities = CharityRepository::new(&state.db)
        .find_by_ids(donations.iter().map(|d| d.charity_id))
        .await?;

    let top_companies = reports::top_groups(
        &donations,
        |d| d.company_id,
        |id| company_name(&companies, id),
        10,
    );
    let top_charities = reports::top_groups(
        &donations,
        |d| d.charity_id,
        |id| {
            charities
                .get(&id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| "Unknown Charity".to_string())
        },
        10,
    );

    Ok(Json(ApiResponse::data(AdminDashboard {
        companies: CompanyRepository::new(&state.db).count().await?,
        active_users: UserRepository::new(&state.db).count_active().await?,
        active_charities: CharityRepository::new(&state.db).count_active().await?,
        totals: DonationTotals::collect(&donations),
        monthly: reports::monthly_breakdown(&donations),
        top_companies,
        top_charities,
    })))
}

/// Company directory with per-tenant activity
#[utoipa::path(
    get,
    path = "/api/admin/companies",
    security(("bearer_auth" = [])),
    params(AdminPageQuery),
    responses(
        (status = 200, description = "Companies with activity", body = ApiResponse<Vec<AdminCompanyRow>>),
        (status = 403, description = "Insufficient role", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn list_companies(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<AdminPageQuery>,
) -> Result<Json<ApiResponse<Vec<AdminCompanyRow>>>, ApiError> {
    ctx.require_role(&[UserRole::SuperAdmin])?;

    let current = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let page = CompanyRepository::new(&state.db)
        .list(CompanyFilter::default(), current, limit)
        .await?;

    let users = UserRepository::new(&state.db);
    let donations = DonationRepository::new(&state.db);

    let mut rows = Vec::with_capacity(page.items.len());
    for company in page.items {
        let active_users = users.count_active_by_company(company.id).await?;
        let company_donations: Vec<_> = donations
            .list_all(DonationFilter {
                company_id: Some(company.id),
                ..Default::default()
            })
            .await?
            .into_iter()
            .filter(|d| !matches!(d.status, DonationStatus::Cancelled | DonationStatus::Failed))
            .collect();

        rows.push(AdminCompanyRow {
            company,
            active_users,
            totals: DonationTotals::collect(&company_donations),
        });
    }

    Ok(Json(ApiResponse::data(rows)))
}

/// Cross-tenant user listing
#[utoipa::path(
    get,
    path = "/api/admin/users",
    security(("bearer_auth" = [])),
    params(AdminPageQuery),
    responses(
        (status = 200, description = "Users", body = ListResponse<user::Model>),
        (status = 403, description = "Insufficient role", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn list_users(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<AdminPageQuery>,
) -> Result<Json<ListResponse<user::Model>>, ApiError> {
    ctx.require_role(&[UserRole::SuperAdmin])?;

    let current = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let page = UserRepository::new(&state.db).list(current, limit).await?;

    Ok(Json(ListResponse::from_page(page, current)))
}

/// Charity directory including inactive entries
#[utoipa::path(
    get,
    path = "/api/admin/charities",
    security(("bearer_auth" = [])),
    params(AdminPageQuery),
    responses(
        (status = 200, description = "Charities", body = ListResponse<charity::Model>),
        (status = 403, description = "Insufficient role", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn list_charities(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<AdminPageQuery>,
) -> Result<Json<ListResponse<charity::Model>>, ApiError> {
    ctx.require_role(&[UserRole::SuperAdmin])?;

    let current = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let page = CharityRepository::new(&state.db)
        .list(
            CharityFilter {
                include_inactive: true,
                ..Default::default()
            },
            current,
            limit,
        )
        .await?;

    Ok(Json(ListResponse::from_page(page, current)))
}

/// Replace a company's subscription
#[utoipa::path(
    put,
    path = "/api/admin/companies/{id}/subscription",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Company id")),
    request_body = Subscription,
    responses(
        (status = 200, description = "Subscription updated", body = ApiResponse<company::Model>),
        (status = 403, description = "Insufficient role", body = ApiError),
        (status = 404, description = "Company not found", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn update_subscription(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(company_id): Path<Uuid>,
    Json(subscription): Json<Subscription>,
) -> Result<Json<ApiResponse<company::Model>>, ApiError> {
    ctx.require_role(&[UserRole::SuperAdmin])?;

    let repo = CompanyRepository::new(&state.db);
    let company = repo
        .find_by_id(company_id)
        .await?
        .ok_or_else(|| not_found("Company not found"))?;

    let updated = repo.set_subscription(company, subscription).await?;
    Ok(Json(ApiResponse::with_message(
        updated,
        "Subscription updated",
    )))
}

/// System-wide completed-donation report as JSON or CSV
#[utoipa::path(
    get,
    path = "/api/admin/reports",
    security(("bearer_auth" = [])),
    params(AdminReportQuery),
    responses(
        (status = 200, description = "Report (JSON envelope or text/csv attachment)"),
        (status = 403, description = "Insufficient role", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn reports(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<AdminReportQuery>,
) -> Result<Response, ApiError> {
    ctx.require_role(&[UserRole::SuperAdmin])?;

    let donations = DonationRepository::new(&state.db)
        .list_all(DonationFilter {
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
                    "attachment; filename=\"donations-platform.csv\"".to_string(),
                ),
            ],
            csv,
        )
            .into_response());
    }

    Ok(Json(ApiResponse::data(AdminReport {
        summary: DonationTotals::collect(&donations),
        donations,
    }))
    .into_response())
}
