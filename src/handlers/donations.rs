//! # Donations API Handlers
//!
//! Donation creation, listing, lifecycle transitions and the per-user and
//! per-company summary endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::RequestContext;
use crate::error::{ApiError, forbidden, not_found};
use crate::handlers::types::{ApiResponse, ListResponse};
use crate::models::donation::{
    self, DonationStatus, DonationType, PaymentMethod, PayrollInfo,
};
use crate::models::user::UserRole;
use crate::reports::{self, DonationTotals, GroupTotals, MonthlyBucket};
use crate::repositories::donation::{CreateDonationData, DonationFilter};
use crate::repositories::{CharityRepository, DonationRepository, UserRepository};
use crate::server::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListDonationsQuery {
    /// Super admins and HR admins may narrow to one donor
    pub user_id: Option<Uuid>,
    /// Super admins may narrow to one company
    pub company_id: Option<Uuid>,
    pub charity_id: Option<Uuid>,
    pub status: Option<DonationStatus>,
    #[serde(rename = "type")]
    pub donation_type: Option<DonationType>,
    pub year: Option<i32>,
    /// 1-based page number
    pub page: Option<u64>,
    /// Page size, capped at 100
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDonationRequest {
    pub charity_id: Uuid,
    pub amount: f64,
    #[serde(default, rename = "type")]
    pub donation_type: Option<DonationType>,
    pub frequency: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub payroll_info: Option<PayrollInfo>,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
    pub tax_deductible: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: DonationStatus,
    pub failure_reason: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SummaryQuery {
    /// Calendar year; defaults to the current year
    pub year: Option<i32>,
    /// Super admins and HR admins may summarize another user or company
    pub user_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
}

/// Per-user or per-company donation summary
#[derive(Debug, Serialize, ToSchema)]
pub struct DonationSummary {
    pub year: i32,
    pub totals: DonationTotals,
    pub monthly: Vec<MonthlyBucket>,
    pub top_charities: Vec<GroupTotals>,
}

/// The caller may read a donation if they made it, administer its tenant,
/// or hold the super-admin role.
fn require_donation_access(ctx: &RequestContext, donation: &donation::Model) -> Result<(), ApiError> {
    let allowed = donation.user_id == ctx.user.id
        || (ctx.user.role != UserRole::Employee && ctx.can_access_company(donation.company_id));
    if allowed {
        Ok(())
    } else {
        Err(forbidden(Some("Access to this donation is not allowed")))
    }
}

async fn load_donation(state: &AppState, donation_id: Uuid) -> Result<donation::Model, ApiError> {
    DonationRepository::new(&state.db)
        .find_by_id(donation_id)
        .await?
        .ok_or_else(|| not_found("Donation not found"))
}

/// Build a summary over non-cancelled, non-failed donations.
async fn summarize(
    state: &AppState,
    filter: DonationFilter,
    year: i32,
) -> Result<DonationSummary, ApiError> {
    let donations: Vec<_> = DonationRepository::new(&state.db)
        .list_all(DonationFilter {
            year: Some(year),
            ..filter
        })
        .await?
        .into_iter()
        .filter(|d| !matches!(d.status, DonationStatus::Cancelled | DonationStatus::Failed))
        .collect();

    let charities = CharityRepository::new(&state.db)
        .find_by_ids(donations.iter().map(|d| d.charity_id))
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

    Ok(DonationSummary {
        year,
        totals: DonationTotals::collect(&donations),
        monthly: reports::monthly_breakdown(&donations),
        top_charities,
    })
}

/// List donations visible to the caller
#[utoipa::path(
    get,
    path = "/api/donations",
    security(("bearer_auth" = [])),
    params(ListDonationsQuery),
    responses(
        (status = 200, description = "Donations", body = ListResponse<donation::Model>),
        (status = 403, description = "Filter outside the caller's scope", body = ApiError)
    ),
    tag = "donations"
)]
pub async fn list_donations(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<ListDonationsQuery>,
) -> Result<Json<ListResponse<donation::Model>>, ApiError> {
    // Employees see only their own rows; HR admins their tenant; super
    // admins anything. Filters outside that scope are rejected, not
    // silently narrowed.
    let (user_id, company_id) = match ctx.user.role {
        UserRole::Employee => {
            if query.user_id.is_some_and(|id| id != ctx.user.id) {
                return Err(forbidden(Some("Access to this user is not allowed")));
            }
            (Some(ctx.user.id), None)
        }
        UserRole::HrAdmin => {
            if query
                .company_id
                .is_some_and(|id| id != ctx.user.company_id)
            {
                return Err(forbidden(Some("Access to this company is not allowed")));
            }
            (query.user_id, Some(ctx.user.company_id))
        }
        UserRole::SuperAdmin => (query.user_id, query.company_id),
    };

    let current = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let page = DonationRepository::new(&state.db)
        .list(
            DonationFilter {
                user_id,
                company_id,
                charity_id: query.charity_id,
                status: query.status,
                donation_type: query.donation_type,
                year: query.year,
            },
            current,
            limit,
        )
        .await?;

    Ok(Json(ListResponse::from_page(page, current)))
}

/// Fetch one donation
#[utoipa::path(
    get,
    path = "/api/donations/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Donation id")),
    responses(
        (status = 200, description = "Donation", body = ApiResponse<donation::Model>),
        (status = 403, description = "Access to this donation is not allowed", body = ApiError),
        (status = 404, description = "Donation not found", body = ApiError)
    ),
    tag = "donations"
)]
pub async fn get_donation(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(donation_id): Path<Uuid>,
) -> Result<Json<ApiResponse<donation::Model>>, ApiError> {
    let donation = load_donation(&state, donation_id).await?;
    require_donation_access(&ctx, &donation)?;
    Ok(Json(ApiResponse::data(donation)))
}

/// Make a donation
#[utoipa::path(
    post,
    path = "/api/donations",
    security(("bearer_auth" = [])),
    request_body = CreateDonationRequest,
    responses(
        (status = 201, description = "Donation created", body = ApiResponse<donation::Model>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Charity not found", body = ApiError)
    ),
    tag = "donations"
)]
pub async fn create_donation(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(request): Json<CreateDonationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<donation::Model>>), ApiError> {
    let charity = CharityRepository::new(&state.db)
        .find_by_id(request.charity_id)
        .await?
        .ok_or_else(|| not_found("Charity not found"))?;

    let donation = DonationRepository::new(&state.db)
        .create(
            &ctx.user,
            &charity,
            CreateDonationData {
                charity_id: request.charity_id,
                amount: request.amount,
                donation_type: request.donation_type.unwrap_or(DonationType::OneTime),
                frequency: request.frequency,
                payment_method: request
                    .payment_method
                    .unwrap_or(PaymentMethod::DirectPayment),
                payroll_info: request.payroll_info,
                notes: request.notes,
                is_anonymous: request.is_anonymous,
                tax_deductible: request.tax_deductible.unwrap_or(true),
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(donation, "Donation created")),
    ))
}

/// Transition a donation's status (HR or super admin)
#[utoipa::path(
    put,
    path = "/api/donations/{id}/status",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Donation id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Donation updated", body = ApiResponse<donation::Model>),
        (status = 403, description = "Access to this donation is not allowed", body = ApiError),
        (status = 404, description = "Donation not found", body = ApiError),
        (status = 409, description = "Transition not allowed from the current status", body = ApiError)
    ),
    tag = "donations"
)]
pub async fn update_donation_status(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(donation_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<donation::Model>>, ApiError> {
    ctx.require_role(&[UserRole::HrAdmin, UserRole::SuperAdmin])?;
    let donation = load_donation(&state, donation_id).await?;
    ctx.require_company_access(donation.company_id)?;

    let updated = DonationRepository::new(&state.db)
        .update_status(donation, request.status, request.failure_reason)
        .await?;

    Ok(Json(ApiResponse::with_message(updated, "Donation updated")))
}

/// Cancel a pending or approved donation
#[utoipa::path(
    put,
    path = "/api/donations/{id}/cancel",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Donation id")),
    responses(
        (status = 200, description = "Donation cancelled", body = ApiResponse<donation::Model>),
        (status = 403, description = "Access to this donation is not allowed", body = ApiError),
        (status = 404, description = "Donation not found", body = ApiError),
        (status = 409, description = "Donation is not cancellable", body = ApiError)
    ),
    tag = "donations"
)]
pub async fn cancel_donation(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(donation_id): Path<Uuid>,
) -> Result<Json<ApiResponse<donation::Model>>, ApiError> {
    let donation = load_donation(&state, donation_id).await?;
    require_donation_access(&ctx, &donation)?;

    let cancelled = DonationRepository::new(&state.db).cancel(donation).await?;
    Ok(Json(ApiResponse::with_message(
        cancelled,
        "Donation cancelled",
    )))
}

/// Year summary for one donor
#[utoipa::path(
    get,
    path = "/api/donations/summary/user",
    security(("bearer_auth" = [])),
    params(SummaryQuery),
    responses(
        (status = 200, description = "Summary", body = ApiResponse<DonationSummary>),
        (status = 403, description = "Access to this user is not allowed", body = ApiError)
    ),
    tag = "donations"
)]
pub async fn user_summary(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<ApiResponse<DonationSummary>>, ApiError> {
    let user_id = query.user_id.unwrap_or(ctx.user.id);
    if user_id != ctx.user.id {
        let target = UserRepository::new(&state.db)
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| not_found("User not found"))?;
        ctx.require_user_access(&target)?;
    }

    let year = query.year.unwrap_or_else(|| Utc::now().year());
    let summary = summarize(
        &state,
        DonationFilter {
            user_id: Some(user_id),
            ..Default::default()
        },
        year,
    )
    .await?;

    Ok(Json(ApiResponse::data(summary)))
}

/// Year summary for one company (HR or super admin)
#[utoipa::path(
    get,
    path = "/api/donations/summary/company",
    security(("bearer_auth" = [])),
    params(SummaryQuery),
    responses(
        (status = 200, description = "Summary", body = ApiResponse<DonationSummary>),
        (status = 403, description = "Access to this company is not allowed", body = ApiError)
    ),
    tag = "donations"
)]
pub async fn company_summary(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<ApiResponse<DonationSummary>>, ApiError> {
    ctx.require_role(&[UserRole::HrAdmin, UserRole::SuperAdmin])?;
    let company_id = query.company_id.unwrap_or(ctx.user.company_id);
    ctx.require_company_access(company_id)?;

    let year = query.year.unwrap_or_else(|| Utc::now().year());
    let summary = summarize(
        &state,
        DonationFilter {
            company_id: Some(company_id),
            ..Default::default()
        },
        year,
    )
    .await?;

    Ok(Json(ApiResponse::data(summary)))
}
