//! # Charities API Handlers
//!
//! Public catalog endpoints (browse, search, featured, per-charity stats)
//! and the super-admin mutations that maintain the directory.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::RequestContext;
use crate::error::{ApiError, not_found};
use crate::handlers::types::{ApiResponse, ListResponse};
use crate::models::charity::{self, CharityCategory, DonationInfo, Impact};
use crate::models::donation::DonationStatus;
use crate::models::user::UserRole;
use crate::models::{Address, ContactInfo};
use crate::reports::{self, DonationTotals, MonthlyBucket};
use crate::repositories::charity::{
    CharityFilter, CharitySort, CreateCharityData, UpdateCharityData,
};
use crate::repositories::donation::DonationFilter;
use crate::repositories::{CharityRepository, DonationRepository};
use crate::server::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListCharitiesQuery {
    pub category: Option<CharityCategory>,
    /// Case-insensitive match against name and description
    pub search: Option<String>,
    pub featured: Option<bool>,
    /// `name` (default), `total_donations` or `created`
    pub sort: Option<CharitySort>,
    /// 1-based page number
    pub page: Option<u64>,
    /// Page size, capped at 100
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchQuery {
    pub q: String,
    /// 1-based page number
    pub page: Option<u64>,
    /// Page size, capped at 100
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct FeaturedQuery {
    /// Number of charities to return, capped at 50
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CategoryPageQuery {
    /// 1-based page number
    pub page: Option<u64>,
    /// Page size, capped at 100
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCharityRequest {
    pub name: String,
    pub ein: String,
    pub description: String,
    pub category: CharityCategory,
    pub subcategory: Option<String>,
    pub website: Option<String>,
    pub address: Option<Address>,
    pub contact_info: Option<ContactInfo>,
    pub impact: Option<Impact>,
    pub donation_info: Option<DonationInfo>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCharityRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<CharityCategory>,
    pub subcategory: Option<String>,
    pub website: Option<String>,
    pub address: Option<Address>,
    pub contact_info: Option<ContactInfo>,
    pub impact: Option<Impact>,
    pub donation_info: Option<DonationInfo>,
    pub is_featured: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyCharityRequest {
    pub rating: Option<f64>,
}

/// One entry of the category taxonomy
#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryInfo {
    pub value: CharityCategory,
    pub label: &'static str,
}

/// Donation statistics for a single charity
#[derive(Debug, Serialize, ToSchema)]
pub struct CharityStats {
    pub charity_id: Uuid,
    pub totals: DonationTotals,
    pub monthly: Vec<MonthlyBucket>,
}

fn category_label(category: CharityCategory) -> &'static str {
    match category {
        CharityCategory::Environment => "Environment",
        CharityCategory::Education => "Education",
        CharityCategory::Health => "Health",
        CharityCategory::Animals => "Animals",
        CharityCategory::HumanServices => "Human Services",
        CharityCategory::International => "International",
        CharityCategory::ArtsCulture => "Arts & Culture",
        CharityCategory::Religion => "Religion",
        CharityCategory::Other => "Other",
    }
}

async fn load_charity(state: &AppState, charity_id: Uuid) -> Result<charity::Model, ApiError> {
    CharityRepository::new(&state.db)
        .find_by_id(charity_id)
        .await?
        .ok_or_else(|| not_found("Charity not found"))
}

fn page_params(page: Option<u64>, limit: Option<u64>) -> (u64, u64) {
    (page.unwrap_or(1).max(1), limit.unwrap_or(20).clamp(1, 100))
}

/// Browse the charity catalog
#[utoipa::path(
    get,
    path = "/api/charities",
    params(ListCharitiesQuery),
    responses(
        (status = 200, description = "Charities", body = ListResponse<charity::Model>)
    ),
    tag = "charities"
)]
pub async fn list_charities(
    State(state): State<AppState>,
    Query(query): Query<ListCharitiesQuery>,
) -> Result<Json<ListResponse<charity::Model>>, ApiError> {
    let (current, limit) = page_params(query.page, query.limit);
    let page = CharityRepository::new(&state.db)
        .list(
            CharityFilter {
                category: query.category,
                search: query.search,
                featured_only: query.featured.unwrap_or(false),
                include_inactive: false,
                sort: query.sort.unwrap_or_default(),
            },
            current,
            limit,
        )
        .await?;

    Ok(Json(ListResponse::from_page(page, current)))
}

/// Featured charities, highest lifetime donations first
#[utoipa::path(
    get,
    path = "/api/charities/featured",
    params(FeaturedQuery),
    responses(
        (status = 200, description = "Featured charities", body = ApiResponse<Vec<charity::Model>>)
    ),
    tag = "charities"
)]
pub async fn featured_charities(
    State(state): State<AppState>,
    Query(query): Query<FeaturedQuery>,
) -> Result<Json<ApiResponse<Vec<charity::Model>>>, ApiError> {
    let limit = query.limit.unwrap_or(6).clamp(1, 50);
    let charities = CharityRepository::new(&state.db).featured(limit).await?;
    Ok(Json(ApiResponse::data(charities)))
}

/// The category taxonomy
#[utoipa::path(
    get,
    path = "/api/charities/categories",
    responses(
        (status = 200, description = "Categories", body = ApiResponse<Vec<CategoryInfo>>)
    ),
    tag = "charities"
)]
pub async fn list_categories() -> Json<ApiResponse<Vec<CategoryInfo>>> {
    let categories = CharityCategory::ALL
        .into_iter()
        .map(|value| CategoryInfo {
            value,
            label: category_label(value),
        })
        .collect();
    Json(ApiResponse::data(categories))
}

/// Full-text search over names and descriptions
#[utoipa::path(
    get,
    path = "/api/charities/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching charities", body = ListResponse<charity::Model>)
    ),
    tag = "charities"
)]
pub async fn search_charities(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ListResponse<charity::Model>>, ApiError> {
    let (current, limit) = page_params(query.page, query.limit);
    let page = CharityRepository::new(&state.db)
        .list(
            CharityFilter {
                search: Some(query.q),
                ..Default::default()
            },
            current,
            limit,
        )
        .await?;

    Ok(Json(ListResponse::from_page(page, current)))
}

/// Charities in one category
#[utoipa::path(
    get,
    path = "/api/charities/category/{category}",
    params(
        ("category" = CharityCategory, Path, description = "Category slug"),
        CategoryPageQuery
    ),
    responses(
        (status = 200, description = "Charities in the category", body = ListResponse<charity::Model>)
    ),
    tag = "charities"
)]
pub async fn charities_by_category(
    State(state): State<AppState>,
    Path(category): Path<CharityCategory>,
    Query(query): Query<CategoryPageQuery>,
) -> Result<Json<ListResponse<charity::Model>>, ApiError> {
    let (current, limit) = page_params(query.page, query.limit);
    let page = CharityRepository::new(&state.db)
        .list(
            CharityFilter {
                category: Some(category),
                ..Default::default()
            },
            current,
            limit,
        )
        .await?;

    Ok(Json(ListResponse::from_page(page, current)))
}

/// Fetch one charity
#[utoipa::path(
    get,
    path = "/api/charities/{id}",
    params(("id" = Uuid, Path, description = "Charity id")),
    responses(
        (status = 200, description = "Charity", body = ApiResponse<charity::Model>),
        (status = 404, description = "Charity not found", body = ApiError)
    ),
    tag = "charities"
)]
pub async fn get_charity(
    State(state): State<AppState>,
    Path(charity_id): Path<Uuid>,
) -> Result<Json<ApiResponse<charity::Model>>, ApiError> {
    let charity = load_charity(&state, charity_id).await?;
    Ok(Json(ApiResponse::data(charity)))
}

/// Completed-donation statistics for one charity
#[utoipa::path(
    get,
    path = "/api/charities/{id}/stats",
    params(("id" = Uuid, Path, description = "Charity id")),
    responses(
        (status = 200, description = "Statistics", body = ApiResponse<CharityStats>),
        (status = 404, description = "Charity not found", body = ApiError)
    ),
    tag = "charities"
)]
pub async fn charity_stats(
    State(state): State<AppState>,
    Path(charity_id): Path<Uuid>,
) -> Result<Json<ApiResponse<CharityStats>>, ApiError> {
    let charity = load_charity(&state, charity_id).await?;

    let donations = DonationRepository::new(&state.db)
        .list_all(DonationFilter {
            charity_id: Some(charity.id),
            status: Some(DonationStatus::Completed),
            ..Default::default()
        })
        .await?;

    Ok(Json(ApiResponse::data(CharityStats {
        charity_id: charity.id,
        totals: DonationTotals::collect(&donations),
        monthly: reports::monthly_breakdown(&donations),
    })))
}

/// Add a charity to the catalog (super admin)
#[utoipa::path(
    post,
    path = "/api/charities",
    security(("bearer_auth" = [])),
    request_body = CreateCharityRequest,
    responses(
        (status = 201, description = "Charity created", body = ApiResponse<charity::Model>),
        (status = 403, description = "Insufficient role", body = ApiError),
        (status = 409, description = "EIN already registered", body = ApiError)
    ),
    tag = "charities"
)]
pub async fn create_charity(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(request): Json<CreateCharityRequest>,
) -> Result<(StatusCode, Json<ApiResponse<charity::Model>>), ApiError> {
    ctx.require_role(&[UserRole::SuperAdmin])?;

    let charity = CharityRepository::new(&state.db)
        .create(CreateCharityData {
            name: request.name,
            ein: request.ein,
            description: request.description,
            category: request.category,
            subcategory: request.subcategory,
            website: request.website,
            address: request.address.unwrap_or_default(),
            contact_info: request.contact_info,
            impact: request.impact,
            donation_info: request.donation_info,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(charity, "Charity created")),
    ))
}

/// Update a charity (super admin, field-by-field overlay)
#[utoipa::path(
    put,
    path = "/api/charities/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Charity id")),
    request_body = UpdateCharityRequest,
    responses(
        (status = 200, description = "Charity updated", body = ApiResponse<charity::Model>),
        (status = 403, description = "Insufficient role", body = ApiError),
        (status = 404, description = "Charity not found", body = ApiError)
    ),
    tag = "charities"
)]
pub async fn update_charity(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(charity_id): Path<Uuid>,
    Json(request): Json<UpdateCharityRequest>,
) -> Result<Json<ApiResponse<charity::Model>>, ApiError> {
    ctx.require_role(&[UserRole::SuperAdmin])?;
    let charity = load_charity(&state, charity_id).await?;

    let updated = CharityRepository::new(&state.db)
        .update(
            charity,
            UpdateCharityData {
                name: request.name,
                description: request.description,
                category: request.category,
                subcategory: request.subcategory,
                website: request.website,
                address: request.address,
                contact_info: request.contact_info,
                impact: request.impact,
                donation_info: request.donation_info,
                is_featured: request.is_featured,
                is_active: request.is_active,
            },
        )
        .await?;

    Ok(Json(ApiResponse::with_message(updated, "Charity updated")))
}

/// Mark a charity as vetted (super admin)
#[utoipa::path(
    put,
    path = "/api/charities/{id}/verify",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Charity id")),
    request_body = VerifyCharityRequest,
    responses(
        (status = 200, description = "Charity verified", body = ApiResponse<charity::Model>),
        (status = 403, description = "Insufficient role", body = ApiError),
        (status = 404, description = "Charity not found", body = ApiError)
    ),
    tag = "charities"
)]
pub async fn verify_charity(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(charity_id): Path<Uuid>,
    Json(request): Json<VerifyCharityRequest>,
) -> Result<Json<ApiResponse<charity::Model>>, ApiError> {
    ctx.require_role(&[UserRole::SuperAdmin])?;
    let charity = load_charity(&state, charity_id).await?;

    let updated = CharityRepository::new(&state.db)
        .verify(charity, ctx.user.email.clone(), request.rating)
        .await?;

    Ok(Json(ApiResponse::with_message(updated, "Charity verified")))
}
