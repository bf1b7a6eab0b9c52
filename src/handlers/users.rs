//! # Users API Handlers
//!
//! Tenant-scoped user management, preference overlays, and the anonymized
//! giving leaderboard.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{RequestContext, hash_password};
use crate::error::{ApiError, forbidden, not_found, validation_error};
use crate::handlers::types::{ApiResponse, ListResponse, PageQuery, Pagination};
use crate::models::user::{self, UserRole};
use crate::reports::DonationTotals;
use crate::repositories::donation::DonationFilter;
use crate::repositories::user::{CreateUserData, UpdateProfileData};
use crate::repositories::{DonationRepository, UserRepository};
use crate::server::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListUsersQuery {
    /// Tenant to list; super admin only, defaults to the caller's company
    pub company_id: Option<Uuid>,
    pub department: Option<String>,
    /// 1-based page number
    pub page: Option<u64>,
    /// Page size, capped at 100
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<UserRole>,
    pub employee_id: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub role: Option<UserRole>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePreferencesRequest {
    pub notifications: Option<user::NotificationPreferences>,
    pub privacy: Option<user::PrivacyPreferences>,
}

/// A user's paginated donations plus running totals
#[derive(Debug, Serialize, ToSchema)]
pub struct UserDonationsData {
    pub donations: Vec<crate::models::donation::Model>,
    pub summary: DonationTotals,
    pub pagination: Pagination,
}

/// One leaderboard row; the display name honors the privacy opt-ins
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    /// 1-based position after filtering and sorting
    pub rank: usize,
    pub name: String,
    pub total_donated: f64,
    pub total_points: i64,
    pub level: i32,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct LeaderboardQuery {
    /// Maximum entries to return
    pub limit: Option<usize>,
}

/// List users of a tenant (HR/super admin)
#[utoipa::path(
    get,
    path = "/api/users",
    security(("bearer_auth" = [])),
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Users for the tenant", body = ListResponse<user::Model>),
        (status = 403, description = "Insufficient role", body = ApiError)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<ListResponse<user::Model>>, ApiError> {
    ctx.require_role(&[UserRole::HrAdmin, UserRole::SuperAdmin])?;

    let company_id = match query.company_id {
        Some(id) if ctx.is_super_admin() => id,
        Some(id) if id != ctx.company.id => {
            return Err(forbidden(Some("Access to this company is not allowed")));
        }
        _ => ctx.company.id,
    };

    let current = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let page = UserRepository::new(&state.db)
        .list_by_company(company_id, query.department, current, limit)
        .await?;

    Ok(Json(ListResponse::from_page(page, current)))
}

/// Company giving leaderboard for the caller's tenant
#[utoipa::path(
    get,
    path = "/api/users/leaderboard",
    security(("bearer_auth" = [])),
    params(LeaderboardQuery),
    responses(
        (status = 200, description = "Ranked opt-in donors", body = ApiResponse<Vec<LeaderboardEntry>>)
    ),
    tag = "users"
)]
pub async fn leaderboard(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<ApiResponse<Vec<LeaderboardEntry>>>, ApiError> {
    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    let users = UserRepository::new(&state.db)
        .leaderboard(ctx.company.id, limit)
        .await?;

    let entries = users
        .into_iter()
        .enumerate()
        .map(|(index, u)| LeaderboardEntry {
            rank: index + 1,
            name: if u.preferences.privacy.share_donation_history {
                u.full_name()
            } else {
                "Anonymous".to_string()
            },
            total_donated: u.gamification.total_donated,
            total_points: u.gamification.total_points,
            level: u.gamification.level,
        })
        .collect();

    Ok(Json(ApiResponse::data(entries)))
}

/// Fetch one user (self, tenant HR, or super admin)
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = ApiResponse<user::Model>),
        (status = 403, description = "Not allowed to view this user", body = ApiError),
        (status = 404, description = "User not found", body = ApiError)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiResponse<user::Model>>, ApiError> {
    let target = UserRepository::new(&state.db)
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| not_found("User not found"))?;
    ctx.require_user_access(&target)?;

    Ok(Json(ApiResponse::data(target)))
}

/// Create an employee in the caller's tenant (HR/super admin)
#[utoipa::path(
    post,
    path = "/api/users",
    security(("bearer_auth" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<user::Model>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Insufficient role", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError)
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<user::Model>>), ApiError> {
    ctx.require_role(&[UserRole::HrAdmin, UserRole::SuperAdmin])?;

    let role = request.role.unwrap_or(UserRole::Employee);
    if role == UserRole::SuperAdmin && !ctx.is_super_admin() {
        return Err(forbidden(Some("Only super admins can grant the super admin role")));
    }
    if request.password.len() < 8 {
        return Err(validation_error(
            "User validation failed",
            json!({"password": "Password must be at least 8 characters"}),
        ));
    }

    let password_hash = hash_password(&state.config, &request.password)?;
    let created = UserRepository::new(&state.db)
        .create(CreateUserData {
            email: request.email.trim().to_lowercase(),
            password_hash,
            first_name: request.first_name,
            last_name: request.last_name,
            role,
            company_id: ctx.company.id,
            employee_id: request.employee_id,
            department: request.department,
            position: request.position,
            phone: request.phone,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(created, "User created")),
    ))
}

/// Update a user; role changes are restricted to admins
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<user::Model>),
        (status = 403, description = "Not allowed to modify this user", body = ApiError),
        (status = 404, description = "User not found", body = ApiError)
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<user::Model>>, ApiError> {
    let repo = UserRepository::new(&state.db);
    let target = repo
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| not_found("User not found"))?;
    ctx.require_user_access(&target)?;

    let mut target = repo
        .update_profile(
            target,
            UpdateProfileData {
                first_name: request.first_name,
                last_name: request.last_name,
                phone: request.phone,
                department: request.department,
                position: request.position,
                notifications: None,
                privacy: None,
            },
        )
        .await?;

    if let Some(role) = request.role {
        ctx.require_role(&[UserRole::HrAdmin, UserRole::SuperAdmin])?;
        if role == UserRole::SuperAdmin && !ctx.is_super_admin() {
            return Err(forbidden(Some("Only super admins can grant the super admin role")));
        }
        if role != target.role {
            target = repo.set_role(target, role).await?;
        }
    }

    Ok(Json(ApiResponse::with_message(target, "User updated")))
}

/// Soft-delete (deactivate) a user
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User deactivated", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Not allowed to delete this user", body = ApiError),
        (status = 404, description = "User not found", body = ApiError)
    ),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    ctx.require_role(&[UserRole::HrAdmin, UserRole::SuperAdmin])?;

    let repo = UserRepository::new(&state.db);
    let target = repo
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| not_found("User not found"))?;
    ctx.require_user_access(&target)?;

    if target.role == UserRole::SuperAdmin {
        return Err(forbidden(Some("Super admin accounts cannot be deleted")));
    }

    repo.set_active(target, false).await?;
    Ok(Json(ApiResponse::message("User deactivated")))
}

/// A user's donations with a running summary
#[utoipa::path(
    get,
    path = "/api/users/{id}/donations",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "User id"),
        PageQuery
    ),
    responses(
        (status = 200, description = "Donations and totals", body = ApiResponse<UserDonationsData>),
        (status = 403, description = "Not allowed to view this user", body = ApiError),
        (status = 404, description = "User not found", body = ApiError)
    ),
    tag = "users"
)]
pub async fn user_donations(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(user_id): Path<Uuid>,
    Query(page_query): Query<PageQuery>,
) -> Result<Json<ApiResponse<UserDonationsData>>, ApiError> {
    let target = UserRepository::new(&state.db)
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| not_found("User not found"))?;
    ctx.require_user_access(&target)?;

    let repo = DonationRepository::new(&state.db);
    let filter = DonationFilter {
        user_id: Some(target.id),
        ..Default::default()
    };
    let all = repo.list_all(filter.clone()).await?;
    let page = repo
        .list(filter, page_query.page(), page_query.limit())
        .await?;

    Ok(Json(ApiResponse::data(UserDonationsData {
        summary: DonationTotals::collect(&all),
        pagination: Pagination {
            current: page_query.page(),
            pages: page.pages,
            total: page.total,
        },
        donations: page.items,
    })))
}

/// Overlay a user's notification/privacy preferences
#[utoipa::path(
    put,
    path = "/api/users/{id}/preferences",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdatePreferencesRequest,
    responses(
        (status = 200, description = "Preferences updated", body = ApiResponse<user::Model>),
        (status = 403, description = "Not allowed to modify this user", body = ApiError),
        (status = 404, description = "User not found", body = ApiError)
    ),
    tag = "users"
)]
pub async fn update_preferences(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UpdatePreferencesRequest>,
) -> Result<Json<ApiResponse<user::Model>>, ApiError> {
    let repo = UserRepository::new(&state.db);
    let target = repo
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| not_found("User not found"))?;
    ctx.require_user_access(&target)?;

    let updated = repo
        .update_profile(
            target,
            UpdateProfileData {
                notifications: request.notifications,
                privacy: request.privacy,
                ..Default::default()
            },
        )
        .await?;

    Ok(Json(ApiResponse::with_message(updated, "Preferences updated")))
}
