//! # Auth API Handlers
//!
//! Registration, login, and the current-user profile endpoints.

use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::auth::{RequestContext, hash_password, issue_token, verify_password};
use crate::error::{ApiError, unauthorized, validation_error};
use crate::handlers::types::ApiResponse;
use crate::models::{company, user};
use crate::repositories::user::{CreateUserData, UpdateProfileData};
use crate::repositories::{CompanyRepository, UserRepository};
use crate::server::AppState;

/// Request payload for user registration
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "ada@acme.example")]
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    /// Company email domain used to place the user in a tenant
    #[schema(example = "acme.example")]
    pub company_domain: String,
    pub employee_id: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
}

/// Request payload for login. `username` is accepted as an alias for email.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(alias = "username")]
    pub email: String,
    pub password: String,
}

/// Token plus the authenticated user
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthData {
    pub token: String,
    pub user: user::Model,
}

/// Current user with its company
#[derive(Debug, Serialize, ToSchema)]
pub struct MeData {
    pub user: user::Model,
    pub company: company::Model,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub notifications: Option<user::NotificationPreferences>,
    pub privacy: Option<user::PrivacyPreferences>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

fn validate_registration(request: &RegisterRequest) -> Result<(), ApiError> {
    let mut errors = serde_json::Map::new();

    if !request.email.contains('@') {
        errors.insert("email".into(), json!("A valid email address is required"));
    }
    if request.password.len() < 8 {
        errors.insert(
            "password".into(),
            json!("Password must be at least 8 characters"),
        );
    }
    if request.first_name.trim().is_empty() {
        errors.insert("first_name".into(), json!("First name is required"));
    }
    if request.last_name.trim().is_empty() {
        errors.insert("last_name".into(), json!("Last name is required"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(validation_error(
            "Registration validation failed",
            serde_json::Value::Object(errors),
        ))
    }
}

/// Register a new employee under the company matching the email domain
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = ApiResponse<AuthData>),
        (status = 400, description = "Validation failed or unknown company domain", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthData>>), ApiError> {
    validate_registration(&request)?;

    let domain = request.company_domain.trim().to_lowercase();
    let company = CompanyRepository::new(&state.db)
        .find_by_domain(&domain)
        .await?
        .filter(|c| c.is_active)
        .ok_or_else(|| {
            validation_error(
                "Unknown company domain",
                json!({"company_domain": "No active company is registered for this domain"}),
            )
        })?;

    let password_hash = hash_password(&state.config, &request.password)?;
    let user = UserRepository::new(&state.db)
        .create(CreateUserData {
            email: request.email.trim().to_lowercase(),
            password_hash,
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            role: user::UserRole::Employee,
            company_id: company.id,
            employee_id: request.employee_id,
            department: request.department,
            position: request.position,
            phone: request.phone,
        })
        .await?;

    let token = issue_token(&state.config, &user)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            AuthData { token, user },
            "Registration successful",
        )),
    ))
}

/// Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<AuthData>),
        (status = 401, description = "Invalid credentials or deactivated company", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthData>>, ApiError> {
    let repo = UserRepository::new(&state.db);
    let email = request.email.trim().to_lowercase();

    // The same 401 covers unknown emails, wrong passwords and deactivated
    // accounts, so the response never reveals which one it was.
    let user = repo
        .find_by_email(&email)
        .await?
        .ok_or_else(|| unauthorized(Some("Invalid credentials")))?;

    if !verify_password(&request.password, &user.password_hash)? {
        return Err(unauthorized(Some("Invalid credentials")));
    }
    if !user.is_active {
        return Err(unauthorized(Some("Invalid credentials")));
    }

    let company = CompanyRepository::new(&state.db)
        .find_by_id(user.company_id)
        .await?;
    if !company.is_some_and(|c| c.is_active) {
        return Err(unauthorized(Some("Company account is deactivated")));
    }

    let user = repo.record_login(user).await?;
    let token = issue_token(&state.config, &user)?;

    Ok(Json(ApiResponse::data(AuthData { token, user })))
}

/// Current authenticated user and company
#[utoipa::path(
    get,
    path = "/api/auth/me",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = ApiResponse<MeData>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn me(ctx: RequestContext) -> Json<ApiResponse<MeData>> {
    Json(ApiResponse::data(MeData {
        user: ctx.user,
        company: ctx.company,
    }))
}

/// Update the caller's profile (field-by-field overlay)
#[utoipa::path(
    put,
    path = "/api/auth/profile",
    security(("bearer_auth" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<user::Model>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<user::Model>>, ApiError> {
    let updated = UserRepository::new(&state.db)
        .update_profile(
            ctx.user,
            UpdateProfileData {
                first_name: request.first_name,
                last_name: request.last_name,
                phone: request.phone,
                department: request.department,
                position: request.position,
                notifications: request.notifications,
                privacy: request.privacy,
            },
        )
        .await?;

    Ok(Json(ApiResponse::with_message(updated, "Profile updated")))
}

/// Change the caller's password
#[utoipa::path(
    put,
    path = "/api/auth/password",
    security(("bearer_auth" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "New password too weak", body = ApiError),
        (status = 401, description = "Current password incorrect", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn change_password(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if !verify_password(&request.current_password, &ctx.user.password_hash)? {
        return Err(unauthorized(Some("Current password is incorrect")));
    }
    if request.new_password.len() < 8 {
        return Err(validation_error(
            "Password validation failed",
            json!({"new_password": "Password must be at least 8 characters"}),
        ));
    }

    let password_hash = hash_password(&state.config, &request.new_password)?;
    UserRepository::new(&state.db)
        .set_password_hash(ctx.user, password_hash)
        .await?;

    Ok(Json(ApiResponse::message("Password changed")))
}

/// Stateless logout acknowledgement; the client discards its token
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Logged out", body = ApiResponse<serde_json::Value>)
    ),
    tag = "auth"
)]
pub async fn logout(_ctx: RequestContext) -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::message("Logged out"))
}
