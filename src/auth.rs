//! # Authentication and Authorization
//!
//! Bearer-token authentication for protected API endpoints. The middleware
//! verifies the HS256 token, resolves the active user and its active
//! company, and inserts a [`RequestContext`] extension for handlers.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{ApiError, forbidden, unauthorized, unauthorized_with_trace_id};
use crate::models::user::UserRole;
use crate::models::{company, user};
use crate::server::AppState;
use crate::telemetry::TraceContext;

/// JWT claims carried by every bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: Uuid,
    pub role: UserRole,
    /// Expiry as a unix timestamp.
    pub exp: i64,
}

/// Request-scoped identity: the verified user and its company, resolved
/// once per request. Passed explicitly to handlers, never ambient.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: user::Model,
    pub company: company::Model,
}

impl RequestContext {
    pub fn is_super_admin(&self) -> bool {
        self.user.role == UserRole::SuperAdmin
    }

    /// Fail with Forbidden unless the caller's role is in `allowed`.
    pub fn require_role(&self, allowed: &[UserRole]) -> Result<(), ApiError> {
        if allowed.contains(&self.user.role) {
            Ok(())
        } else {
            Err(forbidden(Some("Insufficient role for this operation")))
        }
    }

    /// Super admins see every tenant; everyone else only their own.
    pub fn can_access_company(&self, company_id: Uuid) -> bool {
        self.is_super_admin() || self.user.company_id == company_id
    }

    pub fn require_company_access(&self, company_id: Uuid) -> Result<(), ApiError> {
        if self.can_access_company(company_id) {
            Ok(())
        } else {
            Err(forbidden(Some("Access to this company is not allowed")))
        }
    }

    /// Super admins bypass; HR admins are scoped to their tenant; an
    /// employee may only act on itself.
    pub fn can_access_user(&self, target: &user::Model) -> bool {
        match self.user.role {
            UserRole::SuperAdmin => true,
            UserRole::HrAdmin => target.company_id == self.user.company_id,
            UserRole::Employee => target.id == self.user.id,
        }
    }

    pub fn require_user_access(&self, target: &user::Model) -> Result<(), ApiError> {
        if self.can_access_user(target) {
            Ok(())
        } else {
            Err(forbidden(Some("Access to this user is not allowed")))
        }
    }
}

/// Issue a signed token for `user` with the configured expiry.
pub fn issue_token(config: &AppConfig, user: &user::Model) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user.id,
        role: user.role,
        exp: (Utc::now() + Duration::hours(config.jwt_expiry_hours)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|err| {
        tracing::error!("Failed to sign token: {:?}", err);
        ApiError::from(crate::error::ErrorType::InternalServerError)
    })
}

/// Verify a token's signature and expiry, returning its claims.
pub fn verify_token(config: &AppConfig, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| unauthorized(Some("Invalid or expired token")))
}

/// Hash a password with the configured bcrypt cost.
pub fn hash_password(config: &AppConfig, password: &str) -> Result<String, ApiError> {
    Ok(bcrypt::hash(password, config.bcrypt_cost)?)
}

/// Constant-time password verification against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    Ok(bcrypt::verify(password, hash)?)
}

/// Authentication middleware that validates bearer tokens and resolves the
/// request context. Fails with Unauthorized when the token is malformed or
/// expired, the user no longer exists, or the user or its company is
/// inactive.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let headers = request.headers().clone();

    // Extract trace_id from request context for consistent error responses
    let trace_id = request
        .extensions()
        .get::<TraceContext>()
        .map(|ctx| ctx.trace_id.clone());

    let token = extract_bearer_token_with_trace_id(&headers, trace_id)?;
    let claims = verify_token(&state.config, token)?;

    let user = user::Entity::find_by_id(claims.sub)
        .one(&state.db)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| unauthorized(Some("User account is missing or deactivated")))?;

    let company = company::Entity::find_by_id(user.company_id)
        .one(&state.db)
        .await?
        .filter(|c| c.is_active)
        .ok_or_else(|| unauthorized(Some("Company account is missing or deactivated")))?;

    tracing::debug!(user_id = %user.id, company_id = %company.id, "Authenticated request");

    let mut request = request;
    request
        .extensions_mut()
        .insert(RequestContext { user, company });

    Ok(next.run(request).await)
}

fn extract_bearer_token_with_trace_id(
    headers: &HeaderMap,
    trace_id: Option<String>,
) -> Result<&str, ApiError> {
    let trace_id_clone = trace_id.clone();

    headers
        .get(AUTHORIZATION)
        .ok_or_else(|| {
            if let Some(trace_id_val) = trace_id_clone {
                unauthorized_with_trace_id(Some("Missing Authorization header"), trace_id_val)
            } else {
                unauthorized(Some("Missing Authorization header"))
            }
        })
        .and_then(|value| {
            let trace_id_clone2 = trace_id.clone();
            value.to_str().map_err(|_| {
                if let Some(trace_id_val) = trace_id_clone2 {
                    unauthorized_with_trace_id(Some("Invalid Authorization header"), trace_id_val)
                } else {
                    unauthorized(Some("Invalid Authorization header"))
                }
            })
        })
        .and_then(|header| {
            header.strip_prefix("Bearer ").ok_or_else(|| {
                if let Some(trace_id_val) = trace_id {
                    unauthorized_with_trace_id(
                        Some("Authorization header must use Bearer scheme"),
                        trace_id_val,
                    )
                } else {
                    unauthorized(Some("Authorization header must use Bearer scheme"))
                }
            })
        })
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or_else(|| unauthorized(Some("Authentication required")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::company::{CompanySettings, MatchingProgram, Subscription};
    use crate::models::user::{Gamification, Preferences};
    use crate::models::{Address, ContactInfo};

    fn test_company(id: Uuid) -> company::Model {
        company::Model {
            id,
            name: "Acme Corp".to_string(),
            domain: "acme.example".to_string(),
            ein: "12-3456789".to_string(),
            address: Address::default(),
            contact_info: ContactInfo::default(),
            subscription: Subscription::default(),
            matching_program: MatchingProgram::default(),
            settings: CompanySettings::default(),
            is_active: true,
            created_at: Utc::now().into(),
        }
    }

    fn test_user(role: UserRole, company_id: Uuid) -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            email: format!("{}@acme.example", Uuid::new_v4()),
            password_hash: String::new(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            role,
            company_id,
            employee_id: None,
            department: None,
            position: None,
            phone: None,
            preferences: Preferences::default(),
            gamification: Gamification::default(),
            is_active: true,
            is_verified: true,
            last_login: None,
            created_at: Utc::now().into(),
        }
    }

    fn ctx(role: UserRole) -> RequestContext {
        let company_id = Uuid::new_v4();
        RequestContext {
            user: test_user(role, company_id),
            company: test_company(company_id),
        }
    }

    #[test]
    fn token_round_trip_preserves_claims() {
        let config = AppConfig::default();
        let user = test_user(UserRole::HrAdmin, Uuid::new_v4());

        let token = issue_token(&config, &user).unwrap();
        let claims = verify_token(&config, &token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, UserRole::HrAdmin);
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let config = AppConfig::default();
        let user = test_user(UserRole::Employee, Uuid::new_v4());

        let token = issue_token(&config, &user).unwrap();
        let other = AppConfig {
            jwt_secret: "a-completely-different-secret".to_string(),
            ..Default::default()
        };

        assert!(verify_token(&other, &token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = AppConfig::default();
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: UserRole::Employee,
            exp: (Utc::now() - Duration::hours(2)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();

        assert!(verify_token(&config, &token).is_err());
    }

    #[test]
    fn role_guard_enforces_allowed_set() {
        let employee = ctx(UserRole::Employee);
        assert!(employee.require_role(&[UserRole::Employee]).is_ok());
        assert!(
            employee
                .require_role(&[UserRole::HrAdmin, UserRole::SuperAdmin])
                .is_err()
        );

        let admin = ctx(UserRole::SuperAdmin);
        assert!(admin.require_role(&[UserRole::SuperAdmin]).is_ok());
    }

    #[test]
    fn company_access_is_tenant_scoped() {
        let hr = ctx(UserRole::HrAdmin);
        assert!(hr.can_access_company(hr.company.id));
        assert!(!hr.can_access_company(Uuid::new_v4()));

        let super_admin = ctx(UserRole::SuperAdmin);
        assert!(super_admin.can_access_company(Uuid::new_v4()));
    }

    #[test]
    fn user_access_follows_role_scope() {
        let hr = ctx(UserRole::HrAdmin);
        let same_tenant = test_user(UserRole::Employee, hr.company.id);
        let other_tenant = test_user(UserRole::Employee, Uuid::new_v4());
        assert!(hr.can_access_user(&same_tenant));
        assert!(!hr.can_access_user(&other_tenant));

        let employee = ctx(UserRole::Employee);
        let colleague = test_user(UserRole::Employee, employee.company.id);
        assert!(employee.can_access_user(&employee.user));
        assert!(!employee.can_access_user(&colleague));
    }

    #[test]
    fn password_hash_round_trip() {
        let config = AppConfig {
            bcrypt_cost: 4, // keep the test fast
            ..Default::default()
        };
        let hash = hash_password(&config, "s3cret-pass").unwrap();
        assert!(verify_password("s3cret-pass", &hash).unwrap());
        assert!(!verify_password("wrong-pass", &hash).unwrap());
    }
}
