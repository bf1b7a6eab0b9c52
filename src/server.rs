//! # Server Configuration
//!
//! This module contains the server setup and configuration for the
//! GivingWorks API: shared state, the router with its public and
//! token-protected route groups, and the OpenAPI document.

use std::sync::Arc;

use axum::{
    Router,
    extract::Request,
    handler::Handler,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post, put},
};
use sea_orm::DatabaseConnection;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::auth::auth_middleware;
use crate::config::AppConfig;
use crate::handlers;
use crate::telemetry::{self, TraceContext};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
}

/// Assigns every request a trace id, exposed both as a request extension
/// and through task-local storage for error responses and log correlation.
async fn trace_context_middleware(mut request: Request, next: Next) -> Response {
    let context = TraceContext {
        trace_id: Uuid::new_v4().to_string(),
    };
    request.extensions_mut().insert(context.clone());
    telemetry::with_trace_context(context, next.run(request)).await
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let public = Router::new()
        .route("/", get(handlers::root))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login));

    // The charity catalog is browsable without a token; only the
    // super-admin mutations on it require one, so those handlers carry
    // the auth middleware individually.
    let charities = Router::new()
        .route(
            "/api/charities",
            get(handlers::charities::list_charities)
                .post(handlers::charities::create_charity.layer(auth.clone())),
        )
        .route(
            "/api/charities/featured",
            get(handlers::charities::featured_charities),
        )
        .route(
            "/api/charities/categories",
            get(handlers::charities::list_categories),
        )
        .route(
            "/api/charities/search",
            get(handlers::charities::search_charities),
        )
        .route(
            "/api/charities/category/{category}",
            get(handlers::charities::charities_by_category),
        )
        .route(
            "/api/charities/{id}",
            get(handlers::charities::get_charity)
                .put(handlers::charities::update_charity.layer(auth.clone())),
        )
        .route(
            "/api/charities/{id}/stats",
            get(handlers::charities::charity_stats),
        )
        .route(
            "/api/charities/{id}/verify",
            put(handlers::charities::verify_charity.layer(auth.clone())),
        );

    let protected = Router::new()
        .route("/api/auth/me", get(handlers::auth::me))
        .route("/api/auth/profile", put(handlers::auth::update_profile))
        .route("/api/auth/password", put(handlers::auth::change_password))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route(
            "/api/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route("/api/users/leaderboard", get(handlers::users::leaderboard))
        .route(
            "/api/users/{id}",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        .route(
            "/api/users/{id}/donations",
            get(handlers::users::user_donations),
        )
        .route(
            "/api/users/{id}/preferences",
            put(handlers::users::update_preferences),
        )
        .route(
            "/api/companies",
            get(handlers::companies::list_companies).post(handlers::companies::create_company),
        )
        .route(
            "/api/companies/{id}",
            get(handlers::companies::get_company).put(handlers::companies::update_company),
        )
        .route(
            "/api/companies/{id}/matching",
            put(handlers::companies::update_matching_program),
        )
        .route(
            "/api/companies/{id}/dashboard",
            get(handlers::companies::company_dashboard),
        )
        .route(
            "/api/companies/{id}/employees",
            get(handlers::companies::company_employees),
        )
        .route(
            "/api/companies/{id}/reports",
            get(handlers::companies::company_reports),
        )
        .route(
            "/api/donations",
            get(handlers::donations::list_donations).post(handlers::donations::create_donation),
        )
        .route("/api/donations/{id}", get(handlers::donations::get_donation))
        .route(
            "/api/donations/{id}/status",
            put(handlers::donations::update_donation_status),
        )
        .route(
            "/api/donations/{id}/cancel",
            put(handlers::donations::cancel_donation),
        )
        .route(
            "/api/donations/summary/user",
            get(handlers::donations::user_summary),
        )
        .route(
            "/api/donations/summary/company",
            get(handlers::donations::company_summary),
        )
        .route("/api/tax/records", get(handlers::tax::list_records))
        .route(
            "/api/tax/records/generate",
            post(handlers::tax::generate_record),
        )
        .route(
            "/api/tax/records/generate-company",
            post(handlers::tax::generate_company_records),
        )
        .route("/api/tax/records/{id}", get(handlers::tax::get_record))
        .route(
            "/api/tax/records/{id}/download/{document_type}",
            get(handlers::tax::document_metadata),
        )
        .route(
            "/api/tax/records/{id}/download/{document_type}/file",
            get(handlers::tax::document_file),
        )
        .route(
            "/api/tax/records/{id}/downloaded",
            put(handlers::tax::mark_downloaded),
        )
        .route(
            "/api/tax/donations/{id}/receipt",
            get(handlers::tax::donation_receipt),
        )
        .route("/api/tax/summary", get(handlers::tax::tax_summary))
        .route("/api/tax/years", get(handlers::tax::available_years))
        .route("/api/admin/dashboard", get(handlers::admin::dashboard))
        .route("/api/admin/companies", get(handlers::admin::list_companies))
        .route(
            "/api/admin/companies/{id}/subscription",
            put(handlers::admin::update_subscription),
        )
        .route("/api/admin/users", get(handlers::admin::list_users))
        .route("/api/admin/charities", get(handlers::admin::list_charities))
        .route("/api/admin/reports", get(handlers::admin::reports))
        .route_layer(auth);

    public
        .merge(charities)
        .merge(protected)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;
    let profile = config.profile.clone();

    let state = AppState {
        config: Arc::new(config),
        db,
    };
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Server listening on: {}", addr);
    println!("Running in profile: {}", profile);

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::me,
        crate::handlers::auth::update_profile,
        crate::handlers::auth::change_password,
        crate::handlers::auth::logout,
        crate::handlers::users::list_users,
        crate::handlers::users::leaderboard,
        crate::handlers::users::get_user,
        crate::handlers::users::create_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
        crate::handlers::users::user_donations,
        crate::handlers::users::update_preferences,
        crate::handlers::companies::list_companies,
        crate::handlers::companies::get_company,
        crate::handlers::companies::create_company,
        crate::handlers::companies::update_company,
        crate::handlers::companies::update_matching_program,
        crate::handlers::companies::company_dashboard,
        crate::handlers::companies::company_employees,
        crate::handlers::companies::company_reports,
        crate::handlers::charities::list_charities,
        crate::handlers::charities::featured_charities,
        crate::handlers::charities::list_categories,
        crate::handlers::charities::search_charities,
        crate::handlers::charities::charities_by_category,
        crate::handlers::charities::get_charity,
        crate::handlers::charities::charity_stats,
        crate::handlers::charities::create_charity,
        crate::handlers::charities::update_charity,
        crate::handlers::charities::verify_charity,
        crate::handlers::donations::list_donations,
        crate::handlers::donations::get_donation,
        crate::handlers::donations::create_donation,
        crate::handlers::donations::update_donation_status,
        crate::handlers::donations::cancel_donation,
        crate::handlers::donations::user_summary,
        crate::handlers::donations::company_summary,
        crate::handlers::tax::list_records,
        crate::handlers::tax::get_record,
        crate::handlers::tax::generate_record,
        crate::handlers::tax::generate_company_records,
        crate::handlers::tax::document_metadata,
        crate::handlers::tax::document_file,
        crate::handlers::tax::donation_receipt,
        crate::handlers::tax::tax_summary,
        crate::handlers::tax::available_years,
        crate::handlers::tax::mark_downloaded,
        crate::handlers::admin::dashboard,
        crate::handlers::admin::list_companies,
        crate::handlers::admin::list_users,
        crate::handlers::admin::list_charities,
        crate::handlers::admin::update_subscription,
        crate::handlers::admin::reports,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::models::Address,
            crate::models::ContactInfo,
            crate::models::user::Model,
            crate::models::company::Model,
            crate::models::charity::Model,
            crate::models::donation::Model,
            crate::models::tax_record::Model,
        )
    ),
    info(
        title = "GivingWorks API",
        description = "API for corporate charitable giving with employer matching",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
