//! # API Handlers
//!
//! This module contains all the HTTP endpoint handlers for the GivingWorks API.

use crate::models::ServiceInfo;
use axum::response::Json;

pub mod admin;
pub mod auth;
pub mod charities;
pub mod companies;
pub mod donations;
pub mod tax;
pub mod types;
pub mod users;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}
