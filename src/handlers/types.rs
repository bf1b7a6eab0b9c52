//! # Common API Types
//!
//! This module contains shared types used across multiple API handlers:
//! the `{success, data, message?}` envelope and page-number pagination.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::repositories::Page;

/// Standard envelope for single-object responses
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Always true; errors use their own envelope
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }
}

impl ApiResponse<serde_json::Value> {
    /// Message-only acknowledgement with no data payload.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
        }
    }
}

/// Paging block attached to list responses
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct Pagination {
    /// 1-based current page
    pub current: u64,
    /// Total page count
    pub pages: u64,
    /// Total matching items
    pub total: u64,
}

/// Standard envelope for list responses
#[derive(Debug, Serialize, ToSchema)]
pub struct ListResponse<T> {
    pub success: bool,
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl<T> ListResponse<T> {
    pub fn from_page(page: Page<T>, current: u64) -> Self {
        Self {
            success: true,
            pagination: Pagination {
                current: current.max(1),
                pages: page.pages,
                total: page.total,
            },
            data: page.items,
        }
    }
}

/// Page-number query parameters shared by list endpoints
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
pub struct PageQuery {
    /// 1-based page number
    #[serde(default = "default_page")]
    pub page: u64,
    /// Page size, capped at 100
    #[serde(default = "default_limit")]
    pub limit: u64,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PageQuery {
    pub fn page(&self) -> u64 {
        self.page.max(1)
    }

    pub fn limit(&self) -> u64 {
        self.limit.clamp(1, 100)
    }
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    20
}
