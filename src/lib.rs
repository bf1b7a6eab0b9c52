//! # GivingWorks API Library
//!
//! This library provides the core functionality for the GivingWorks API
//! service: a multi-tenant corporate giving platform with employer
//! matching, a shared charity catalog, donation lifecycle management and
//! yearly tax documents.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod matching;
pub mod models;
pub mod pdf;
pub mod reports;
pub mod repositories;
pub mod seeds;
pub mod server;
pub mod taxes;
pub mod telemetry;
pub use migration;
