//! Axum HTTP API for the caption pipeline.
//!
//! This crate provides:
//! - Editor routes for renders, portal export, transcript edits and asset URLs
//! - Render worker report routes guarded by signed worker tokens
//! - The external integration surface guarded by bearer tokens
//! - Rate limiting, security headers and Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod security;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::{build_pipeline, AppState};
