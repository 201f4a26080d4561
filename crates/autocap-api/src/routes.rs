//! API routes.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, patch, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::handlers::health;
use crate::handlers::{export, integration, render, transcripts, uploads, worker};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    // Editor-facing routes
    let editor_routes = Router::new()
        .route("/videos/render", post(render::render_video))
        .route("/export/start", post(export::start_export))
        .route("/portal/list", get(export::list_portals))
        .route("/transcripts/:transcript_id", patch(transcripts::update_transcript))
        .route("/uploads/:upload_id/signed-url", get(uploads::get_signed_url))
        .route("/uploads/:upload_id/render-url", get(uploads::get_render_url));

    // Render worker reports (worker token)
    let worker_routes = Router::new()
        .route("/render/jobs/:job_id/complete", post(worker::complete_job))
        .route("/render/jobs/:job_id/progress", post(worker::report_progress))
        .route("/render/jobs/:job_id/fail", post(worker::fail_job));

    // External system (integration bearer token)
    let integration_routes = Router::new()
        .route("/integration/videos", post(integration::register_video))
        .route(
            "/integration/videos/:video_id/transcription",
            post(integration::link_transcription),
        )
        .route(
            "/integration/videos/:video_id/transcription/complete",
            post(integration::complete_transcription),
        )
        .route(
            "/integration/videos/:video_id/failure",
            post(integration::report_failure),
        )
        .route(
            "/integration/captions/:video_id",
            get(integration::get_caption_set).put(integration::save_caption_set),
        )
        .route("/integration/render/:video_id", post(integration::render_video));

    let rate_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .merge(editor_routes)
        .merge(integration_routes)
        .layer(middleware::from_fn_with_state(rate_limiter, rate_limit_middleware))
        // Workers report from a small set of hosts; they are not rate limited.
        .merge(worker_routes);

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health));

    let metrics_routes = match metrics_handle {
        Some(handle) => Router::new().route("/metrics", get(move || async move { handle.render() })),
        None => Router::new(),
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(TimeoutLayer::new(state.config.request_timeout))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
