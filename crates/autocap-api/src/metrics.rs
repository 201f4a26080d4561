//! Prometheus metrics for the API server.

use std::sync::LazyLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex_lite::Regex;

/// Install the Prometheus recorder and return the handle used by `/metrics`.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "autocap_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "autocap_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "autocap_http_requests_in_flight";
    pub const RATE_LIMIT_HITS_TOTAL: &str = "autocap_rate_limit_hits_total";
    pub const AUTH_FAILURES_TOTAL: &str = "autocap_auth_failures_total";
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_rate_limit_hit(path: &str) {
    let labels = [("path", sanitize_path(path))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// `scheme` is `worker` or `integration`.
pub fn record_auth_failure(scheme: &'static str) {
    counter!(names::AUTH_FAILURES_TOTAL, "scheme" => scheme).increment(1);
}

static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("valid regex")
});
static RESOURCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(uploads|transcripts|jobs|captions)/[^/]+").expect("valid regex")
});
static INTEGRATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/integration/(videos|render)/[^/]+").expect("valid regex")
});

/// Collapse ids in a request path so label cardinality stays bounded.
fn sanitize_path(path: &str) -> String {
    let path = UUID_RE.replace_all(path, ":id");
    let path = RESOURCE_RE.replace_all(&path, "/${1}/:id");
    let path = INTEGRATION_RE.replace_all(&path, "/integration/${1}/:id");
    path.to_string()
}

pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/api/uploads/up_123/render-url"),
            "/api/uploads/:id/render-url"
        );
        assert_eq!(
            sanitize_path("/api/render/jobs/550e8400-e29b-41d4-a716-446655440000/complete"),
            "/api/render/jobs/:id/complete"
        );
        assert_eq!(
            sanitize_path("/api/integration/videos/ext-42/transcription/complete"),
            "/api/integration/videos/:id/transcription/complete"
        );
        assert_eq!(sanitize_path("/api/videos/render"), "/api/videos/render");
        assert_eq!(sanitize_path("/api/integration/videos"), "/api/integration/videos");
    }
}
