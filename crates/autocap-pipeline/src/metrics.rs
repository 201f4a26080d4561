//! Render, export and callback metrics.

use metrics::{counter, histogram};

pub mod names {
    pub const RENDERS_CREATED_TOTAL: &str = "autocap_renders_created_total";
    pub const RENDERS_SKIPPED_TOTAL: &str = "autocap_renders_skipped_total";
    pub const RENDERS_DISPATCHED_TOTAL: &str = "autocap_renders_dispatched_total";
    pub const RENDERS_FAILED_TOTAL: &str = "autocap_renders_failed_total";
    pub const RENDER_DISPATCH_SECONDS: &str = "autocap_render_dispatch_seconds";
    pub const EXPORT_ATTEMPTS_TOTAL: &str = "autocap_export_attempts_total";
    pub const CALLBACKS_TOTAL: &str = "autocap_callbacks_total";
}

pub fn record_render_created(template: &str) {
    counter!(names::RENDERS_CREATED_TOTAL, "template" => template.to_string()).increment(1);
}

pub fn record_render_skipped() {
    counter!(names::RENDERS_SKIPPED_TOTAL).increment(1);
}

pub fn record_render_dispatched(duration_secs: f64) {
    counter!(names::RENDERS_DISPATCHED_TOTAL).increment(1);
    histogram!(names::RENDER_DISPATCH_SECONDS).record(duration_secs);
}

/// `reason` is a short code such as `WORKER_REJECTED`.
pub fn record_render_failed(reason: &str) {
    counter!(names::RENDERS_FAILED_TOTAL, "reason" => reason.to_string()).increment(1);
}

pub fn record_export_attempt(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!(names::EXPORT_ATTEMPTS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_callback(kind: &str, delivered: bool) {
    let outcome = if delivered { "delivered" } else { "failed" };
    counter!(
        names::CALLBACKS_TOTAL,
        "kind" => kind.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}
