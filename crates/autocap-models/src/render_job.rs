//! Render job records and lifecycle.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{CaptionFormat, CaptionTemplate, Overlay, Resolution};

/// Unique identifier for a render job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Render and export job status.
///
/// ```text
/// pending_render -> queued -> rendering -> rendered -> exported
///                                              \-> export_failed (retryable)
/// any pre-render state -> failed | trigger_failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum RenderJobStatus {
    /// Row created, nothing dispatched yet
    #[default]
    PendingRender,
    /// Caption stored and handed to the worker
    Queued,
    /// Worker reported progress
    Rendering,
    /// Output video available
    #[serde(alias = "done")]
    Rendered,
    /// Delivered to the export portal
    Exported,
    /// Portal delivery failed; retried by `next_attempt_at` sweeps
    ExportFailed,
    /// Render could not be triggered for an export row
    TriggerFailed,
    /// Render failed
    Failed,
}

impl RenderJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderJobStatus::PendingRender => "pending_render",
            RenderJobStatus::Queued => "queued",
            RenderJobStatus::Rendering => "rendering",
            RenderJobStatus::Rendered => "rendered",
            RenderJobStatus::Exported => "exported",
            RenderJobStatus::ExportFailed => "export_failed",
            RenderJobStatus::TriggerFailed => "trigger_failed",
            RenderJobStatus::Failed => "failed",
        }
    }

    /// No further automatic transitions happen from a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RenderJobStatus::Exported | RenderJobStatus::Failed | RenderJobStatus::TriggerFailed
        )
    }

    pub fn can_transition_to(&self, next: RenderJobStatus) -> bool {
        use RenderJobStatus::*;
        match self {
            PendingRender => matches!(next, Queued | Rendered | Failed | TriggerFailed),
            Queued => matches!(next, Rendering | Rendered | Failed),
            Rendering => matches!(next, Rendering | Rendered | Failed),
            Rendered => matches!(next, Exported | ExportFailed),
            ExportFailed => matches!(next, Exported | ExportFailed),
            Exported | Failed | TriggerFailed => false,
        }
    }
}

impl fmt::Display for RenderJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything the worker needs to render, plus bookkeeping about the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderPayload {
    pub template: CaptionTemplate,
    pub resolution: Resolution,
    #[serde(default)]
    pub transcript_id: Option<String>,
    #[serde(default)]
    pub translation_id: Option<String>,
    pub video_path: String,
    #[serde(default)]
    pub caption_path: String,
    pub caption_format: CaptionFormat,
    pub caption_hash: String,
    #[serde(default)]
    pub output_path: String,
    #[serde(default)]
    pub segments_provided: bool,
    #[serde(default)]
    pub segment_count: usize,
    #[serde(default)]
    pub overlays: Vec<Overlay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_video_id: Option<String>,
}

/// Output of a finished render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderResult {
    pub output_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

/// A render job row in the `jobs` collection.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RenderJob {
    #[serde(default = "JobId::new")]
    pub id: JobId,
    pub upload_id: String,
    pub user_id: String,
    #[serde(rename = "type", default = "default_job_type")]
    pub job_type: String,
    pub payload: RenderPayload,
    #[serde(default)]
    pub status: RenderJobStatus,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Worker response body or transport error behind `error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<RenderResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_job_type() -> String {
    "render".to_string()
}

impl RenderJob {
    /// Create a new job in `pending_render`.
    pub fn new(
        upload_id: impl Into<String>,
        user_id: impl Into<String>,
        payload: RenderPayload,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            upload_id: upload_id.into(),
            user_id: user_id.into(),
            job_type: default_job_type(),
            payload,
            status: RenderJobStatus::PendingRender,
            attempts: 0,
            error: None,
            failure_reason: None,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }
}
