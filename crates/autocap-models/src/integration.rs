//! External-system integration: tracked videos, workflow states and callbacks.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Name recorded for videos registered by the content scheduler.
pub const EXTERNAL_SYSTEM: &str = "content_scheduler";

/// Workflow state of an integration video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    #[default]
    Received,
    PendingTranscription,
    Transcribing,
    AwaitingApproval,
    ApprovedRendering,
    Rendering,
    Captioned,
    Failed,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Received => "received",
            WorkflowStatus::PendingTranscription => "pending_transcription",
            WorkflowStatus::Transcribing => "transcribing",
            WorkflowStatus::AwaitingApproval => "awaiting_approval",
            WorkflowStatus::ApprovedRendering => "approved_rendering",
            WorkflowStatus::Rendering => "rendering",
            WorkflowStatus::Captioned => "captioned",
            WorkflowStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStatus::Captioned | WorkflowStatus::Failed)
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable entry of the workflow audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WorkflowHistoryEntry {
    pub status: WorkflowStatus,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl WorkflowHistoryEntry {
    pub fn now(status: WorkflowStatus, note: Option<String>) -> Self {
        Self {
            status,
            at: Utc::now(),
            note,
        }
    }
}

/// Error recorded on a failed integration video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoError {
    pub message: String,
    pub code: String,
    pub occurred_at: DateTime<Utc>,
}

/// A video registered by an external system and tracked through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationVideo {
    #[serde(default)]
    pub id: String,
    pub external_video_id: String,
    pub content_id: String,
    pub portal_id: String,
    #[serde(default = "default_external_system")]
    pub external_system: String,

    // Linked pipeline ids
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription_job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption_set_id: Option<String>,

    // Video locations
    pub video_url: String,
    #[serde(
        rename = "video_storage_path",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub video_storage_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captioned_url: Option<String>,

    // Callbacks
    pub transcription_callback_url: String,
    pub render_callback_url: String,
    #[serde(default)]
    pub callback_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_callback_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub status: WorkflowStatus,
    #[serde(default)]
    pub workflow_history: Vec<WorkflowHistoryEntry>,

    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_options: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<VideoError>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_external_system() -> String {
    EXTERNAL_SYSTEM.to_string()
}

/// Error code attached to failure callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallbackErrorCode {
    TranscriptionFailed,
    RenderFailed,
}

impl CallbackErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackErrorCode::TranscriptionFailed => "TRANSCRIPTION_FAILED",
            CallbackErrorCode::RenderFailed => "RENDER_FAILED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CallbackError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<CallbackErrorCode>,
}

/// Body of a signed workflow callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CallbackPayload {
    pub content_id: String,
    pub portal_id: String,
    pub video_id: String,
    pub status: WorkflowStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription_job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption_set_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendered_video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CallbackError>,
}

impl CallbackPayload {
    /// Payload skeleton identifying the video, with `status` set.
    pub fn for_video(video: &IntegrationVideo, status: WorkflowStatus) -> Self {
        Self {
            content_id: video.content_id.clone(),
            portal_id: video.portal_id.clone(),
            video_id: video.external_video_id.clone(),
            status,
            transcription_job_id: None,
            transcript_id: None,
            render_job_id: None,
            progress: None,
            caption_set_id: None,
            rendered_video_url: None,
            error: None,
        }
    }
}
