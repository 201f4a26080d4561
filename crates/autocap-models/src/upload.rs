//! Upload records owned by the upload service.
//!
//! The pipeline reads `storage_path` and writes render side effects
//! (`status`, `caption_asset_path`, `render_asset_path`, `render_caption_hash`).

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Upload lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    #[default]
    PendingUpload,
    Uploaded,
    Transcribing,
    Transcribed,
    Rendering,
    Rendered,
    Failed,
    /// Status written by another service that this crate does not model
    #[serde(other)]
    Other,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::PendingUpload => "pending_upload",
            UploadStatus::Uploaded => "uploaded",
            UploadStatus::Transcribing => "transcribing",
            UploadStatus::Transcribed => "transcribed",
            UploadStatus::Rendering => "rendering",
            UploadStatus::Rendered => "rendered",
            UploadStatus::Failed => "failed",
            UploadStatus::Other => "other",
        }
    }
}

/// Uploaded source video.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Upload {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub storage_path: String,
    #[serde(default)]
    pub status: UploadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption_asset_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_asset_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_caption_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_transcript_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Upload {
    pub fn new(user_id: impl Into<String>, storage_path: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            user_id: user_id.into(),
            storage_path: storage_path.into(),
            status: UploadStatus::PendingUpload,
            file_name: None,
            file_size: None,
            mime_type: None,
            caption_asset_path: None,
            render_asset_path: None,
            render_caption_hash: None,
            latest_transcript_id: None,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// Whether a previous render with exactly this caption hash can be reused.
    pub fn can_reuse_render(&self, caption_hash: &str) -> bool {
        self.render_asset_path.is_some()
            && self.render_caption_hash.as_deref() == Some(caption_hash)
    }
}
