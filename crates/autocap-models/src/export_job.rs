//! Portal export rows (`render_jobs` collection) and portals.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::RenderJobStatus;

/// Source tag sent with every export payload.
pub const EXPORT_SOURCE: &str = "AutoCaptions";

/// Tracks delivery of a rendered video to an export portal.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportJob {
    #[serde(default)]
    pub id: String,
    pub upload_id: String,
    pub file_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub target_portal: Option<String>,
    #[serde(default)]
    pub status: RenderJobStatus,
    #[serde(default)]
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_attempt_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Render job in the `jobs` collection that produces the video
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendered_video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExportJob {
    pub fn new(
        upload_id: impl Into<String>,
        file_name: impl Into<String>,
        description: impl Into<String>,
        target_portal: Option<String>,
        status: RenderJobStatus,
    ) -> Self {
        Self {
            id: String::new(),
            upload_id: upload_id.into(),
            file_name: file_name.into(),
            description: description.into(),
            target_portal,
            status,
            attempts: 0,
            created_at: Utc::now(),
            last_attempt_at: None,
            next_attempt_at: None,
            last_error: None,
            worker_job_id: None,
            rendered_video_url: None,
            caption_hash: None,
            updated_at: None,
            error: None,
        }
    }

    /// Body posted to the portal.
    pub fn payload(&self, rendered_video_url: &str) -> ExportPayload {
        ExportPayload {
            file_name: self.file_name.clone(),
            description: self.description.clone(),
            rendered_video_url: rendered_video_url.to_string(),
            source: EXPORT_SOURCE.to_string(),
            job_id: self.id.clone(),
        }
    }
}

/// JSON body of a portal export request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    pub file_name: String,
    pub description: String,
    pub rendered_video_url: String,
    pub source: String,
    pub job_id: String,
}

/// A configured export destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Portal {
    pub id: String,
    pub name: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_payload_shape() {
        let mut job = ExportJob::new(
            "up1",
            "clip.mp4",
            "",
            Some("https://portal.test/ingest".into()),
            RenderJobStatus::Rendered,
        );
        job.id = "exp1".into();

        let json = serde_json::to_value(job.payload("https://cdn.test/r.mp4")).unwrap();
        assert_eq!(json["fileName"], "clip.mp4");
        assert_eq!(json["renderedVideoUrl"], "https://cdn.test/r.mp4");
        assert_eq!(json["source"], "AutoCaptions");
        assert_eq!(json["jobId"], "exp1");
    }
}
