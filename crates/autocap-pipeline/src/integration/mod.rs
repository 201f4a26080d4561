//! Integration workflow tracking for externally registered videos.
//!
//! ```text
//! received -> pending_transcription -> transcribing -> awaiting_approval
//!          -> approved_rendering -> rendering -> captioned
//! (any) -> failed
//! ```
//!
//! Every transition writes `status` and appends one entry to
//! `workflowHistory` in the same update. The history is never rewritten.

pub mod mirror;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use autocap_captions::{segments_from_ms, segments_to_ms};
use autocap_firestore::{DocumentStore, DocumentStoreExt, Filter, FindOptions, Update};
use autocap_models::{
    CallbackError, CallbackErrorCode, CallbackPayload, CaptionSet, CaptionSetStatus,
    CaptionTemplate, IntegrationVideo, MsSegment, RawMsSegment, RenderJob, RenderJobStatus,
    Resolution, Segment, VideoError, WorkflowHistoryEntry, WorkflowStatus,
};
use autocap_models::integration::EXTERNAL_SYSTEM;

use crate::callback::CallbackClient;
use crate::collections::{CAPTION_SETS, INTEGRATION_VIDEOS, JOBS};
use crate::config::IntegrationConfig;
use crate::error::{PipelineError, PipelineResult};

pub use mirror::VideoMirror;

/// Registration request from the external system.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterVideo {
    #[serde(default)]
    pub external_video_id: String,
    #[serde(default)]
    pub content_id: String,
    #[serde(default)]
    pub portal_id: String,
    #[serde(default)]
    pub video_url: String,
    #[serde(default)]
    pub transcription_callback_url: String,
    #[serde(default)]
    pub render_callback_url: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl RegisterVideo {
    pub fn validate(&self) -> PipelineResult<()> {
        let required = [
            ("externalVideoId", &self.external_video_id),
            ("contentId", &self.content_id),
            ("portalId", &self.portal_id),
            ("videoUrl", &self.video_url),
            ("transcriptionCallbackUrl", &self.transcription_callback_url),
            ("renderCallbackUrl", &self.render_callback_url),
        ];
        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((name, _)) => Err(PipelineError::validation(format!("{name} is required"))),
            None => Ok(()),
        }
    }
}

/// Fields written when a caption set is saved.
#[derive(Debug, Clone, Default)]
pub struct SaveCaptionSet {
    pub status: CaptionSetStatus,
    /// Keeps the stored template when `None`.
    pub template: Option<CaptionTemplate>,
    /// Keeps the stored resolution when `None`.
    pub resolution: Option<Resolution>,
    pub metadata: Option<BTreeMap<String, Value>>,
}

/// Caption set as exchanged with the external system, timings in ms.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionSetMs {
    pub video_id: String,
    pub caption_set_id: String,
    pub transcript_id: Option<String>,
    pub status: CaptionSetStatus,
    pub version: u32,
    pub template: CaptionTemplate,
    pub resolution: Option<Resolution>,
    pub segments: Vec<MsSegment>,
    pub updated_at: DateTime<Utc>,
}

impl From<CaptionSet> for CaptionSetMs {
    fn from(set: CaptionSet) -> Self {
        Self {
            segments: segments_to_ms(&set.segments),
            video_id: set.video_id,
            caption_set_id: set.id,
            transcript_id: set.transcript_id,
            status: set.status,
            version: set.version,
            template: set.template,
            resolution: set.resolution,
            updated_at: set.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct IntegrationTracker {
    store: Arc<dyn DocumentStore>,
    callbacks: CallbackClient,
    mirror: VideoMirror,
    config: IntegrationConfig,
}

impl IntegrationTracker {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        callbacks: CallbackClient,
        mirror: VideoMirror,
        config: IntegrationConfig,
    ) -> Self {
        Self {
            store,
            callbacks,
            mirror,
            config,
        }
    }

    pub async fn get_video(&self, external_video_id: &str) -> PipelineResult<Option<IntegrationVideo>> {
        Ok(self
            .store
            .find_one_as(
                INTEGRATION_VIDEOS,
                &[Filter::eq("externalVideoId", external_video_id)],
                FindOptions::default(),
            )
            .await?)
    }

    pub async fn get_video_or_err(&self, external_video_id: &str) -> PipelineResult<IntegrationVideo> {
        self.get_video(external_video_id).await?.ok_or_else(|| {
            PipelineError::not_found(format!("Integration video not found: {external_video_id}"))
        })
    }

    /// Upsert a video by external id. The source is mirrored into owned
    /// storage on first registration and whenever its URL changes.
    pub async fn register_video(&self, params: RegisterVideo) -> PipelineResult<IntegrationVideo> {
        params.validate()?;
        let existing = self.get_video(&params.external_video_id).await?;

        let needs_mirror = existing.as_ref().map_or(true, |video| {
            video.video_storage_path.is_none()
                || video.original_video_url.as_deref() != Some(params.video_url.as_str())
        });

        let mut storage_path = existing.as_ref().and_then(|v| v.video_storage_path.clone());
        let mut video_url = existing
            .as_ref()
            .map(|v| v.video_url.clone())
            .unwrap_or_else(|| params.video_url.clone());

        if needs_mirror {
            let file_name = params.metadata.get("fileName").and_then(Value::as_str);
            match self
                .mirror
                .mirror(&params.external_video_id, &params.video_url, file_name)
                .await
            {
                Some(stored) => {
                    storage_path = Some(stored.path);
                    video_url = stored.url;
                }
                None => video_url = params.video_url.clone(),
            }
        }

        let mut metadata = existing
            .as_ref()
            .map(|v| v.metadata.clone())
            .unwrap_or_default();
        metadata.extend(params.metadata.clone());
        metadata.insert(
            "originalVideoUrl".to_string(),
            Value::String(params.video_url.clone()),
        );

        let now = Utc::now();
        if let Some(video) = existing {
            let update = Update::new()
                .set("contentId", params.content_id.as_str())
                .set("portalId", params.portal_id.as_str())
                .set("videoUrl", video_url.as_str())
                .set_opt("video_storage_path", storage_path)
                .set("originalVideoUrl", params.video_url.as_str())
                .set("transcriptionCallbackUrl", params.transcription_callback_url.as_str())
                .set("renderCallbackUrl", params.render_callback_url.as_str())
                .set_json("metadata", &metadata)?
                .set("updatedAt", now.to_rfc3339());
            self.store.update(INTEGRATION_VIDEOS, &video.id, update).await?;
            info!(video_id = %params.external_video_id, "Integration video re-registered");
            return self.get_video_or_err(&params.external_video_id).await;
        }

        let mut video = IntegrationVideo {
            id: String::new(),
            external_video_id: params.external_video_id.clone(),
            content_id: params.content_id,
            portal_id: params.portal_id,
            external_system: EXTERNAL_SYSTEM.to_string(),
            upload_id: None,
            transcript_id: None,
            transcription_job_id: None,
            render_job_id: None,
            caption_set_id: None,
            video_url,
            video_storage_path: storage_path,
            original_video_url: Some(params.video_url),
            captioned_url: None,
            transcription_callback_url: params.transcription_callback_url,
            render_callback_url: params.render_callback_url,
            callback_attempts: 0,
            last_callback_at: None,
            status: WorkflowStatus::PendingTranscription,
            workflow_history: vec![WorkflowHistoryEntry::now(
                WorkflowStatus::PendingTranscription,
                Some("Video registered".to_string()),
            )],
            metadata,
            render_options: None,
            error: None,
            created_at: now,
            updated_at: now,
        };
        video.id = self.store.insert_as(INTEGRATION_VIDEOS, &video).await?;
        info!(video_id = %video.external_video_id, doc_id = %video.id, "Integration video registered");
        Ok(video)
    }

    /// Record a workflow transition.
    pub async fn update_status(
        &self,
        external_video_id: &str,
        status: WorkflowStatus,
        note: Option<String>,
    ) -> PipelineResult<()> {
        let video = self.get_video_or_err(external_video_id).await?;
        self.store
            .update(INTEGRATION_VIDEOS, &video.id, transition(status, note)?)
            .await?;
        info!(video_id = external_video_id, status = %status, "Integration workflow transition");
        Ok(())
    }

    pub async fn link_transcription(
        &self,
        external_video_id: &str,
        upload_id: &str,
        transcript_id: &str,
        transcription_job_id: Option<String>,
    ) -> PipelineResult<()> {
        let video = self.get_video_or_err(external_video_id).await?;
        let update = with_transition(
            Update::new()
                .set("uploadId", upload_id)
                .set("transcriptId", transcript_id)
                .set_opt("transcriptionJobId", transcription_job_id),
            WorkflowStatus::Transcribing,
            None,
        )?;
        self.store.update(INTEGRATION_VIDEOS, &video.id, update).await?;
        Ok(())
    }

    /// Return the linked caption set, creating a draft from `segments` when
    /// the video has none yet.
    pub async fn ensure_caption_draft(
        &self,
        external_video_id: &str,
        transcript_id: Option<String>,
        segments: Vec<Segment>,
        template: CaptionTemplate,
    ) -> PipelineResult<CaptionSet> {
        let video = self.get_video_or_err(external_video_id).await?;
        if let Some(set) = self.linked_caption_set(&video).await? {
            return Ok(set);
        }

        let now = Utc::now();
        let mut set = CaptionSet {
            id: String::new(),
            video_id: video.external_video_id.clone(),
            content_id: video.content_id.clone(),
            portal_id: video.portal_id.clone(),
            transcript_id: transcript_id.clone(),
            segments,
            status: CaptionSetStatus::Draft,
            version: 1,
            template,
            resolution: None,
            metadata: None,
            created_at: now,
            updated_at: now,
        };
        set.id = self.store.insert_as(CAPTION_SETS, &set).await?;

        let update = Update::new()
            .set("captionSetId", set.id.as_str())
            .set_opt("transcriptId", transcript_id)
            .set("updatedAt", now.to_rfc3339());
        self.store.update(INTEGRATION_VIDEOS, &video.id, update).await?;
        Ok(set)
    }

    /// Save millisecond segments; creates the set on first save and bumps
    /// `version` on every later one.
    pub async fn save_caption_set(
        &self,
        external_video_id: &str,
        segments_ms: &[RawMsSegment],
        save: SaveCaptionSet,
    ) -> PipelineResult<CaptionSet> {
        let segments = segments_from_ms(segments_ms);
        let video = self.get_video_or_err(external_video_id).await?;
        let now = Utc::now();

        if let Some(existing) = self.linked_caption_set(&video).await? {
            let mut update = Update::new()
                .set_json("segments", &segments)?
                .set("status", save.status.as_str())
                .set("template", save.template.unwrap_or(existing.template).as_str())
                .set("updatedAt", now.to_rfc3339())
                .increment("version", 1);
            if let Some(resolution) = save.resolution {
                update = update.set("resolution", resolution.as_str());
            }
            if let Some(metadata) = &save.metadata {
                update = update.set_json("metadata", metadata)?;
            }
            self.store.update(CAPTION_SETS, &existing.id, update).await?;
            return self
                .store
                .get_as(CAPTION_SETS, &existing.id)
                .await?
                .ok_or_else(|| PipelineError::not_found("Caption set not found"));
        }

        let mut set = CaptionSet {
            id: String::new(),
            video_id: video.external_video_id.clone(),
            content_id: video.content_id.clone(),
            portal_id: video.portal_id.clone(),
            transcript_id: video.transcript_id.clone(),
            segments,
            status: save.status,
            version: 1,
            template: save.template.unwrap_or_default(),
            resolution: save.resolution,
            metadata: save.metadata,
            created_at: now,
            updated_at: now,
        };
        set.id = self.store.insert_as(CAPTION_SETS, &set).await?;
        self.store
            .update(
                INTEGRATION_VIDEOS,
                &video.id,
                Update::new()
                    .set("captionSetId", set.id.as_str())
                    .set("updatedAt", now.to_rfc3339()),
            )
            .await?;
        Ok(set)
    }

    pub async fn get_caption_set(&self, external_video_id: &str) -> PipelineResult<Option<CaptionSet>> {
        match self.get_video(external_video_id).await? {
            Some(video) => self.linked_caption_set(&video).await,
            None => Ok(None),
        }
    }

    pub async fn get_caption_set_ms(&self, external_video_id: &str) -> PipelineResult<Option<CaptionSetMs>> {
        Ok(self.get_caption_set(external_video_id).await?.map(CaptionSetMs::from))
    }

    async fn linked_caption_set(&self, video: &IntegrationVideo) -> PipelineResult<Option<CaptionSet>> {
        match video.caption_set_id.as_deref() {
            Some(id) => Ok(self.store.get_as(CAPTION_SETS, id).await?),
            None => Ok(None),
        }
    }

    /// Tell the external system the transcript is ready for review.
    pub async fn send_transcription_callback(&self, external_video_id: &str) -> PipelineResult<()> {
        let video = self.get_video_or_err(external_video_id).await?;
        let mut payload = CallbackPayload::for_video(&video, WorkflowStatus::AwaitingApproval);
        payload.transcription_job_id = video.transcription_job_id.clone();
        payload.transcript_id = video.transcript_id.clone();
        payload.caption_set_id = video.caption_set_id.clone();

        let delivered = self
            .callbacks
            .send(
                "transcription",
                &video.transcription_callback_url,
                &payload,
                self.config.callback_attempts,
            )
            .await;
        self.record_callback_attempt(&video, Update::new()).await?;

        if !delivered {
            self.update_status(
                external_video_id,
                WorkflowStatus::Failed,
                Some("Transcription callback failed".to_string()),
            )
            .await?;
            return Err(PipelineError::callback_failed(
                "Failed to send transcription callback",
            ));
        }

        self.update_status(external_video_id, WorkflowStatus::AwaitingApproval, None)
            .await
    }

    pub async fn link_render_job(
        &self,
        external_video_id: &str,
        render_job_id: &str,
        render_options: Value,
    ) -> PipelineResult<()> {
        let video = self.get_video_or_err(external_video_id).await?;
        let update = with_transition(
            Update::new()
                .set("renderJobId", render_job_id)
                .set("renderOptions", render_options),
            WorkflowStatus::Rendering,
            None,
        )?;
        self.store.update(INTEGRATION_VIDEOS, &video.id, update).await?;
        Ok(())
    }

    /// Returns `false` without sending when no render job is linked yet.
    pub async fn send_render_progress_callback(
        &self,
        external_video_id: &str,
        progress: u8,
    ) -> PipelineResult<bool> {
        let video = self.get_video_or_err(external_video_id).await?;
        let Some(render_job_id) = video.render_job_id.clone() else {
            return Ok(false);
        };

        let mut payload = CallbackPayload::for_video(&video, WorkflowStatus::Rendering);
        payload.render_job_id = Some(render_job_id);
        payload.progress = Some(progress.min(100));

        Ok(self
            .callbacks
            .send(
                "render_progress",
                &video.render_callback_url,
                &payload,
                self.config.callback_attempts,
            )
            .await)
    }

    /// Report the finished render. The linked job must be rendered.
    pub async fn send_render_complete_callback(&self, external_video_id: &str) -> PipelineResult<()> {
        let video = self.get_video_or_err(external_video_id).await?;
        let render_job_id = video.render_job_id.clone().ok_or_else(|| {
            PipelineError::conflict(format!("No render job linked to video {external_video_id}"))
        })?;
        let job: RenderJob = self
            .store
            .get_as(JOBS, &render_job_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("Render job not found"))?;
        if !matches!(
            job.status,
            RenderJobStatus::Rendered | RenderJobStatus::Exported
        ) {
            return Err(PipelineError::conflict("Render job is not complete"));
        }

        let rendered_url = job
            .result
            .and_then(|r| r.download_url)
            .unwrap_or_default();

        let mut payload = CallbackPayload::for_video(&video, WorkflowStatus::Captioned);
        payload.render_job_id = Some(render_job_id);
        payload.rendered_video_url = Some(rendered_url.clone());
        payload.caption_set_id = video.caption_set_id.clone();

        let delivered = self
            .callbacks
            .send(
                "render_complete",
                &video.render_callback_url,
                &payload,
                self.config.callback_attempts,
            )
            .await;
        self.record_callback_attempt(&video, Update::new().set("captionedUrl", rendered_url))
            .await?;

        if !delivered {
            self.update_status(
                external_video_id,
                WorkflowStatus::Failed,
                Some("Render callback failed".to_string()),
            )
            .await?;
            return Err(PipelineError::callback_failed(
                "Failed to send render completion callback",
            ));
        }

        self.update_status(external_video_id, WorkflowStatus::Captioned, None)
            .await
    }

    /// Report a failure to the callback URL matching `code` and mark the
    /// video failed. Returns whether the callback was delivered.
    pub async fn send_error_callback(
        &self,
        external_video_id: &str,
        code: CallbackErrorCode,
        message: &str,
    ) -> PipelineResult<bool> {
        let video = self.get_video_or_err(external_video_id).await?;
        let mut payload = CallbackPayload::for_video(&video, WorkflowStatus::Failed);
        payload.transcription_job_id = video.transcription_job_id.clone();
        payload.transcript_id = video.transcript_id.clone();
        payload.render_job_id = video.render_job_id.clone();
        payload.error = Some(CallbackError {
            message: message.to_string(),
            code: Some(code),
        });

        let url = match code {
            CallbackErrorCode::TranscriptionFailed => &video.transcription_callback_url,
            CallbackErrorCode::RenderFailed => &video.render_callback_url,
        };
        let delivered = self
            .callbacks
            .send("error", url, &payload, self.config.error_callback_attempts)
            .await;
        if !delivered {
            warn!(video_id = external_video_id, code = code.as_str(), "Error callback not delivered");
        }

        let error = VideoError {
            message: message.to_string(),
            code: code.as_str().to_string(),
            occurred_at: Utc::now(),
        };
        let update = with_transition(
            Update::new().set_json("error", &error)?,
            WorkflowStatus::Failed,
            Some(message.to_string()),
        )?;
        self.store.update(INTEGRATION_VIDEOS, &video.id, update).await?;
        Ok(delivered)
    }

    async fn record_callback_attempt(&self, video: &IntegrationVideo, update: Update) -> PipelineResult<()> {
        let now = Utc::now().to_rfc3339();
        let update = update
            .increment("callbackAttempts", 1)
            .set("lastCallbackAt", now.as_str())
            .set("updatedAt", now);
        self.store.update(INTEGRATION_VIDEOS, &video.id, update).await?;
        Ok(())
    }
}

fn transition(status: WorkflowStatus, note: Option<String>) -> PipelineResult<Update> {
    with_transition(Update::new(), status, note)
}

fn with_transition(
    update: Update,
    status: WorkflowStatus,
    note: Option<String>,
) -> PipelineResult<Update> {
    let entry = serde_json::to_value(WorkflowHistoryEntry::now(status, note))?;
    Ok(update
        .set("status", status.as_str())
        .set("updatedAt", Utc::now().to_rfc3339())
        .append("workflowHistory", entry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_requires_all_fields() {
        let mut params = RegisterVideo {
            external_video_id: "ext-1".into(),
            content_id: "c1".into(),
            portal_id: "p1".into(),
            video_url: "https://cdn.test/v.mp4".into(),
            transcription_callback_url: "https://cb.test/t".into(),
            render_callback_url: "https://cb.test/r".into(),
            metadata: BTreeMap::new(),
        };
        assert!(params.validate().is_ok());

        params.render_callback_url = "  ".into();
        let err = params.validate().unwrap_err();
        assert_eq!(err.to_string(), "renderCallbackUrl is required");
    }

    #[test]
    fn test_transition_appends_history() {
        let update = transition(WorkflowStatus::Failed, Some("boom".into())).unwrap();
        assert_eq!(update.set["status"], "failed");
        assert_eq!(update.append[0].0, "workflowHistory");
        assert_eq!(update.append[0].1[0]["note"], "boom");
    }
}
