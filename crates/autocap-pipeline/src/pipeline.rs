//! The pipeline facade: one handle, built once at startup, that owns every
//! service and the shared HTTP client.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use autocap_captions::normalize_segments;
use autocap_firestore::{to_fields, DocumentStore, DocumentStoreExt, Filter, FindOptions, Update};
use autocap_models::{
    CallbackErrorCode, CaptionSet, CaptionTemplate, ExportJob, RawSegment, RenderJob,
    RenderJobStatus, RenderResult, Resolution, StyleOverrides, Transcript, UploadStatus,
    WorkflowStatus,
};
use autocap_storage::ObjectStore;

use crate::caption_source::CaptionSourceSpec;
use crate::callback::CallbackClient;
use crate::collections::{JOBS, RENDER_JOBS, TRANSCRIPTS, UPLOADS};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::export::{ExportOutcome, PortalExporter};
use crate::integration::{IntegrationTracker, VideoMirror};
use crate::portals::{list_portals, resolve_portal_url};
use crate::render::{RenderOrchestrator, RenderOutcome, RenderRequest};
use crate::transcripts::TranscriptService;
use crate::uploads::UploadAssets;
use crate::worker_client::WorkerClient;

/// Error code written to jobs the worker reports as failed.
pub const RENDER_FAILED: &str = "RENDER_FAILED";

/// Export request from the editor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    #[serde(default)]
    pub upload_id: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub portal_id: Option<String>,
    #[serde(default)]
    pub segments: Option<Vec<RawSegment>>,
    #[serde(default)]
    pub custom_styles: StyleOverrides,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportStart {
    pub job_id: String,
    pub skipped: bool,
}

/// Worker report of a finished render.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderReport {
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// Render request from the external system.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationRenderRequest {
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub caption_set_id: Option<String>,
}

#[derive(Clone)]
pub struct Pipeline {
    store: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStore>,
    config: PipelineConfig,
    renders: RenderOrchestrator,
    exporter: PortalExporter,
    integration: IntegrationTracker,
    transcripts: TranscriptService,
    uploads: UploadAssets,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
        config: PipelineConfig,
    ) -> PipelineResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.http_connect_timeout)
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| PipelineError::config(format!("Failed to build HTTP client: {e}")))?;

        let worker = WorkerClient::from_config(http.clone(), &config.worker);
        if worker.is_none() {
            warn!("Render worker not configured; renders that need the worker will fail");
        }

        let renders = RenderOrchestrator::new(
            store.clone(),
            objects.clone(),
            worker,
            config.render_lock_ttl,
        );
        let exporter = PortalExporter::new(store.clone(), http.clone(), config.export.clone());
        let callbacks = CallbackClient::new(
            http.clone(),
            config.integration.secret.clone(),
            config.integration.backoff_base,
        );
        let mirror = VideoMirror::new(http, objects.clone(), config.integration.mirror_timeout);
        let integration = IntegrationTracker::new(
            store.clone(),
            callbacks,
            mirror,
            config.integration.clone(),
        );

        Ok(Self {
            transcripts: TranscriptService::new(store.clone()),
            uploads: UploadAssets::new(store.clone(), objects.clone()),
            store,
            objects,
            config,
            renders,
            exporter,
            integration,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn renders(&self) -> &RenderOrchestrator {
        &self.renders
    }

    pub fn integration(&self) -> &IntegrationTracker {
        &self.integration
    }

    pub fn transcripts(&self) -> &TranscriptService {
        &self.transcripts
    }

    pub fn uploads(&self) -> &UploadAssets {
        &self.uploads
    }

    pub fn portals(&self) -> Vec<autocap_models::Portal> {
        list_portals(&self.config.export)
    }

    pub async fn start_render(&self, request: RenderRequest) -> PipelineResult<RenderOutcome> {
        self.renders.start_render(request).await
    }

    /// Render an upload with karaoke captions and deliver it to a portal.
    ///
    /// A reused render is delivered immediately; otherwise the export row
    /// waits on the worker job and is delivered by [`Pipeline::complete_render`].
    pub async fn start_export(&self, request: ExportRequest) -> PipelineResult<ExportStart> {
        let export_config = &self.config.export;
        if !export_config.enabled {
            return Err(PipelineError::disabled("Portal export disabled"));
        }
        if request.upload_id.trim().is_empty() || request.file_name.trim().is_empty() {
            return Err(PipelineError::validation("Missing uploadId or fileName"));
        }
        let portal_url = resolve_portal_url(export_config, request.portal_id.as_deref())
            .ok_or_else(|| PipelineError::config("Portal export URL not configured"))?;

        let mut export = ExportJob::new(
            &request.upload_id,
            &request.file_name,
            &request.description,
            Some(portal_url.clone()),
            RenderJobStatus::PendingRender,
        );
        if export_config.record_before_trigger {
            export.id = self.store.insert_as(RENDER_JOBS, &export).await?;
        }

        let mut render = RenderRequest::new(
            &request.upload_id,
            CaptionSourceSpec::from_request(request.segments, None, None),
        );
        render.template = CaptionTemplate::Karaoke;
        render.resolution = Resolution::FullHd;
        render.custom_styles = request.custom_styles;

        let outcome = match self.renders.start_render(render).await {
            Ok(outcome) => outcome,
            Err(e) => {
                if !export.id.is_empty() {
                    self.mark_trigger_failed(&export.id, &e.to_string()).await;
                }
                return Err(e);
            }
        };

        if outcome.skipped {
            let rendered_url = self.objects.public_url(&outcome.output_path);
            export.status = RenderJobStatus::Rendered;
            export.rendered_video_url = Some(rendered_url.clone());
            export.caption_hash = Some(outcome.caption_hash.clone());
            self.save_export(&mut export).await?;

            let delivery = self.exporter.deliver(&export, &portal_url, &rendered_url).await?;
            info!(
                export_id = %export.id,
                status = %delivery.status,
                "Export delivered from reused render"
            );
            return Ok(ExportStart {
                job_id: export.id,
                skipped: true,
            });
        }

        if export.id.is_empty() {
            self.save_export(&mut export).await?;
        }
        let queued = self
            .store
            .update(
                RENDER_JOBS,
                &export.id,
                Update::new()
                    .set("status", RenderJobStatus::Queued.as_str())
                    .set("workerJobId", outcome.job_id.as_str())
                    .set("updatedAt", Utc::now().to_rfc3339()),
            )
            .await;
        if let Err(e) = queued {
            self.mark_trigger_failed(&export.id, &e.to_string()).await;
            return Err(e.into());
        }

        info!(export_id = %export.id, job_id = %outcome.job_id, "Export waiting on render");
        Ok(ExportStart {
            job_id: export.id,
            skipped: false,
        })
    }

    /// Insert `export`, or overwrite its row when it was recorded earlier.
    async fn save_export(&self, export: &mut ExportJob) -> PipelineResult<()> {
        if export.id.is_empty() {
            export.id = self.store.insert_as(RENDER_JOBS, &*export).await?;
            return Ok(());
        }
        let update = Update {
            set: to_fields(&*export)?,
            ..Default::default()
        };
        self.store.update(RENDER_JOBS, &export.id, update).await?;
        Ok(())
    }

    async fn mark_trigger_failed(&self, export_id: &str, error: &str) {
        let update = Update::new()
            .set("status", RenderJobStatus::TriggerFailed.as_str())
            .set("error", error)
            .set("updatedAt", Utc::now().to_rfc3339());
        if let Err(e) = self.store.update(RENDER_JOBS, export_id, update).await {
            warn!(export_id, error = %e, "Failed to record export trigger failure");
        }
    }

    /// Record a finished render, then deliver waiting exports and notify the
    /// integration. Repeated reports of a finished job are no-ops.
    pub async fn complete_render(&self, job_id: &str, report: RenderReport) -> PipelineResult<RenderJob> {
        let mut job = self.load_job(job_id).await?;
        if matches!(job.status, RenderJobStatus::Rendered | RenderJobStatus::Exported) {
            return Ok(job);
        }
        if !job.status.can_transition_to(RenderJobStatus::Rendered) {
            return Err(PipelineError::conflict(format!("Render job is {}", job.status)));
        }

        let output_path = report
            .output_path
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| job.payload.output_path.clone());
        let download_url = report
            .download_url
            .unwrap_or_else(|| self.objects.public_url(&output_path));
        let result = RenderResult {
            output_path: output_path.clone(),
            download_url: Some(download_url.clone()),
        };
        let now = Utc::now().to_rfc3339();

        self.store
            .update(
                JOBS,
                job_id,
                Update::new()
                    .set("status", RenderJobStatus::Rendered.as_str())
                    .set_json("result", &result)?
                    .set("updated_at", now.as_str()),
            )
            .await?;
        self.store
            .update(
                UPLOADS,
                &job.upload_id,
                Update::new()
                    .set("status", UploadStatus::Rendered.as_str())
                    .set("render_asset_path", output_path.as_str())
                    .set("render_caption_hash", job.payload.caption_hash.as_str())
                    .set("updated_at", now),
            )
            .await?;
        job.status = RenderJobStatus::Rendered;
        job.result = Some(result);
        info!(job_id, upload_id = %job.upload_id, "Render completed");

        for outcome in self.deliver_waiting_exports(&job, &download_url).await? {
            info!(export_id = %outcome.job_id, status = %outcome.status, "Export burst finished");
        }

        if let Some(video_id) = job.payload.integration_video_id.as_deref() {
            if let Err(e) = self.integration.send_render_complete_callback(video_id).await {
                warn!(job_id, video_id, error = %e, "Render completion callback failed");
            }
        }
        Ok(job)
    }

    async fn deliver_waiting_exports(
        &self,
        job: &RenderJob,
        rendered_url: &str,
    ) -> PipelineResult<Vec<ExportOutcome>> {
        let waiting: Vec<ExportJob> = self
            .store
            .find_as(
                RENDER_JOBS,
                &[
                    Filter::eq("workerJobId", job.id.as_str()),
                    Filter::eq("status", RenderJobStatus::Queued.as_str()),
                ],
                FindOptions::default(),
            )
            .await?;

        let mut outcomes = Vec::with_capacity(waiting.len());
        for mut export in waiting {
            self.store
                .update(
                    RENDER_JOBS,
                    &export.id,
                    Update::new()
                        .set("status", RenderJobStatus::Rendered.as_str())
                        .set("renderedVideoUrl", rendered_url)
                        .set("captionHash", job.payload.caption_hash.as_str())
                        .set("updatedAt", Utc::now().to_rfc3339()),
                )
                .await?;
            export.rendered_video_url = Some(rendered_url.to_string());

            let portal_url = export
                .target_portal
                .clone()
                .or_else(|| self.config.export.default_url.clone());
            match portal_url {
                Some(url) => outcomes.push(self.exporter.deliver(&export, &url, rendered_url).await?),
                None => warn!(export_id = %export.id, "Export has no portal URL"),
            }
        }
        Ok(outcomes)
    }

    /// Worker progress: the job moves to `rendering` and the integration is told.
    pub async fn report_render_progress(&self, job_id: &str, progress: u8) -> PipelineResult<()> {
        let job = self.load_job(job_id).await?;
        if job.status != RenderJobStatus::Rendering {
            if !job.status.can_transition_to(RenderJobStatus::Rendering) {
                return Err(PipelineError::conflict(format!("Render job is {}", job.status)));
            }
            self.store
                .update(
                    JOBS,
                    job_id,
                    Update::new()
                        .set("status", RenderJobStatus::Rendering.as_str())
                        .set("updated_at", Utc::now().to_rfc3339()),
                )
                .await?;
        }

        if let Some(video_id) = job.payload.integration_video_id.as_deref() {
            match self.integration.send_render_progress_callback(video_id, progress).await {
                Ok(_) => {}
                Err(e) => warn!(job_id, video_id, error = %e, "Render progress callback failed"),
            }
        }
        Ok(())
    }

    /// Worker failure: the job is marked failed and the integration gets an
    /// error callback.
    pub async fn fail_render(&self, job_id: &str, message: &str) -> PipelineResult<()> {
        let job = self.load_job(job_id).await?;
        if job.status == RenderJobStatus::Failed {
            return Ok(());
        }
        if !job.status.can_transition_to(RenderJobStatus::Failed) {
            return Err(PipelineError::conflict(format!("Render job is {}", job.status)));
        }
        self.renders
            .fail_job(job_id, RENDER_FAILED, Some(message.to_string()))
            .await;
        crate::metrics::record_render_failed(RENDER_FAILED);

        if let Some(video_id) = job.payload.integration_video_id.as_deref() {
            if let Err(e) = self
                .integration
                .send_error_callback(video_id, CallbackErrorCode::RenderFailed, message)
                .await
            {
                warn!(job_id, video_id, error = %e, "Render error callback failed");
            }
        }
        Ok(())
    }

    async fn load_job(&self, job_id: &str) -> PipelineResult<RenderJob> {
        self.renders
            .get_job(job_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("Render job not found"))
    }

    /// Transcription finished: draft a caption set from the transcript and
    /// ask the external system for approval.
    pub async fn complete_transcription(
        &self,
        external_video_id: &str,
        transcript_id: Option<String>,
    ) -> PipelineResult<CaptionSet> {
        let video = self.integration.get_video_or_err(external_video_id).await?;
        let transcript_id = transcript_id
            .or(video.transcript_id)
            .ok_or_else(|| PipelineError::validation("transcriptId is required"))?;
        let transcript: Transcript = self
            .store
            .get_as(TRANSCRIPTS, &transcript_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("Transcript not found"))?;

        let segments = normalize_segments(&transcript.segments, &transcript.text);
        let set = self
            .integration
            .ensure_caption_draft(
                external_video_id,
                Some(transcript_id),
                segments,
                CaptionTemplate::Karaoke,
            )
            .await?;
        self.integration.send_transcription_callback(external_video_id).await?;
        Ok(set)
    }

    /// Render the approved caption set of an integration video.
    pub async fn render_integration_video(
        &self,
        external_video_id: &str,
        request: IntegrationRenderRequest,
    ) -> PipelineResult<RenderOutcome> {
        let video = self
            .integration
            .get_video(external_video_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("Video not registered"))?;
        let upload_id = video
            .upload_id
            .clone()
            .ok_or_else(|| PipelineError::conflict("Upload linkage missing"))?;
        let set = self
            .integration
            .get_caption_set(external_video_id)
            .await?
            .ok_or_else(|| PipelineError::conflict("Caption set not ready"))?;
        if request.caption_set_id.as_deref().is_some_and(|id| id != set.id) {
            return Err(PipelineError::conflict("Caption set mismatch"));
        }
        if self.renders.get_upload(&upload_id).await?.is_none() {
            return Err(PipelineError::not_found("Upload not found"));
        }

        let template = request
            .template
            .as_deref()
            .and_then(CaptionTemplate::from_name)
            .unwrap_or(set.template);
        let resolution = request
            .resolution
            .as_deref()
            .and_then(Resolution::from_name)
            .or(set.resolution)
            .unwrap_or_default();

        self.integration
            .update_status(external_video_id, WorkflowStatus::ApprovedRendering, None)
            .await?;

        let mut render = RenderRequest::new(
            &upload_id,
            CaptionSourceSpec::Prepared {
                segments: set.segments.clone(),
                transcript_id: set.transcript_id.clone(),
            },
        );
        render.template = template;
        render.resolution = resolution;
        render.integration_video_id = Some(external_video_id.to_string());

        let outcome = match self.renders.start_render(render).await {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Err(status_err) = self
                    .integration
                    .update_status(
                        external_video_id,
                        WorkflowStatus::Failed,
                        Some(format!("Render failed: {e}")),
                    )
                    .await
                {
                    warn!(video_id = external_video_id, error = %status_err, "Failed to record render failure");
                }
                return Err(e);
            }
        };

        self.integration
            .link_render_job(
                external_video_id,
                &outcome.job_id,
                json!({
                    "template": template.as_str(),
                    "resolution": resolution.as_str(),
                    "captionSetId": set.id,
                }),
            )
            .await?;

        let tracker = self.integration.clone();
        let video_id = external_video_id.to_string();
        let skipped = outcome.skipped;
        tokio::spawn(async move {
            let result = if skipped {
                tracker.send_render_complete_callback(&video_id).await
            } else {
                tracker.send_render_progress_callback(&video_id, 0).await.map(|_| ())
            };
            if let Err(e) = result {
                warn!(video_id = %video_id, error = %e, "Initial render callback failed");
            }
        });

        Ok(outcome)
    }

    /// Report a failed transcription or render to the external system.
    pub async fn report_failure(
        &self,
        external_video_id: &str,
        code: CallbackErrorCode,
        message: &str,
    ) -> PipelineResult<bool> {
        self.integration
            .send_error_callback(external_video_id, code, message)
            .await
    }
}
