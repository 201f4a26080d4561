//! Render job orchestration.
//!
//! ```text
//! resolve captions -> lock upload -> insert job (pending_render)
//!     hash matches previous render -> job rendered, worker not called
//!     otherwise -> queued -> caption uploaded -> upload rendering -> worker
//! ```
//!
//! Every failure after the job row exists is written back to the row before
//! the error is returned.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tracing::Instrument;

use autocap_captions::{build_caption_file, build_emoji_overlays, CaptionFile};
use autocap_firestore::{DocumentStore, DocumentStoreExt, FirestoreResult, Update};
use autocap_models::{
    CaptionTemplate, Overlay, RenderJob, RenderJobStatus, RenderPayload, RenderResult,
    Resolution, StyleOverrides, Upload, UploadStatus,
};
use autocap_storage::ObjectStore;

use crate::caption_source::{resolve_caption_source, CaptionSource, CaptionSourceSpec};
use crate::collections::{caption_path, render_output_path, JOBS, UPLOADS};
use crate::error::{PipelineError, PipelineResult};
use crate::lock::RenderLock;
use crate::logging::JobLogger;
use crate::metrics;
use crate::worker_client::{WorkerClient, WorkerRenderRequest};

/// Error codes written to failed jobs.
pub const CAPTION_UPLOAD_FAILED: &str = "CAPTION_UPLOAD_FAILED";
pub const WORKER_REJECTED: &str = "WORKER_REJECTED";
pub const WORKER_UNREACHABLE: &str = "Worker unreachable";
pub const WORKER_NOT_CONFIGURED: &str = "Worker configuration missing";
pub const STORE_UPDATE_FAILED: &str = "STORE_UPDATE_FAILED";

#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub upload_id: String,
    /// Scope lookups to this user. `None` for trusted callers.
    pub user_id: Option<String>,
    pub template: CaptionTemplate,
    pub resolution: Resolution,
    pub source: CaptionSourceSpec,
    pub custom_styles: StyleOverrides,
    pub integration_video_id: Option<String>,
}

impl RenderRequest {
    pub fn new(upload_id: impl Into<String>, source: CaptionSourceSpec) -> Self {
        Self {
            upload_id: upload_id.into(),
            user_id: None,
            template: CaptionTemplate::default(),
            resolution: Resolution::default(),
            source,
            custom_styles: StyleOverrides::default(),
            integration_video_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOutcome {
    pub job_id: String,
    pub upload_id: String,
    pub caption_path: String,
    pub video_path: String,
    pub output_path: String,
    pub status: RenderJobStatus,
    pub skipped: bool,
    pub caption_hash: String,
}

/// Caption artifacts built for one request.
struct BuiltCaptions {
    source: CaptionSource,
    file: CaptionFile,
    hash: String,
    overlays: Vec<Overlay>,
}

#[derive(Clone)]
pub struct RenderOrchestrator {
    store: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStore>,
    worker: Option<WorkerClient>,
    lock_ttl: Duration,
}

impl RenderOrchestrator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
        worker: Option<WorkerClient>,
        lock_ttl: Duration,
    ) -> Self {
        Self {
            store,
            objects,
            worker,
            lock_ttl,
        }
    }

    pub async fn get_job(&self, job_id: &str) -> PipelineResult<Option<RenderJob>> {
        Ok(self.store.get_as(JOBS, job_id).await?)
    }

    pub async fn get_upload(&self, upload_id: &str) -> PipelineResult<Option<Upload>> {
        Ok(self.store.get_as(UPLOADS, upload_id).await?)
    }

    /// Build captions for `request` and either reuse the previous render or
    /// dispatch a new job to the worker.
    pub async fn start_render(&self, request: RenderRequest) -> PipelineResult<RenderOutcome> {
        let upload = self.load_upload(&request).await?;
        let built = self.build_captions(&request, &upload).await?;

        let lock = RenderLock::acquire(self.store.clone(), &upload.id, self.lock_ttl).await?;
        let result = self.render_locked(&request, built).await;
        lock.release().await;
        result
    }

    async fn load_upload(&self, request: &RenderRequest) -> PipelineResult<Upload> {
        let upload = self
            .get_upload(&request.upload_id)
            .await?
            .filter(|u| request.user_id.as_deref().map_or(true, |user| user == u.user_id));
        upload.ok_or_else(|| {
            tracing::info!(
                upload_id = %request.upload_id,
                user_id = ?request.user_id,
                "Upload not found"
            );
            PipelineError::not_found("Upload not found")
        })
    }

    async fn build_captions(
        &self,
        request: &RenderRequest,
        upload: &Upload,
    ) -> PipelineResult<BuiltCaptions> {
        let source = resolve_caption_source(
            self.store.as_ref(),
            &upload.id,
            request.user_id.as_deref(),
            request.template,
            request.source.clone(),
        )
        .await?;

        let (width, height) = request.resolution.dimensions();
        let styles = request.custom_styles.clone().with_canvas(width, height);
        let file = build_caption_file(request.template, &source.segments, &styles);
        let overlays = build_emoji_overlays(request.template, &source.segments, &styles);
        let hash = file.content_hash();

        tracing::debug!(
            upload_id = %upload.id,
            segments = source.segments.len(),
            overlays = overlays.len(),
            "Built render captions"
        );

        Ok(BuiltCaptions {
            source,
            file,
            hash,
            overlays,
        })
    }

    async fn render_locked(
        &self,
        request: &RenderRequest,
        built: BuiltCaptions,
    ) -> PipelineResult<RenderOutcome> {
        // Re-read under the lock; a render that finished meanwhile may now be reusable.
        let upload = self.load_upload(request).await?;

        let payload = RenderPayload {
            template: request.template,
            resolution: request.resolution,
            transcript_id: built.source.transcript_id.clone(),
            translation_id: built.source.translation_id.clone(),
            video_path: upload.storage_path.clone(),
            caption_path: String::new(),
            caption_format: built.file.format,
            caption_hash: built.hash.clone(),
            output_path: String::new(),
            segments_provided: request.source.is_inline(),
            segment_count: built.source.segments.len(),
            overlays: built.overlays.clone(),
            integration_video_id: request.integration_video_id.clone(),
        };
        let job = RenderJob::new(&upload.id, &upload.user_id, payload);
        self.store.create_as(JOBS, job.id.as_str(), &job).await?;
        metrics::record_render_created(request.template.as_str());

        let logger = JobLogger::new(&job.id, &upload.id, "render");
        let span = logger.create_span();

        async {
            logger.log_start(&format!(
                "template={} resolution={} segments={}",
                request.template,
                request.resolution,
                built.source.segments.len()
            ));

            if upload.can_reuse_render(&built.hash) {
                return self.reuse_render(job, &upload, &logger).await;
            }
            self.dispatch(request, job, &upload, built, &logger).await
        }
        .instrument(span)
        .await
    }

    async fn reuse_render(
        &self,
        mut job: RenderJob,
        upload: &Upload,
        logger: &JobLogger,
    ) -> PipelineResult<RenderOutcome> {
        let rendered_path = upload.render_asset_path.clone().unwrap_or_default();
        let caption_path = upload.caption_asset_path.clone().unwrap_or_default();
        job.payload.caption_path = caption_path.clone();
        job.payload.output_path = rendered_path.clone();
        let result = RenderResult {
            output_path: rendered_path.clone(),
            download_url: Some(self.objects.public_url(&rendered_path)),
        };

        let rendered = Update::new()
            .set("status", RenderJobStatus::Rendered.as_str())
            .set_json("payload", &job.payload)
            .and_then(|u| u.set_json("result", &result))
            .map(|u| u.set("updated_at", Utc::now().to_rfc3339()));
        self.update_or_fail(JOBS, job.id.as_str(), rendered, job.id.as_str(), logger)
            .await?;

        metrics::record_render_skipped();
        logger.log_completion("caption hash matches previous render, reusing asset");

        Ok(RenderOutcome {
            job_id: job.id.to_string(),
            upload_id: upload.id.clone(),
            caption_path,
            video_path: upload.storage_path.clone(),
            output_path: rendered_path,
            status: RenderJobStatus::Rendered,
            skipped: true,
            caption_hash: job.payload.caption_hash,
        })
    }

    async fn dispatch(
        &self,
        request: &RenderRequest,
        mut job: RenderJob,
        upload: &Upload,
        built: BuiltCaptions,
        logger: &JobLogger,
    ) -> PipelineResult<RenderOutcome> {
        let job_id = job.id.clone();
        let Some(worker) = self.worker.as_ref() else {
            logger.log_error(WORKER_NOT_CONFIGURED);
            self.fail_job(job_id.as_str(), WORKER_NOT_CONFIGURED, None).await;
            return Err(PipelineError::config(
                "FFMPEG_WORKER_URL and WORKER_JWT_SECRET must be set",
            ));
        };

        let format = built.file.format;
        let caption_path = caption_path(&upload.user_id, &upload.id, job_id.as_str(), format.extension());
        let output_path = render_output_path(&upload.user_id, job_id.as_str());
        job.payload.caption_path = caption_path.clone();
        job.payload.output_path = output_path.clone();

        let queued = Update::new()
            .set("status", RenderJobStatus::Queued.as_str())
            .set_json("payload", &job.payload)
            .map(|u| u.set("updated_at", Utc::now().to_rfc3339()));
        self.update_or_fail(JOBS, job_id.as_str(), queued, job_id.as_str(), logger)
            .await?;

        let content_type = built.file.content_type();
        if let Err(e) = self
            .objects
            .upload_file(&caption_path, built.file.into_bytes(), content_type)
            .await
        {
            logger.log_error(&format!("caption upload failed: {e}"));
            self.fail_job(job_id.as_str(), CAPTION_UPLOAD_FAILED, Some(e.to_string()))
                .await;
            metrics::record_render_failed(CAPTION_UPLOAD_FAILED);
            return Err(PipelineError::CaptionUpload(e.to_string()));
        }

        let rendering = Update::new()
            .set("status", UploadStatus::Rendering.as_str())
            .set("caption_asset_path", caption_path.as_str())
            .set("updated_at", Utc::now().to_rfc3339());
        self.update_or_fail(UPLOADS, &upload.id, Ok(rendering), job_id.as_str(), logger)
            .await?;

        let worker_request = WorkerRenderRequest {
            job_id: job_id.to_string(),
            upload_id: upload.id.clone(),
            video_path: upload.storage_path.clone(),
            caption_path: caption_path.clone(),
            caption_format: format,
            template: request.template,
            resolution: request.resolution,
            output_path: output_path.clone(),
            overlays: built.overlays,
            integration_video_id: request.integration_video_id.clone(),
        };

        let started = Instant::now();
        if let Err(e) = worker.dispatch(&worker_request).await {
            let (code, reason) = match &e {
                PipelineError::WorkerUnreachable(reason) => (WORKER_UNREACHABLE, reason.clone()),
                PipelineError::WorkerRejected { reason, .. } => (WORKER_REJECTED, reason.clone()),
                other => (WORKER_REJECTED, other.to_string()),
            };
            logger.log_error(&format!("{code}: {reason}"));
            self.fail_job(job_id.as_str(), code, Some(reason)).await;
            metrics::record_render_failed(code);
            return Err(e);
        }
        metrics::record_render_dispatched(started.elapsed().as_secs_f64());
        logger.log_progress("dispatched to worker");

        Ok(RenderOutcome {
            job_id: job_id.to_string(),
            upload_id: upload.id.clone(),
            caption_path,
            video_path: upload.storage_path.clone(),
            output_path,
            status: RenderJobStatus::Queued,
            skipped: false,
            caption_hash: built.hash,
        })
    }

    /// Apply `update`, marking the job failed before surfacing any error.
    async fn update_or_fail(
        &self,
        collection: &str,
        id: &str,
        update: FirestoreResult<Update>,
        job_id: &str,
        logger: &JobLogger,
    ) -> PipelineResult<()> {
        let result = match update {
            Ok(update) => self.store.update(collection, id, update).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            logger.log_error(&format!("{collection} update failed: {e}"));
            self.fail_job(job_id, STORE_UPDATE_FAILED, Some(e.to_string()))
                .await;
            metrics::record_render_failed(STORE_UPDATE_FAILED);
            return Err(e.into());
        }
        Ok(())
    }

    /// Mark a job failed. Used on error paths, so a store failure only warns.
    pub async fn fail_job(&self, job_id: &str, error: &str, reason: Option<String>) {
        let update = Update::new()
            .set("status", RenderJobStatus::Failed.as_str())
            .set("error", error)
            .set_opt("failure_reason", reason)
            .set("updated_at", Utc::now().to_rfc3339());
        if let Err(e) = self.store.update(JOBS, job_id, update).await {
            tracing::warn!(job_id, error = %e, "Failed to record job failure");
        }
    }
}
