//! Render worker reports.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use autocap_models::RenderJobStatus;
use autocap_pipeline::RenderReport;

use crate::auth::WorkerAuth;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAck {
    pub job_id: String,
    pub status: RenderJobStatus,
}

/// `POST /api/render/jobs/:job_id/complete`
pub async fn complete_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    worker: WorkerAuth,
    body: Option<Json<RenderReport>>,
) -> ApiResult<Json<JobAck>> {
    worker.ensure_job(&job_id)?;
    let report = body.map(|Json(r)| r).unwrap_or_default();

    let job = state.pipeline.complete_render(&job_id, report).await?;
    info!(job_id = %job_id, "Worker reported render complete");
    Ok(Json(JobAck {
        job_id,
        status: job.status,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ProgressBody {
    pub progress: u8,
}

/// `POST /api/render/jobs/:job_id/progress`
pub async fn report_progress(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    worker: WorkerAuth,
    Json(body): Json<ProgressBody>,
) -> ApiResult<Json<JobAck>> {
    worker.ensure_job(&job_id)?;
    state
        .pipeline
        .report_render_progress(&job_id, body.progress.min(100))
        .await?;
    Ok(Json(JobAck {
        job_id,
        status: RenderJobStatus::Rendering,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct FailureBody {
    #[serde(default, alias = "message")]
    pub error: Option<String>,
}

/// `POST /api/render/jobs/:job_id/fail`
pub async fn fail_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    worker: WorkerAuth,
    body: Option<Json<FailureBody>>,
) -> ApiResult<Json<JobAck>> {
    worker.ensure_job(&job_id)?;
    let message = body
        .and_then(|Json(b)| b.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| "Render failed".to_string());

    state.pipeline.fail_render(&job_id, &message).await?;
    Ok(Json(JobAck {
        job_id,
        status: RenderJobStatus::Failed,
    }))
}
