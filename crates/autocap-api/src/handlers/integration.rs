//! External integration surface.
//!
//! Every handler requires [`IntegrationAuth`]. Video ids in paths are the
//! external system's ids.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use validator::Validate;

use autocap_models::{
    CallbackErrorCode, CaptionSetStatus, CaptionTemplate, IntegrationVideo, RawMsSegment,
    Resolution, WorkflowStatus,
};
use autocap_pipeline::{
    CaptionSetMs, IntegrationRenderRequest, RegisterVideo, RenderOutcome, SaveCaptionSet,
};

use crate::auth::IntegrationAuth;
use crate::error::{ApiError, ApiResult};
use crate::security::validate_outbound_url;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResponse {
    pub video_id: String,
    pub status: WorkflowStatus,
    pub upload_id: Option<String>,
    pub caption_set_id: Option<String>,
    pub video_storage_path: Option<String>,
}

impl From<IntegrationVideo> for VideoResponse {
    fn from(video: IntegrationVideo) -> Self {
        Self {
            video_id: video.external_video_id,
            status: video.status,
            upload_id: video.upload_id,
            caption_set_id: video.caption_set_id,
            video_storage_path: video.video_storage_path,
        }
    }
}

/// `POST /api/integration/videos`
pub async fn register_video(
    State(state): State<AppState>,
    _auth: IntegrationAuth,
    Json(body): Json<RegisterVideo>,
) -> ApiResult<(StatusCode, Json<VideoResponse>)> {
    body.validate()?;
    let allow_private = state.config.allow_private_urls;
    for url in [
        &body.video_url,
        &body.transcription_callback_url,
        &body.render_callback_url,
    ] {
        validate_outbound_url(url, allow_private)
            .into_result()
            .map_err(ApiError::Validation)?;
    }

    let video = state.pipeline.integration().register_video(body).await?;
    info!(video_id = %video.external_video_id, "Integration video registered");
    Ok((StatusCode::CREATED, Json(video.into())))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LinkTranscriptionBody {
    #[serde(default)]
    #[validate(length(min = 1, message = "uploadId is required"))]
    pub upload_id: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "transcriptId is required"))]
    pub transcript_id: String,
    #[serde(default)]
    pub transcription_job_id: Option<String>,
}

/// `POST /api/integration/videos/:video_id/transcription`
pub async fn link_transcription(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    _auth: IntegrationAuth,
    Json(body): Json<LinkTranscriptionBody>,
) -> ApiResult<Json<VideoResponse>> {
    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let integration = state.pipeline.integration();
    integration
        .link_transcription(
            &video_id,
            &body.upload_id,
            &body.transcript_id,
            body.transcription_job_id,
        )
        .await?;
    let video = integration.get_video_or_err(&video_id).await?;
    Ok(Json(video.into()))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionCompleteBody {
    #[serde(default)]
    pub transcript_id: Option<String>,
}

/// `POST /api/integration/videos/:video_id/transcription/complete`
pub async fn complete_transcription(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    _auth: IntegrationAuth,
    body: Option<Json<TranscriptionCompleteBody>>,
) -> ApiResult<Json<CaptionSetMs>> {
    let transcript_id = body.and_then(|Json(b)| b.transcript_id);
    let set = state
        .pipeline
        .complete_transcription(&video_id, transcript_id)
        .await?;
    Ok(Json(set.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureReport {
    pub code: CallbackErrorCode,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct FailureAck {
    pub delivered: bool,
}

/// `POST /api/integration/videos/:video_id/failure`
pub async fn report_failure(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    _auth: IntegrationAuth,
    Json(body): Json<FailureReport>,
) -> ApiResult<Json<FailureAck>> {
    let message = if body.message.trim().is_empty() {
        match body.code {
            CallbackErrorCode::TranscriptionFailed => "Transcription failed",
            CallbackErrorCode::RenderFailed => "Render failed",
        }
        .to_string()
    } else {
        body.message
    };

    let delivered = state
        .pipeline
        .report_failure(&video_id, body.code, &message)
        .await?;
    Ok(Json(FailureAck { delivered }))
}

/// `GET /api/integration/captions/:video_id`
pub async fn get_caption_set(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    _auth: IntegrationAuth,
) -> ApiResult<Json<CaptionSetMs>> {
    state
        .pipeline
        .integration()
        .get_caption_set_ms(&video_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Caption set not found"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveCaptionSetBody {
    #[serde(default)]
    pub segments: Vec<RawMsSegment>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, Value>>,
}

/// `PUT /api/integration/captions/:video_id`
pub async fn save_caption_set(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    _auth: IntegrationAuth,
    Json(body): Json<SaveCaptionSetBody>,
) -> ApiResult<Json<CaptionSetMs>> {
    if body.segments.is_empty() {
        return Err(ApiError::Validation("segments array is required".to_string()));
    }

    let save = SaveCaptionSet {
        status: CaptionSetStatus::from_name(body.status.as_deref()),
        template: body.template.as_deref().and_then(CaptionTemplate::from_name),
        resolution: body.resolution.as_deref().and_then(Resolution::from_name),
        metadata: body.metadata,
    };
    let integration = state.pipeline.integration();
    integration
        .save_caption_set(&video_id, &body.segments, save)
        .await?;

    integration
        .get_caption_set_ms(&video_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Caption set not available after save"))
}

/// `POST /api/integration/render/:video_id`
pub async fn render_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    _auth: IntegrationAuth,
    body: Option<Json<IntegrationRenderRequest>>,
) -> ApiResult<Json<RenderOutcome>> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let outcome = state
        .pipeline
        .render_integration_video(&video_id, request)
        .await?;
    Ok(Json(outcome))
}
