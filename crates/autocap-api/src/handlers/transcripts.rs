//! Transcript editing.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use autocap_pipeline::{TranscriptEdit, TranscriptView};

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub transcript: TranscriptView,
}

/// `PATCH /api/transcripts/:id`
pub async fn update_transcript(
    State(state): State<AppState>,
    Path(transcript_id): Path<String>,
    user: CurrentUser,
    Json(body): Json<TranscriptEdit>,
) -> ApiResult<Json<TranscriptResponse>> {
    let transcript = state
        .pipeline
        .transcripts()
        .edit(&transcript_id, &user.user_id, body)
        .await?;
    Ok(Json(TranscriptResponse { transcript }))
}
