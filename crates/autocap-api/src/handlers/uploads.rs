//! Upload asset URLs.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrlResponse {
    pub signed_url: String,
}

/// `GET /api/uploads/:id/signed-url`
pub async fn get_signed_url(
    State(state): State<AppState>,
    Path(upload_id): Path<String>,
    user: CurrentUser,
) -> ApiResult<Json<SignedUrlResponse>> {
    let signed_url = state
        .pipeline
        .uploads()
        .signed_url(&upload_id, &user.user_id)
        .await?;
    Ok(Json(SignedUrlResponse { signed_url }))
}

/// `GET /api/uploads/:id/render-url`
pub async fn get_render_url(
    State(state): State<AppState>,
    Path(upload_id): Path<String>,
    user: CurrentUser,
) -> ApiResult<Json<SignedUrlResponse>> {
    let signed_url = state
        .pipeline
        .uploads()
        .render_url(&upload_id, &user.user_id)
        .await?;
    Ok(Json(SignedUrlResponse { signed_url }))
}
