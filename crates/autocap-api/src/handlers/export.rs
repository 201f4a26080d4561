//! Portal export handlers.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use autocap_models::Portal;
use autocap_pipeline::ExportRequest;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportStartResponse {
    pub success: bool,
    pub job_id: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
}

/// `POST /api/export/start`
pub async fn start_export(
    State(state): State<AppState>,
    Json(body): Json<ExportRequest>,
) -> ApiResult<Json<ExportStartResponse>> {
    let started = state.pipeline.start_export(body).await?;
    Ok(Json(ExportStartResponse {
        success: true,
        job_id: started.job_id,
        skipped: started.skipped,
    }))
}

#[derive(Debug, Serialize)]
pub struct PortalListResponse {
    pub portals: Vec<Portal>,
}

/// `GET /api/portal/list`
pub async fn list_portals(State(state): State<AppState>) -> Json<PortalListResponse> {
    Json(PortalListResponse {
        portals: state.pipeline.portals(),
    })
}
