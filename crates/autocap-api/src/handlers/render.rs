//! Editor render requests.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use autocap_models::{CaptionTemplate, RawSegment, Resolution, StyleOverrides};
use autocap_pipeline::{CaptionSourceSpec, RenderOutcome, RenderRequest};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RenderVideoRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "uploadId is required"))]
    pub upload_id: String,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub segments: Option<Vec<RawSegment>>,
    #[serde(default)]
    pub translation_id: Option<String>,
    #[serde(default)]
    pub transcript_id: Option<String>,
    #[serde(default)]
    pub custom_styles: StyleOverrides,
}

impl RenderVideoRequest {
    fn into_render_request(self, user_id: String) -> ApiResult<RenderRequest> {
        let template = match self.template.as_deref() {
            None => CaptionTemplate::default(),
            Some(name) => CaptionTemplate::from_name(name)
                .ok_or_else(|| ApiError::Validation(format!("Unknown template: {name}")))?,
        };

        let mut request = RenderRequest::new(
            self.upload_id,
            CaptionSourceSpec::from_request(self.segments, self.translation_id, self.transcript_id),
        );
        request.user_id = Some(user_id);
        request.template = template;
        request.resolution = Resolution::parse_or_default(self.resolution.as_deref());
        request.custom_styles = self.custom_styles;
        Ok(request)
    }
}

/// `POST /api/videos/render`
pub async fn render_video(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<RenderVideoRequest>,
) -> ApiResult<Json<RenderOutcome>> {
    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let request = body.into_render_request(user.user_id)?;
    info!(
        upload_id = %request.upload_id,
        template = request.template.as_str(),
        resolution = request.resolution.as_str(),
        "Render requested"
    );

    let outcome = state.pipeline.start_render(request).await?;
    Ok(Json(outcome))
}
