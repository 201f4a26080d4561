//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use autocap_pipeline::PipelineError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(e) => match e {
                PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
                PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
                PipelineError::Conflict(_) => StatusCode::CONFLICT,
                PipelineError::Disabled(_) => StatusCode::FORBIDDEN,
                PipelineError::WorkerUnreachable(_) | PipelineError::WorkerRejected { .. } => {
                    StatusCode::BAD_GATEWAY
                }
                PipelineError::CallbackFailed(_) => StatusCode::BAD_GATEWAY,
                PipelineError::Config(_)
                | PipelineError::CaptionUpload(_)
                | PipelineError::Store(_)
                | PipelineError::Storage(_)
                | PipelineError::Caption(_)
                | PipelineError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Pipeline(e) => e.code(),
        }
    }

    /// Errors whose message may carry infrastructure details.
    fn is_internal(&self) -> bool {
        matches!(
            self,
            ApiError::Pipeline(
                PipelineError::Store(_)
                    | PipelineError::Storage(_)
                    | PipelineError::Caption(_)
                    | PipelineError::Serialization(_)
                    | PipelineError::Config(_)
            )
        )
    }

    /// Caller-facing message. Worker failures keep their short summary only.
    fn detail(&self) -> String {
        match self {
            ApiError::Pipeline(PipelineError::WorkerUnreachable(_)) => {
                "Unable to reach worker".to_string()
            }
            ApiError::Pipeline(PipelineError::WorkerRejected { .. }) => {
                "Worker rejected job".to_string()
            }
            ApiError::Pipeline(PipelineError::CaptionUpload(_)) => {
                "Failed to store caption file".to_string()
            }
            _ => self.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        // Don't expose internal error details in production
        let detail = if self.is_internal()
            && std::env::var("ENVIRONMENT").unwrap_or_default() == "production"
        {
            "An internal error occurred".to_string()
        } else {
            self.detail()
        };

        let body = ErrorResponse {
            detail,
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_errors_map_to_statuses() {
        let cases = [
            (PipelineError::validation("bad"), StatusCode::BAD_REQUEST),
            (PipelineError::not_found("Upload not found"), StatusCode::NOT_FOUND),
            (PipelineError::conflict("busy"), StatusCode::CONFLICT),
            (PipelineError::disabled("Portal export disabled"), StatusCode::FORBIDDEN),
            (PipelineError::config("missing"), StatusCode::INTERNAL_SERVER_ERROR),
            (
                PipelineError::WorkerRejected {
                    status: 503,
                    reason: "full".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_worker_details_are_summarised() {
        let err = ApiError::from(PipelineError::WorkerUnreachable("connection refused".into()));
        assert_eq!(err.detail(), "Unable to reach worker");
        assert_eq!(err.code(), "WORKER_UNREACHABLE");
    }
}
