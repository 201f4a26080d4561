//! Pipeline error types.

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Disabled(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to store caption file: {0}")]
    CaptionUpload(String),

    #[error("Unable to reach worker: {0}")]
    WorkerUnreachable(String),

    #[error("Worker rejected job ({status}): {reason}")]
    WorkerRejected { status: u16, reason: String },

    #[error("{0}")]
    CallbackFailed(String),

    #[error("Store error: {0}")]
    Store(#[from] autocap_firestore::FirestoreError),

    #[error("Storage error: {0}")]
    Storage(#[from] autocap_storage::StorageError),

    #[error("Caption error: {0}")]
    Caption(#[from] autocap_captions::CaptionError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn disabled(msg: impl Into<String>) -> Self {
        Self::Disabled(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn callback_failed(msg: impl Into<String>) -> Self {
        Self::CallbackFailed(msg.into())
    }

    /// Short machine-readable code, used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "VALIDATION_ERROR",
            PipelineError::NotFound(_) => "NOT_FOUND",
            PipelineError::Conflict(_) => "CONFLICT",
            PipelineError::Disabled(_) => "DISABLED",
            PipelineError::Config(_) => "CONFIGURATION_ERROR",
            PipelineError::CaptionUpload(_) => "CAPTION_UPLOAD_FAILED",
            PipelineError::WorkerUnreachable(_) => "WORKER_UNREACHABLE",
            PipelineError::WorkerRejected { .. } => "WORKER_REJECTED",
            PipelineError::CallbackFailed(_) => "CALLBACK_FAILED",
            PipelineError::Store(_) => "STORE_ERROR",
            PipelineError::Storage(_) => "STORAGE_ERROR",
            PipelineError::Caption(_) => "CAPTION_ERROR",
            PipelineError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}
