//! Error types for caption building.

use thiserror::Error;

/// Result type for caption operations.
pub type CaptionResult<T> = Result<T, CaptionError>;

#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("Unknown caption template: {0}")]
    UnknownTemplate(String),
}

impl CaptionError {
    pub fn unknown_template(name: impl Into<String>) -> Self {
        Self::UnknownTemplate(name.into())
    }
}
