//! Shared data models for the caption rendering pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Caption segments and word timings (seconds and millisecond payloads)
//! - Caption templates, output formats and render resolutions
//! - Style overrides sent by the editor
//! - Uploads, transcripts and translations
//! - Render jobs, export jobs and emoji overlays
//! - Integration videos, caption sets and callback payloads

pub mod caption_set;
pub mod export_job;
pub mod integration;
pub mod lenient;
pub mod overlay;
pub mod render_job;
pub mod segment;
pub mod style;
pub mod template;
pub mod transcript;
pub mod upload;

// Re-export common types
pub use caption_set::{CaptionSet, CaptionSetStatus};
pub use export_job::{ExportJob, ExportPayload, Portal, EXPORT_SOURCE};
pub use integration::{
    CallbackError, CallbackErrorCode, CallbackPayload, IntegrationVideo, VideoError,
    WorkflowHistoryEntry, WorkflowStatus,
};
pub use overlay::Overlay;
pub use render_job::{JobId, RenderJob, RenderJobStatus, RenderPayload, RenderResult};
pub use segment::{MsSegment, MsWord, RawMsSegment, RawMsWord, RawSegment, RawWord, Segment, Word};
pub use style::StyleOverrides;
pub use template::{CaptionFormat, CaptionTemplate, Resolution};
pub use transcript::{Transcript, Translation};
pub use upload::{Upload, UploadStatus};
