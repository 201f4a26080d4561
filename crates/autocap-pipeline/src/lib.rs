//! Caption render orchestration.
//!
//! This crate coordinates everything around a render:
//! - Caption source resolution and hash-based render reuse
//! - Single-flight render locks per upload
//! - Signed dispatch to the render worker and completion handling
//! - Portal export with backoff bookkeeping
//! - Integration workflow tracking with signed callbacks
//! - Transcript edits and upload asset URLs

pub mod callback;
pub mod caption_source;
pub mod collections;
pub mod config;
pub mod error;
pub mod export;
pub mod integration;
pub mod lock;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod portals;
pub mod render;
pub mod retry;
pub mod transcripts;
pub mod uploads;
pub mod worker_client;

pub use callback::{sign_payload, verify_signature, CallbackClient, SIGNATURE_HEADER};
pub use caption_source::{CaptionSource, CaptionSourceSpec};
pub use config::{ExportConfig, IntegrationConfig, PipelineConfig, WorkerConfig};
pub use error::{PipelineError, PipelineResult};
pub use export::{ExportOutcome, PortalExporter};
pub use integration::{CaptionSetMs, IntegrationTracker, RegisterVideo, SaveCaptionSet};
pub use pipeline::{ExportRequest, ExportStart, IntegrationRenderRequest, Pipeline, RenderReport};
pub use render::{RenderOrchestrator, RenderOutcome, RenderRequest};
pub use transcripts::{TranscriptEdit, TranscriptService, TranscriptView};
pub use uploads::UploadAssets;
pub use worker_client::{sign_worker_token, verify_worker_token, WorkerClaims, WorkerClient};
