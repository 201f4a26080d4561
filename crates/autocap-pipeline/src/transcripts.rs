//! Transcript edits from the caption editor.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use autocap_captions::normalize_segments;
use autocap_firestore::{DocumentStore, DocumentStoreExt, Update};
use autocap_models::{RawSegment, Segment, Transcript, Word};

use crate::collections::{TRANSCRIPTS, UPLOADS};
use crate::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranscriptEdit {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub segments: Option<Vec<RawSegment>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptView {
    pub id: String,
    pub text: String,
    pub segments: Vec<Segment>,
    pub source_language: Option<String>,
}

#[derive(Clone)]
pub struct TranscriptService {
    store: Arc<dyn DocumentStore>,
}

impl TranscriptService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Replace a transcript's text and segments. Segments are normalized
    /// against the new text; the upload's `latest_transcript_id` follows on a
    /// best-effort basis.
    pub async fn edit(
        &self,
        transcript_id: &str,
        user_id: &str,
        edit: TranscriptEdit,
    ) -> PipelineResult<TranscriptView> {
        let text = edit.text.trim().to_string();
        if text.is_empty() {
            return Err(PipelineError::validation("Transcript text is required"));
        }
        let language = edit.language.map(|l| l.trim().to_string());
        if language.as_ref().is_some_and(|l| l.chars().count() < 2) {
            return Err(PipelineError::validation(
                "Language must be at least 2 characters",
            ));
        }

        let transcript: Transcript = self
            .store
            .get_as(TRANSCRIPTS, transcript_id)
            .await?
            .filter(|t: &Transcript| t.user_id == user_id)
            .ok_or_else(|| PipelineError::not_found("Transcript not found"))?;

        let segments = normalize_segments(edit.segments.as_deref().unwrap_or_default(), &text);
        let words: Vec<Word> = segments
            .iter()
            .flat_map(|segment| segment.words().iter().cloned())
            .collect();
        let source_language = language.or(transcript.source_language);
        let now = Utc::now().to_rfc3339();

        self.store
            .update(
                TRANSCRIPTS,
                transcript_id,
                Update::new()
                    .set("text", text.as_str())
                    .set_opt("source_language", source_language.clone())
                    .set_json("segments", &segments)?
                    .set_json("words", &words)?
                    .set("updated_at", now.as_str()),
            )
            .await?;

        if let Err(e) = self
            .store
            .update(
                UPLOADS,
                &transcript.upload_id,
                Update::new()
                    .set("latest_transcript_id", transcript_id)
                    .set("updated_at", now),
            )
            .await
        {
            warn!(
                upload_id = %transcript.upload_id,
                transcript_id,
                error = %e,
                "Failed to update latest transcript on upload"
            );
        }

        info!(transcript_id, segments = segments.len(), "Transcript updated");
        Ok(TranscriptView {
            id: transcript_id.to_string(),
            text,
            segments,
            source_language,
        })
    }
}
