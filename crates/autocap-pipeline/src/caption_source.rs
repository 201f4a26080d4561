//! Where a render's caption segments come from.

use autocap_captions::normalize_segments;
use autocap_firestore::{DocumentStore, DocumentStoreExt, Filter, FindOptions};
use autocap_models::{CaptionTemplate, RawSegment, Segment, Transcript, Translation};

use crate::collections::{TRANSCRIPTS, TRANSLATIONS};
use crate::error::{PipelineError, PipelineResult};

/// Caption source of a render request, in resolution priority order.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptionSourceSpec {
    /// Segments sent with the request (live editor state).
    Inline {
        segments: Vec<RawSegment>,
        transcript_id: Option<String>,
        translation_id: Option<String>,
    },
    /// Segments that were normalized when they were saved.
    Prepared {
        segments: Vec<Segment>,
        transcript_id: Option<String>,
    },
    Translation(String),
    Transcript(String),
    LatestTranscript,
}

impl CaptionSourceSpec {
    /// Pick the source from optional request fields: non-empty segments win,
    /// then a translation id, then a transcript id, then the latest transcript.
    pub fn from_request(
        segments: Option<Vec<RawSegment>>,
        translation_id: Option<String>,
        transcript_id: Option<String>,
    ) -> Self {
        match segments.filter(|s| !s.is_empty()) {
            Some(segments) => CaptionSourceSpec::Inline {
                segments,
                transcript_id,
                translation_id,
            },
            None => match (translation_id, transcript_id) {
                (Some(id), _) => CaptionSourceSpec::Translation(id),
                (None, Some(id)) => CaptionSourceSpec::Transcript(id),
                (None, None) => CaptionSourceSpec::LatestTranscript,
            },
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            CaptionSourceSpec::Inline { .. } | CaptionSourceSpec::Prepared { .. }
        )
    }
}

/// Resolved caption segments plus provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionSource {
    pub transcript_id: Option<String>,
    pub translation_id: Option<String>,
    pub segments: Vec<Segment>,
}

/// Resolve `requested` for `upload_id`. When `user_id` is set, transcripts and
/// translations must belong to that user.
pub async fn resolve_caption_source(
    store: &dyn DocumentStore,
    upload_id: &str,
    user_id: Option<&str>,
    template: CaptionTemplate,
    requested: CaptionSourceSpec,
) -> PipelineResult<CaptionSource> {
    match requested {
        CaptionSourceSpec::Inline {
            mut segments,
            transcript_id,
            translation_id,
        } => {
            // Karaoke highlights word by word; editor word timings go stale
            // after text edits, so words are rebuilt from the text.
            if template == CaptionTemplate::Karaoke {
                for segment in &mut segments {
                    segment.words = None;
                }
            }
            Ok(CaptionSource {
                transcript_id,
                translation_id,
                segments: normalize_segments(&segments, ""),
            })
        }

        CaptionSourceSpec::Prepared {
            segments,
            transcript_id,
        } => Ok(CaptionSource {
            transcript_id,
            translation_id: None,
            segments,
        }),

        CaptionSourceSpec::Translation(translation_id) => {
            let translation: Translation = store
                .get_as(TRANSLATIONS, &translation_id)
                .await?
                .filter(|t: &Translation| owned_by(user_id, &t.user_id))
                .ok_or_else(|| PipelineError::not_found("Translation not found"))?;

            let transcript: Option<Transcript> =
                store.get_as(TRANSCRIPTS, &translation.transcript_id).await?;
            if !transcript.is_some_and(|t| t.upload_id == upload_id) {
                return Err(PipelineError::not_found(
                    "Translation not found for this upload",
                ));
            }

            Ok(CaptionSource {
                transcript_id: Some(translation.transcript_id.clone()),
                translation_id: Some(translation.id.clone()),
                segments: normalize_segments(&translation.segments, &translation.text),
            })
        }

        CaptionSourceSpec::Transcript(transcript_id) => {
            let transcript: Transcript = store
                .get_as(TRANSCRIPTS, &transcript_id)
                .await?
                .filter(|t: &Transcript| owned_by(user_id, &t.user_id))
                .ok_or_else(|| PipelineError::not_found("Transcript not found"))?;
            Ok(from_transcript(transcript))
        }

        CaptionSourceSpec::LatestTranscript => {
            let transcript = latest_transcript(store, upload_id, user_id)
                .await?
                .ok_or_else(|| PipelineError::not_found("Transcript not found"))?;
            Ok(from_transcript(transcript))
        }
    }
}

/// Most recently created transcript of an upload.
pub async fn latest_transcript(
    store: &dyn DocumentStore,
    upload_id: &str,
    user_id: Option<&str>,
) -> PipelineResult<Option<Transcript>> {
    let mut filters = vec![Filter::eq("upload_id", upload_id)];
    if let Some(user_id) = user_id {
        filters.push(Filter::eq("user_id", user_id));
    }
    Ok(store
        .find_one_as(TRANSCRIPTS, &filters, FindOptions::newest_first("created_at"))
        .await?)
}

fn from_transcript(transcript: Transcript) -> CaptionSource {
    CaptionSource {
        segments: normalize_segments(&transcript.segments, &transcript.text),
        transcript_id: Some(transcript.id),
        translation_id: None,
    }
}

fn owned_by(user_id: Option<&str>, owner: &str) -> bool {
    user_id.map_or(true, |user| user == owner)
}
