//! Transcripts and translations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::segment::{RawSegment, Word};

/// Transcript of an upload. Segments are stored as written by the
/// transcription service or the editor, and normalized on use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub id: String,
    pub upload_id: String,
    pub user_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
    #[serde(default)]
    pub segments: Vec<RawSegment>,
    #[serde(default)]
    pub words: Vec<Word>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Translation of a transcript into another language.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Translation {
    #[serde(default)]
    pub id: String,
    pub transcript_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub segments: Vec<RawSegment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}
