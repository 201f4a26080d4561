//! Caption segment and word timing models.
//!
//! `Segment`/`Word` are the canonical, seconds-based time model. The `Raw*`
//! types accept whatever editors and stored transcripts send; the `Ms*` types
//! are the millisecond wire shape used by the integration API.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::lenient;

/// A single word with timing in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Word {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl Word {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }
}

/// A timed span of caption text with optional per-word timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Segment {
    pub id: String,
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<Word>>,
}

impl Segment {
    /// Segment duration in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Words, if any were provided or synthesized.
    pub fn words(&self) -> &[Word] {
        self.words.as_deref().unwrap_or(&[])
    }
}

/// Segment before normalization. Every field is optional and type-tolerant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient::list", skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<RawWord>>,
}

/// Word before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawWord {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
}

impl From<&Segment> for RawSegment {
    fn from(segment: &Segment) -> Self {
        Self {
            id: Some(segment.id.clone()),
            start: Some(segment.start),
            end: Some(segment.end),
            text: Some(segment.text.clone()),
            words: segment.words.as_ref().map(|words| {
                words
                    .iter()
                    .map(|w| RawWord {
                        text: Some(w.text.clone()),
                        start: Some(w.start),
                        end: Some(w.end),
                    })
                    .collect()
            }),
        }
    }
}

/// Millisecond-based segment as received from an external system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMsSegment {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub start_ms: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub end_ms: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient::list", skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<RawMsWord>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMsWord {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub start_ms: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub end_ms: Option<f64>,
}

/// Millisecond-based segment returned to an external system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MsSegment {
    pub id: String,
    pub text: String,
    pub start_ms: i64,
    pub end_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<MsWord>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MsWord {
    pub text: String,
    pub start_ms: i64,
    pub end_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_segment_tolerates_bad_fields() {
        let raw: RawSegment = serde_json::from_str(
            r#"{"id": 7, "start": "1.5", "end": null, "text": "hi", "words": [{"text": "hi"}, 3]}"#,
        )
        .unwrap();
        assert_eq!(raw.id, None);
        assert_eq!(raw.start, Some(1.5));
        assert_eq!(raw.end, None);
        assert_eq!(raw.words.unwrap().len(), 1);
    }

    #[test]
    fn test_ms_segment_uses_camel_case() {
        let seg = MsSegment {
            id: "segment_0".to_string(),
            text: "hello".to_string(),
            start_ms: 0,
            end_ms: 1200,
            words: None,
        };
        let json = serde_json::to_value(&seg).unwrap();
        assert_eq!(json["startMs"], 0);
        assert_eq!(json["endMs"], 1200);
        assert!(json.get("words").is_none());
    }

    #[test]
    fn test_segment_words_accessor() {
        let seg = Segment {
            id: "a".into(),
            start: 0.0,
            end: 1.0,
            text: "x".into(),
            words: None,
        };
        assert!(seg.words().is_empty());
        assert_eq!(seg.duration(), 1.0);
    }
}
