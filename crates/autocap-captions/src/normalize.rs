//! Segment normalization.
//!
//! Turns editor input, stored transcripts, free text and millisecond
//! payloads into canonical [`Segment`]s:
//! - `end > start` for every segment
//! - unique, deterministic ids (`segment_<index>` when missing)
//! - words clipped to their segment, synthesized evenly when absent

use std::collections::HashSet;

use autocap_models::{MsSegment, MsWord, RawMsSegment, RawSegment, Segment, Word};

use crate::time::{ms_to_seconds, seconds_to_ms};

/// Fallback spacing between segments without a start time (seconds).
const FALLBACK_SEGMENT_SPACING: f64 = 2.0;
/// Minimum duration of a segment derived from its text (seconds).
const MIN_SEGMENT_DURATION: f64 = 1.2;
/// Characters per second used to derive a missing segment end.
const CHARS_PER_SECOND: f64 = 10.0;
/// Default word length when a provided word lacks timing (seconds).
const DEFAULT_WORD_DURATION: f64 = 0.2;
/// Minimum derived word length (seconds).
const MIN_WORD_DURATION: f64 = 0.06;

// Sentence fallback
const SENTENCE_CHARS_PER_SECOND: f64 = 8.0;
const MIN_SENTENCE_DURATION: f64 = 1.5;

// Millisecond payloads
const FALLBACK_SEGMENT_SPACING_MS: f64 = 2000.0;
const DEFAULT_SEGMENT_DURATION_MS: f64 = 800.0;
const MIN_SEGMENT_DURATION_MS: f64 = 200.0;
const FALLBACK_WORD_SPACING_MS: f64 = 120.0;
const MIN_WORD_DURATION_MS: f64 = 60.0;

/// Normalize raw segments, or derive segments from `fallback_text` when
/// there are none.
pub fn normalize_segments(raw: &[RawSegment], fallback_text: &str) -> Vec<Segment> {
    if raw.is_empty() {
        return segments_from_text(fallback_text);
    }

    let mut ids = UniqueIds::default();
    raw.iter()
        .enumerate()
        .map(|(index, segment)| normalize_segment(index, segment, &mut ids))
        .collect()
}

fn normalize_segment(index: usize, raw: &RawSegment, ids: &mut UniqueIds) -> Segment {
    let text = raw.text.as_deref().unwrap_or("").trim().to_string();

    let start = raw
        .start
        .unwrap_or(index as f64 * FALLBACK_SEGMENT_SPACING)
        .max(0.0);
    let end = match raw.end {
        Some(end) if end > start => end,
        _ => start + derived_duration(&text),
    };

    let provided: Vec<Word> = raw
        .words
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .enumerate()
        .filter_map(|(word_index, word)| {
            let word_text = word.text.as_deref().unwrap_or("").trim();
            if word_text.is_empty() {
                return None;
            }
            let word_start = word
                .start
                .unwrap_or(start + word_index as f64 * DEFAULT_WORD_DURATION);
            let word_end = word
                .end
                .unwrap_or(word_start + DEFAULT_WORD_DURATION)
                .max(word_start + MIN_WORD_DURATION);
            Some(clip_word(word_text, word_start, word_end, start, end))
        })
        .collect();

    let words = if provided.is_empty() {
        synthesize_words(&text, start, end)
    } else {
        Some(provided)
    };

    Segment {
        id: ids.assign(raw.id.as_deref(), index),
        start,
        end,
        text,
        words,
    }
}

fn derived_duration(text: &str) -> f64 {
    (text.chars().count() as f64 / CHARS_PER_SECOND).max(MIN_SEGMENT_DURATION)
}

fn clip_word(text: &str, start: f64, end: f64, window_start: f64, window_end: f64) -> Word {
    let start = start.max(window_start).min(window_end);
    let end = end.min(window_end).max(start);
    Word::new(text, start, end)
}

/// Split `text` on whitespace and spread the tokens evenly over
/// `[start, end]`. Boundaries are computed from the segment start so the
/// words tile the window exactly; the last word ends at `end`.
pub fn synthesize_words(text: &str, start: f64, end: f64) -> Option<Vec<Word>> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    let count = tokens.len();
    let duration = (end - start).max(0.0);
    let boundary = |i: usize| {
        if i == count {
            end
        } else {
            start + duration * i as f64 / count as f64
        }
    };

    Some(
        tokens
            .iter()
            .enumerate()
            .map(|(i, token)| Word::new(*token, boundary(i), boundary(i + 1)))
            .collect(),
    )
}

/// Derive timed segments from plain text, one per sentence.
fn segments_from_text(text: &str) -> Vec<Segment> {
    let cleaned = text.trim();
    if cleaned.is_empty() {
        return vec![Segment {
            id: "segment_0".to_string(),
            start: 0.0,
            end: 2.0,
            text: String::new(),
            words: None,
        }];
    }

    split_sentences(cleaned)
        .into_iter()
        .enumerate()
        .map(|(index, sentence)| {
            let start = index as f64 * FALLBACK_SEGMENT_SPACING;
            let end = start
                + (sentence.chars().count() as f64 / SENTENCE_CHARS_PER_SECOND)
                    .max(MIN_SENTENCE_DURATION);
            Segment {
                id: format!("segment_{index}"),
                start,
                end,
                words: synthesize_words(sentence, start, end),
                text: sentence.to_string(),
            }
        })
        .collect()
}

/// Split after `.`, `!` or `?` when followed by whitespace.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut begin = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            if let Some((_, next)) = chars.peek() {
                if next.is_whitespace() {
                    let end = i + c.len_utf8();
                    sentences.push(&text[begin..end]);
                    begin = end;
                }
            }
        }
    }
    sentences.push(&text[begin..]);

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Convert millisecond segments from an external system into canonical
/// segments.
pub fn segments_from_ms(raw: &[RawMsSegment]) -> Vec<Segment> {
    let mut ids = UniqueIds::default();

    raw.iter()
        .enumerate()
        .map(|(index, segment)| {
            let safe_start = segment
                .start_ms
                .unwrap_or(index as f64 * FALLBACK_SEGMENT_SPACING_MS);
            let raw_end = segment
                .end_ms
                .unwrap_or(safe_start + DEFAULT_SEGMENT_DURATION_MS);
            let start_ms = safe_start.min(raw_end).max(0.0);
            let end_ms = raw_end.max(start_ms + MIN_SEGMENT_DURATION_MS);

            let words: Vec<Word> = segment
                .words
                .as_deref()
                .unwrap_or(&[])
                .iter()
                .enumerate()
                .filter_map(|(word_index, word)| {
                    let text = word.text.as_deref().unwrap_or("").trim();
                    if text.is_empty() {
                        return None;
                    }
                    let word_start = word
                        .start_ms
                        .unwrap_or(start_ms + word_index as f64 * FALLBACK_WORD_SPACING_MS);
                    let word_end = word
                        .end_ms
                        .unwrap_or(word_start + FALLBACK_WORD_SPACING_MS)
                        .max(word_start + MIN_WORD_DURATION_MS);
                    let clipped_start = word_start.max(start_ms).min(end_ms);
                    let clipped_end = word_end.min(end_ms).max(clipped_start);
                    Some(Word::new(
                        text,
                        ms_to_seconds(clipped_start),
                        ms_to_seconds(clipped_end),
                    ))
                })
                .collect();

            Segment {
                id: ids.assign(segment.id.as_deref(), index),
                start: ms_to_seconds(start_ms),
                end: ms_to_seconds(end_ms),
                text: segment.text.as_deref().unwrap_or("").trim().to_string(),
                words: (!words.is_empty()).then_some(words),
            }
        })
        .collect()
}

/// Convert canonical segments to the millisecond wire shape.
pub fn segments_to_ms(segments: &[Segment]) -> Vec<MsSegment> {
    segments
        .iter()
        .map(|segment| MsSegment {
            id: segment.id.clone(),
            text: segment.text.clone(),
            start_ms: seconds_to_ms(segment.start),
            end_ms: seconds_to_ms(segment.end),
            words: segment.words.as_ref().map(|words| {
                words
                    .iter()
                    .map(|word| MsWord {
                        text: word.text.clone(),
                        start_ms: seconds_to_ms(word.start),
                        end_ms: seconds_to_ms(word.end),
                    })
                    .collect()
            }),
        })
        .collect()
}

/// Assigns segment ids, keeping them unique in insertion order.
#[derive(Default)]
struct UniqueIds {
    seen: HashSet<String>,
}

impl UniqueIds {
    fn assign(&mut self, provided: Option<&str>, index: usize) -> String {
        let base = provided
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("segment_{index}"));

        let mut candidate = base.clone();
        let mut suffix = index;
        while self.seen.contains(&candidate) {
            candidate = format!("{base}_{suffix}");
            suffix += 1;
        }
        self.seen.insert(candidate.clone());
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autocap_models::{RawMsWord, RawWord};

    fn raw(start: Option<f64>, end: Option<f64>, text: &str) -> RawSegment {
        RawSegment {
            id: None,
            start,
            end,
            text: Some(text.to_string()),
            words: None,
        }
    }

    #[test]
    fn test_invalid_end_is_derived() {
        let segments = normalize_segments(
            &[
                raw(Some(3.0), Some(2.0), "short"),
                raw(Some(5.0), None, "a considerably longer caption line here"),
            ],
            "",
        );
        assert_eq!(segments[0].end, 3.0 + 1.2);
        let expected = 5.0 + "a considerably longer caption line here".len() as f64 / 10.0;
        assert!((segments[1].end - expected).abs() < 1e-9);
        for s in &segments {
            assert!(s.end > s.start);
        }
    }

    #[test]
    fn test_missing_start_uses_index_spacing() {
        let segments = normalize_segments(&[raw(Some(0.0), Some(1.0), "a"), raw(None, None, "b")], "");
        assert_eq!(segments[1].start, 2.0);
        assert_eq!(segments[1].id, "segment_1");
    }

    #[test]
    fn test_duplicate_ids_are_made_unique() {
        let mut a = raw(Some(0.0), Some(1.0), "a");
        a.id = Some("x".into());
        let mut b = raw(Some(1.0), Some(2.0), "b");
        b.id = Some("x".into());
        let segments = normalize_segments(&[a, b], "");
        assert_eq!(segments[0].id, "x");
        assert_eq!(segments[1].id, "x_1");
    }

    #[test]
    fn test_synthesized_words_tile_segment() {
        let segments = normalize_segments(&[raw(Some(1.0), Some(2.3), "one two three")], "");
        let words = segments[0].words();
        assert_eq!(words.len(), 3);
        assert_eq!(words[0].start, 1.0);
        for pair in words.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(words[2].end, 2.3);
    }

    #[test]
    fn test_provided_words_are_preserved_and_clipped() {
        let mut segment = raw(Some(1.0), Some(2.0), "hello world");
        segment.words = Some(vec![
            RawWord {
                text: Some("hello".into()),
                start: Some(0.5),
                end: Some(1.5),
            },
            RawWord {
                text: Some("world".into()),
                start: Some(1.9),
                end: None,
            },
            RawWord {
                text: Some("  ".into()),
                start: None,
                end: None,
            },
        ]);
        let segments = normalize_segments(&[segment], "");
        let words = segments[0].words();
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].start, 1.0);
        assert_eq!(words[0].end, 1.5);
        assert_eq!(words[1].start, 1.9);
        assert_eq!(words[1].end, 2.0);
    }

    #[test]
    fn test_fallback_text_splits_sentences() {
        let segments = normalize_segments(&[], "Hello there. How are you? Fine!");
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].text, "Hello there.");
        assert_eq!(segments[1].start, 2.0);
        assert_eq!(segments[1].end, 2.0 + "How are you?".len() as f64 / 8.0);
        assert_eq!(segments[2].end, 4.0 + 1.5);
        assert_eq!(segments[2].id, "segment_2");
    }

    #[test]
    fn test_fallback_decimal_is_not_a_sentence_break() {
        let segments = normalize_segments(&[], "Version 2.5 is out");
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn test_empty_fallback_text() {
        let segments = normalize_segments(&[], "   ");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start, 0.0);
        assert_eq!(segments[0].end, 2.0);
        assert!(segments[0].words.is_none());
    }

    #[test]
    fn test_segments_from_ms_clamps() {
        let raw = vec![RawMsSegment {
            id: None,
            start_ms: Some(1000.0),
            end_ms: Some(1100.0),
            text: Some(" hi there ".into()),
            words: Some(vec![
                RawMsWord {
                    text: Some("hi".into()),
                    start_ms: Some(900.0),
                    end_ms: Some(920.0),
                },
                RawMsWord {
                    text: Some("there".into()),
                    start_ms: None,
                    end_ms: None,
                },
            ]),
        }];
        let segments = segments_from_ms(&raw);
        let seg = &segments[0];
        assert_eq!(seg.start, 1.0);
        assert_eq!(seg.end, 1.2);
        assert_eq!(seg.text, "hi there");
        let words = seg.words();
        assert_eq!(words[0].start, 1.0);
        assert_eq!(words[0].end, 1.0);
        assert_eq!(words[1].start, 1.12);
        assert_eq!(words[1].end, 1.2);
    }

    #[test]
    fn test_segments_from_ms_without_words() {
        let raw = vec![RawMsSegment {
            text: Some("x".into()),
            ..Default::default()
        }];
        let segments = segments_from_ms(&raw);
        assert_eq!(segments[0].start, 0.0);
        assert_eq!(segments[0].end, 0.8);
        assert!(segments[0].words.is_none());
    }

    #[test]
    fn test_segments_to_ms_rounds() {
        let segments = vec![Segment {
            id: "a".into(),
            start: 1.2344,
            end: 2.0006,
            text: "x".into(),
            words: Some(vec![Word::new("x", 1.2344, 2.0006)]),
        }];
        let ms = segments_to_ms(&segments);
        assert_eq!(ms[0].start_ms, 1234);
        assert_eq!(ms[0].end_ms, 2001);
        assert_eq!(ms[0].words.as_ref().unwrap()[0].end_ms, 2001);
    }
}
