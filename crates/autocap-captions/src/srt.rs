//! SubRip output for the plain template.

use std::fmt::Write as _;

use autocap_models::Segment;

use crate::time::{format_srt_timestamp, seconds_to_srt_ms};

pub fn write_srt(segments: &[Segment]) -> String {
    let starts: Vec<i64> = segments.iter().map(|s| seconds_to_srt_ms(s.start)).collect();
    let mut out = String::new();
    let mut cue = 0usize;

    for (i, segment) in segments.iter().enumerate() {
        let text = segment
            .text
            .replace('\r', "")
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        if text.is_empty() {
            continue;
        }

        let start = starts[i];
        let mut end = seconds_to_srt_ms(segment.end).max(start.saturating_add(1));
        if let Some(&next) = starts.get(i + 1) {
            if next > start {
                end = end.min(next);
            }
        }

        cue += 1;
        let _ = write!(
            out,
            "{cue}\n{} --> {}\n{text}\n\n",
            format_srt_timestamp(start),
            format_srt_timestamp(end)
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start: f64, end: f64, text: &str) -> Segment {
        Segment {
            id: String::new(),
            start,
            end,
            text: text.into(),
            words: None,
        }
    }

    #[test]
    fn test_cues_are_numbered_and_clamped() {
        let out = write_srt(&[
            segment(0.0, 1.5009, "first"),
            segment(1.5, 3.0, ""),
            segment(1.5, 3.0, "second"),
        ]);
        assert_eq!(
            out,
            "1\n00:00:00,000 --> 00:00:01,500\nfirst\n\n2\n00:00:01,500 --> 00:00:03,000\nsecond\n\n"
        );
    }

    #[test]
    fn test_huge_start_does_not_overflow() {
        let out = write_srt(&[segment(1e300, f64::INFINITY, "late")]);
        assert!(out.starts_with("1\n99:59:59,99"));
        assert!(out.ends_with("late\n\n"));
    }
}
