//! Caption file builder.

use sha2::{Digest, Sha256};

use autocap_models::{CaptionFormat, CaptionTemplate, Segment, StyleOverrides};

use crate::error::{CaptionError, CaptionResult};
use crate::style::CaptionStyle;
use crate::{ass, srt};

/// A rendered subtitle file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionFile {
    pub content: String,
    pub format: CaptionFormat,
}

impl CaptionFile {
    /// SHA-256 of the content, lower-case hex.
    pub fn content_hash(&self) -> String {
        content_hash(&self.content)
    }

    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.content.into_bytes()
    }
}

/// SHA-256 of `content`, lower-case hex.
pub fn content_hash(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}

/// Render `segments` with `template`. Pure and deterministic.
pub fn build_caption_file(
    template: CaptionTemplate,
    segments: &[Segment],
    overrides: &StyleOverrides,
) -> CaptionFile {
    let style = CaptionStyle::resolve(template, overrides);

    let content = match template {
        CaptionTemplate::Karaoke => ass::write_karaoke(segments, &style),
        CaptionTemplate::Minimal => ass::write_minimal(segments, &style),
        CaptionTemplate::Plain => srt::write_srt(segments),
    };

    tracing::debug!(
        template = template.as_str(),
        segments = segments.len(),
        bytes = content.len(),
        "Built caption file"
    );

    CaptionFile {
        content,
        format: template.format(),
    }
}

/// Like [`build_caption_file`], resolving the template by name.
pub fn build_caption_file_named(
    template: &str,
    segments: &[Segment],
    overrides: &StyleOverrides,
) -> CaptionResult<CaptionFile> {
    let template = CaptionTemplate::from_name(template)
        .ok_or_else(|| CaptionError::unknown_template(template))?;
    Ok(build_caption_file(template, segments, overrides))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_segments;
    use autocap_models::RawSegment;

    fn segments() -> Vec<Segment> {
        let raw: Vec<RawSegment> = serde_json::from_str(
            r#"[
                {"start": 0, "end": 1.4, "text": "that's so fire money moves"},
                {"start": 1.4, "end": 3.1, "text": "second line of captions here"}
            ]"#,
        )
        .unwrap();
        normalize_segments(&raw, "")
    }

    #[test]
    fn test_build_is_deterministic() {
        let overrides = StyleOverrides::default().with_canvas(1080, 1920);
        for template in [CaptionTemplate::Karaoke, CaptionTemplate::Minimal, CaptionTemplate::Plain] {
            let a = build_caption_file(template, &segments(), &overrides);
            let b = build_caption_file(template, &segments(), &overrides);
            assert_eq!(a, b);
            assert_eq!(a.content_hash(), b.content_hash());
        }
    }

    #[test]
    fn test_format_follows_template() {
        let plain = build_caption_file(CaptionTemplate::Plain, &segments(), &StyleOverrides::default());
        assert_eq!(plain.format, CaptionFormat::Srt);
        assert!(plain.content.starts_with("1\n00:00:00,000 --> 00:00:01,400\n"));

        let karaoke =
            build_caption_file(CaptionTemplate::Karaoke, &segments(), &StyleOverrides::default());
        assert_eq!(karaoke.format, CaptionFormat::Ass);
        assert!(karaoke.content.starts_with("[Script Info]\n"));
    }

    #[test]
    fn test_style_changes_hash() {
        let base = build_caption_file(CaptionTemplate::Karaoke, &segments(), &StyleOverrides::default());
        let styled = build_caption_file(
            CaptionTemplate::Karaoke,
            &segments(),
            &StyleOverrides {
                primary_color: Some("#00FF00".into()),
                ..Default::default()
            },
        );
        assert_ne!(base.content_hash(), styled.content_hash());
    }

    #[test]
    fn test_unknown_template_name() {
        let err = build_caption_file_named("neon", &segments(), &StyleOverrides::default()).unwrap_err();
        assert!(matches!(err, CaptionError::UnknownTemplate(name) if name == "neon"));
        assert!(build_caption_file_named("creator-kinetic", &segments(), &StyleOverrides::default()).is_ok());
    }

    #[test]
    fn test_content_hash_known_value() {
        assert_eq!(
            content_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
