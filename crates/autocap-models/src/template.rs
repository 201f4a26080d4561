//! Caption templates, output formats and render resolutions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Visual caption template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaptionTemplate {
    /// Word-by-word highlight with a cycling colour palette
    #[default]
    #[serde(alias = "creator-kinetic")]
    Karaoke,
    /// Static caption line per segment
    #[serde(alias = "modern")]
    Minimal,
    /// Plain subtitles (SRT)
    #[serde(alias = "srt")]
    Plain,
}

impl CaptionTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptionTemplate::Karaoke => "karaoke",
            CaptionTemplate::Minimal => "minimal",
            CaptionTemplate::Plain => "plain",
        }
    }

    /// Resolve a template name, including legacy aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "karaoke" | "creator-kinetic" => Some(CaptionTemplate::Karaoke),
            "minimal" | "modern" => Some(CaptionTemplate::Minimal),
            "plain" | "srt" => Some(CaptionTemplate::Plain),
            _ => None,
        }
    }

    /// Subtitle format this template renders to.
    pub fn format(&self) -> CaptionFormat {
        match self {
            CaptionTemplate::Karaoke | CaptionTemplate::Minimal => CaptionFormat::Ass,
            CaptionTemplate::Plain => CaptionFormat::Srt,
        }
    }
}

impl fmt::Display for CaptionTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Subtitle file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CaptionFormat {
    Ass,
    Srt,
}

impl CaptionFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptionFormat::Ass => "ass",
            CaptionFormat::Srt => "srt",
        }
    }

    /// File extension for stored caption files.
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    /// Content type used when uploading to object storage.
    pub fn content_type(&self) -> &'static str {
        match self {
            CaptionFormat::Ass => "text/x-ass",
            CaptionFormat::Srt => "text/plain",
        }
    }
}

/// Output render resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum Resolution {
    #[serde(rename = "720p")]
    Hd,
    #[default]
    #[serde(rename = "1080p")]
    FullHd,
    #[serde(rename = "4k")]
    Uhd,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Hd => "720p",
            Resolution::FullHd => "1080p",
            Resolution::Uhd => "4k",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "720p" | "720" => Some(Resolution::Hd),
            "1080p" | "1080" => Some(Resolution::FullHd),
            "4k" | "2160p" | "2160" => Some(Resolution::Uhd),
            _ => None,
        }
    }

    /// Parse a resolution name, falling back to 1080p.
    pub fn parse_or_default(name: Option<&str>) -> Self {
        name.and_then(Self::from_name).unwrap_or_default()
    }

    /// Canvas width and height in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Resolution::Hd => (1280, 720),
            Resolution::FullHd => (1920, 1080),
            Resolution::Uhd => (3840, 2160),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_aliases() {
        assert_eq!(CaptionTemplate::from_name("creator-kinetic"), Some(CaptionTemplate::Karaoke));
        assert_eq!(CaptionTemplate::from_name(" Modern "), Some(CaptionTemplate::Minimal));
        assert_eq!(CaptionTemplate::from_name("srt"), Some(CaptionTemplate::Plain));
        assert_eq!(CaptionTemplate::from_name("neon"), None);
    }

    #[test]
    fn test_template_format() {
        assert_eq!(CaptionTemplate::Karaoke.format(), CaptionFormat::Ass);
        assert_eq!(CaptionTemplate::Plain.format(), CaptionFormat::Srt);
        assert_eq!(CaptionFormat::Srt.content_type(), "text/plain");
        assert_eq!(CaptionFormat::Ass.content_type(), "text/x-ass");
    }

    #[test]
    fn test_resolution_fallback() {
        assert_eq!(Resolution::parse_or_default(Some("4K")), Resolution::Uhd);
        assert_eq!(Resolution::parse_or_default(Some("8k")), Resolution::FullHd);
        assert_eq!(Resolution::parse_or_default(None), Resolution::FullHd);
        assert_eq!(Resolution::FullHd.dimensions(), (1920, 1080));
        assert_eq!(serde_json::to_string(&Resolution::Hd).unwrap(), "\"720p\"");
    }
}
