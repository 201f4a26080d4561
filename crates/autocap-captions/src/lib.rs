//! Caption build engine.
//!
//! Pure, synchronous functions shared by every render entry point:
//! - Segment normalization (free text, partial timings, millisecond payloads)
//! - Subtitle rendering (ASS karaoke/minimal, SRT plain) with layout math
//! - Emoji overlay placement
//! - Content hashing for render reuse
//!
//! Building is deterministic: identical inputs always produce byte-identical
//! output, which the render reuse check depends on.

pub mod ass;
pub mod builder;
pub mod emoji;
pub mod error;
pub mod layout;
pub mod normalize;
pub mod srt;
pub mod style;
pub mod time;

pub use builder::{build_caption_file, build_caption_file_named, content_hash, CaptionFile};
pub use emoji::{build_emoji_overlays, emoji_asset};
pub use error::{CaptionError, CaptionResult};
pub use normalize::{normalize_segments, segments_from_ms, segments_to_ms};
pub use style::CaptionStyle;
