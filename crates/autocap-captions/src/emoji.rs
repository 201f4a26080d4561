//! Keyword-triggered emoji overlays.

use autocap_models::{CaptionTemplate, Overlay, Segment, StyleOverrides};

use crate::style::{in_range, CaptionStyle};

const TWEMOJI_BASE: &str = "https://cdnjs.cloudflare.com/ajax/libs/twemoji/14.0.2/72x72";
const MONEY_GIF: &str =
    "https://raw.githubusercontent.com/notankith/cloudinarytest/refs/heads/main/Money.gif";

const DEFAULT_RISE_MS: u32 = 400;
const MAX_RISE_MS: f64 = 10_000.0;
const DEFAULT_EMOJI_SIZE: u32 = 140;
const FALLBACK_OFFSET_PX: i64 = 30;

/// Keyword to twemoji code point.
const KEYWORDS: &[(&str, &str)] = &[
    // money / wealth
    ("cash", "1f4b5"),
    ("rich", "1f4b8"),
    ("wealth", "1f4b8"),
    ("profit", "1f4c8"),
    ("growth", "1f4c8"),
    ("upgrade", "1f680"),
    ("boss", "1f4aa"),
    // winning / energy
    ("win", "1f3c6"),
    ("victory", "1f3c6"),
    ("hype", "1f525"),
    ("fire", "1f525"),
    ("lit", "1f525"),
    ("trending", "1f525"),
    ("wow", "1f929"),
    ("awesome", "1f929"),
    ("shocked", "1f631"),
    ("speed", "1f4ab"),
    ("fast", "1f4ab"),
    ("rocket", "1f680"),
    // danger / chaos
    ("danger", "26a0"),
    ("warning", "26a0"),
    ("caution", "26a0"),
    ("boom", "1f4a5"),
    ("explosion", "1f4a5"),
    ("dead", "2620"),
    ("skull", "2620"),
    ("crazy", "1f92f"),
    // emotions
    ("love", "2764"),
    ("heart", "2764"),
    ("broken", "1f494"),
    ("sad", "1f622"),
    ("cry", "1f622"),
    ("surprise", "1f632"),
    ("fear", "1f631"),
    ("smile", "1f642"),
    ("happy", "1f642"),
    ("angry", "1f620"),
    // magic / fun
    ("star", "2b50"),
    ("sparkle", "2728"),
    ("magic", "2728"),
    ("party", "1f389"),
    ("celebrate", "1f389"),
    ("king", "1f451"),
    ("queen", "1f451"),
    ("gift", "1f381"),
    ("blast", "1f4a3"),
    // brain / logic
    ("idea", "1f4a1"),
    ("light", "1f4a1"),
    ("brain", "1f9e0"),
    ("smart", "1f9e0"),
    ("thinking", "1f914"),
    ("question", "2753"),
    ("check", "2705"),
    // misc
    ("break", "1f6a8"),
    ("alert", "1f6a8"),
    ("flex", "1f4aa"),
    ("freeze", "2744"),
    ("heat", "1f525"),
    ("thumbs-up", "1f44d"),
];

/// Asset URL for a cleaned, lower-case keyword.
pub fn emoji_asset(keyword: &str) -> Option<String> {
    if keyword == "money" {
        return Some(MONEY_GIF.to_string());
    }
    KEYWORDS
        .iter()
        .find(|(k, _)| *k == keyword)
        .map(|(_, code)| format!("{TWEMOJI_BASE}/{code}.png"))
}

/// Lower-case and keep only `[a-z0-9-]`.
fn clean_token(token: &str) -> String {
    token
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

/// One overlay per keyword match, timed to the whole segment and placed
/// just below the caption baseline of the resolved `template` style.
pub fn build_emoji_overlays(
    template: CaptionTemplate,
    segments: &[Segment],
    overrides: &StyleOverrides,
) -> Vec<Overlay> {
    let style = CaptionStyle::resolve(template, overrides);
    let play_res_y = style.play_res_y;
    let canvas = f64::from(play_res_y);

    let default_offset = match (canvas * 0.03).round() as i64 {
        0 => FALLBACK_OFFSET_PX,
        offset => offset,
    };
    let offset = in_range(overrides.emoji_offset_px, -canvas, canvas)
        .map(|v| v.round() as i64)
        .unwrap_or(default_offset);
    let rise_ms = in_range(overrides.emoji_rise_ms, 0.0, MAX_RISE_MS)
        .map(|v| v.round() as u32)
        .unwrap_or(DEFAULT_RISE_MS);
    let width = in_range(overrides.emoji_size, 1.0, canvas)
        .map(|v| v.round() as u32)
        .unwrap_or(DEFAULT_EMOJI_SIZE);
    let y = style.baseline().saturating_add(offset);

    segments
        .iter()
        .flat_map(|segment| {
            segment
                .text
                .split_whitespace()
                .filter_map(|token| emoji_asset(&clean_token(token)))
                .map(|url| Overlay {
                    url,
                    start: segment.start,
                    end: segment.end,
                    x: 0,
                    y,
                    width,
                    play_res_y,
                    rise_ms,
                })
                .collect::<Vec<_>>()
        })
        .collect()
}
