//! Line breaking and vertical placement on the caption canvas.
//!
//! Positions are for bottom-centre anchored text (`\an2`): the y coordinate
//! is the bottom edge of the line.

use std::ops::Range;

use crate::style::CaptionStyle;

/// Estimated glyph width as a fraction of the font size.
const CHAR_WIDTH_RATIO: f64 = 0.56;
/// Share of the frame width a line may occupy.
const USABLE_WIDTH_RATIO: f64 = 0.85;

/// Maximum characters per line for the style's font and canvas.
pub fn max_line_chars(style: &CaptionStyle) -> usize {
    let char_width = (f64::from(style.font_size) * CHAR_WIDTH_RATIO).max(1.0);
    let usable = f64::from(style.play_res_x) * USABLE_WIDTH_RATIO;
    ((usable / char_width).floor() as usize).max(1)
}

/// Greedy line breaking. Returns token index ranges, one per line; a token
/// longer than a line gets a line of its own.
pub fn break_lines<S: AsRef<str>>(tokens: &[S], max_chars: usize) -> Vec<Range<usize>> {
    let mut lines = Vec::new();
    let mut line_start = 0;
    let mut line_len = 0;

    for (i, token) in tokens.iter().enumerate() {
        let token_len = token.as_ref().chars().count();
        let needed = if line_len == 0 { token_len } else { token_len + 1 };

        if line_len > 0 && line_len + needed > max_chars {
            lines.push(line_start..i);
            line_start = i;
            line_len = token_len;
        } else {
            line_len += needed;
        }
    }

    if line_start < tokens.len() {
        lines.push(line_start..tokens.len());
    }
    lines
}

/// Horizontal anchor: centre of the canvas.
pub fn anchor_x(style: &CaptionStyle) -> i64 {
    i64::from(style.play_res_x / 2)
}

/// Vertical distance between stacked lines.
pub fn line_step(style: &CaptionStyle) -> i64 {
    (style.line_gap_ratio * f64::from(style.font_size)).round() as i64
}

/// Bottom y coordinate for each of `count` stacked lines, top line first.
///
/// With a `line_center_percent` the block is centred on that share of the
/// frame height; otherwise the last line sits on the caption baseline.
pub fn line_positions(style: &CaptionStyle, count: usize) -> Vec<i64> {
    let step = line_step(style);

    match style.line_center_percent {
        Some(percent) => {
            let center = percent / 100.0 * f64::from(style.play_res_y);
            let middle = (count as f64 - 1.0) / 2.0;
            let half_font = f64::from(style.font_size) / 2.0;
            (0..count)
                .map(|i| (center + (i as f64 - middle) * step as f64 + half_font).round() as i64)
                .collect()
        }
        None => {
            let baseline = style.baseline();
            (0..count)
                .map(|i| baseline - (count - 1 - i) as i64 * step)
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autocap_models::{CaptionTemplate, StyleOverrides};

    fn style(overrides: StyleOverrides) -> CaptionStyle {
        CaptionStyle::resolve(CaptionTemplate::Karaoke, &overrides)
    }

    #[test]
    fn test_max_line_chars() {
        // 1920 * 0.85 / (72 * 0.56) = 40.47
        assert_eq!(max_line_chars(&style(StyleOverrides::default())), 40);
    }

    #[test]
    fn test_break_lines() {
        let tokens = ["aaaa", "bb", "cc", "dddddddddd", "e"];
        assert_eq!(break_lines(&tokens, 7), vec![0..2, 2..3, 3..4, 4..5]);
        assert_eq!(break_lines(&tokens, 100), vec![0..5]);
        assert!(break_lines::<&str>(&[], 10).is_empty());
    }

    #[test]
    fn test_lines_stack_up_from_baseline() {
        let s = style(StyleOverrides::default());
        // step = round(1.2 * 72) = 86, baseline = 1030
        assert_eq!(line_positions(&s, 1), vec![1030]);
        assert_eq!(line_positions(&s, 2), vec![944, 1030]);
        assert_eq!(anchor_x(&s), 960);
    }

    #[test]
    fn test_lines_centered_on_percent() {
        let s = style(StyleOverrides {
            line_center_percent: Some(50.0),
            ..Default::default()
        });
        // center 540, half font 36, step 86
        assert_eq!(line_positions(&s, 1), vec![576]);
        assert_eq!(line_positions(&s, 2), vec![533, 619]);
    }
}
