//! Advanced SubStation Alpha output for the karaoke and minimal templates.

use std::fmt::Write as _;

use autocap_models::Segment;

use crate::layout::{anchor_x, break_lines, line_positions, max_line_chars};
use crate::style::{ass_style_color, ass_tag_color, CaptionStyle};
use crate::time::{format_ass_timestamp, seconds_to_centis};

const STYLE_FORMAT: &str = "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding";
const EVENT_FORMAT: &str = "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text";

/// Karaoke: one event per highlight window per line.
pub fn write_karaoke(segments: &[Segment], style: &CaptionStyle) -> String {
    let mut out = header(style);
    let windows = segment_windows(segments);
    let max_chars = max_line_chars(style);
    let x = anchor_x(style);
    let primary = ass_tag_color(&style.primary_color);
    let mut global_chunk = 0usize;

    for (segment, (seg_start, seg_end)) in segments.iter().zip(windows) {
        let words: Vec<(String, i64, i64)> = segment
            .words()
            .iter()
            .map(|w| {
                (
                    display_text(&w.text, style),
                    seconds_to_centis(w.start),
                    seconds_to_centis(w.end),
                )
            })
            .filter(|(text, _, _)| !text.is_empty())
            .collect();
        if words.is_empty() {
            continue;
        }

        let tokens: Vec<&str> = words.iter().map(|(t, _, _)| t.as_str()).collect();
        let lines = break_lines(&tokens, max_chars);

        let chunks: Vec<&[std::ops::Range<usize>]> =
            lines.chunks(style.max_lines_per_chunk.max(1)).collect();

        // Chunk windows tile the segment window.
        let mut chunk_starts: Vec<i64> = Vec::with_capacity(chunks.len());
        for (ci, chunk) in chunks.iter().enumerate() {
            let first_word = chunk[0].start;
            let floor = chunk_starts.last().copied().unwrap_or(seg_start);
            let start = if ci == 0 {
                seg_start
            } else {
                words[first_word].1.clamp(floor, seg_end)
            };
            chunk_starts.push(start);
        }

        for (ci, chunk) in chunks.iter().enumerate() {
            let chunk_start = chunk_starts[ci];
            let chunk_end = chunk_starts.get(ci + 1).copied().unwrap_or(seg_end);
            let highlight = ass_tag_color(style.highlight_for_chunk(global_chunk));
            global_chunk += 1;

            if chunk_end <= chunk_start {
                continue;
            }

            let first = chunk[0].start;
            let last = chunk[chunk.len() - 1].end;
            let ys = line_positions(style, chunk.len());

            let mut cursor = chunk_start;
            for k in first..last {
                let (_, word_start, word_end) = words[k];
                let ws = word_start.clamp(cursor, chunk_end);
                let we = word_end.clamp(ws, chunk_end);

                if ws > cursor {
                    push_chunk_events(&mut out, style, chunk, &ys, x, &words, None, cursor, ws, &primary);
                }
                if we > ws {
                    let lit = Some((k, highlight.as_str()));
                    push_chunk_events(&mut out, style, chunk, &ys, x, &words, lit, ws, we, &primary);
                }
                cursor = cursor.max(we);
            }
            if cursor < chunk_end {
                push_chunk_events(&mut out, style, chunk, &ys, x, &words, None, cursor, chunk_end, &primary);
            }
        }
    }

    out
}

#[allow(clippy::too_many_arguments)]
fn push_chunk_events(
    out: &mut String,
    style: &CaptionStyle,
    chunk: &[std::ops::Range<usize>],
    ys: &[i64],
    x: i64,
    words: &[(String, i64, i64)],
    lit: Option<(usize, &str)>,
    start: i64,
    end: i64,
    primary: &str,
) {
    for (line, y) in chunk.iter().zip(ys) {
        let mut text = format!("{{\\an2\\q2\\pos({x},{y})}}");
        for k in line.clone() {
            if k > line.start {
                text.push(' ');
            }
            match lit {
                Some((lit_index, color)) if lit_index == k => {
                    let _ = write!(text, "{{\\1c{color}}}{}{{\\1c{primary}}}", words[k].0);
                }
                _ => text.push_str(&words[k].0),
            }
        }
        push_dialogue(out, style, start, end, &text);
    }
}

/// Minimal: one event per segment, lines joined with `\N`.
pub fn write_minimal(segments: &[Segment], style: &CaptionStyle) -> String {
    let mut out = header(style);
    let windows = segment_windows(segments);
    let max_chars = max_line_chars(style);
    let x = anchor_x(style);

    for (segment, (start, end)) in segments.iter().zip(windows) {
        let text = display_text(&segment.text, style);
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.is_empty() || end <= start {
            continue;
        }

        let lines = break_lines(&tokens, max_chars);
        let ys = line_positions(style, lines.len());
        let y = ys.last().copied().unwrap_or_else(|| style.baseline());
        let body = lines
            .iter()
            .map(|range| tokens[range.clone()].join(" "))
            .collect::<Vec<_>>()
            .join("\\N");

        push_dialogue(&mut out, style, start, end, &format!("{{\\an2\\q2\\pos({x},{y})}}{body}"));
    }

    out
}

/// Centisecond windows per segment. A segment ends no later than the next
/// segment starts, so rounding never makes adjacent events overlap.
fn segment_windows(segments: &[Segment]) -> Vec<(i64, i64)> {
    let starts: Vec<i64> = segments.iter().map(|s| seconds_to_centis(s.start)).collect();

    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            let start = starts[i];
            let mut end = seconds_to_centis(segment.end).max(start.saturating_add(1));
            if let Some(&next) = starts.get(i + 1) {
                if next > start {
                    end = end.min(next);
                }
            }
            (start, end)
        })
        .collect()
}

fn header(style: &CaptionStyle) -> String {
    let mut out = String::new();
    out.push_str("[Script Info]\n");
    out.push_str("Title: AutoCaptions\n");
    out.push_str("ScriptType: v4.00+\n");
    out.push_str("WrapStyle: 2\n");
    out.push_str("ScaledBorderAndShadow: yes\n");
    let _ = writeln!(out, "PlayResX: {}", style.play_res_x);
    let _ = writeln!(out, "PlayResY: {}", style.play_res_y);
    out.push('\n');

    out.push_str("[V4+ Styles]\n");
    out.push_str(STYLE_FORMAT);
    out.push('\n');
    let _ = writeln!(
        out,
        "Style: {name},{font},{size},{primary},{secondary},{outline},{back},{bold},0,0,0,100,100,0,0,1,{outline_w},{shadow_w},{alignment},{margin_h},{margin_h},{margin_v},1",
        name = style.name,
        font = style.font_family,
        size = style.font_size,
        primary = ass_style_color(&style.primary_color),
        secondary = ass_style_color(&style.primary_color),
        outline = ass_style_color(&style.outline_color),
        back = ass_style_color(&style.shadow_color),
        bold = if style.bold { -1 } else { 0 },
        outline_w = format_number(style.outline_width),
        shadow_w = format_number(style.shadow_width),
        alignment = style.alignment,
        margin_h = pad_margin(40),
        margin_v = pad_margin(style.margin_v),
    );
    out.push('\n');

    out.push_str("[Events]\n");
    out.push_str(EVENT_FORMAT);
    out.push('\n');
    out
}

fn push_dialogue(out: &mut String, style: &CaptionStyle, start: i64, end: i64, text: &str) {
    let _ = writeln!(
        out,
        "Dialogue: 0,{},{},{},,0000,0000,0000,,{}",
        format_ass_timestamp(start),
        format_ass_timestamp(end),
        style.name,
        text
    );
}

fn pad_margin(value: u32) -> String {
    format!("{:0>4}", value.min(9999))
}

/// Integers without a fraction, otherwise up to two decimals.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        let s = format!("{value:.2}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Caption text made safe for an event line.
fn display_text(text: &str, style: &CaptionStyle) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != '\r')
        .map(|c| match c {
            '\n' | '\t' => ' ',
            '{' => '(',
            '}' => ')',
            '\\' => '/',
            other => other,
        })
        .collect();
    let cleaned = cleaned.trim();
    if style.uppercase {
        cleaned.to_uppercase()
    } else {
        cleaned.to_string()
    }
}
