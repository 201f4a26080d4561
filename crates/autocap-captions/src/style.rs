//! Template defaults merged with editor overrides.

use autocap_models::{CaptionTemplate, StyleOverrides};

pub const DEFAULT_PLAY_RES_X: u32 = 1920;
pub const DEFAULT_PLAY_RES_Y: u32 = 1080;
pub const DEFAULT_MARGIN_V: u32 = 50;

const KARAOKE_PALETTE: [&str; 3] = ["#FFD400", "#39FF14", "#00E5FF"];

/// Fully resolved caption style. Every field holds a valid value.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionStyle {
    pub name: &'static str,
    pub font_family: String,
    pub font_size: u32,
    /// `#RRGGBB`
    pub primary_color: String,
    pub outline_color: String,
    pub outline_width: f64,
    pub shadow_color: String,
    pub shadow_width: f64,
    /// ASS numpad alignment (1-9)
    pub alignment: u8,
    pub margin_v: u32,
    pub bold: bool,
    pub uppercase: bool,
    pub play_res_x: u32,
    pub play_res_y: u32,

    // Karaoke
    pub highlight_colors: Vec<String>,
    pub cycle_after_chunks: usize,
    pub max_lines_per_chunk: usize,
    pub line_gap_ratio: f64,
    pub line_center_percent: Option<f64>,
}

impl CaptionStyle {
    /// Merge overrides onto the template defaults. Invalid override values
    /// are ignored.
    pub fn resolve(template: CaptionTemplate, overrides: &StyleOverrides) -> Self {
        let play_res_x = canvas_dimension(overrides.play_res_x).unwrap_or(DEFAULT_PLAY_RES_X);
        let play_res_y = canvas_dimension(overrides.play_res_y).unwrap_or(DEFAULT_PLAY_RES_Y);
        let scale = f64::from(play_res_y) / f64::from(DEFAULT_PLAY_RES_Y);

        let mut style = Self::template_defaults(template, play_res_x, play_res_y, scale);

        if let Some(font) = overrides
            .font_family
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty() && !f.contains(','))
        {
            style.font_family = font.to_string();
        }
        if let Some(size) = in_range(overrides.font_size, 1.0, 1000.0) {
            style.font_size = size.round() as u32;
        }
        if let Some(color) = valid_color(overrides.primary_color.as_deref()) {
            style.primary_color = color;
        }
        if let Some(color) = valid_color(overrides.outline_color.as_deref()) {
            style.outline_color = color;
        }
        if let Some(width) = in_range(overrides.outline_width, 0.0, 50.0) {
            style.outline_width = width;
        }
        if let Some(color) = valid_color(overrides.shadow_color.as_deref()) {
            style.shadow_color = color;
        }
        if let Some(width) = in_range(overrides.shadow_width, 0.0, 50.0) {
            style.shadow_width = width;
        }
        if let Some(alignment) = in_range(overrides.alignment, 1.0, 9.0).filter(|a| a.fract() == 0.0)
        {
            style.alignment = alignment as u8;
        }
        if let Some(margin) = in_range(overrides.margin_v, 0.0, f64::from(play_res_y) - 1.0) {
            style.margin_v = margin.round() as u32;
        }
        if let Some(uppercase) = overrides.uppercase {
            style.uppercase = uppercase;
        }

        let palette: Vec<String> = overrides
            .highlight_colors
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .filter_map(|c| valid_color(Some(c)))
            .collect();
        if !palette.is_empty() {
            style.highlight_colors = palette;
        } else if let Some(color) = valid_color(overrides.highlight_color.as_deref()) {
            style.highlight_colors = vec![color];
        }
        if let Some(cycle) = in_range(overrides.cycle_after_chunks, 1.0, 1000.0) {
            style.cycle_after_chunks = cycle.round() as usize;
        }
        if let Some(lines) = in_range(overrides.max_lines_per_chunk, 1.0, 4.0) {
            style.max_lines_per_chunk = lines.round() as usize;
        }
        if let Some(ratio) = in_range(overrides.line_gap_ratio, 0.1, 5.0) {
            style.line_gap_ratio = ratio;
        }
        if let Some(center) = in_range(overrides.line_center_percent, 0.0, 100.0) {
            style.line_center_percent = Some(center);
        }

        style
    }

    fn template_defaults(
        template: CaptionTemplate,
        play_res_x: u32,
        play_res_y: u32,
        scale: f64,
    ) -> Self {
        let scaled = |size: f64| (size * scale).round().max(1.0) as u32;
        let (name, font_family, font_size, outline_width, shadow_width, bold, uppercase) =
            match template {
                CaptionTemplate::Karaoke => ("Karaoke", "Arial Black", scaled(72.0), 4.0, 0.0, true, true),
                CaptionTemplate::Minimal => ("Minimal", "Arial", scaled(54.0), 2.0, 1.0, false, false),
                CaptionTemplate::Plain => ("Plain", "Arial", scaled(48.0), 2.0, 0.0, false, false),
            };

        Self {
            name,
            font_family: font_family.to_string(),
            font_size,
            primary_color: "#FFFFFF".to_string(),
            outline_color: "#000000".to_string(),
            outline_width,
            shadow_color: "#000000".to_string(),
            shadow_width,
            alignment: 2,
            margin_v: DEFAULT_MARGIN_V,
            bold,
            uppercase,
            play_res_x,
            play_res_y,
            highlight_colors: KARAOKE_PALETTE.iter().map(|c| c.to_string()).collect(),
            cycle_after_chunks: 2,
            max_lines_per_chunk: 1,
            line_gap_ratio: 1.2,
            line_center_percent: None,
        }
    }

    /// Y coordinate of the caption baseline.
    pub fn baseline(&self) -> i64 {
        i64::from(self.play_res_y) - i64::from(self.margin_v)
    }

    /// Highlight colour for the chunk at `global_chunk_index`.
    pub fn highlight_for_chunk(&self, global_chunk_index: usize) -> &str {
        let cycle = self.cycle_after_chunks.max(1);
        let index = (global_chunk_index / cycle) % self.highlight_colors.len().max(1);
        self.highlight_colors
            .get(index)
            .map(String::as_str)
            .unwrap_or(KARAOKE_PALETTE[0])
    }
}

fn canvas_dimension(value: Option<f64>) -> Option<u32> {
    in_range(value, 16.0, 8192.0).map(|v| v.round() as u32)
}

pub(crate) fn in_range(value: Option<f64>, min: f64, max: f64) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= min && *v <= max)
}

/// Accept `#RRGGBB` or `RRGGBB`; returns the canonical upper-case form.
pub fn valid_color(value: Option<&str>) -> Option<String> {
    let hex = value?.trim().trim_start_matches('#');
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(format!("#{}", hex.to_ascii_uppercase()))
    } else {
        None
    }
}

/// `#RRGGBB` to the ASS `&HAABBGGRR` colour used in style lines.
pub fn ass_style_color(hex: &str) -> String {
    format!("&H00{}", bgr(hex))
}

/// `#RRGGBB` to the ASS `&HBBGGRR&` colour used in override tags.
pub fn ass_tag_color(hex: &str) -> String {
    format!("&H{}&", bgr(hex))
}

fn bgr(hex: &str) -> String {
    let hex = hex.trim_start_matches('#');
    if hex.len() == 6 && hex.is_ascii() {
        format!("{}{}{}", &hex[4..6], &hex[2..4], &hex[0..2])
    } else {
        "FFFFFF".to_string()
    }
}
