//! Editor-supplied caption style overrides.

use serde::{Deserialize, Serialize};

use crate::lenient;

/// Optional per-request style overrides (`customStyles`).
///
/// Every field is parsed leniently: a value of the wrong type is treated as
/// absent, and the caption builder substitutes its template default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleOverrides {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub outline_color: Option<String>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub outline_width: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub shadow_color: Option<String>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub shadow_width: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub alignment: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub margin_v: Option<f64>,
    #[serde(default, deserialize_with = "lenient::flag", skip_serializing_if = "Option::is_none")]
    pub uppercase: Option<bool>,

    // Karaoke
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub highlight_color: Option<String>,
    #[serde(default, deserialize_with = "lenient::text_list", skip_serializing_if = "Option::is_none")]
    pub highlight_colors: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub cycle_after_chunks: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub max_lines_per_chunk: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub line_gap_ratio: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub line_center_percent: Option<f64>,

    // Canvas
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub play_res_x: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub play_res_y: Option<f64>,

    // Emoji overlays
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub emoji_offset_px: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub emoji_rise_ms: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub emoji_size: Option<f64>,
}

impl StyleOverrides {
    /// Fill the canvas size from a resolution unless explicitly overridden.
    pub fn with_canvas(mut self, width: u32, height: u32) -> Self {
        if self.play_res_x.is_none() {
            self.play_res_x = Some(f64::from(width));
        }
        if self.play_res_y.is_none() {
            self.play_res_y = Some(f64::from(height));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_values_are_dropped() {
        let style: StyleOverrides = serde_json::from_str(
            r##"{"fontSize": "big", "marginV": "80", "uppercase": "yes", "highlightColors": ["#FF0000", 4], "primaryColor": "#FFFFFF"}"##,
        )
        .unwrap();
        assert_eq!(style.font_size, None);
        assert_eq!(style.margin_v, Some(80.0));
        assert_eq!(style.uppercase, None);
        assert_eq!(style.highlight_colors, Some(vec!["#FF0000".to_string()]));
        assert_eq!(style.primary_color.as_deref(), Some("#FFFFFF"));
    }

    #[test]
    fn test_with_canvas_keeps_explicit_values() {
        let style = StyleOverrides {
            play_res_y: Some(1920.0),
            ..Default::default()
        }
        .with_canvas(1280, 720);
        assert_eq!(style.play_res_x, Some(1280.0));
        assert_eq!(style.play_res_y, Some(1920.0));
    }
}
