//! Decorative overlays composited by the render worker.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A timed, positioned emoji asset.
///
/// Coordinates are in the caption canvas space (`play_res_y` high); the
/// worker scales them to the output frame and animates the rise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Overlay {
    pub url: String,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub play_res_y: u32,
    pub rise_ms: u32,
}
