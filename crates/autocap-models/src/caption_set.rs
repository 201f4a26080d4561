//! Versioned caption sets for integration videos.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{CaptionTemplate, Resolution, Segment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaptionSetStatus {
    #[default]
    Draft,
    Approved,
}

impl CaptionSetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptionSetStatus::Draft => "draft",
            CaptionSetStatus::Approved => "approved",
        }
    }

    /// Anything other than `approved` saves as a draft.
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            Some("approved") => CaptionSetStatus::Approved,
            _ => CaptionSetStatus::Draft,
        }
    }
}

/// Editable caption segments for one external video.
///
/// Created on first save, updated in place afterwards; every save bumps
/// `version`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CaptionSet {
    #[serde(default)]
    pub id: String,
    pub video_id: String,
    pub content_id: String,
    pub portal_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_id: Option<String>,
    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub status: CaptionSetStatus,
    #[serde(default = "first_version")]
    pub version: u32,
    #[serde(default)]
    pub template: CaptionTemplate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, serde_json::Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn first_version() -> u32 {
    1
}
