//! Copy externally hosted source videos into owned storage.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use autocap_storage::{ObjectStore, StoredObject};

use crate::collections::mirror_path;

const DEFAULT_EXTENSION: &str = "mp4";
const DEFAULT_CONTENT_TYPE: &str = "video/mp4";

#[derive(Clone)]
pub struct VideoMirror {
    http: reqwest::Client,
    objects: Arc<dyn ObjectStore>,
    timeout: Duration,
}

impl VideoMirror {
    pub fn new(http: reqwest::Client, objects: Arc<dyn ObjectStore>, timeout: Duration) -> Self {
        Self {
            http,
            objects,
            timeout,
        }
    }

    /// Download `url` and store it under the integration prefix. Any failure
    /// is logged and reported as `None`.
    pub async fn mirror(
        &self,
        external_video_id: &str,
        url: &str,
        file_name: Option<&str>,
    ) -> Option<StoredObject> {
        match self.try_mirror(external_video_id, url, file_name).await {
            Ok(stored) => {
                info!(video_id = external_video_id, path = %stored.path, "Mirrored source video");
                Some(stored)
            }
            Err(reason) => {
                warn!(video_id = external_video_id, url, reason = %reason, "Failed to mirror source video");
                None
            }
        }
    }

    async fn try_mirror(
        &self,
        external_video_id: &str,
        url: &str,
        file_name: Option<&str>,
    ) -> Result<StoredObject, String> {
        let response = self
            .http
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let bytes = response.bytes().await.map_err(|e| e.to_string())?;

        let extension = mirror_extension(file_name, url);
        let name = match file_name {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => format!("integration-{external_video_id}.{extension}"),
        };
        let path = mirror_path(
            external_video_id,
            Utc::now().timestamp_millis(),
            &sanitize_file_name(&name),
        );

        self.objects
            .upload_file(&path, bytes.to_vec(), &content_type)
            .await
            .map_err(|e| e.to_string())
    }
}

/// Extension from the file name, else from the URL path, else `mp4`;
/// lower-cased.
pub fn mirror_extension(file_name: Option<&str>, url: &str) -> String {
    file_name
        .and_then(name_extension)
        .or_else(|| url_extension(url))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
        .to_ascii_lowercase()
}

/// Trailing `.ext` of a name, alphanumeric only.
fn name_extension(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    (!ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric())).then(|| ext.to_string())
}

/// Extension at the end of the URL path, before any query or fragment.
fn url_extension(url: &str) -> Option<String> {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    name_extension(&url[..end])
}

/// Replace everything outside `[A-Za-z0-9_./-]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '/' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
