//! Source and rendered asset URLs for uploads.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use autocap_firestore::{DocumentStore, DocumentStoreExt, Update};
use autocap_models::{Upload, UploadStatus};
use autocap_storage::ObjectStore;

use crate::collections::UPLOADS;
use crate::error::{PipelineError, PipelineResult};

#[derive(Clone)]
pub struct UploadAssets {
    store: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStore>,
}

impl UploadAssets {
    pub fn new(store: Arc<dyn DocumentStore>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { store, objects }
    }

    async fn owned_upload(&self, upload_id: &str, user_id: &str) -> PipelineResult<Upload> {
        self.store
            .get_as::<Upload>(UPLOADS, upload_id)
            .await?
            .filter(|u| u.user_id == user_id)
            .ok_or_else(|| PipelineError::not_found("Upload not found"))
    }

    /// URL of the source video. A `pending_upload` upload whose object now
    /// exists is promoted to `uploaded`.
    pub async fn signed_url(&self, upload_id: &str, user_id: &str) -> PipelineResult<String> {
        let upload = self.owned_upload(upload_id, user_id).await?;
        let url = self.objects.public_url(&upload.storage_path);

        if upload.status == UploadStatus::PendingUpload {
            match self.objects.head(&upload.storage_path).await {
                Ok(Some(meta)) => {
                    let update = Update::new()
                        .set("status", UploadStatus::Uploaded.as_str())
                        .set("file_size", meta.size)
                        .set_opt("mime_type", meta.content_type)
                        .set("updated_at", Utc::now().to_rfc3339());
                    match self.store.update(UPLOADS, upload_id, update).await {
                        Ok(()) => info!(upload_id, size = meta.size, "Upload marked uploaded"),
                        Err(e) => warn!(upload_id, error = %e, "Failed to mark upload uploaded"),
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(upload_id, error = %e, "Failed to check uploaded object"),
            }
        }

        Ok(url)
    }

    /// URL of the rendered video, once the object exists.
    pub async fn render_url(&self, upload_id: &str, user_id: &str) -> PipelineResult<String> {
        let upload = self.owned_upload(upload_id, user_id).await?;
        let Some(path) = upload.render_asset_path else {
            return Err(PipelineError::not_found("Rendered file not ready"));
        };

        match self.objects.head(&path).await {
            Ok(Some(_)) => {}
            Ok(None) => return Err(PipelineError::not_found("Rendered file not ready")),
            Err(e) => warn!(upload_id, error = %e, "Failed to check rendered object"),
        }
        Ok(self.objects.public_url(&path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autocap_firestore::MemoryStore;
    use autocap_storage::MemoryObjectStore;
    use serde_json::json;

    async fn setup(doc: serde_json::Value) -> (UploadAssets, Arc<MemoryStore>, Arc<MemoryObjectStore>) {
        let store = Arc::new(MemoryStore::new());
        let objects = Arc::new(MemoryObjectStore::new("https://cdn.test"));
        store
            .create(UPLOADS, "up1", doc.as_object().cloned().unwrap())
            .await
            .unwrap();
        (UploadAssets::new(store.clone(), objects.clone()), store, objects)
    }

    #[tokio::test]
    async fn test_signed_url_promotes_pending_upload() {
        let (assets, store, objects) = setup(json!({
            "user_id": "u1",
            "storage_path": "uploads/u1/a.mp4",
            "status": "pending_upload"
        }))
        .await;

        let url = assets.signed_url("up1", "u1").await.unwrap();
        assert_eq!(url, "https://cdn.test/uploads/u1/a.mp4");
        let upload: Upload = store.get_as(UPLOADS, "up1").await.unwrap().unwrap();
        assert_eq!(upload.status, UploadStatus::PendingUpload);

        objects.put("uploads/u1/a.mp4", vec![0; 42], "video/mp4").await;
        assets.signed_url("up1", "u1").await.unwrap();
        let upload: Upload = store.get_as(UPLOADS, "up1").await.unwrap().unwrap();
        assert_eq!(upload.status, UploadStatus::Uploaded);
        assert_eq!(upload.file_size, Some(42));
        assert_eq!(upload.mime_type.as_deref(), Some("video/mp4"));

        assert!(matches!(
            assets.signed_url("up1", "u2").await,
            Err(PipelineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_render_url_requires_object() {
        let (assets, _, objects) = setup(json!({
            "user_id": "u1",
            "storage_path": "uploads/u1/a.mp4",
            "render_asset_path": "renders/u1/j1/rendered.mp4"
        }))
        .await;

        let err = assets.render_url("up1", "u1").await.unwrap_err();
        assert_eq!(err.to_string(), "Rendered file not ready");

        objects.put("renders/u1/j1/rendered.mp4", vec![1], "video/mp4").await;
        assert_eq!(
            assets.render_url("up1", "u1").await.unwrap(),
            "https://cdn.test/renders/u1/j1/rendered.mp4"
        );
    }
}
