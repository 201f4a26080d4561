//! In-memory object store for tests and local runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{StorageError, StorageResult};
use crate::store::{join_url, validate_key, ObjectMeta, ObjectStore, StoredObject};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

pub struct MemoryObjectStore {
    base_url: String,
    objects: RwLock<HashMap<String, MemoryObject>>,
    uploads: AtomicUsize,
    fail_uploads: AtomicBool,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new("memory://objects")
    }
}

impl MemoryObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: RwLock::new(HashMap::new()),
            uploads: AtomicUsize::new(0),
            fail_uploads: AtomicBool::new(false),
        }
    }

    /// Make every following upload fail.
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Successful uploads so far.
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub async fn object(&self, path: &str) -> Option<MemoryObject> {
        self.objects.read().await.get(path.trim_start_matches('/')).cloned()
    }

    pub async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) {
        self.objects.write().await.insert(
            path.trim_start_matches('/').to_string(),
            MemoryObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload_file(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<StoredObject> {
        let key = validate_key(path)?;
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::upload_failed(format!("{key}: uploads disabled")));
        }
        self.put(key, bytes, content_type).await;
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(StoredObject {
            url: self.public_url(key),
            path: key.to_string(),
        })
    }

    fn public_url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    async fn head(&self, path: &str) -> StorageResult<Option<ObjectMeta>> {
        let key = validate_key(path)?;
        Ok(self.objects.read().await.get(key).map(|o| ObjectMeta {
            size: o.bytes.len() as u64,
            content_type: Some(o.content_type.clone()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_then_head() {
        let store = MemoryObjectStore::new("https://cdn.test");
        let stored = store
            .upload_file("captions/u1/up1/j1.ass", b"[Script Info]".to_vec(), "text/x-ass")
            .await
            .unwrap();
        assert_eq!(stored.path, "captions/u1/up1/j1.ass");
        assert_eq!(stored.url, "https://cdn.test/captions/u1/up1/j1.ass");

        let meta = store.head("captions/u1/up1/j1.ass").await.unwrap().unwrap();
        assert_eq!(meta.size, 13);
        assert_eq!(meta.content_type.as_deref(), Some("text/x-ass"));
        assert!(store.head("captions/other").await.unwrap().is_none());
        assert_eq!(store.upload_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_uploads() {
        let store = MemoryObjectStore::default();
        store.fail_uploads(true);
        let err = store.upload_file("a.srt", vec![], "text/plain").await.unwrap_err();
        assert!(matches!(err, StorageError::UploadFailed(_)));
        assert_eq!(store.upload_count(), 0);
    }
}
