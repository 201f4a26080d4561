//! The object storage seam.

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};

/// Where an uploaded object landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub url: String,
    pub path: String,
}

/// Result of a HEAD request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub size: u64,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload_file(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<StoredObject>;

    /// Public URL for `path`. Does not check that the object exists.
    fn public_url(&self, path: &str) -> String;

    /// `None` when the object does not exist.
    async fn head(&self, path: &str) -> StorageResult<Option<ObjectMeta>>;
}

/// Object keys are relative, non-empty and free of `..` segments.
pub fn validate_key(path: &str) -> StorageResult<&str> {
    let key = path.trim_start_matches('/');
    if key.is_empty() || key.split('/').any(|segment| segment == "..") {
        return Err(StorageError::invalid_key(path));
    }
    Ok(key)
}

/// `base` and `path` joined with exactly one slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert_eq!(validate_key("/captions/u/1.ass").unwrap(), "captions/u/1.ass");
        assert!(validate_key("").is_err());
        assert!(validate_key("renders/../secrets").is_err());
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://cdn.test/", "/a/b.mp4"), "https://cdn.test/a/b.mp4");
        assert_eq!(join_url("https://cdn.test", "a.mp4"), "https://cdn.test/a.mp4");
    }
}
