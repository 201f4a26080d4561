//! S3-compatible object storage (Cloudflare R2, OCI object storage).

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::store::{join_url, validate_key, ObjectMeta, ObjectStore, StoredObject};

#[derive(Debug, Clone)]
pub struct S3Config {
    /// S3 API endpoint
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    /// "auto" for R2
    pub region: String,
    /// Base URL objects are publicly served from. Defaults to the
    /// path-style bucket URL on the endpoint.
    pub public_base_url: Option<String>,
}

impl S3Config {
    pub fn from_env() -> StorageResult<Self> {
        let required = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| StorageError::config_error(format!("{key} not set")))
        };

        Ok(Self {
            endpoint_url: required("R2_ENDPOINT_URL")?,
            access_key_id: required("R2_ACCESS_KEY_ID")?,
            secret_access_key: required("R2_SECRET_ACCESS_KEY")?,
            bucket_name: required("R2_BUCKET_NAME")?,
            region: std::env::var("R2_REGION").unwrap_or_else(|_| "auto".to_string()),
            public_base_url: std::env::var("R2_PUBLIC_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        })
    }

    fn public_base(&self) -> String {
        self.public_base_url
            .clone()
            .unwrap_or_else(|| join_url(&self.endpoint_url, &self.bucket_name))
    }
}

#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    public_base: String,
}

impl S3ObjectStore {
    pub fn new(config: S3Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "autocap-storage",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            public_base: config.public_base(),
            bucket: config.bucket_name,
        }
    }

    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(S3Config::from_env()?))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload_file(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<StoredObject> {
        let key = validate_key(path)?;
        let size = bytes.len();
        debug!(key, size, "Uploading object");

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(format!("{key}: {e}")))?;

        info!(key, size, "Uploaded object");
        Ok(StoredObject {
            url: self.public_url(key),
            path: key.to_string(),
        })
    }

    fn public_url(&self, path: &str) -> String {
        join_url(&self.public_base, path)
    }

    async fn head(&self, path: &str) -> StorageResult<Option<ObjectMeta>> {
        let key = validate_key(path)?;
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => Ok(Some(ObjectMeta {
                size: output.content_length().unwrap_or(0).max(0) as u64,
                content_type: output.content_type().map(str::to_string),
            })),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(None),
            Err(e) => Err(StorageError::HeadFailed(format!("{key}: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 6] = [
        "R2_ENDPOINT_URL",
        "R2_ACCESS_KEY_ID",
        "R2_SECRET_ACCESS_KEY",
        "R2_BUCKET_NAME",
        "R2_REGION",
        "R2_PUBLIC_URL",
    ];

    fn set_required() {
        std::env::set_var("R2_ENDPOINT_URL", "https://account.r2.test");
        std::env::set_var("R2_ACCESS_KEY_ID", "key");
        std::env::set_var("R2_SECRET_ACCESS_KEY", "secret");
        std::env::set_var("R2_BUCKET_NAME", "captions");
    }

    fn clear() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_config_requires_credentials() {
        clear();
        let err = S3Config::from_env().unwrap_err();
        assert!(err.to_string().contains("R2_ENDPOINT_URL"));
    }

    #[test]
    #[serial]
    fn test_public_url_defaults_to_bucket_path() {
        clear();
        set_required();
        let config = S3Config::from_env().unwrap();
        assert_eq!(config.region, "auto");
        let store = S3ObjectStore::new(config);
        assert_eq!(
            store.public_url("renders/u/j/rendered.mp4"),
            "https://account.r2.test/captions/renders/u/j/rendered.mp4"
        );
        clear();
    }

    #[test]
    #[serial]
    fn test_public_url_uses_configured_base() {
        clear();
        set_required();
        std::env::set_var("R2_PUBLIC_URL", "https://media.example.com/");
        let store = S3ObjectStore::from_env().unwrap();
        assert_eq!(
            store.public_url("/uploads/a.mp4"),
            "https://media.example.com/uploads/a.mp4"
        );
        clear();
    }
}
