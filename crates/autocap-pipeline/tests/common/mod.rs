//! Shared fixtures for pipeline flow tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use autocap_firestore::{DocumentStore, DocumentStoreExt, Fields, FindOptions, MemoryStore};
use autocap_models::RenderJob;
use autocap_pipeline::collections::{JOBS, TRANSCRIPTS, UPLOADS};
use autocap_pipeline::{Pipeline, PipelineConfig, WorkerConfig};
use autocap_storage::MemoryObjectStore;
use serde_json::{json, Value};

pub const WORKER_SECRET: &str = "worker-secret";
pub const INTEGRATION_SECRET: &str = "integration-secret";

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub objects: Arc<MemoryObjectStore>,
    pub pipeline: Pipeline,
}

impl Harness {
    pub fn new(config: PipelineConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let objects = Arc::new(MemoryObjectStore::new("https://cdn.test"));
        let pipeline = Pipeline::new(store.clone(), objects.clone(), config).unwrap();
        Self {
            store,
            objects,
            pipeline,
        }
    }

    pub async fn jobs(&self) -> Vec<RenderJob> {
        self.store
            .find_as(JOBS, &[], FindOptions::default())
            .await
            .unwrap()
    }

    pub async fn doc(&self, collection: &str, id: &str) -> Fields {
        self.store.get(collection, id).await.unwrap().unwrap()
    }
}

/// Worker at `{worker_url}/render`, fast integration backoff.
pub fn config(worker_url: Option<&str>) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.worker = WorkerConfig {
        url: worker_url.map(str::to_string),
        jwt_secret: Some(WORKER_SECRET.to_string()),
        token_ttl: Duration::from_secs(600),
    };
    config.integration.secret = Some(INTEGRATION_SECRET.to_string());
    config.integration.backoff_base = Duration::from_millis(100);
    config.http_timeout = Duration::from_secs(5);
    config
}

pub async fn seed(store: &MemoryStore, collection: &str, id: &str, doc: Value) {
    let fields = doc.as_object().cloned().unwrap();
    store.create(collection, id, fields).await.unwrap();
}

/// Upload `up1` owned by `u1` with one transcript.
pub async fn seed_upload_with_transcript(store: &MemoryStore) {
    seed(
        store,
        UPLOADS,
        "up1",
        json!({"user_id": "u1", "storage_path": "uploads/u1/source.mp4", "status": "uploaded"}),
    )
    .await;
    seed(
        store,
        TRANSCRIPTS,
        "t1",
        json!({
            "upload_id": "up1",
            "user_id": "u1",
            "text": "This is fire. Money moves today!",
            "created_at": "2024-03-01T10:00:00Z"
        }),
    )
    .await;
}
