//! Application state.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use autocap_firestore::{DocumentStore, FirestoreStore, MemoryStore};
use autocap_pipeline::{Pipeline, PipelineConfig};
use autocap_storage::{MemoryObjectStore, ObjectStore, S3ObjectStore};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Pipeline,
}

impl AppState {
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let pipeline = build_pipeline(PipelineConfig::from_env()).await?;
        Ok(Self::with_pipeline(config, pipeline))
    }

    pub fn with_pipeline(config: ApiConfig, pipeline: Pipeline) -> Self {
        Self { config, pipeline }
    }
}

/// Build the pipeline over the backends selected by `STORE_BACKEND`
/// (`firestore` | `memory`) and `STORAGE_BACKEND` (`s3` | `memory`).
pub async fn build_pipeline(config: PipelineConfig) -> anyhow::Result<Pipeline> {
    let store: Arc<dyn DocumentStore> = match backend("STORE_BACKEND", "firestore").as_str() {
        "memory" => {
            info!("Using in-memory document store");
            Arc::new(MemoryStore::new())
        }
        _ => Arc::new(
            FirestoreStore::from_env()
                .await
                .context("Failed to initialize Firestore")?,
        ),
    };

    let objects: Arc<dyn ObjectStore> = match backend("STORAGE_BACKEND", "s3").as_str() {
        "memory" => {
            let base_url = std::env::var("MEMORY_STORAGE_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000/objects".to_string());
            info!(base_url = %base_url, "Using in-memory object store");
            Arc::new(MemoryObjectStore::new(base_url))
        }
        _ => Arc::new(S3ObjectStore::from_env().context("Failed to initialize object storage")?),
    };

    Ok(Pipeline::new(store, objects, config)?)
}

fn backend(var: &str, default: &str) -> String {
    std::env::var(var)
        .map(|v| v.trim().to_lowercase())
        .unwrap_or_else(|_| default.to_string())
}
