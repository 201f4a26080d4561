//! Router fixtures over the in-memory store and object store.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

use autocap_api::auth::IntegrationClaims;
use autocap_api::{create_router, ApiConfig, AppState};
use autocap_firestore::{DocumentStore, MemoryStore};
use autocap_pipeline::{sign_worker_token, Pipeline, PipelineConfig, WorkerConfig};
use autocap_storage::MemoryObjectStore;

pub const WORKER_SECRET: &str = "worker-secret";
pub const INTEGRATION_SECRET: &str = "integration-secret";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub objects: Arc<MemoryObjectStore>,
}

pub fn pipeline_config(worker_url: Option<&str>) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.worker = WorkerConfig {
        url: worker_url.map(str::to_string),
        jwt_secret: Some(WORKER_SECRET.to_string()),
        token_ttl: Duration::from_secs(600),
    };
    config.integration.secret = Some(INTEGRATION_SECRET.to_string());
    config.integration.backoff_base = Duration::from_millis(50);
    config.http_timeout = Duration::from_secs(5);
    config
}

impl TestApp {
    pub fn new(pipeline_config: PipelineConfig) -> Self {
        let api_config = ApiConfig {
            rate_limit_rps: 1_000,
            allow_private_urls: true,
            ..ApiConfig::default()
        };
        Self::with_api_config(api_config, pipeline_config)
    }

    pub fn with_api_config(api_config: ApiConfig, pipeline_config: PipelineConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let objects = Arc::new(MemoryObjectStore::new("https://cdn.test"));
        let pipeline = Pipeline::new(store.clone(), objects.clone(), pipeline_config).unwrap();
        let router = create_router(AppState::with_pipeline(api_config, pipeline), None);
        Self {
            router,
            store,
            objects,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    pub async fn seed(&self, collection: &str, id: &str, doc: Value) {
        let fields = doc.as_object().cloned().unwrap();
        self.store.create(collection, id, fields).await.unwrap();
    }

    /// Upload `up1` owned by `u1` with transcript `t1`.
    pub async fn seed_upload_with_transcript(&self) {
        self.seed(
            "uploads",
            "up1",
            json!({"user_id": "u1", "storage_path": "uploads/u1/source.mp4", "status": "uploaded"}),
        )
        .await;
        self.seed(
            "transcripts",
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
}

/// JSON request with optional extra headers.
pub fn request(method: Method, uri: &str, body: Option<Value>, headers: &[(&str, String)]) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, value.as_str());
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn user(id: &str) -> (&'static str, String) {
    ("x-user-id", id.to_string())
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("authorization", format!("Bearer {token}"))
}

pub fn worker_token(job_id: &str, upload_id: &str) -> String {
    sign_worker_token(WORKER_SECRET, job_id, upload_id, Duration::from_secs(600)).unwrap()
}

pub fn integration_token() -> String {
    let claims = IntegrationClaims {
        sub: Some("newsroom".into()),
        exp: chrono::Utc::now().timestamp() + 600,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(INTEGRATION_SECRET.as_bytes()),
    )
    .unwrap()
}
