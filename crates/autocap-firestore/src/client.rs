//! Firestore REST client and the [`DocumentStore`] built on it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::{record_query_results, record_request};
use crate::retry::{with_retry, RetryConfig};
use crate::store::{Direction, DocumentStore, Fields, Filter, FindOptions, Update};
use crate::token_cache::TokenCache;
use crate::types::{
    fields_from_json, ArrayValue, BatchWriteRequest, BatchWriteResponse, CollectionSelector,
    CompositeFilter, Document, DocumentMask, FieldFilter, FieldReference, FieldTransform,
    Precondition, QueryFilter, QueryOrder, RunQueryRequest, RunQueryResponse, StructuredQuery,
    Value, Write,
};

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    /// Usually "(default)"
    pub database_id: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub retry: RetryConfig,
}

impl FirestoreConfig {
    pub fn from_env() -> FirestoreResult<Self> {
        let project_id = std::env::var("GCP_PROJECT_ID")
            .or_else(|_| std::env::var("FIREBASE_PROJECT_ID"))
            .map_err(|_| {
                FirestoreError::auth_error("GCP_PROJECT_ID or FIREBASE_PROJECT_ID must be set")
            })?;
        if project_id.trim().is_empty() {
            return Err(FirestoreError::auth_error(
                "GCP_PROJECT_ID or FIREBASE_PROJECT_ID cannot be empty",
            ));
        }

        let connect_timeout_secs: u64 = std::env::var("FIRESTORE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);
        let timeout_secs: u64 = std::env::var("FIRESTORE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        Ok(Self {
            project_id,
            database_id: std::env::var("FIRESTORE_DATABASE_ID")
                .unwrap_or_else(|_| "(default)".to_string()),
            timeout: Duration::from_secs(timeout_secs),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            retry: RetryConfig::from_env(),
        })
    }

    fn documents_root(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents",
            self.project_id, self.database_id
        )
    }
}

// =============================================================================
// Client
// =============================================================================

#[derive(Clone)]
pub struct FirestoreClient {
    http: Client,
    config: FirestoreConfig,
    base_url: String,
    token_cache: Arc<TokenCache>,
}

impl FirestoreClient {
    pub async fn new(config: FirestoreConfig) -> FirestoreResult<Self> {
        let service_account = CustomServiceAccount::from_env()
            .map_err(|e| FirestoreError::auth_error(format!("Failed to load service account: {e}")))?
            .ok_or_else(|| {
                FirestoreError::auth_error(
                    "GOOGLE_APPLICATION_CREDENTIALS must point to a service account JSON file",
                )
            })?;
        Self::with_token_provider(config, Arc::new(service_account))
    }

    pub fn with_token_provider(
        config: FirestoreConfig,
        provider: Arc<dyn TokenProvider>,
    ) -> FirestoreResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("autocap-firestore/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let base_url = format!(
            "https://firestore.googleapis.com/v1/{}",
            config.documents_root()
        );

        Ok(Self {
            http,
            config,
            base_url,
            token_cache: Arc::new(TokenCache::new(provider)),
        })
    }

    pub async fn from_env() -> FirestoreResult<Self> {
        Self::new(FirestoreConfig::from_env()?).await
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    /// Resource name used inside write and query bodies.
    pub fn full_document_name(&self, collection: &str, doc_id: &str) -> String {
        format!("{}/{}/{}", self.config.documents_root(), collection, doc_id)
    }

    fn document_url(&self, collection: &str, doc_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            collection,
            urlencoding::encode(doc_id)
        )
    }

    fn is_access_token_expired(body: &str) -> bool {
        body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
    }

    /// Send with a bearer token; on an expired-token 401, refresh once and resend.
    async fn send<F>(&self, build: F) -> FirestoreResult<Response>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.token_cache.get_token().await?;
        let response = build(&token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if !Self::is_access_token_expired(&body) {
            return Err(FirestoreError::from_http_status(401, body));
        }
        self.token_cache.invalidate().await;
        let token = self.token_cache.get_token().await?;
        Ok(build(&token).send().await?)
    }

    pub async fn get_document(&self, collection: &str, doc_id: &str) -> FirestoreResult<Option<Document>> {
        let url = self.document_url(collection, doc_id);
        self.execute("get_document", collection, Some(doc_id), async {
            let response = self.send(|token| self.http.get(&url).bearer_auth(token)).await?;
            match response.status() {
                StatusCode::OK => Ok(Some(response.json().await?)),
                StatusCode::NOT_FOUND => Ok(None),
                status => Err(error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    pub async fn create_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
    ) -> FirestoreResult<Document> {
        let url = format!(
            "{}/{}?documentId={}",
            self.base_url,
            collection,
            urlencoding::encode(doc_id)
        );
        let body = Document::new(fields);
        self.execute("create_document", collection, Some(doc_id), async {
            let response = self
                .send(|token| self.http.post(&url).bearer_auth(token).json(&body))
                .await?;
            match response.status() {
                StatusCode::OK | StatusCode::CREATED => Ok(response.json().await?),
                StatusCode::CONFLICT => Err(FirestoreError::AlreadyExists(format!(
                    "{collection}/{doc_id}"
                ))),
                status => Err(error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    pub async fn delete_document(&self, collection: &str, doc_id: &str) -> FirestoreResult<()> {
        let url = self.document_url(collection, doc_id);
        self.execute("delete_document", collection, Some(doc_id), async {
            let response = self.send(|token| self.http.delete(&url).bearer_auth(token)).await?;
            match response.status() {
                StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
                StatusCode::NOT_FOUND => {
                    debug!(collection, doc_id, "Document already deleted");
                    Ok(())
                }
                status => Err(error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Run a structured query against top-level collections.
    pub async fn run_query(&self, query: StructuredQuery) -> FirestoreResult<Vec<Document>> {
        let collection = query
            .from
            .first()
            .map(|c| c.collection_id.clone())
            .unwrap_or_default();
        let url = format!("{}:runQuery", self.base_url);
        let request = RunQueryRequest {
            structured_query: query,
        };

        self.execute("run_query", &collection, None, async {
            let response = self
                .send(|token| self.http.post(&url).bearer_auth(token).json(&request))
                .await?;
            match response.status() {
                StatusCode::OK => {
                    let body = response.text().await.unwrap_or_default();
                    let rows: Vec<RunQueryResponse> = serde_json::from_str(&body).map_err(|e| {
                        FirestoreError::request_failed(format!(
                            "Failed to parse runQuery response: {e} (body prefix: {})",
                            body.chars().take(200).collect::<String>()
                        ))
                    })?;
                    let docs: Vec<Document> = rows.into_iter().filter_map(|r| r.document).collect();
                    record_query_results(&collection, docs.len());
                    Ok(docs)
                }
                status => Err(error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Non-atomic batch write; per-write failures come back in the status list.
    pub async fn batch_write(&self, writes: Vec<Write>) -> FirestoreResult<BatchWriteResponse> {
        if writes.len() > 500 {
            return Err(FirestoreError::request_failed("Batch write exceeds 500 writes"));
        }
        let url = format!("{}:batchWrite", self.base_url);
        let request = BatchWriteRequest { writes };

        self.execute("batch_write", "batch", None, async {
            let response = self
                .send(|token| self.http.post(&url).bearer_auth(token).json(&request))
                .await?;
            match response.status() {
                StatusCode::OK => Ok(response.json().await?),
                status => Err(error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    async fn execute<T, F>(
        &self,
        operation: &str,
        collection: &str,
        doc_id: Option<&str>,
        fut: F,
    ) -> FirestoreResult<T>
    where
        F: std::future::Future<Output = FirestoreResult<T>>,
    {
        let span = info_span!(
            "firestore_request",
            operation = %operation,
            collection = %collection,
            doc_id = doc_id.unwrap_or("")
        );

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, start.elapsed().as_secs_f64() * 1000.0);
        result
    }
}

async fn error_from_response(status: StatusCode, url: &str, response: Response) -> FirestoreError {
    let body = response.text().await.unwrap_or_default();
    FirestoreError::from_http_status(status.as_u16(), format!("{url} failed: {body}"))
}

// =============================================================================
// DocumentStore over Firestore
// =============================================================================

/// [`DocumentStore`] backed by Firestore. Reads, queries, updates and
/// deletes are retried on transient errors; creates are not, so a create
/// that timed out after succeeding is not reported as a conflict.
#[derive(Clone)]
pub struct FirestoreStore {
    client: FirestoreClient,
}

impl FirestoreStore {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    pub async fn from_env() -> FirestoreResult<Self> {
        Ok(Self::new(FirestoreClient::from_env().await?))
    }

    fn retry(&self) -> &RetryConfig {
        &self.client.config.retry
    }
}

fn build_query(collection: &str, filters: &[Filter], options: &FindOptions) -> StructuredQuery {
    let mut clauses: Vec<QueryFilter> = filters
        .iter()
        .map(|f| {
            QueryFilter::FieldFilter(FieldFilter {
                field: FieldReference {
                    field_path: f.field.clone(),
                },
                op: "EQUAL".to_string(),
                value: Value::from_json(&f.value),
            })
        })
        .collect();

    let filter = match clauses.len() {
        0 => None,
        1 => clauses.pop(),
        _ => Some(QueryFilter::CompositeFilter(CompositeFilter {
            op: "AND".to_string(),
            filters: clauses,
        })),
    };

    let order_by = options
        .order_by
        .iter()
        .map(|(field, direction)| QueryOrder {
            field: FieldReference {
                field_path: field.clone(),
            },
            direction: match direction {
                Direction::Ascending => "ASCENDING",
                Direction::Descending => "DESCENDING",
            }
            .to_string(),
        })
        .collect();

    StructuredQuery {
        from: vec![CollectionSelector {
            collection_id: collection.to_string(),
        }],
        filter,
        order_by,
        limit: options.limit,
    }
}

fn build_update_write(name: String, update: Update) -> Write {
    let mut set = update.set;
    set.remove("id");
    let field_paths: Vec<String> = set.keys().cloned().collect();

    let transforms = update
        .increment
        .into_iter()
        .map(|(field_path, by)| FieldTransform {
            field_path,
            increment: Some(Value::IntegerValue(by.to_string())),
            append_missing_elements: None,
        })
        .chain(update.append.into_iter().map(|(field_path, values)| FieldTransform {
            field_path,
            increment: None,
            append_missing_elements: Some(ArrayValue {
                values: Some(values.iter().map(Value::from_json).collect()),
            }),
        }))
        .collect();

    Write {
        update: Some(Document::named(name, fields_from_json(&set))),
        update_mask: Some(DocumentMask { field_paths }),
        update_transforms: transforms,
        current_document: Some(Precondition { exists: true }),
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, collection: &str, id: &str) -> FirestoreResult<Option<Fields>> {
        let doc = with_retry(self.retry(), "get_document", || {
            self.client.get_document(collection, id)
        })
        .await?;
        doc.map(Document::into_json_fields).transpose()
    }

    async fn find(
        &self,
        collection: &str,
        filters: &[Filter],
        options: FindOptions,
    ) -> FirestoreResult<Vec<Fields>> {
        let query = build_query(collection, filters, &options);
        let docs = with_retry(self.retry(), "run_query", || {
            self.client.run_query(query.clone())
        })
        .await?;
        docs.into_iter().map(Document::into_json_fields).collect()
    }

    async fn insert(&self, collection: &str, fields: Fields) -> FirestoreResult<String> {
        let id = Uuid::new_v4().to_string();
        self.create(collection, &id, fields).await?;
        Ok(id)
    }

    async fn create(&self, collection: &str, id: &str, mut fields: Fields) -> FirestoreResult<()> {
        fields.remove("id");
        self.client
            .create_document(collection, id, fields_from_json(&fields))
            .await
            .map(|_| ())
    }

    async fn update(&self, collection: &str, id: &str, update: Update) -> FirestoreResult<()> {
        if update.is_empty() {
            return Ok(());
        }
        let target = format!("{collection}/{id}");
        let name = self.client.full_document_name(collection, id);
        let response = with_retry(self.retry(), "update_document", || {
            self.client
                .batch_write(vec![build_update_write(name.clone(), update.clone())])
        })
        .await?;
        response.check(&target)
    }

    async fn delete(&self, collection: &str, id: &str) -> FirestoreResult<()> {
        with_retry(self.retry(), "delete_document", || {
            self.client.delete_document(collection, id)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_requires_project_id() {
        std::env::remove_var("GCP_PROJECT_ID");
        std::env::remove_var("FIREBASE_PROJECT_ID");
        assert!(FirestoreConfig::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        std::env::set_var("GCP_PROJECT_ID", "test-project");
        std::env::remove_var("FIRESTORE_CONNECT_TIMEOUT_SECS");
        std::env::remove_var("FIRESTORE_DATABASE_ID");
        let config = FirestoreConfig::from_env().unwrap();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.documents_root(), "projects/test-project/databases/(default)/documents");
        std::env::remove_var("GCP_PROJECT_ID");
    }

    #[test]
    fn test_query_combines_filters_with_and() {
        let query = build_query(
            "integration_videos",
            &[Filter::eq("externalVideoId", "ext-1"), Filter::eq("portalId", "p1")],
            &FindOptions::newest_first("createdAt").limit(1),
        );
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["from"][0]["collectionId"], "integration_videos");
        assert_eq!(json["where"]["compositeFilter"]["op"], "AND");
        assert_eq!(json["where"]["compositeFilter"]["filters"].as_array().unwrap().len(), 2);
        assert_eq!(json["orderBy"][0]["field"]["fieldPath"], "createdAt");
        assert_eq!(json["limit"], 1);

        let unfiltered = serde_json::to_value(build_query("jobs", &[], &FindOptions::default())).unwrap();
        assert!(unfiltered.get("where").is_none());
        assert!(unfiltered.get("orderBy").is_none());
    }

    #[test]
    fn test_update_write_shape() {
        let write = build_update_write(
            "projects/p/databases/(default)/documents/videos/v1".into(),
            Update::new()
                .set("status", "rendering")
                .set("id", "ignored")
                .increment("callbackAttempts", 1)
                .append("workflowHistory", json!({"status": "rendering"})),
        );
        let json = serde_json::to_value(&write).unwrap();
        assert_eq!(json["updateMask"]["fieldPaths"], json!(["status"]));
        assert_eq!(json["update"]["fields"]["status"]["stringValue"], "rendering");
        assert_eq!(json["updateTransforms"][0]["increment"]["integerValue"], "1");
        assert_eq!(json["updateTransforms"][1]["fieldPath"], "workflowHistory");
        assert_eq!(json["currentDocument"]["exists"], true);
    }
}
