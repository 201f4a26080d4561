//! Render worker client: signed dispatch and token verification.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use autocap_models::{CaptionFormat, CaptionTemplate, Overlay, Resolution};

use crate::config::WorkerConfig;
use crate::error::{PipelineError, PipelineResult};

/// Claims of a worker token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerClaims {
    pub job_id: String,
    pub upload_id: String,
    pub iat: i64,
    pub exp: i64,
}

/// Body of `POST {worker}/render`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRenderRequest {
    pub job_id: String,
    pub upload_id: String,
    pub video_path: String,
    pub caption_path: String,
    pub caption_format: CaptionFormat,
    pub template: CaptionTemplate,
    pub resolution: Resolution,
    pub output_path: String,
    pub overlays: Vec<Overlay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_video_id: Option<String>,
}

#[derive(Clone)]
pub struct WorkerClient {
    http: reqwest::Client,
    url: String,
    secret: String,
    token_ttl: Duration,
}

impl WorkerClient {
    pub fn new(
        http: reqwest::Client,
        url: impl Into<String>,
        secret: impl Into<String>,
        token_ttl: Duration,
    ) -> Self {
        Self {
            http,
            url: url.into().trim_end_matches('/').to_string(),
            secret: secret.into(),
            token_ttl,
        }
    }

    /// `None` unless both the worker URL and secret are configured.
    pub fn from_config(http: reqwest::Client, config: &WorkerConfig) -> Option<Self> {
        match (&config.url, &config.jwt_secret) {
            (Some(url), Some(secret)) => Some(Self::new(http, url, secret, config.token_ttl)),
            _ => None,
        }
    }

    pub fn sign_token(&self, job_id: &str, upload_id: &str) -> PipelineResult<String> {
        sign_worker_token(&self.secret, job_id, upload_id, self.token_ttl)
    }

    /// Hand a job to the worker. A transport failure and a non-2xx answer
    /// are reported as different errors.
    pub async fn dispatch(&self, request: &WorkerRenderRequest) -> PipelineResult<()> {
        let token = self.sign_token(&request.job_id, &request.upload_id)?;
        let endpoint = format!("{}/render", self.url);

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(token)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!(job_id = %request.job_id, error = %e, "Worker unreachable");
                PipelineError::WorkerUnreachable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let reason = response.text().await.unwrap_or_default();
            warn!(
                job_id = %request.job_id,
                status = status.as_u16(),
                reason = %reason,
                "Worker rejected render job"
            );
            return Err(PipelineError::WorkerRejected {
                status: status.as_u16(),
                reason,
            });
        }

        debug!(job_id = %request.job_id, "Worker accepted render job");
        Ok(())
    }
}

pub fn sign_worker_token(
    secret: &str,
    job_id: &str,
    upload_id: &str,
    ttl: Duration,
) -> PipelineResult<String> {
    let now = Utc::now().timestamp();
    let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    let claims = WorkerClaims {
        job_id: job_id.to_string(),
        upload_id: upload_id.to_string(),
        iat: now,
        exp: now.saturating_add(ttl_secs),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| PipelineError::config(format!("Failed to sign worker token: {e}")))
}

/// Verify a worker token and return its claims.
pub fn verify_worker_token(secret: &str, token: &str) -> Option<WorkerClaims> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<WorkerClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .ok()
}
