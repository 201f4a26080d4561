//! Request authentication.
//!
//! Three callers reach the API:
//! - Editor users, identified by the `X-User-Id` header set by the gateway
//! - The render worker, presenting an HS256 token signed with `WORKER_JWT_SECRET`
//! - The external integration system, presenting an HS256 bearer token
//!   signed with `INTEGRATION_JWT_SECRET`

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;

use autocap_pipeline::{verify_worker_token, WorkerClaims};

use crate::error::ApiError;
use crate::metrics::record_auth_failure;
use crate::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const DEFAULT_USER_ID: &str = "default-user";

/// Editor user on whose behalf a request runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: String,
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_USER_ID)
            .to_string();
        Ok(CurrentUser { user_id })
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Render worker reporting on a job. The handler must still check that
/// `claims.job_id` matches the job in the path.
#[derive(Debug, Clone)]
pub struct WorkerAuth {
    pub claims: WorkerClaims,
}

impl WorkerAuth {
    pub fn ensure_job(&self, job_id: &str) -> Result<(), ApiError> {
        if self.claims.job_id == job_id {
            Ok(())
        } else {
            record_auth_failure("worker");
            Err(ApiError::forbidden("Token does not match job"))
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for WorkerAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let secret = state
            .pipeline
            .config()
            .worker
            .jwt_secret
            .as_deref()
            .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;
        let token = bearer_token(parts).ok_or_else(|| {
            record_auth_failure("worker");
            ApiError::unauthorized("Unauthorized")
        })?;

        match verify_worker_token(secret, token) {
            Some(claims) => Ok(WorkerAuth { claims }),
            None => {
                record_auth_failure("worker");
                Err(ApiError::unauthorized("Unauthorized"))
            }
        }
    }
}

/// Claims accepted from the integration system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationClaims {
    #[serde(default)]
    pub sub: Option<String>,
    pub exp: i64,
}

/// Verify an integration bearer token.
pub fn verify_integration_token(secret: &str, token: &str) -> Option<IntegrationClaims> {
    decode::<IntegrationClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| warn!(error = %e, "Rejected integration token"))
    .ok()
}

/// External integration system.
#[derive(Debug, Clone)]
pub struct IntegrationAuth {
    pub claims: IntegrationClaims,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for IntegrationAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(secret) = state.pipeline.config().integration.secret.as_deref() else {
            warn!("INTEGRATION_JWT_SECRET not set; rejecting integration request");
            return Err(ApiError::unauthorized("Unauthorized"));
        };

        bearer_token(parts)
            .and_then(|token| verify_integration_token(secret, token))
            .map(|claims| IntegrationAuth { claims })
            .ok_or_else(|| {
                record_auth_failure("integration");
                ApiError::unauthorized("Unauthorized")
            })
    }
}
