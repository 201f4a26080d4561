//! Portal export delivery.
//!
//! A delivery is a synchronous burst of up to `max_attempts` POSTs with no
//! sleep between them. Every failed attempt records `nextAttemptAt = now +
//! 2^attempt * backoff_base` so an external sweep can pick the row up later;
//! the first success marks the row `exported`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use autocap_firestore::{DocumentStore, Update};
use autocap_models::{ExportJob, ExportPayload, RenderJobStatus};

use crate::collections::RENDER_JOBS;
use crate::config::ExportConfig;
use crate::error::PipelineResult;
use crate::metrics;

pub const PORTAL_SECRET_HEADER: &str = "x-portal-secret";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOutcome {
    pub job_id: String,
    pub status: RenderJobStatus,
    pub attempts: u32,
}

#[derive(Clone)]
pub struct PortalExporter {
    store: Arc<dyn DocumentStore>,
    http: reqwest::Client,
    config: ExportConfig,
}

impl PortalExporter {
    pub fn new(store: Arc<dyn DocumentStore>, http: reqwest::Client, config: ExportConfig) -> Self {
        Self {
            store,
            http,
            config,
        }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Run one delivery burst for `export` and record every attempt on its row.
    pub async fn deliver(
        &self,
        export: &ExportJob,
        portal_url: &str,
        rendered_video_url: &str,
    ) -> PipelineResult<ExportOutcome> {
        let payload = export.payload(rendered_video_url);
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 0..max_attempts {
            let attempted_at = Utc::now();
            match self.post(portal_url, &payload).await {
                Ok(()) => {
                    self.store
                        .update(
                            RENDER_JOBS,
                            &export.id,
                            Update::new()
                                .set("status", RenderJobStatus::Exported.as_str())
                                .set("attempts", attempt + 1)
                                .set("lastAttemptAt", attempted_at.to_rfc3339())
                                .set("updatedAt", Utc::now().to_rfc3339()),
                        )
                        .await?;
                    metrics::record_export_attempt(true);
                    info!(export_id = %export.id, attempts = attempt + 1, "Export delivered");
                    return Ok(ExportOutcome {
                        job_id: export.id.clone(),
                        status: RenderJobStatus::Exported,
                        attempts: attempt + 1,
                    });
                }
                Err(reason) => {
                    let next_attempt_at = self.next_attempt_at(attempted_at, attempt);
                    self.store
                        .update(
                            RENDER_JOBS,
                            &export.id,
                            Update::new()
                                .set("status", RenderJobStatus::ExportFailed.as_str())
                                .set("attempts", attempt + 1)
                                .set("lastAttemptAt", attempted_at.to_rfc3339())
                                .set("nextAttemptAt", next_attempt_at.to_rfc3339())
                                .set("lastError", reason.as_str())
                                .set("updatedAt", Utc::now().to_rfc3339()),
                        )
                        .await?;
                    metrics::record_export_attempt(false);
                    warn!(
                        export_id = %export.id,
                        attempt = attempt + 1,
                        error = %reason,
                        "Export attempt failed"
                    );
                }
            }
        }

        Ok(ExportOutcome {
            job_id: export.id.clone(),
            status: RenderJobStatus::ExportFailed,
            attempts: max_attempts,
        })
    }

    fn next_attempt_at(&self, attempted_at: DateTime<Utc>, attempt: u32) -> DateTime<Utc> {
        let delay = self
            .config
            .backoff_base
            .saturating_mul(2u32.saturating_pow(attempt));
        attempted_at + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero())
    }

    async fn post(&self, portal_url: &str, payload: &ExportPayload) -> Result<(), String> {
        let mut request = self.http.post(portal_url).json(payload);
        if let Some(token) = &self.config.auth_token {
            request = request.bearer_auth(token);
        }
        if let Some(secret) = &self.config.portal_secret {
            request = request.header(PORTAL_SECRET_HEADER, secret);
        }

        let response = request.send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(format!("Portal responded {}: {}", status.as_u16(), text))
        }
    }
}
