//! Per-upload single-flight lock.
//!
//! A lock is a `render_locks` document keyed by upload id, created with a
//! conditional insert. Locks older than their TTL are taken over, so a
//! crashed request cannot block an upload forever.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use autocap_firestore::{DocumentStore, FirestoreError, Fields};

use crate::collections::RENDER_LOCKS;
use crate::error::{PipelineError, PipelineResult};

pub struct RenderLock {
    store: Arc<dyn DocumentStore>,
    upload_id: String,
    token: String,
}

impl RenderLock {
    pub async fn acquire(
        store: Arc<dyn DocumentStore>,
        upload_id: &str,
        ttl: Duration,
    ) -> PipelineResult<Self> {
        let token = Uuid::new_v4().to_string();
        let now_ms = Utc::now().timestamp_millis();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);

        let mut fields = Fields::new();
        fields.insert("token".into(), Value::from(token.clone()));
        fields.insert("acquiredAtMs".into(), Value::from(now_ms));
        fields.insert("expiresAtMs".into(), Value::from(now_ms.saturating_add(ttl_ms)));

        match store.create(RENDER_LOCKS, upload_id, fields.clone()).await {
            Ok(()) => {}
            Err(FirestoreError::AlreadyExists(_)) => {
                let existing = store.get(RENDER_LOCKS, upload_id).await?;
                let expired = existing
                    .as_ref()
                    .and_then(|doc| doc.get("expiresAtMs"))
                    .and_then(Value::as_i64)
                    .map_or(true, |expires| expires <= now_ms);
                if !expired {
                    return Err(PipelineError::conflict(
                        "A render is already in progress for this upload",
                    ));
                }

                warn!(upload_id, "Taking over expired render lock");
                store.delete(RENDER_LOCKS, upload_id).await?;
                store
                    .create(RENDER_LOCKS, upload_id, fields)
                    .await
                    .map_err(|e| match e {
                        FirestoreError::AlreadyExists(_) => PipelineError::conflict(
                            "A render is already in progress for this upload",
                        ),
                        other => other.into(),
                    })?;
            }
            Err(e) => return Err(e.into()),
        }

        debug!(upload_id, "Acquired render lock");
        Ok(Self {
            store,
            upload_id: upload_id.to_string(),
            token,
        })
    }

    /// Release the lock if it is still ours. Failures only warn; the TTL
    /// frees the upload eventually.
    pub async fn release(self) {
        let current = match self.store.get(RENDER_LOCKS, &self.upload_id).await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(upload_id = %self.upload_id, error = %e, "Failed to read render lock");
                return;
            }
        };

        let ours = current
            .as_ref()
            .and_then(|doc| doc.get("token"))
            .and_then(Value::as_str)
            == Some(self.token.as_str());
        if !ours {
            warn!(upload_id = %self.upload_id, "Render lock was taken over before release");
            return;
        }

        if let Err(e) = self.store.delete(RENDER_LOCKS, &self.upload_id).await {
            warn!(upload_id = %self.upload_id, error = %e, "Failed to release render lock");
        }
    }
}
