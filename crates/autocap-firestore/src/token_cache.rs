//! OAuth token cache for the Firestore REST API.
//!
//! Tokens are refreshed a minute before expiry. Refresh happens under the
//! write lock so concurrent callers wait for one refresh instead of each
//! fetching their own. If a refresh fails while the old token is still
//! valid, the old token is used.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use gcp_auth::TokenProvider;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{FirestoreError, FirestoreResult};

const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Used when the provider reports an expiry we cannot convert.
const FALLBACK_TTL: Duration = Duration::from_secs(50 * 60);

pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

struct Cached {
    value: String,
    expires_at: Instant,
}

impl Cached {
    fn fresh(&self) -> bool {
        Instant::now() + REFRESH_MARGIN < self.expires_at
    }

    fn unexpired(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

pub struct TokenCache {
    provider: Arc<dyn TokenProvider>,
    slot: RwLock<Option<Cached>>,
}

impl TokenCache {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            slot: RwLock::new(None),
        }
    }

    /// Drop the cached token, e.g. after the API reported it expired.
    pub async fn invalidate(&self) {
        *self.slot.write().await = None;
    }

    pub async fn get_token(&self) -> FirestoreResult<String> {
        if let Some(cached) = self.slot.read().await.as_ref().filter(|c| c.fresh()) {
            return Ok(cached.value.clone());
        }

        let mut slot = self.slot.write().await;
        if let Some(cached) = slot.as_ref().filter(|c| c.fresh()) {
            return Ok(cached.value.clone());
        }

        match self.provider.token(&[DATASTORE_SCOPE]).await {
            Ok(token) => {
                let value = token.as_str().to_string();
                let remaining = token.expires_at() - Utc::now();
                let expires_at = match remaining.to_std() {
                    Ok(ttl) => Instant::now() + ttl,
                    Err(_) if remaining > chrono::Duration::zero() => Instant::now() + FALLBACK_TTL,
                    Err(_) => Instant::now(),
                };
                *slot = Some(Cached {
                    value: value.clone(),
                    expires_at,
                });
                debug!("Refreshed document store access token");
                Ok(value)
            }
            Err(e) => match slot.as_ref().filter(|c| c.unexpired()) {
                Some(cached) => {
                    warn!(error = %e, "Token refresh failed, reusing current token");
                    Ok(cached.value.clone())
                }
                None => Err(FirestoreError::auth_error(format!(
                    "Failed to obtain access token: {e}"
                ))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_token_freshness() {
        let soon = Cached {
            value: "t".into(),
            expires_at: Instant::now() + Duration::from_secs(30),
        };
        assert!(!soon.fresh());
        assert!(soon.unexpired());

        let later = Cached {
            value: "t".into(),
            expires_at: Instant::now() + Duration::from_secs(600),
        };
        assert!(later.fresh());
    }

    #[test]
    fn test_scope() {
        assert!(DATASTORE_SCOPE.ends_with("/datastore"));
    }
}
