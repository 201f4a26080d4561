//! Signed workflow callbacks.
//!
//! The body is the JSON payload; `X-Signature` carries the lower-case hex
//! HMAC-SHA256 of exactly those bytes. Delivery is at-least-once with a
//! bounded number of attempts.

use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, warn};

use autocap_models::CallbackPayload;

use crate::error::{PipelineError, PipelineResult};
use crate::metrics;
use crate::retry::{retry_async, RetryConfig};

pub const SIGNATURE_HEADER: &str = "X-Signature";

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 of `body` keyed with `secret`.
pub fn sign_payload(secret: &str, body: &[u8]) -> PipelineResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PipelineError::config(format!("Invalid HMAC key: {e}")))?;
    mac.update(body);
    Ok(format!("{:x}", mac.finalize().into_bytes()))
}

/// Constant-time check of a hex signature.
pub fn verify_signature(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Some(expected) = decode_hex(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

fn decode_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect()
}

#[derive(Clone)]
pub struct CallbackClient {
    http: reqwest::Client,
    secret: Option<String>,
    backoff_base: Duration,
}

impl CallbackClient {
    pub fn new(http: reqwest::Client, secret: Option<String>, backoff_base: Duration) -> Self {
        Self {
            http,
            secret,
            backoff_base,
        }
    }

    /// POST `payload` to `url`, retrying with `base * 2^attempt` between
    /// attempts. Returns whether any attempt got a 2xx; never errors.
    pub async fn send(&self, kind: &str, url: &str, payload: &CallbackPayload, max_attempts: u32) -> bool {
        let Some(secret) = self.secret.as_deref() else {
            warn!(kind, video_id = %payload.video_id, "Callback secret not configured, skipping callback");
            metrics::record_callback(kind, false);
            return false;
        };

        let (body, signature) = match serde_json::to_vec(payload)
            .map_err(|e| PipelineError::config(e.to_string()))
            .and_then(|body| sign_payload(secret, &body).map(|sig| (body, sig)))
        {
            Ok(signed) => signed,
            Err(e) => {
                warn!(kind, error = %e, "Failed to sign callback payload");
                metrics::record_callback(kind, false);
                return false;
            }
        };

        let config = RetryConfig::new(format!("{kind} callback"))
            .with_max_attempts(max_attempts)
            .with_base_delay(self.backoff_base);

        let result = retry_async(&config, |attempt| {
            let request = self
                .http
                .post(url)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .header(SIGNATURE_HEADER, signature.as_str())
                .body(body.clone());
            async move {
                let response = request.send().await.map_err(|e| e.to_string())?;
                let status = response.status();
                if status.is_success() {
                    debug!(attempt = attempt + 1, "Callback delivered");
                    Ok(())
                } else {
                    let text = response.text().await.unwrap_or_default();
                    Err(format!("HTTP {}: {}", status.as_u16(), text))
                }
            }
        })
        .await;

        let delivered = result.is_success();
        if !delivered {
            warn!(
                kind,
                video_id = %payload.video_id,
                attempts = result.attempts(),
                "Callback delivery failed"
            );
        }
        metrics::record_callback(kind, delivered);
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_hex_hmac() {
        let sig = sign_payload("secret", br#"{"a":1}"#).unwrap();
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(sig, sign_payload("secret", br#"{"a":1}"#).unwrap());
        assert_ne!(sig, sign_payload("other", br#"{"a":1}"#).unwrap());

        assert!(verify_signature("secret", br#"{"a":1}"#, &sig));
        assert!(!verify_signature("secret", br#"{"a":2}"#, &sig));
        assert!(!verify_signature("secret", br#"{"a":1}"#, "zz"));
    }

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2
        let sig = sign_payload("Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }
}
