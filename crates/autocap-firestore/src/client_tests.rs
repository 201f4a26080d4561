//! Error mapping and configuration tests for the Firestore client.

use std::time::Duration;

use serial_test::serial;

use crate::client::FirestoreConfig;
use crate::error::FirestoreError;

fn clear_env() {
    for key in [
        "GCP_PROJECT_ID",
        "FIREBASE_PROJECT_ID",
        "FIRESTORE_CONNECT_TIMEOUT_SECS",
        "FIRESTORE_RETRY_BASE_MS",
        "FIRESTORE_RETRY_MAX_MS",
        "FIRESTORE_MAX_RETRIES",
    ] {
        std::env::remove_var(key);
    }
}

// =============================================================================
// Error mapping
// =============================================================================

#[test]
fn test_status_mapping() {
    assert!(matches!(FirestoreError::from_http_status(429, "slow down"), FirestoreError::RateLimited(_)));
    assert!(matches!(FirestoreError::from_http_status(503, "unavailable"), FirestoreError::ServerError(503, _)));
    assert!(matches!(FirestoreError::from_http_status(400, "bad"), FirestoreError::RequestFailed(_)));
    assert!(matches!(FirestoreError::from_http_status(404, "gone"), FirestoreError::NotFound(_)));
    assert!(matches!(FirestoreError::from_http_status(409, "taken"), FirestoreError::AlreadyExists(_)));
    assert!(matches!(FirestoreError::from_http_status(403, "no"), FirestoreError::PermissionDenied(_)));
}

#[test]
fn test_only_transient_errors_retry() {
    assert!(FirestoreError::from_http_status(500, "boom").is_retryable());
    assert!(FirestoreError::from_http_status(429, "slow down").is_retryable());
    assert!(!FirestoreError::from_http_status(400, "bad").is_retryable());
    assert!(!FirestoreError::from_http_status(404, "gone").is_retryable());
    assert!(!FirestoreError::from_http_status(409, "taken").is_retryable());
}

#[test]
fn test_http_status_and_retry_after() {
    assert_eq!(FirestoreError::RateLimited(1000).http_status(), Some(429));
    assert_eq!(FirestoreError::ServerError(502, "bad gateway".into()).http_status(), Some(502));
    assert_eq!(FirestoreError::invalid_document("x").http_status(), None);
    assert_eq!(FirestoreError::RateLimited(5000).retry_after_ms(), Some(5000));
    assert_eq!(FirestoreError::ServerError(500, "e".into()).retry_after_ms(), None);
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
#[serial]
fn test_config_rejects_empty_project_id() {
    clear_env();
    std::env::set_var("GCP_PROJECT_ID", "");
    assert!(FirestoreConfig::from_env().is_err());
    clear_env();
}

#[test]
#[serial]
fn test_config_prefers_gcp_project_id() {
    clear_env();
    std::env::set_var("FIREBASE_PROJECT_ID", "firebase-project");
    assert_eq!(FirestoreConfig::from_env().unwrap().project_id, "firebase-project");

    std::env::set_var("GCP_PROJECT_ID", "gcp-project");
    assert_eq!(FirestoreConfig::from_env().unwrap().project_id, "gcp-project");
    clear_env();
}

#[test]
#[serial]
fn test_config_parses_env_overrides() {
    clear_env();
    std::env::set_var("GCP_PROJECT_ID", "test");
    std::env::set_var("FIRESTORE_CONNECT_TIMEOUT_SECS", "15");
    std::env::set_var("FIRESTORE_RETRY_BASE_MS", "50");
    std::env::set_var("FIRESTORE_RETRY_MAX_MS", "2000");
    let config = FirestoreConfig::from_env().unwrap();
    assert_eq!(config.connect_timeout, Duration::from_secs(15));
    assert_eq!(config.retry.base_delay_ms, 50);
    assert_eq!(config.retry.max_delay_ms, 2000);
    clear_env();
}

#[test]
#[serial]
fn test_config_ignores_invalid_numbers() {
    clear_env();
    std::env::set_var("GCP_PROJECT_ID", "test");
    std::env::set_var("FIRESTORE_CONNECT_TIMEOUT_SECS", "not-a-number");
    let config = FirestoreConfig::from_env().unwrap();
    assert_eq!(config.connect_timeout, Duration::from_secs(5));
    assert_eq!(config.retry.max_retries, 3);
    clear_env();
}
