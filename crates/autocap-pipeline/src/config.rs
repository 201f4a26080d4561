//! Pipeline configuration.

use std::time::Duration;

use autocap_models::Portal;

/// Render worker endpoint and token signing.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Base URL; jobs are posted to `{url}/render`
    pub url: Option<String>,
    /// Shared HS256 secret for worker tokens
    pub jwt_secret: Option<String>,
    /// Lifetime of dispatch tokens
    pub token_ttl: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            url: None,
            jwt_secret: None,
            token_ttl: Duration::from_secs(600),
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        Self {
            url: non_empty_var("FFMPEG_WORKER_URL"),
            jwt_secret: non_empty_var("WORKER_JWT_SECRET"),
            token_ttl: Duration::from_secs(
                std::env::var("WORKER_TOKEN_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
        }
    }
}

/// Portal export settings.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// `ENABLE_PORTAL_EXPORT=true`
    pub enabled: bool,
    /// Single/default portal (`PORTAL_EXPORT_URL`)
    pub default_url: Option<String>,
    pub default_name: String,
    /// Numbered portals (`PORTAL_EXPORT_URL_<n>`), in slot order
    pub portals: Vec<Portal>,
    /// Sent as `x-portal-secret`
    pub portal_secret: Option<String>,
    /// Sent as `Authorization: Bearer ..`
    pub auth_token: Option<String>,
    /// Attempts per export burst
    pub max_attempts: u32,
    /// `next_attempt_at = now + 2^attempt * backoff_base`
    pub backoff_base: Duration,
    /// Create the export row before triggering the render
    pub record_before_trigger: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            default_url: None,
            default_name: "Portal".to_string(),
            portals: Vec::new(),
            portal_secret: None,
            auth_token: None,
            max_attempts: 3,
            backoff_base: Duration::from_secs(60),
            record_before_trigger: false,
        }
    }
}

impl ExportConfig {
    pub fn from_env() -> Self {
        let max_portals: u32 = std::env::var("PORTAL_EXPORT_MAX_PORTALS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        let portals = (1..=max_portals)
            .filter_map(|slot| {
                let url = non_empty_var(&format!("PORTAL_EXPORT_URL_{slot}"))?;
                let name = non_empty_var(&format!("PORTAL_EXPORT_NAME_{slot}"))
                    .unwrap_or_else(|| format!("Portal {slot}"));
                Some(Portal {
                    id: slot.to_string(),
                    name,
                    url,
                })
            })
            .collect();

        Self {
            enabled: std::env::var("ENABLE_PORTAL_EXPORT").as_deref() == Ok("true"),
            default_url: non_empty_var("PORTAL_EXPORT_URL"),
            default_name: non_empty_var("PORTAL_EXPORT_NAME").unwrap_or_else(|| "Portal".to_string()),
            portals,
            portal_secret: non_empty_var("PORTAL_SECRET"),
            auth_token: non_empty_var("WORKER_JWT_SECRET"),
            max_attempts: std::env::var("EXPORT_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            backoff_base: Duration::from_secs(
                std::env::var("EXPORT_BACKOFF_BASE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            record_before_trigger: std::env::var("EXPORT_RECORD_BEFORE_TRIGGER")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(false),
        }
    }
}

/// External-system integration settings.
#[derive(Debug, Clone)]
pub struct IntegrationConfig {
    /// HMAC key for callback signatures and bearer tokens
    pub secret: Option<String>,
    pub callback_attempts: u32,
    pub error_callback_attempts: u32,
    /// Delay after the first failed attempt; doubles each time
    pub backoff_base: Duration,
    /// Per-request timeout when mirroring source videos
    pub mirror_timeout: Duration,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            secret: None,
            callback_attempts: 3,
            error_callback_attempts: 2,
            backoff_base: Duration::from_millis(1000),
            mirror_timeout: Duration::from_secs(300),
        }
    }
}

impl IntegrationConfig {
    pub fn from_env() -> Self {
        Self {
            secret: non_empty_var("INTEGRATION_JWT_SECRET"),
            callback_attempts: std::env::var("INTEGRATION_CALLBACK_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            error_callback_attempts: std::env::var("INTEGRATION_ERROR_CALLBACK_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            backoff_base: Duration::from_millis(
                std::env::var("INTEGRATION_BACKOFF_BASE_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            ),
            mirror_timeout: Duration::from_secs(
                std::env::var("INTEGRATION_MIRROR_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
        }
    }
}

/// Everything the pipeline services need.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub worker: WorkerConfig,
    pub export: ExportConfig,
    pub integration: IntegrationConfig,
    /// Age after which a render lock may be taken over
    pub render_lock_ttl: Duration,
    /// Outbound HTTP timeouts (worker, portals, callbacks)
    pub http_connect_timeout: Duration,
    pub http_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker: WorkerConfig::default(),
            export: ExportConfig::default(),
            integration: IntegrationConfig::default(),
            render_lock_ttl: Duration::from_secs(120),
            http_connect_timeout: Duration::from_secs(5),
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Self {
            worker: WorkerConfig::from_env(),
            export: ExportConfig::from_env(),
            integration: IntegrationConfig::from_env(),
            render_lock_ttl: Duration::from_secs(
                std::env::var("RENDER_LOCK_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            http_connect_timeout: Duration::from_secs(
                std::env::var("HTTP_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            http_timeout: Duration::from_secs(
                std::env::var("HTTP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const PORTAL_VARS: [&str; 7] = [
        "ENABLE_PORTAL_EXPORT",
        "PORTAL_EXPORT_URL",
        "PORTAL_EXPORT_NAME",
        "PORTAL_EXPORT_URL_1",
        "PORTAL_EXPORT_NAME_1",
        "PORTAL_EXPORT_URL_3",
        "PORTAL_EXPORT_MAX_PORTALS",
    ];

    fn clear() {
        for var in PORTAL_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_export_defaults() {
        clear();
        let config = ExportConfig::from_env();
        assert!(!config.enabled);
        assert!(config.portals.is_empty());
        assert_eq!(config.default_name, "Portal");
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.backoff_base, Duration::from_secs(60));
    }

    #[test]
    #[serial]
    fn test_numbered_portals_skip_gaps() {
        clear();
        std::env::set_var("ENABLE_PORTAL_EXPORT", "true");
        std::env::set_var("PORTAL_EXPORT_URL_1", "https://one.test/ingest");
        std::env::set_var("PORTAL_EXPORT_NAME_1", "Newsroom");
        std::env::set_var("PORTAL_EXPORT_URL_3", "https://three.test/ingest");

        let config = ExportConfig::from_env();
        assert!(config.enabled);
        assert_eq!(config.portals.len(), 2);
        assert_eq!(config.portals[0].name, "Newsroom");
        assert_eq!(config.portals[1].id, "3");
        assert_eq!(config.portals[1].name, "Portal 3");

        std::env::set_var("PORTAL_EXPORT_MAX_PORTALS", "2");
        assert_eq!(ExportConfig::from_env().portals.len(), 1);
        clear();
    }

    #[test]
    #[serial]
    fn test_enable_flag_is_exact() {
        clear();
        std::env::set_var("ENABLE_PORTAL_EXPORT", "TRUE");
        assert!(!ExportConfig::from_env().enabled);
        clear();
    }
}
