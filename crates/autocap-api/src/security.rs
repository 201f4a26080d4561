//! Validation of caller-supplied URLs.
//!
//! Registered videos are downloaded and callbacks are POSTed by this
//! service, so their URLs must not point at internal hosts.

use std::net::IpAddr;

use url::{Host, Url};

/// Maximum URL length.
pub const MAX_URL_LENGTH: usize = 2048;

/// Metadata hostnames of cloud providers.
const BLOCKED_HOSTS: &[&str] = &["localhost", "metadata", "metadata.google.internal"];

#[derive(Debug, PartialEq, Eq)]
pub enum UrlValidationResult {
    Valid(Url),
    /// Malformed or not http(s)
    Invalid(String),
    /// Loopback, private, link-local or metadata host
    Blocked(String),
    TooLong,
}

impl UrlValidationResult {
    pub fn into_result(self) -> Result<Url, String> {
        match self {
            Self::Valid(url) => Ok(url),
            Self::Invalid(msg) | Self::Blocked(msg) => Err(msg),
            Self::TooLong => Err(format!(
                "URL exceeds maximum length of {MAX_URL_LENGTH} characters"
            )),
        }
    }
}

/// Check an outbound URL. `allow_private` skips the host checks (local runs
/// and tests against mock servers).
pub fn validate_outbound_url(raw: &str, allow_private: bool) -> UrlValidationResult {
    let raw = raw.trim();
    if raw.len() > MAX_URL_LENGTH {
        return UrlValidationResult::TooLong;
    }

    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(e) => return UrlValidationResult::Invalid(format!("Invalid URL: {e}")),
    };
    if !matches!(url.scheme(), "http" | "https") {
        return UrlValidationResult::Invalid("URL must use http or https".to_string());
    }

    let blocked = match url.host() {
        None => return UrlValidationResult::Invalid("URL has no host".to_string()),
        Some(Host::Domain(domain)) => {
            let domain = domain.to_ascii_lowercase();
            BLOCKED_HOSTS
                .iter()
                .any(|h| domain == *h || domain.ends_with(&format!(".{h}")))
        }
        Some(Host::Ipv4(ip)) => is_internal_ip(IpAddr::V4(ip)),
        Some(Host::Ipv6(ip)) => is_internal_ip(IpAddr::V6(ip)),
    };

    if blocked && !allow_private {
        return UrlValidationResult::Blocked(format!(
            "URL host is not allowed: {}",
            url.host_str().unwrap_or_default()
        ));
    }
    UrlValidationResult::Valid(url)
}

fn is_internal_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 unique local, fe80::/10 link local
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
                || v6.to_ipv4_mapped().is_some_and(|v4| is_internal_ip(IpAddr::V4(v4)))
        }
    }
}
