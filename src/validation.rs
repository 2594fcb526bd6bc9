//! Delivery URL validation and SSRF protection.
//!
//! Validates destination URLs before an attempt is made:
//! - scheme must be HTTP or HTTPS
//! - host must be present and, unless internal destinations are explicitly
//!   allowed (dev/test), must not be a private/internal address

use std::net::IpAddr;

use crate::error::WebhookError;

/// Validate a webhook destination URL.
///
/// A failure here is a configuration error: the episode fails immediately
/// without retrying.
pub fn validate_delivery_url(url: &str, allow_internal: bool) -> Result<url::Url, WebhookError> {
    let parsed = url::Url::parse(url)
        .map_err(|e| WebhookError::Configuration(format!("Invalid URL format: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(WebhookError::Configuration(format!(
                "Unsupported URL scheme: {scheme}"
            )));
        }
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| WebhookError::Configuration("URL must have a host".to_string()))?;

    if !allow_internal {
        validate_host_not_internal(host)?;
    }

    Ok(parsed)
}

/// Validate that a host is not a private/internal address.
///
/// Blocks:
/// - Loopback addresses (127.0.0.0/8)
/// - Private networks (10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16)
/// - Link-local (169.254.0.0/16, the cloud metadata range)
/// - CGNAT (100.64.0.0/10)
/// - IPv6 loopback and unspecified
/// - Internal hostnames (localhost, *.internal, *.local)
pub fn validate_host_not_internal(host: &str) -> Result<(), WebhookError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_internal_ip(&ip) {
            return Err(WebhookError::Configuration(format!(
                "Destination host {host} is a private/internal address"
            )));
        }
    }

    let lower = host.to_ascii_lowercase();
    if lower == "localhost"
        || lower == "metadata.google.internal"
        || lower.ends_with(".internal")
        || lower.ends_with(".local")
    {
        return Err(WebhookError::Configuration(format!(
            "Destination host {host} is a restricted internal hostname"
        )));
    }

    Ok(())
}

/// Check if an IP address belongs to a private/internal range.
fn is_internal_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64) // 100.64.0.0/10 (CGNAT)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
