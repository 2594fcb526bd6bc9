//! HMAC-SHA256 payload signing for webhook deliveries.
//!
//! The signature covers the exact serialized payload bytes. Receivers
//! recompute HMAC-SHA256 over the raw request body with their shared secret
//! and compare against the `X-Hub-Chantier-Signature` header.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Compute the hex-encoded HMAC-SHA256 signature of `body` under `secret`.
pub fn compute_signature(secret: &str, body: &[u8]) -> Result<String, WebhookError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .map_err(|e| WebhookError::Signing(e.to_string()))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Build the signature header value: `sha256={hex}`.
pub fn signature_header(secret: &str, body: &[u8]) -> Result<String, WebhookError> {
    Ok(format!("sha256={}", compute_signature(secret, body)?))
}

/// Verify a hex-encoded signature using constant-time comparison.
#[must_use]
pub fn verify_signature(expected_hex: &str, secret: &str, body: &[u8]) -> bool {
    match compute_signature(secret, body) {
        Ok(computed) => constant_time_eq(expected_hex.as_bytes(), computed.as_bytes()),
        Err(_) => false,
    }
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    a.ct_eq(b).into()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
