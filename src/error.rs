//! Error types for the webhook delivery engine.

/// Webhook delivery error variants.
///
/// All of these are caught at the attempt boundary and converted into a
/// delivery record plus an episode state transition; none of them propagate
/// to the event producer.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// Malformed webhook configuration (unusable URL, internal destination).
    /// Not retried — the episode fails immediately.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Timeout, DNS failure or connection failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a non-2xx status.
    #[error("HTTP {0}")]
    Protocol(u16),

    /// Payload signing failed. Should not occur under normal operation.
    #[error("Signing error: {0}")]
    Signing(String),

    /// The registry or history store was unavailable.
    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),
}
