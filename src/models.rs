//! Domain types for webhook subscriptions, delivery history and events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Event patterns
// ---------------------------------------------------------------------------

/// Ordered list of glob patterns a webhook subscribes to.
///
/// In memory this is always a real list of strings. The JSON codec exists
/// for the persistence edge only, where the registry stores the patterns as
/// a JSON text column for database portability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventPatterns(Vec<String>);

impl EventPatterns {
    #[must_use]
    pub fn new(patterns: Vec<String>) -> Self {
        Self(patterns)
    }

    /// True if any pattern matches the event type (see [`crate::pattern`]).
    #[must_use]
    pub fn matches(&self, event_type: &str) -> bool {
        crate::pattern::matches(event_type, &self.0)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Decode from the registry's JSON text representation.
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw).map(Self)
    }

    /// Encode to the registry's JSON text representation.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }
}

impl<const N: usize> From<[&str; N]> for EventPatterns {
    fn from(patterns: [&str; N]) -> Self {
        Self(patterns.iter().map(ToString::to_string).collect())
    }
}

// ---------------------------------------------------------------------------
// Webhook
// ---------------------------------------------------------------------------

/// A registered webhook subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Webhook {
    pub id: Uuid,
    /// Opaque reference to the owning user; never interpreted here.
    pub user_id: Uuid,
    pub url: String,
    pub events: EventPatterns,
    /// Shared symmetric key used to sign outgoing payloads.
    pub secret: String,
    pub is_active: bool,
    pub retry_enabled: bool,
    /// Additional attempts after the first one.
    pub max_retries: i32,
    pub consecutive_failures: i32,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Webhook {
    /// Total attempts an episode may perform for this webhook.
    #[must_use]
    pub fn max_attempts(&self) -> i32 {
        if self.retry_enabled {
            self.max_retries.max(0) + 1
        } else {
            1
        }
    }
}

// ---------------------------------------------------------------------------
// Delivery history
// ---------------------------------------------------------------------------

/// One row per HTTP attempt. Immutable once written; only the retention
/// cleaner ever deletes rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub id: Uuid,
    pub webhook_id: Uuid,
    pub event_type: String,
    /// Snapshot of the body that was sent, captured even for retries.
    pub payload: serde_json::Value,
    /// None on transport-level failure.
    pub status_code: Option<i16>,
    /// Truncated to the configured maximum length.
    pub response_body: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
    /// 1-based ordinal within its episode.
    pub attempt_number: i32,
    pub delivered_at: DateTime<Utc>,
    pub response_time_ms: i32,
}

/// Input for appending a delivery record.
#[derive(Debug, Clone)]
pub struct CreateDeliveryRecord {
    pub webhook_id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub status_code: Option<i16>,
    pub response_body: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
    pub attempt_number: i32,
    pub response_time_ms: i32,
}

// ---------------------------------------------------------------------------
// Events and wire payload
// ---------------------------------------------------------------------------

/// An internally produced domain event (e.g. "chantier.created") pushed to
/// the engine by the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub event_id: Uuid,
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    pub data: serde_json::Value,
}

impl DomainEvent {
    #[must_use]
    pub fn new(event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event_type.into(),
            occurred_at: Utc::now(),
            data,
        }
    }
}

/// Canonical JSON body POSTed to webhook endpoints. Third parties verify
/// the signature over these exact serialized bytes — field order and
/// presence are part of the wire contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub event_type: String,
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
}

impl From<&DomainEvent> for WebhookPayload {
    fn from(event: &DomainEvent) -> Self {
        Self {
            event_type: event.event_type.clone(),
            event_id: event.event_id,
            timestamp: event.occurred_at,
            data: event.data.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
