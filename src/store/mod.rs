//! Persistence seams consumed by the delivery engine.
//!
//! The webhook registry and the delivery history live with the rest of the
//! back office; the engine only sees these traits. Counter and active-flag
//! mutations are modeled as single atomic operations so that concurrent
//! episodes against the same webhook cannot lose updates — the one place
//! where naive read-modify-write would silently corrupt the circuit-breaker
//! state.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{CreateDeliveryRecord, DeliveryRecord, Webhook};

pub use memory::{InMemoryDeliveryStore, InMemoryWebhookStore};

/// Error returned by store implementations.
#[derive(Debug, thiserror::Error)]
#[error("store error: {0}")]
pub struct StoreError(pub String);

impl StoreError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Registry of webhook subscriptions.
///
/// The engine never creates or deletes webhooks; it only reads the active
/// set and applies the failure-tracker mutations. `reactivate` and
/// `reset_consecutive_failures` are independent operations so the external
/// management layer decides whether reactivation also forgives past
/// failures.
#[async_trait]
pub trait WebhookStore: Send + Sync {
    /// All webhooks with `is_active = true`.
    async fn list_active(&self) -> Result<Vec<Webhook>, StoreError>;

    /// Atomically increment `consecutive_failures`, returning the new value.
    async fn increment_consecutive_failures(&self, id: Uuid) -> Result<i32, StoreError>;

    /// Reset `consecutive_failures` to zero.
    async fn reset_consecutive_failures(&self, id: Uuid) -> Result<(), StoreError>;

    /// Record a successful delivery timestamp.
    async fn mark_triggered(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Force `is_active = false`. Applied by the circuit breaker; only an
    /// external management action reverses it.
    async fn deactivate(&self, id: Uuid) -> Result<(), StoreError>;

    /// Set `is_active = true`. Never called by the engine itself.
    async fn reactivate(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Append-only log of delivery attempts.
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    /// Append one record; returns the stored row.
    async fn append(&self, record: CreateDeliveryRecord) -> Result<DeliveryRecord, StoreError>;

    /// Delete records with `delivered_at` older than `cutoff`; returns the
    /// number of deleted rows.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}
