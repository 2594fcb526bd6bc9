//! In-memory store implementations.
//!
//! Used by the test suite and by embedders that do not need durable
//! history. Mutations take the write lock for the whole read-modify-write,
//! which gives the atomicity the traits require.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{CreateDeliveryRecord, DeliveryRecord, Webhook};
use crate::store::{DeliveryStore, StoreError, WebhookStore};

/// In-memory webhook registry.
#[derive(Clone, Default)]
pub struct InMemoryWebhookStore {
    webhooks: Arc<RwLock<HashMap<Uuid, Webhook>>>,
}

impl InMemoryWebhookStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a webhook (test setup / management edge).
    pub async fn insert(&self, webhook: Webhook) {
        self.webhooks.write().await.insert(webhook.id, webhook);
    }

    /// Fetch a webhook by id.
    pub async fn get(&self, id: Uuid) -> Option<Webhook> {
        self.webhooks.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl WebhookStore for InMemoryWebhookStore {
    async fn list_active(&self) -> Result<Vec<Webhook>, StoreError> {
        let webhooks = self.webhooks.read().await;
        Ok(webhooks.values().filter(|w| w.is_active).cloned().collect())
    }

    async fn increment_consecutive_failures(&self, id: Uuid) -> Result<i32, StoreError> {
        let mut webhooks = self.webhooks.write().await;
        let webhook = webhooks
            .get_mut(&id)
            .ok_or_else(|| StoreError::new(format!("webhook {id} not found")))?;
        webhook.consecutive_failures += 1;
        Ok(webhook.consecutive_failures)
    }

    async fn reset_consecutive_failures(&self, id: Uuid) -> Result<(), StoreError> {
        let mut webhooks = self.webhooks.write().await;
        let webhook = webhooks
            .get_mut(&id)
            .ok_or_else(|| StoreError::new(format!("webhook {id} not found")))?;
        webhook.consecutive_failures = 0;
        Ok(())
    }

    async fn mark_triggered(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut webhooks = self.webhooks.write().await;
        let webhook = webhooks
            .get_mut(&id)
            .ok_or_else(|| StoreError::new(format!("webhook {id} not found")))?;
        webhook.last_triggered_at = Some(at);
        Ok(())
    }

    async fn deactivate(&self, id: Uuid) -> Result<(), StoreError> {
        let mut webhooks = self.webhooks.write().await;
        let webhook = webhooks
            .get_mut(&id)
            .ok_or_else(|| StoreError::new(format!("webhook {id} not found")))?;
        webhook.is_active = false;
        Ok(())
    }

    async fn reactivate(&self, id: Uuid) -> Result<(), StoreError> {
        let mut webhooks = self.webhooks.write().await;
        let webhook = webhooks
            .get_mut(&id)
            .ok_or_else(|| StoreError::new(format!("webhook {id} not found")))?;
        webhook.is_active = true;
        Ok(())
    }
}

/// In-memory delivery history.
#[derive(Clone, Default)]
pub struct InMemoryDeliveryStore {
    records: Arc<RwLock<Vec<DeliveryRecord>>>,
}

impl InMemoryDeliveryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records, in insertion order.
    pub async fn all(&self) -> Vec<DeliveryRecord> {
        self.records.read().await.clone()
    }

    /// Records for a single webhook, in insertion order.
    pub async fn for_webhook(&self, webhook_id: Uuid) -> Vec<DeliveryRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.webhook_id == webhook_id)
            .cloned()
            .collect()
    }

    /// Total number of records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// True if the history is empty.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Insert a pre-built record (test setup for retention scenarios).
    pub async fn insert_raw(&self, record: DeliveryRecord) {
        self.records.write().await.push(record);
    }
}

#[async_trait]
impl DeliveryStore for InMemoryDeliveryStore {
    async fn append(&self, record: CreateDeliveryRecord) -> Result<DeliveryRecord, StoreError> {
        let row = DeliveryRecord {
            id: Uuid::new_v4(),
            webhook_id: record.webhook_id,
            event_type: record.event_type,
            payload: record.payload,
            status_code: record.status_code,
            response_body: record.response_body,
            success: record.success,
            error_message: record.error_message,
            attempt_number: record.attempt_number,
            delivered_at: Utc::now(),
            response_time_ms: record.response_time_ms,
        };
        self.records.write().await.push(row.clone());
        Ok(row)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.delivered_at >= cutoff);
        Ok((before - records.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
