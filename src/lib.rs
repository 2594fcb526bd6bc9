//! Webhook delivery engine for the Hub Chantier back office.
//!
//! Fans internally produced domain events out to externally registered HTTP
//! endpoints: glob-based subscription matching, HMAC-SHA256 signed payloads,
//! bounded concurrent delivery, exponential-backoff retries, per-webhook
//! failure isolation, automatic deactivation of chronically failing
//! endpoints, and a daily retention purge of the delivery history.

pub mod config;
pub mod crypto;
pub mod delivery;
pub mod error;
pub mod models;
pub mod pattern;
pub mod publisher;
pub mod retention;
pub mod store;
pub mod validation;
pub mod worker;

pub use config::{DeliveryConfig, RetentionConfig, FAILURE_THRESHOLD, MAX_CONCURRENT_DELIVERIES};
pub use delivery::{backoff_delay, AttemptOutcome, DeliveryEngine};
pub use error::WebhookError;
pub use models::{
    CreateDeliveryRecord, DeliveryRecord, DomainEvent, EventPatterns, Webhook, WebhookPayload,
};
pub use publisher::EventPublisher;
pub use retention::RetentionCleaner;
pub use store::{DeliveryStore, InMemoryDeliveryStore, InMemoryWebhookStore, WebhookStore};
pub use worker::DeliveryWorker;
