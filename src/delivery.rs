//! Webhook delivery engine.
//!
//! Fans an incoming domain event out to every matching active webhook, one
//! delivery episode per webhook. Episodes run concurrently under a global
//! semaphore, retry with exponential backoff, append one history record per
//! attempt, and feed the per-webhook failure counter that eventually
//! deactivates a chronically failing endpoint.
//!
//! Nothing here ever propagates a failure back to the event producer:
//! delivery is fire-and-forget from the producer's perspective, and a
//! failing webhook cannot affect delivery to any other webhook.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::DeliveryConfig;
use crate::crypto;
use crate::error::WebhookError;
use crate::models::{CreateDeliveryRecord, DomainEvent, Webhook, WebhookPayload};
use crate::store::{DeliveryStore, WebhookStore};
use crate::validation::{validate_delivery_url, validate_host_not_internal};

/// Outcome of a single HTTP delivery attempt.
///
/// Replaces exception-style control flow: the attempt function returns a
/// tagged outcome and the episode loop decides the transition.
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    /// HTTP status in [200, 300).
    Success {
        status_code: u16,
        response_body: String,
        latency_ms: i32,
    },
    /// Timeout, DNS or connection failure. Retryable.
    Transport { message: String, latency_ms: i32 },
    /// Non-2xx HTTP status. Retryable.
    Protocol {
        status_code: u16,
        response_body: String,
        latency_ms: i32,
    },
    /// Unusable webhook configuration (bad URL, signing failure). The
    /// episode fails immediately without retrying.
    Configuration { message: String },
}

impl AttemptOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Whether the episode may retry after this outcome.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Protocol { .. })
    }
}

/// Backoff delay inserted before attempt `n` (n ≥ 2): `2^(n-1)` seconds.
///
/// Pure function of the attempt number, deliberately unjittered — under
/// correlated outages this can synchronize retries across webhooks.
#[must_use]
pub fn backoff_delay(attempt_number: i32) -> Duration {
    let exponent = (attempt_number - 1).clamp(1, 32) as u32;
    Duration::from_secs(1u64 << exponent)
}

/// The delivery engine. Constructed once at process start and shared by
/// reference; cloning is cheap (all state is behind `Arc`).
#[derive(Clone)]
pub struct DeliveryEngine {
    webhooks: Arc<dyn WebhookStore>,
    history: Arc<dyn DeliveryStore>,
    http_client: Client,
    semaphore: Arc<Semaphore>,
    config: DeliveryConfig,
}

impl DeliveryEngine {
    /// Create an engine with a shared HTTP client.
    ///
    /// The redirect policy re-validates every redirect target, so a public
    /// endpoint cannot bounce a delivery to an internal host after the
    /// initial URL check passed.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::Configuration` if the HTTP client cannot be
    /// built.
    pub fn new(
        webhooks: Arc<dyn WebhookStore>,
        history: Arc<dyn DeliveryStore>,
        config: DeliveryConfig,
    ) -> Result<Self, WebhookError> {
        let redirect_policy = {
            let allow_internal = config.allow_internal_destinations;
            let max_redirects = config.max_redirects;
            reqwest::redirect::Policy::custom(move |attempt| {
                let decision = redirect_decision(
                    attempt.previous().len(),
                    attempt.url().host_str(),
                    allow_internal,
                    max_redirects,
                );
                match decision {
                    RedirectDecision::Follow => attempt.follow(),
                    RedirectDecision::Stop => attempt.stop(),
                    RedirectDecision::TooMany => attempt.error("too many redirects"),
                }
            })
        };

        let http_client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .redirect(redirect_policy)
            .build()
            .map_err(|e| {
                WebhookError::Configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        let semaphore = Arc::new(Semaphore::new(config.max_concurrent));

        Ok(Self {
            webhooks,
            history,
            http_client,
            semaphore,
            config,
        })
    }

    /// Deliver an event to all matching active webhooks.
    ///
    /// Starts one episode per matching webhook, all concurrent, bounded by
    /// the global semaphore. Returns once every episode has reached a
    /// terminal state. Zero matching webhooks is a no-op.
    pub async fn deliver_all(&self, event: &DomainEvent) {
        let webhooks = match self.webhooks.list_active().await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!(
                    target: "webhook_delivery",
                    event_id = %event.event_id,
                    event_type = %event.event_type,
                    error = %e,
                    "Failed to load active webhooks"
                );
                return;
            }
        };

        let matching: Vec<Webhook> = webhooks
            .into_iter()
            .filter(|w| w.events.matches(&event.event_type))
            .collect();

        if matching.is_empty() {
            tracing::debug!(
                target: "webhook_delivery",
                event_id = %event.event_id,
                event_type = %event.event_type,
                "No active webhooks match event type"
            );
            return;
        }

        let payload = WebhookPayload::from(event);
        let body: Arc<Vec<u8>> = match serde_json::to_vec(&payload) {
            Ok(b) => Arc::new(b),
            Err(e) => {
                tracing::error!(
                    target: "webhook_delivery",
                    event_id = %event.event_id,
                    error = %e,
                    "Failed to serialize webhook payload"
                );
                return;
            }
        };
        let payload_json = match serde_json::to_value(&payload) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(
                    target: "webhook_delivery",
                    event_id = %event.event_id,
                    error = %e,
                    "Failed to serialize webhook payload"
                );
                return;
            }
        };

        tracing::info!(
            target: "webhook_delivery",
            event_id = %event.event_id,
            event_type = %event.event_type,
            webhook_count = matching.len(),
            "Delivering event to matching webhooks"
        );

        let mut episodes = JoinSet::new();
        for webhook in matching {
            let engine = self.clone();
            let event_type = event.event_type.clone();
            let body = Arc::clone(&body);
            let payload_json = payload_json.clone();

            episodes.spawn(async move {
                // One permit per episode, held until the terminal state.
                let _permit = match engine.semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                engine
                    .run_episode(&webhook, &event_type, &payload_json, &body)
                    .await;
            });
        }

        while let Some(result) = episodes.join_next().await {
            if let Err(e) = result {
                // A panicking episode must not take down its siblings.
                tracing::error!(
                    target: "webhook_delivery",
                    error = %e,
                    "Delivery episode task failed"
                );
            }
        }
    }

    /// Run the retry state machine for one (webhook, event) pair.
    ///
    /// Attempts are strictly sequential; every attempt appends exactly one
    /// history record. Ends in either a success (counter reset) or an
    /// exhausted episode (counter incremented once).
    async fn run_episode(
        &self,
        webhook: &Webhook,
        event_type: &str,
        payload: &serde_json::Value,
        body: &[u8],
    ) {
        let max_attempts = webhook.max_attempts();
        let mut attempt_number = 1;

        loop {
            let outcome = self.execute_attempt(webhook, event_type, body).await;
            self.record_attempt(webhook, event_type, payload, attempt_number, &outcome)
                .await;

            if outcome.is_success() {
                self.handle_episode_success(webhook, event_type, attempt_number)
                    .await;
                return;
            }

            if !outcome.is_retryable() || attempt_number >= max_attempts {
                self.handle_episode_exhausted(webhook, event_type, attempt_number, &outcome)
                    .await;
                return;
            }

            attempt_number += 1;
            tokio::time::sleep(backoff_delay(attempt_number)).await;
        }
    }

    /// Execute one signed HTTP POST against the webhook's URL.
    async fn execute_attempt(
        &self,
        webhook: &Webhook,
        event_type: &str,
        body: &[u8],
    ) -> AttemptOutcome {
        let url = match validate_delivery_url(&webhook.url, self.config.allow_internal_destinations)
        {
            Ok(url) => url,
            Err(e) => {
                return AttemptOutcome::Configuration {
                    message: e.to_string(),
                }
            }
        };

        let signature = match crypto::signature_header(&webhook.secret, body) {
            Ok(header) => header,
            Err(e) => {
                return AttemptOutcome::Configuration {
                    message: e.to_string(),
                }
            }
        };

        let start = Instant::now();
        let result = self
            .http_client
            .post(url)
            .header("Content-Type", "application/json")
            .header("X-Hub-Chantier-Event", event_type)
            .header("X-Hub-Chantier-Signature", signature)
            .body(body.to_vec())
            .send()
            .await;
        let latency_ms = start.elapsed().as_millis() as i32;

        match result {
            Ok(response) => {
                let status_code = response.status().as_u16();
                let response_body = truncate_chars(
                    response.text().await.unwrap_or_default(),
                    self.config.response_body_max,
                );

                if (200..300).contains(&status_code) {
                    AttemptOutcome::Success {
                        status_code,
                        response_body,
                        latency_ms,
                    }
                } else {
                    AttemptOutcome::Protocol {
                        status_code,
                        response_body,
                        latency_ms,
                    }
                }
            }
            Err(e) => {
                let message = if e.is_timeout() {
                    format!("Request timeout ({}s)", self.config.timeout.as_secs())
                } else if e.is_connect() {
                    format!("Connection failed: {e}")
                } else {
                    format!("Request error: {e}")
                };
                AttemptOutcome::Transport {
                    message,
                    latency_ms,
                }
            }
        }
    }

    /// Append one history record for an attempt, whatever its outcome.
    async fn record_attempt(
        &self,
        webhook: &Webhook,
        event_type: &str,
        payload: &serde_json::Value,
        attempt_number: i32,
        outcome: &AttemptOutcome,
    ) {
        let max = self.config.response_body_max;
        let record = match outcome {
            AttemptOutcome::Success {
                status_code,
                response_body,
                latency_ms,
            } => CreateDeliveryRecord {
                webhook_id: webhook.id,
                event_type: event_type.to_string(),
                payload: payload.clone(),
                status_code: Some(*status_code as i16),
                response_body: Some(response_body.clone()),
                success: true,
                error_message: None,
                attempt_number,
                response_time_ms: *latency_ms,
            },
            AttemptOutcome::Protocol {
                status_code,
                response_body,
                latency_ms,
            } => CreateDeliveryRecord {
                webhook_id: webhook.id,
                event_type: event_type.to_string(),
                payload: payload.clone(),
                status_code: Some(*status_code as i16),
                response_body: Some(response_body.clone()),
                success: false,
                error_message: Some(format!("HTTP {status_code}")),
                attempt_number,
                response_time_ms: *latency_ms,
            },
            AttemptOutcome::Transport {
                message,
                latency_ms,
            } => CreateDeliveryRecord {
                webhook_id: webhook.id,
                event_type: event_type.to_string(),
                payload: payload.clone(),
                status_code: None,
                response_body: None,
                success: false,
                error_message: Some(truncate_chars(message.clone(), max)),
                attempt_number,
                response_time_ms: *latency_ms,
            },
            AttemptOutcome::Configuration { message } => CreateDeliveryRecord {
                webhook_id: webhook.id,
                event_type: event_type.to_string(),
                payload: payload.clone(),
                status_code: None,
                response_body: None,
                success: false,
                error_message: Some(truncate_chars(message.clone(), max)),
                attempt_number,
                response_time_ms: 0,
            },
        };

        if let Err(e) = self.history.append(record).await {
            tracing::error!(
                target: "webhook_delivery",
                webhook_id = %webhook.id,
                attempt_number,
                error = %e,
                "Failed to append delivery record"
            );
        }
    }

    /// Terminal success: reset the failure counter, stamp the webhook.
    async fn handle_episode_success(
        &self,
        webhook: &Webhook,
        event_type: &str,
        attempt_number: i32,
    ) {
        tracing::info!(
            target: "webhook_delivery",
            webhook_id = %webhook.id,
            event_type = %event_type,
            attempt_number,
            "Webhook delivery succeeded"
        );

        // Unconditional: `webhook` is a snapshot from list_active time, and a
        // concurrent exhausted episode may have bumped the stored counter
        // since. The reset is atomic and idempotent.
        if let Err(e) = self.webhooks.reset_consecutive_failures(webhook.id).await {
            tracing::error!(
                target: "webhook_delivery",
                webhook_id = %webhook.id,
                error = %e,
                "Failed to reset consecutive failures"
            );
        }

        if let Err(e) = self
            .webhooks
            .mark_triggered(webhook.id, chrono::Utc::now())
            .await
        {
            tracing::error!(
                target: "webhook_delivery",
                webhook_id = %webhook.id,
                error = %e,
                "Failed to update last_triggered_at"
            );
        }
    }

    /// Terminal failure: one counter increment per episode, deactivation at
    /// the threshold.
    async fn handle_episode_exhausted(
        &self,
        webhook: &Webhook,
        event_type: &str,
        attempts_made: i32,
        last_outcome: &AttemptOutcome,
    ) {
        tracing::warn!(
            target: "webhook_delivery",
            webhook_id = %webhook.id,
            event_type = %event_type,
            attempts_made,
            last_outcome = ?last_outcome,
            "Webhook delivery exhausted"
        );

        let failures = match self.webhooks.increment_consecutive_failures(webhook.id).await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(
                    target: "webhook_delivery",
                    webhook_id = %webhook.id,
                    error = %e,
                    "Failed to increment consecutive failures"
                );
                return;
            }
        };

        if failures >= self.config.failure_threshold {
            tracing::warn!(
                target: "webhook_delivery",
                webhook_id = %webhook.id,
                consecutive_failures = failures,
                threshold = self.config.failure_threshold,
                "Deactivating webhook after consecutive failures"
            );

            if let Err(e) = self.webhooks.deactivate(webhook.id).await {
                tracing::error!(
                    target: "webhook_delivery",
                    webhook_id = %webhook.id,
                    error = %e,
                    "Failed to deactivate webhook"
                );
            }
        }
    }
}

/// What to do with a redirect hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RedirectDecision {
    Follow,
    /// Redirect target is an internal host: return the 3xx response as-is
    /// instead of following it (the attempt then fails as `Protocol`).
    Stop,
    TooMany,
}

/// Decide whether a redirect may be followed. `hops` is the number of
/// redirects already taken.
fn redirect_decision(
    hops: usize,
    target_host: Option<&str>,
    allow_internal: bool,
    max_redirects: usize,
) -> RedirectDecision {
    if hops > max_redirects {
        return RedirectDecision::TooMany;
    }
    if !allow_internal {
        match target_host {
            Some(host) if validate_host_not_internal(host).is_ok() => {}
            _ => return RedirectDecision::Stop,
        }
    }
    RedirectDecision::Follow
}

/// Truncate a string to at most `max` characters.
fn truncate_chars(s: String, max: usize) -> String {
    if s.chars().count() <= max {
        s
    } else {
        s.chars().take(max).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
