//! Common test utilities for delivery engine integration tests.
//!
//! Provides wiremock responders, in-memory store fixtures and helpers for
//! verifying delivery behavior without a real database.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;
use wiremock::{Request, Respond, ResponseTemplate};

use chantier_webhooks::{
    DeliveryConfig, DeliveryEngine, DomainEvent, EventPatterns, InMemoryDeliveryStore,
    InMemoryWebhookStore, Webhook,
};

pub const SECRET_1: &str = "whsec_test_secret_key_12345";
pub const SECRET_2: &str = "whsec_another_secret_67890";

/// Initialize test logging once; enable output with `RUST_LOG`.
fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A webhook with sensible test defaults; tests mutate fields as needed.
pub fn test_webhook(url: &str, patterns: &[&str]) -> Webhook {
    Webhook {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        url: url.to_string(),
        events: EventPatterns::new(patterns.iter().map(ToString::to_string).collect()),
        secret: SECRET_1.to_string(),
        is_active: true,
        retry_enabled: false,
        max_retries: 0,
        consecutive_failures: 0,
        last_triggered_at: None,
        created_at: Utc::now(),
    }
}

/// Engine wired to in-memory stores, loopback destinations allowed, short
/// timeout. Returns the stores for assertions.
pub fn test_engine(
    config: DeliveryConfig,
) -> (DeliveryEngine, InMemoryWebhookStore, InMemoryDeliveryStore) {
    init_tracing();
    let webhooks = InMemoryWebhookStore::new();
    let history = InMemoryDeliveryStore::new();
    let engine = DeliveryEngine::new(
        Arc::new(webhooks.clone()),
        Arc::new(history.clone()),
        config
            .with_internal_destinations_allowed()
            .with_timeout(Duration::from_secs(2)),
    )
    .expect("failed to build engine");
    (engine, webhooks, history)
}

pub fn default_engine() -> (DeliveryEngine, InMemoryWebhookStore, InMemoryDeliveryStore) {
    test_engine(DeliveryConfig::default())
}

pub fn chantier_created_event() -> DomainEvent {
    DomainEvent::new(
        "chantier.created",
        serde_json::json!({
            "chantier_id": Uuid::new_v4().to_string(),
            "nom": "Rénovation Rue des Lilas",
        }),
    )
}

pub fn achat_created_event() -> DomainEvent {
    DomainEvent::new(
        "achat.created",
        serde_json::json!({
            "achat_id": Uuid::new_v4().to_string(),
            "montant": 1250.50,
        }),
    )
}

// ---------------------------------------------------------------------------
// CapturedRequest - for inspecting webhook requests
// ---------------------------------------------------------------------------

/// A captured HTTP request with body and headers.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub body: Vec<u8>,
    pub headers: HashMap<String, String>,
}

impl CapturedRequest {
    /// Parse the body as JSON.
    pub fn body_json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body is not JSON")
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        let name_lower = name.to_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| k.to_lowercase() == name_lower)
            .map(|(_, v)| v.as_str())
    }
}

// ---------------------------------------------------------------------------
// CaptureResponder - captures requests and answers with a fixed status
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct CaptureResponder {
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    response_code: u16,
}

impl CaptureResponder {
    pub fn new() -> Self {
        Self::with_status(200)
    }

    pub fn with_status(status: u16) -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            response_code: status,
        }
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Respond for CaptureResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let captured = CapturedRequest {
            body: request.body.clone(),
            headers: request
                .headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                .collect(),
        };
        self.requests.lock().unwrap().push(captured);
        ResponseTemplate::new(self.response_code)
    }
}

// ---------------------------------------------------------------------------
// CountingResponder - counts requests
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct CountingResponder {
    count: Arc<AtomicU32>,
    response_code: u16,
    delay: Option<Duration>,
}

impl CountingResponder {
    pub fn new() -> Self {
        Self::with_status(200)
    }

    pub fn with_status(status: u16) -> Self {
        Self {
            count: Arc::new(AtomicU32::new(0)),
            response_code: status,
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }
}

impl Respond for CountingResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.count.fetch_add(1, Ordering::SeqCst);
        let mut template = ResponseTemplate::new(self.response_code);
        if let Some(delay) = self.delay {
            template = template.set_delay(delay);
        }
        template
    }
}

// ---------------------------------------------------------------------------
// FailingResponder - fails N times then succeeds
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct FailingResponder {
    attempt_count: Arc<AtomicU32>,
    failures_before_success: u32,
    failure_code: u16,
    success_delay: Option<Duration>,
}

impl FailingResponder {
    /// Fail `n` times with 500, then return 200.
    pub fn fail_times(n: u32) -> Self {
        Self {
            attempt_count: Arc::new(AtomicU32::new(0)),
            failures_before_success: n,
            failure_code: 500,
            success_delay: None,
        }
    }

    /// Delay the successful response; failures still answer immediately.
    pub fn with_success_delay(mut self, delay: Duration) -> Self {
        self.success_delay = Some(delay);
        self
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count.load(Ordering::SeqCst)
    }
}

impl Respond for FailingResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.attempt_count.fetch_add(1, Ordering::SeqCst);
        if n < self.failures_before_success {
            ResponseTemplate::new(self.failure_code)
        } else {
            let mut template = ResponseTemplate::new(200);
            if let Some(delay) = self.success_delay {
                template = template.set_delay(delay);
            }
            template
        }
    }
}

// ---------------------------------------------------------------------------
// Signature verification
// ---------------------------------------------------------------------------

/// Verify the `X-Hub-Chantier-Signature` header of a captured request.
pub fn verify_captured_signature(request: &CapturedRequest, secret: &str) -> bool {
    let Some(header) = request.header("x-hub-chantier-signature") else {
        return false;
    };
    let Some(hex_sig) = header.strip_prefix("sha256=") else {
        return false;
    };
    chantier_webhooks::crypto::verify_signature(hex_sig, secret, &request.body)
}
