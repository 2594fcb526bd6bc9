//! Configuration for the delivery engine and retention cleaner.

use std::time::Duration;

/// System-wide cap on simultaneously running delivery episodes.
pub const MAX_CONCURRENT_DELIVERIES: usize = 50;

/// Consecutive exhausted episodes before a webhook is deactivated.
pub const FAILURE_THRESHOLD: i32 = 10;

/// Days of delivery history kept by the retention cleaner.
pub const RETENTION_DAYS: i64 = 90;

/// Delivery engine configuration.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Global concurrency limit across all orchestration calls.
    pub max_concurrent: usize,
    /// Consecutive-failure threshold for auto-deactivation.
    pub failure_threshold: i32,
    /// Per-attempt HTTP timeout.
    pub timeout: Duration,
    /// Maximum redirect hops followed per attempt.
    pub max_redirects: usize,
    /// Maximum stored length of a response body, in characters.
    pub response_body_max: usize,
    /// User-Agent header sent with every delivery.
    pub user_agent: String,
    /// Allow private/internal destination hosts (dev and test only).
    pub allow_internal_destinations: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_concurrent: MAX_CONCURRENT_DELIVERIES,
            failure_threshold: FAILURE_THRESHOLD,
            timeout: Duration::from_secs(10),
            max_redirects: 3,
            response_body_max: 1000,
            user_agent: "hub-chantier-webhooks/1.0".to_string(),
            allow_internal_destinations: false,
        }
    }
}

impl DeliveryConfig {
    /// Set the global concurrency limit.
    #[must_use]
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    /// Set the consecutive-failure threshold for auto-deactivation.
    #[must_use]
    pub fn with_failure_threshold(mut self, threshold: i32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Set the per-attempt HTTP timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Allow delivery to private/internal hosts (dev and test only).
    #[must_use]
    pub fn with_internal_destinations_allowed(mut self) -> Self {
        self.allow_internal_destinations = true;
        self
    }
}

/// Retention cleaner configuration.
#[derive(Debug, Clone)]
pub struct RetentionConfig {
    /// Records older than this many days are purged.
    pub retention_days: i64,
    /// How often the cleaner runs.
    pub interval: Duration,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            retention_days: RETENTION_DAYS,
            interval: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl RetentionConfig {
    /// Set the retention window in days.
    #[must_use]
    pub fn with_retention_days(mut self, days: i64) -> Self {
        self.retention_days = days;
        self
    }

    /// Set the run interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}
