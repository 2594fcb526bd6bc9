//! Retention cleaner: periodic purge of old delivery history.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use tokio::time::{interval, MissedTickBehavior};

use crate::config::RetentionConfig;
use crate::store::DeliveryStore;

/// Scheduled job deleting delivery records older than the retention window.
///
/// Independent of the delivery flow. Idempotent — a second back-to-back run
/// deletes nothing. Never runs concurrently with itself: an overlapping
/// `run_once` is skipped. A failed run is logged and the job simply waits
/// for the next tick; it never aborts the host process.
pub struct RetentionCleaner {
    history: Arc<dyn DeliveryStore>,
    config: RetentionConfig,
    running: tokio::sync::Mutex<()>,
}

impl RetentionCleaner {
    #[must_use]
    pub fn new(history: Arc<dyn DeliveryStore>, config: RetentionConfig) -> Self {
        Self {
            history,
            config,
            running: tokio::sync::Mutex::new(()),
        }
    }

    /// Run forever on the configured interval (daily by default).
    pub async fn run(&self) {
        tracing::info!(
            target: "retention",
            retention_days = self.config.retention_days,
            interval_secs = self.config.interval.as_secs(),
            "Retention cleaner started"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.run_once().await;
        }
    }

    /// Execute one purge pass. Returns the number of deleted records, or
    /// `None` if the pass was skipped (already running) or failed.
    pub async fn run_once(&self) -> Option<u64> {
        let Ok(_guard) = self.running.try_lock() else {
            tracing::warn!(
                target: "retention",
                "Retention pass already in progress; skipping"
            );
            return None;
        };

        let cutoff = Utc::now() - ChronoDuration::days(self.config.retention_days);

        match self.history.delete_older_than(cutoff).await {
            Ok(deleted) => {
                tracing::info!(
                    target: "retention",
                    deleted,
                    cutoff = %cutoff,
                    "Retention pass completed"
                );
                Some(deleted)
            }
            Err(e) => {
                tracing::error!(
                    target: "retention",
                    error = %e,
                    "Retention pass failed; will retry on next tick"
                );
                None
            }
        }
    }
}
