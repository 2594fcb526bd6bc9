//! Delivery worker: consumes the event broadcast and drives the engine.

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;

use crate::delivery::DeliveryEngine;
use crate::models::DomainEvent;

/// Long-lived task bridging the event bus to the delivery engine.
///
/// Each received event is handed to `deliver_all` on its own task so one
/// slow fan-out cannot delay the next event; in-flight episodes stay
/// bounded by the engine's global semaphore either way.
pub struct DeliveryWorker {
    engine: DeliveryEngine,
    receiver: Receiver<DomainEvent>,
}

impl DeliveryWorker {
    #[must_use]
    pub fn new(engine: DeliveryEngine, receiver: Receiver<DomainEvent>) -> Self {
        Self { engine, receiver }
    }

    /// Run until the broadcast channel closes (all publishers dropped).
    pub async fn run(mut self) {
        tracing::info!(target: "webhook_delivery", "Delivery worker started");

        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    let engine = self.engine.clone();
                    tokio::spawn(async move {
                        engine.deliver_all(&event).await;
                    });
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        target: "webhook_delivery",
                        skipped,
                        "Delivery worker lagged behind event bus; events were dropped"
                    );
                }
                Err(RecvError::Closed) => {
                    tracing::info!(
                        target: "webhook_delivery",
                        "Event bus closed; delivery worker stopping"
                    );
                    return;
                }
            }
        }
    }
}
