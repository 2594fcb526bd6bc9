//! Producer-facing event ingress.
//!
//! Business use cases publish every domain event here, fire-and-forget;
//! the delivery worker consumes the broadcast channel. A delivery failure
//! is never visible to the code that raised the event.

use crate::models::DomainEvent;

/// Publishes domain events to a tokio broadcast channel.
#[derive(Clone)]
pub struct EventPublisher {
    sender: tokio::sync::broadcast::Sender<DomainEvent>,
}

impl EventPublisher {
    /// Create a publisher with the given channel capacity.
    pub fn new(capacity: usize) -> (Self, tokio::sync::broadcast::Receiver<DomainEvent>) {
        let (sender, receiver) = tokio::sync::broadcast::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Publish an event to all subscribers. Fire-and-forget — a missing
    /// subscriber is logged, never propagated.
    pub fn publish(&self, event: DomainEvent) {
        if let Err(e) = self.sender.send(event) {
            tracing::warn!(
                target: "webhook_delivery",
                error = %e,
                "No active delivery worker to receive event"
            );
        }
    }

    /// Get a new receiver for the broadcast channel.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}
