//! Multi-producer / multi-consumer bus for [`DomainEvent`]s. Policies
//! subscribe here rather than being wired directly into the runtime;
//! publishing with no subscribers must never fail or panic.

use ab_domain::events::DomainEvent;
use tokio::sync::broadcast;

pub struct DomainEventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl DomainEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event. A channel with no subscribers returns an error from
    /// `tokio::sync::broadcast`; that error is swallowed here so an event bus
    /// emitting into the void behaves the same as an event bus with a
    /// listener that happens to be lagging.
    pub fn publish(&self, event: DomainEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for DomainEventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = DomainEventBus::default();
        bus.publish(DomainEvent::SessionCreated {
            session_id: "s1".into(),
        });
    }

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = DomainEventBus::default();
        let mut rx = bus.subscribe();
        bus.publish(DomainEvent::SessionCreated {
            session_id: "s1".into(),
        });
        let event = rx.recv().await.unwrap();
        assert_eq!(event.session_id(), Some("s1"));
    }
}
