//! Fans out unified messages from one session to its attached consumers,
//! preserving per-consumer in-order delivery. When a consumer's send buffer
//! is full, stream deltas are dropped first; `result`, `permission_request`,
//! `session_init`, and `status_change` are never dropped.

use std::collections::HashMap;

use ab_domain::message::{MessageKind, UnifiedMessage};
use tokio::sync::mpsc;

/// Message kinds the broadcaster will never drop under backpressure.
fn is_essential(kind: MessageKind) -> bool {
    matches!(
        kind,
        MessageKind::Status | MessageKind::PermissionRequest | MessageKind::Control | MessageKind::Error
    )
}

pub struct ConsumerBroadcaster {
    consumers: HashMap<String, mpsc::Sender<UnifiedMessage>>,
}

impl ConsumerBroadcaster {
    pub fn new() -> Self {
        Self {
            consumers: HashMap::new(),
        }
    }

    pub fn attach(&mut self, consumer_id: String, sender: mpsc::Sender<UnifiedMessage>) {
        self.consumers.insert(consumer_id, sender);
    }

    pub fn detach(&mut self, consumer_id: &str) {
        self.consumers.remove(consumer_id);
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    /// Deliver `msg` to every attached consumer. A consumer whose channel is
    /// full drops the message if it's non-essential; an essential message is
    /// delivered even if doing so means awaiting a blocking send. A consumer
    /// whose channel has been closed is pruned.
    pub async fn broadcast(&mut self, msg: &UnifiedMessage) {
        let mut dead = Vec::new();
        for (id, sender) in self.consumers.iter() {
            if is_essential(msg.kind) {
                if sender.send(msg.clone()).await.is_err() {
                    dead.push(id.clone());
                }
            } else {
                match sender.try_send(msg.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::debug!(consumer_id = %id, kind = ?msg.kind, "dropping non-essential message under backpressure");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => dead.push(id.clone()),
                }
            }
        }
        for id in dead {
            self.consumers.remove(&id);
        }
    }
}

impl Default for ConsumerBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ab_domain::message::MessageRole;

    #[tokio::test]
    async fn broadcasts_to_all_attached_consumers_in_order() {
        let mut b = ConsumerBroadcaster::new();
        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);
        b.attach("c1".into(), tx1);
        b.attach("c2".into(), tx2);

        b.broadcast(&UnifiedMessage::text(MessageRole::Assistant, "first")).await;
        b.broadcast(&UnifiedMessage::text(MessageRole::Assistant, "second")).await;

        assert_eq!(rx1.recv().await.unwrap().text_content(), "first");
        assert_eq!(rx1.recv().await.unwrap().text_content(), "second");
        assert_eq!(rx2.recv().await.unwrap().text_content(), "first");
    }

    #[tokio::test]
    async fn detach_removes_consumer() {
        let mut b = ConsumerBroadcaster::new();
        let (tx, _rx) = mpsc::channel(8);
        b.attach("c1".into(), tx);
        assert_eq!(b.consumer_count(), 1);
        b.detach("c1");
        assert_eq!(b.consumer_count(), 0);
    }

    #[tokio::test]
    async fn full_buffer_drops_non_essential_message_but_keeps_essential() {
        let mut b = ConsumerBroadcaster::new();
        let (tx, mut rx) = mpsc::channel(1);
        b.attach("c1".into(), tx);

        // Fill the channel's single slot with a non-essential message.
        b.broadcast(&UnifiedMessage::text(MessageRole::Assistant, "delta-1")).await;
        // This one should be dropped (buffer full, non-essential).
        b.broadcast(&UnifiedMessage::text(MessageRole::Assistant, "delta-2")).await;

        let received = rx.recv().await.unwrap();
        assert_eq!(received.text_content(), "delta-1");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn dead_consumer_is_pruned_on_broadcast() {
        let mut b = ConsumerBroadcaster::new();
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        b.attach("c1".into(), tx);

        b.broadcast(&UnifiedMessage::text(MessageRole::Assistant, "hi")).await;
        assert_eq!(b.consumer_count(), 0);
    }
}
