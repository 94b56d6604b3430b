//! The append-only inter-agent message log.

use std::sync::Arc;

use perles_broker::Broker;
use perles_types::{Message, ProcessId};
use tokio::sync::RwLock;

/// `MessageRepo` — an append-only broadcast log (`spec.md` §3 `Message`:
/// "every agent sees every entry regardless of `To`"). `Append` publishes
/// the new entry on its [`Broker`] for live subscribers.
pub struct MessageRepo {
    entries: RwLock<Vec<Message>>,
    broker: Arc<Broker<Message>>,
}

/// Topic every message is published on.
pub const MESSAGES_TOPIC: &str = "messages";

impl MessageRepo {
    /// Create an empty log backed by a fresh broker with the given
    /// per-subscriber channel capacity.
    pub fn new(broker_channel_capacity: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            broker: Arc::new(Broker::new(broker_channel_capacity)),
        }
    }

    /// Append an entry. The sender is marked as having read it
    /// (idempotent if already marked by [`Message::new`]), and the
    /// stored entry is published on the broker.
    pub async fn append(&self, mut message: Message) {
        message.read_by.insert(message.from.clone());
        self.broker.publish(MESSAGES_TOPIC, message.clone());
        self.entries.write().await.push(message);
    }

    /// Every entry in the log, oldest first, as copies.
    pub async fn entries(&self) -> Vec<Message> {
        self.entries.read().await.clone()
    }

    /// Every entry `agent` has not yet read.
    pub async fn unread_for(&self, agent: &ProcessId) -> Vec<Message> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|m| !m.is_read_by(agent))
            .cloned()
            .collect()
    }

    /// Mark every entry currently in the log as read by `agent`.
    pub async fn mark_read(&self, agent: &ProcessId) {
        for message in self.entries.write().await.iter_mut() {
            message.read_by.insert(agent.clone());
        }
    }

    /// Total number of entries in the log.
    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// The broker entries are published on, for subscribing to live
    /// message events.
    pub fn broker(&self) -> &Arc<Broker<Message>> {
        &self.broker
    }
}

impl Default for MessageRepo {
    fn default() -> Self {
        Self::new(perles_broker::DEFAULT_CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perles_types::MessageKind;
    use tokio_util::sync::CancellationToken;

    fn message(from: &str, to: &str, content: &str) -> Message {
        Message::new(
            perles_types::MessageId::from("m1"),
            ProcessId::from(from),
            ProcessId::from(to),
            content.to_string(),
            MessageKind::Chat,
            0,
        )
    }

    #[tokio::test]
    async fn append_auto_marks_sender_read() {
        let repo = MessageRepo::new(8);
        repo.append(message("coordinator", "w1", "hi")).await;

        let unread = repo.unread_for(&ProcessId::from("coordinator")).await;
        assert!(unread.is_empty());
    }

    #[tokio::test]
    async fn broadcast_semantics_every_agent_sees_every_entry() {
        let repo = MessageRepo::new(8);
        repo.append(message("coordinator", "w1", "hi")).await;

        // w2 was never the `To`, but still sees it as unread.
        let unread = repo.unread_for(&ProcessId::from("w2")).await;
        assert_eq!(unread.len(), 1);
    }

    #[tokio::test]
    async fn mark_read_clears_unread_for_that_agent_only() {
        let repo = MessageRepo::new(8);
        repo.append(message("coordinator", "w1", "hi")).await;

        repo.mark_read(&ProcessId::from("w1")).await;

        assert!(repo.unread_for(&ProcessId::from("w1")).await.is_empty());
        assert_eq!(repo.unread_for(&ProcessId::from("w2")).await.len(), 1);
    }

    #[tokio::test]
    async fn count_tracks_total_entries() {
        let repo = MessageRepo::new(8);
        repo.append(message("coordinator", "w1", "one")).await;
        repo.append(message("coordinator", "w1", "two")).await;
        assert_eq!(repo.count().await, 2);
    }

    #[tokio::test]
    async fn append_publishes_on_the_broker() {
        let repo = MessageRepo::new(8);
        let mut rx = repo.broker().subscribe(CancellationToken::new());

        repo.append(message("coordinator", "w1", "hi")).await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.payload.content, "hi");
        assert_eq!(event.topic, MESSAGES_TOPIC);
    }
}
