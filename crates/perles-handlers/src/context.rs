//! Shared repository + broker handle every handler is built on.

use std::sync::Arc;

use perles_broker::Broker;
use perles_repo::{MessageRepo, ProcessRepo, QueueRepo, TaskRepo};
use perles_types::ProcessEvent;

/// The repositories and event broker every handler needs. Cheap to
/// clone — every field is already an `Arc`.
#[derive(Clone)]
pub struct HandlerContext {
    /// Process repository.
    pub processes: Arc<ProcessRepo>,
    /// Task assignment repository.
    pub tasks: Arc<TaskRepo>,
    /// Per-worker message queues.
    pub queues: Arc<QueueRepo>,
    /// Broadcast inter-agent message log.
    pub messages: Arc<MessageRepo>,
    /// Broker process-level events are published on for live observers.
    pub events: Arc<Broker<ProcessEvent>>,
}

impl HandlerContext {
    /// Publish a [`ProcessEvent`], keyed by topic on the originating
    /// process's id.
    pub fn publish(&self, event: ProcessEvent) {
        let topic = event.process_id().to_string();
        self.events.publish(topic, event);
    }
}
