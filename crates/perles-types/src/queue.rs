//! `QueueEntry` — a single message enqueued for delivery to a worker.

use serde::{Deserialize, Serialize};

/// Who sent a queued message or log entry.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// A human operator.
    User,
    /// The coordinator process.
    Coordinator,
    /// The control plane itself (system-generated).
    System,
}

/// A single entry in a worker's inbound message queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// The message content.
    pub content: String,
    /// Who sent it.
    pub sender: Sender,
    /// Epoch milliseconds the entry was enqueued.
    pub timestamp_ms: i64,
}

impl QueueEntry {
    /// Build a new queue entry.
    pub fn new(content: impl Into<String>, sender: Sender, timestamp_ms: i64) -> Self {
        Self {
            content: content.into(),
            sender,
            timestamp_ms,
        }
    }
}
