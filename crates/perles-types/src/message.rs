//! The append-only inter-agent `Message` log.

use crate::id::{MessageId, ProcessId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What kind of content a message log entry carries.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Ordinary chat content between agents.
    Chat,
    /// A status update (turn complete, task transition, etc.).
    Status,
    /// An error surfaced to observers.
    Error,
}

/// An append-only log entry. Broadcast semantics: every agent sees
/// every entry regardless of `to` (`spec.md` §3). The sender is
/// auto-marked as having read its own entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique id of this log entry.
    pub id: MessageId,
    /// Sending process.
    pub from: ProcessId,
    /// Nominal recipient. Broadcast semantics mean this does not limit
    /// visibility — it is metadata only.
    pub to: ProcessId,
    /// Message body.
    pub content: String,
    /// What kind of entry this is.
    pub kind: MessageKind,
    /// Epoch milliseconds this entry was appended.
    pub timestamp_ms: i64,
    /// Set of agent ids that have read this entry.
    pub read_by: HashSet<ProcessId>,
}

impl Message {
    /// Build a new message entry, auto-marking `from` as having read it.
    pub fn new(
        id: MessageId,
        from: ProcessId,
        to: ProcessId,
        content: impl Into<String>,
        kind: MessageKind,
        timestamp_ms: i64,
    ) -> Self {
        let mut read_by = HashSet::new();
        read_by.insert(from.clone());
        Self {
            id,
            from,
            to,
            content: content.into(),
            kind,
            timestamp_ms,
            read_by,
        }
    }

    /// True iff `agent` has read this entry.
    pub fn is_read_by(&self, agent: &ProcessId) -> bool {
        self.read_by.contains(agent)
    }
}
