//! Per-worker message queues and the repository that owns them.

use std::collections::{HashMap, VecDeque};

use perles_types::{ProcessId, QueueEntry, RepoError};
use tokio::sync::RwLock;

/// A bounded FIFO of [`QueueEntry`] values for a single worker
/// (`spec.md` §3 `MessageQueue`). `max_size` of `0` means unbounded.
pub struct MessageQueue {
    max_size: usize,
    entries: VecDeque<QueueEntry>,
}

impl MessageQueue {
    /// Create a queue with the given bound (`0` = unbounded).
    pub fn new(max_size: usize) -> Self {
        Self { max_size, entries: VecDeque::new() }
    }

    /// Append an entry, failing with [`RepoError::QueueFull`] if the
    /// queue is already at `max_size` (and `max_size != 0`).
    pub fn enqueue(&mut self, entry: QueueEntry) -> Result<(), RepoError> {
        if self.max_size != 0 && self.entries.len() >= self.max_size {
            return Err(RepoError::QueueFull);
        }
        self.entries.push_back(entry);
        Ok(())
    }

    /// Remove and return the oldest entry, if any.
    pub fn dequeue(&mut self) -> Option<QueueEntry> {
        self.entries.pop_front()
    }

    /// Remove and return every entry, oldest first, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<QueueEntry> {
        self.entries.drain(..).collect()
    }

    /// Number of entries currently queued.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True iff the queue holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `QueueRepo` — one [`MessageQueue`] per worker, created on first access.
pub struct QueueRepo {
    queues: RwLock<HashMap<ProcessId, MessageQueue>>,
    default_max_size: usize,
}

impl QueueRepo {
    /// Create a repository whose queues default to `default_max_size`
    /// (`0` = unbounded) when first created for a process.
    pub fn new(default_max_size: usize) -> Self {
        Self { queues: RwLock::new(HashMap::new()), default_max_size }
    }

    /// Enqueue an entry for `process`, creating its queue on first use.
    pub async fn enqueue(&self, process: &ProcessId, entry: QueueEntry) -> Result<(), RepoError> {
        let mut queues = self.queues.write().await;
        let queue = queues
            .entry(process.clone())
            .or_insert_with(|| MessageQueue::new(self.default_max_size));
        queue.enqueue(entry)
    }

    /// Dequeue the oldest entry for `process`, if its queue exists and
    /// is non-empty.
    pub async fn dequeue(&self, process: &ProcessId) -> Option<QueueEntry> {
        self.queues.write().await.get_mut(process).and_then(MessageQueue::dequeue)
    }

    /// Drain every entry for `process`, emptying its queue atomically.
    /// Returns an empty vec if no queue exists yet for this process.
    pub async fn drain(&self, process: &ProcessId) -> Vec<QueueEntry> {
        self.queues
            .write()
            .await
            .get_mut(process)
            .map(MessageQueue::drain)
            .unwrap_or_default()
    }

    /// Remove a process's queue entirely.
    pub async fn delete(&self, process: &ProcessId) {
        self.queues.write().await.remove(process);
    }

    /// Current size of `process`'s queue (`0` if it has none).
    pub async fn size(&self, process: &ProcessId) -> usize {
        self.queues.read().await.get(process).map(MessageQueue::len).unwrap_or(0)
    }
}

impl Default for QueueRepo {
    fn default() -> Self {
        Self::new(0)
    }
}
