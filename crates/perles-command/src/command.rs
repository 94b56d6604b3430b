//! The `Command` trait and the concrete commands named by `spec.md` §4.5.

use std::any::Any;
use std::fmt;

use perles_types::{ProcessId, QueueEntry, Role, TaskId, TokenMetrics, TurnError};

/// Discriminant used to look up the handler registered for a command,
/// independent of the command's concrete Rust type.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// A supervisor finished a turn (`spec.md` §4.4.6).
    ProcessTurnComplete,
    /// Spawn a new supervised process.
    SpawnProcess,
    /// Stop a running process.
    StopProcess,
    /// Assign a task to an implementer.
    AssignTask,
    /// Deliver a queued entry to a process (moves it to `Working`).
    DeliverMessage,
    /// Append an entry to a worker's message queue.
    EnqueueMessage,
}

/// A polymorphic unit of work submitted to the [`CommandProcessor`](crate::CommandProcessor).
///
/// Commands are total: handlers never hand an error back to the
/// submitter. Downcast via [`Command::as_any`] to recover the concrete
/// type once a handler has matched on [`Command::kind`].
pub trait Command: fmt::Debug + Send + Sync {
    /// The discriminant this command's handler is registered under.
    fn kind(&self) -> CommandKind;

    /// Type-erased access for handler-side downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// Submitted once per turn, exactly once, when a supervisor's event
/// loop finishes draining both streams (`spec.md` §4.4.6).
#[derive(Debug, Clone)]
pub struct ProcessTurnCompleteCommand {
    /// The process whose turn completed.
    pub process_id: ProcessId,
    /// Whether the subprocess exited with `Completed` status.
    pub succeeded: bool,
    /// Metrics as of the end of this turn.
    pub metrics: TokenMetrics,
    /// The last error observed during the turn, if any.
    pub error: Option<TurnError>,
}

impl Command for ProcessTurnCompleteCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::ProcessTurnComplete
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Request to spawn a new supervised process in the given role.
#[derive(Debug, Clone)]
pub struct SpawnProcessCommand {
    /// Id to assign the new process.
    pub process_id: ProcessId,
    /// Role the new process plays.
    pub role: Role,
}

impl Command for SpawnProcessCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::SpawnProcess
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Request to stop a running process.
#[derive(Debug, Clone)]
pub struct StopProcessCommand {
    /// The process to stop.
    pub process_id: ProcessId,
}

impl Command for StopProcessCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::StopProcess
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Request to assign a task to an implementer.
#[derive(Debug, Clone)]
pub struct AssignTaskCommand {
    /// The task being assigned.
    pub task_id: TaskId,
    /// The worker to implement it.
    pub implementer: ProcessId,
}

impl Command for AssignTaskCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::AssignTask
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Request to dequeue and deliver a process's next queued entry,
/// transitioning it to `Working`.
#[derive(Debug, Clone)]
pub struct DeliverMessageCommand {
    /// The process to deliver to.
    pub process_id: ProcessId,
}

impl Command for DeliverMessageCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::DeliverMessage
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Request to append an entry to a worker's [`perles_repo::MessageQueue`](../perles_repo/struct.MessageQueue.html).
#[derive(Debug, Clone)]
pub struct EnqueueMessageCommand {
    /// The worker whose queue receives the entry.
    pub process_id: ProcessId,
    /// The entry content.
    pub content: String,
    /// Who originated this entry.
    pub sender: perles_types::Sender,
}

impl Command for EnqueueMessageCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::EnqueueMessage
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Convenience: build the `QueueEntry` this command implies, stamped
/// with `timestamp_ms`.
impl EnqueueMessageCommand {
    /// Build the queue entry this command implies.
    pub fn to_queue_entry(&self, timestamp_ms: i64) -> QueueEntry {
        QueueEntry::new(self.content.clone(), self.sender, timestamp_ms)
    }
}
