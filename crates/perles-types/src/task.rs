//! The `TaskAssignment` entity.

use crate::id::{ProcessId, TaskId};
use serde::{Deserialize, Serialize};

/// Status of a task assignment as it moves through implement/review/commit.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// The implementer is actively working.
    Implementing,
    /// Handed to a reviewer.
    InReview,
    /// Reviewer approved.
    Approved,
    /// Reviewer denied; returns to the implementer.
    Denied,
    /// Approved and being committed.
    Committing,
    /// Done.
    Completed,
}

impl TaskStatus {
    /// `spec.md` §3 invariant: `Reviewer` is required while status is one
    /// of these.
    pub fn requires_reviewer(self) -> bool {
        matches!(
            self,
            TaskStatus::InReview | TaskStatus::Approved | TaskStatus::Denied | TaskStatus::Committing
        )
    }
}

/// A task assignment linking an external issue id to an implementer and,
/// once review starts, a reviewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAssignment {
    /// External issue-tracker id.
    pub task_id: TaskId,
    /// Worker implementing the task.
    pub implementer: ProcessId,
    /// Worker reviewing the task, once assigned.
    pub reviewer: Option<ProcessId>,
    /// Current status.
    pub status: TaskStatus,
    /// Epoch milliseconds implementation started.
    pub started_at_ms: i64,
    /// Epoch milliseconds review started, if it has.
    pub review_started_at_ms: Option<i64>,
}

impl TaskAssignment {
    /// Start a new task assignment in the `Implementing` state.
    pub fn new(task_id: TaskId, implementer: ProcessId, now_ms: i64) -> Self {
        Self {
            task_id,
            implementer,
            reviewer: None,
            status: TaskStatus::Implementing,
            started_at_ms: now_ms,
            review_started_at_ms: None,
        }
    }

    /// True iff the invariant "reviewer required while status needs one"
    /// holds for this assignment's current state.
    pub fn satisfies_reviewer_invariant(&self) -> bool {
        !self.status.requires_reviewer() || self.reviewer.is_some()
    }

    /// True iff `process` is either the implementer or the reviewer
    /// (`spec.md` §4.3 `TaskRepo::GetByWorker`).
    pub fn involves(&self, process: &ProcessId) -> bool {
        &self.implementer == process || self.reviewer.as_ref() == Some(process)
    }
}
