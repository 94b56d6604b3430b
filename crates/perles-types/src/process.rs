//! The `Process` entity — a single supervised AI subprocess.

use crate::id::{ProcessId, SessionId, TaskId};
use crate::metrics::TokenMetrics;
use serde::{Deserialize, Serialize};

/// The role a process plays in the workflow.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The single coordinator; see `spec.md` §3 invariant on uniqueness.
    Coordinator,
    /// A worker implementing or reviewing tasks.
    Worker,
    /// A read-only observer (e.g. a TUI attach point).
    Observer,
}

/// Lifecycle status of a process. `Retired` and `Failed` are terminal:
/// no transition leaves them (`spec.md` §3 invariant).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Created, not yet spawned.
    Pending,
    /// Spawned, waiting for the first ready signal.
    Starting,
    /// Idle and able to receive work.
    Ready,
    /// Currently processing a delivered message.
    Working,
    /// Temporarily suspended (dormant or explicitly paused).
    Paused,
    /// Stopped by request; not terminal (may be resumed).
    Stopped,
    /// Permanently retired. Terminal.
    Retired,
    /// Failed unrecoverably. Terminal.
    Failed,
}

impl Status {
    /// A process is Active iff it can receive enqueued messages
    /// (`spec.md` §3: `Active` iff status ∈ {Ready, Working}).
    pub fn is_active(self) -> bool {
        matches!(self, Status::Ready | Status::Working)
    }

    /// `Retired` and `Failed` are terminal — no transition leaves them.
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Retired | Status::Failed)
    }
}

/// Worker-only phase within the implement/review cycle.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Not currently assigned to a task.
    Idle,
    /// Implementing an assigned task.
    Implementing,
    /// Implementation done, waiting for a reviewer.
    AwaitingReview,
    /// Actively reviewing another worker's task.
    Reviewing,
    /// Addressing reviewer feedback.
    AddressingFeedback,
    /// Committing the final result.
    Committing,
}

/// A single supervised AI subprocess (coordinator, worker, or observer).
///
/// See `spec.md` §3 for the full invariant list; `Process::is_active`
/// and `Process::is_terminal` enforce the status-derived invariants at
/// the type level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    /// Unique identifier. The coordinator's id is always `"coordinator"`.
    pub id: ProcessId,
    /// The role this process plays.
    pub role: Role,
    /// Current lifecycle status.
    pub status: Status,
    /// Opaque session id, may be empty. Only the owning supervisor may
    /// clear or overwrite this (`spec.md` §3 invariant).
    pub session_id: Option<SessionId>,
    /// Token/cost metrics for the most recently completed turn.
    pub metrics: TokenMetrics,
    /// Epoch milliseconds this process was created.
    pub created_at_ms: i64,
    /// Epoch milliseconds of the last observed activity.
    pub last_activity_at_ms: i64,
    /// Worker-only: current phase. `None` for coordinators/observers.
    pub phase: Option<Phase>,
    /// Worker-only: the task currently assigned, if any.
    pub task_id: Option<TaskId>,
    /// Worker-only: when this process was retired, if it has been.
    pub retired_at_ms: Option<i64>,
}

impl Process {
    /// Construct a freshly spawned, `Pending` process.
    pub fn new(id: ProcessId, role: Role, now_ms: i64) -> Self {
        let phase = matches!(role, Role::Worker).then_some(Phase::Idle);
        Self {
            id,
            role,
            status: Status::Pending,
            session_id: None,
            metrics: TokenMetrics::default(),
            created_at_ms: now_ms,
            last_activity_at_ms: now_ms,
            phase,
            task_id: None,
            retired_at_ms: None,
        }
    }

    /// Construct a dormant process: no live subprocess, carrying a
    /// saved session id, starting directly in `Ready`
    /// (`spec.md` §3 Lifecycle, §4.4.1 Dormant construction).
    pub fn new_dormant(id: ProcessId, role: Role, session_id: SessionId, now_ms: i64) -> Self {
        let mut p = Self::new(id, role, now_ms);
        p.status = Status::Ready;
        p.session_id = Some(session_id);
        p
    }

    /// True iff this process may currently receive enqueued messages.
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// True iff this process is in a terminal lifecycle state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// True iff this process is ready and either has no phase or is idle
    /// (`spec.md` §4.3 `ReadyWorkers`).
    pub fn is_ready_worker(&self) -> bool {
        self.status == Status::Ready
            && matches!(self.phase, None | Some(Phase::Idle))
    }
}
