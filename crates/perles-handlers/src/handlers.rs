//! Concrete [`CommandHandler`] implementations, one per [`CommandKind`].
//!
//! None of these return errors: a missing process or task is logged
//! and turned into a published [`ProcessEvent::WorkerError`]
//! (`spec.md` §7).

use async_trait::async_trait;

use perles_command::{
    AssignTaskCommand, Command, CommandHandler, DeliverMessageCommand, EnqueueMessageCommand,
    ProcessTurnCompleteCommand, SpawnProcessCommand, StopProcessCommand,
};
use perles_types::{now_ms, Phase, Process, ProcessEvent, Status, TaskAssignment};

use crate::context::HandlerContext;

fn downcast<'a, T: 'static>(command: &'a dyn Command) -> &'a T {
    command
        .as_any()
        .downcast_ref::<T>()
        .expect("command routed to handler with mismatched concrete type")
}

fn worker_error(ctx: &HandlerContext, process_id: &perles_types::ProcessId, message: impl Into<String>) {
    let message = message.into();
    tracing::warn!(process_id = %process_id, %message, "command handler error");
    ctx.publish(ProcessEvent::WorkerError { process_id: process_id.clone(), message });
}

/// Applies a [`ProcessTurnCompleteCommand`]: updates the process's
/// status and metrics, and publishes the completion plus any error
/// (`spec.md` §4.4.6).
pub struct ProcessTurnCompleteHandler {
    ctx: HandlerContext,
}

impl ProcessTurnCompleteHandler {
    /// Build a handler over the given shared context.
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl CommandHandler for ProcessTurnCompleteHandler {
    async fn handle(&self, command: &dyn Command) {
        let cmd: &ProcessTurnCompleteCommand = downcast(command);

        let mut process = match self.ctx.processes.get(&cmd.process_id).await {
            Ok(process) => process,
            Err(_) => {
                worker_error(&self.ctx, &cmd.process_id, "turn-complete for unknown process");
                return;
            }
        };

        process.metrics = cmd.metrics.clone();
        process.last_activity_at_ms = now_ms();
        process.status = if cmd.succeeded { Status::Ready } else { Status::Failed };
        self.ctx.processes.save(process).await;

        if let Some(error) = &cmd.error {
            self.ctx.publish(ProcessEvent::ProcessError {
                process_id: cmd.process_id.clone(),
                message: error.to_string(),
            });
        }
        self.ctx.publish(ProcessEvent::TurnComplete {
            process_id: cmd.process_id.clone(),
            succeeded: cmd.succeeded,
        });
    }
}

/// Applies a [`SpawnProcessCommand`]: registers a new `Pending` process.
pub struct SpawnProcessHandler {
    ctx: HandlerContext,
}

impl SpawnProcessHandler {
    /// Build a handler over the given shared context.
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl CommandHandler for SpawnProcessHandler {
    async fn handle(&self, command: &dyn Command) {
        let cmd: &SpawnProcessCommand = downcast(command);
        let process = Process::new(cmd.process_id.clone(), cmd.role, now_ms());
        self.ctx.processes.save(process).await;
    }
}

/// Applies a [`StopProcessCommand`]: transitions the process to
/// `Stopped` unless it is already in a terminal status.
pub struct StopProcessHandler {
    ctx: HandlerContext,
}

impl StopProcessHandler {
    /// Build a handler over the given shared context.
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl CommandHandler for StopProcessHandler {
    async fn handle(&self, command: &dyn Command) {
        let cmd: &StopProcessCommand = downcast(command);
        let mut process = match self.ctx.processes.get(&cmd.process_id).await {
            Ok(process) => process,
            Err(_) => {
                worker_error(&self.ctx, &cmd.process_id, "stop requested for unknown process");
                return;
            }
        };
        if process.is_terminal() {
            return;
        }
        process.status = Status::Stopped;
        process.last_activity_at_ms = now_ms();
        self.ctx.processes.save(process).await;
    }
}

/// Applies an [`AssignTaskCommand`]: creates the task assignment and
/// moves the implementer into the `Implementing` phase.
pub struct AssignTaskHandler {
    ctx: HandlerContext,
}

impl AssignTaskHandler {
    /// Build a handler over the given shared context.
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl CommandHandler for AssignTaskHandler {
    async fn handle(&self, command: &dyn Command) {
        let cmd: &AssignTaskCommand = downcast(command);

        let assignment = TaskAssignment::new(cmd.task_id.clone(), cmd.implementer.clone(), now_ms());
        self.ctx.tasks.save(assignment).await;

        match self.ctx.processes.get(&cmd.implementer).await {
            Ok(mut process) => {
                process.phase = Some(Phase::Implementing);
                process.task_id = Some(cmd.task_id.clone());
                process.last_activity_at_ms = now_ms();
                self.ctx.processes.save(process).await;
            }
            Err(_) => worker_error(
                &self.ctx,
                &cmd.implementer,
                "task assigned to unknown implementer",
            ),
        }
    }
}

/// Applies a [`DeliverMessageCommand`]: dequeues the process's next
/// queued entry and marks it `Working`.
pub struct DeliverMessageHandler {
    ctx: HandlerContext,
}

impl DeliverMessageHandler {
    /// Build a handler over the given shared context.
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl CommandHandler for DeliverMessageHandler {
    async fn handle(&self, command: &dyn Command) {
        let cmd: &DeliverMessageCommand = downcast(command);

        let Some(_entry) = self.ctx.queues.dequeue(&cmd.process_id).await else {
            tracing::debug!(process_id = %cmd.process_id, "deliver requested on empty queue");
            return;
        };

        match self.ctx.processes.get(&cmd.process_id).await {
            Ok(mut process) => {
                process.status = Status::Working;
                process.last_activity_at_ms = now_ms();
                self.ctx.processes.save(process).await;
            }
            Err(_) => worker_error(
                &self.ctx,
                &cmd.process_id,
                "delivered a queued entry to an unknown process",
            ),
        }
    }
}

/// Applies an [`EnqueueMessageCommand`]: appends to the target
/// worker's bounded message queue.
pub struct EnqueueMessageHandler {
    ctx: HandlerContext,
}

impl EnqueueMessageHandler {
    /// Build a handler over the given shared context.
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl CommandHandler for EnqueueMessageHandler {
    async fn handle(&self, command: &dyn Command) {
        let cmd: &EnqueueMessageCommand = downcast(command);
        let entry = cmd.to_queue_entry(now_ms());

        if self.ctx.queues.enqueue(&cmd.process_id, entry).await.is_err() {
            worker_error(&self.ctx, &cmd.process_id, "message queue full, entry dropped");
        }
    }
}
