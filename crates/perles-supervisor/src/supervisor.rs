//! The process supervisor event loop (`spec.md` §4.4) — the core of
//! the control plane.

use std::sync::Arc;

use perles_broker::Broker;
use perles_buffer::{truncate_line, SOFT_LINE_LIMIT};
use perles_command::ProcessTurnCompleteCommand;
use perles_types::{
    now_ms, ContextExceededError, ProcessEvent, ProcessId, Role, SessionId, TokenMetrics, TurnError,
};
use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::event::{ContentBlock, EventError, RunStatus, SubprocessEvent};
use crate::state::SupervisorState;
use crate::subprocess::Subprocess;

/// Decouples the supervisor from a concrete command processor so it
/// can be driven by an in-memory mock in tests (`spec.md` §9
/// "Supervisor ownership graph").
pub trait CommandSubmitter: Send + Sync {
    /// Submit a turn-complete command. Total: never fails from the
    /// supervisor's perspective.
    fn submit(&self, command: ProcessTurnCompleteCommand);
}

impl CommandSubmitter for perles_command::CommandProcessor {
    fn submit(&self, command: ProcessTurnCompleteCommand) {
        perles_command::CommandProcessor::submit(self, command);
    }
}

impl<T: CommandSubmitter + ?Sized> CommandSubmitter for Arc<T> {
    fn submit(&self, command: ProcessTurnCompleteCommand) {
        (**self).submit(command);
    }
}

/// The supervisor's lifecycle state (`spec.md` §4.4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Constructed (Live) but `Start` has not been called yet.
    NotStarted,
    /// An event loop is draining a turn.
    Running,
    /// The last turn finished with the subprocess reporting success.
    Completed,
    /// The last turn finished with the subprocess reporting failure.
    Failed,
    /// The last turn was cancelled via `Stop`.
    Cancelled,
}

struct RunInner {
    subprocess: Option<Arc<dyn Subprocess>>,
    cancel: CancellationToken,
    done: Option<JoinHandle<()>>,
}

/// Owns one subprocess's event stream across turns: session id,
/// accumulated cost, the sticky last error, and the recent-output
/// buffer. Never touches a repository directly — all state
/// transitions on turn boundaries go through a [`CommandSubmitter`]
/// (`spec.md` §9 "Supervisor ownership graph").
pub struct Supervisor {
    id: ProcessId,
    role: Role,
    state: Arc<SupervisorState>,
    submitter: Arc<dyn CommandSubmitter>,
    events: Arc<Broker<ProcessEvent>>,
    run_state: Arc<std::sync::Mutex<RunState>>,
    run: tokio::sync::Mutex<RunInner>,
}

impl Supervisor {
    /// Live construction: attaches to a running subprocess. The event
    /// loop does not start until [`Supervisor::start`] is called
    /// (`spec.md` §4.4.1).
    pub fn new(
        id: ProcessId,
        role: Role,
        subprocess: Arc<dyn Subprocess>,
        submitter: Arc<dyn CommandSubmitter>,
        events: Arc<Broker<ProcessEvent>>,
        buffer_capacity: usize,
    ) -> Self {
        let session_id = subprocess.session_ref();
        Self {
            id,
            role,
            state: Arc::new(SupervisorState::new(session_id, buffer_capacity)),
            submitter,
            events,
            run_state: Arc::new(std::sync::Mutex::new(RunState::NotStarted)),
            run: tokio::sync::Mutex::new(RunInner {
                subprocess: Some(subprocess),
                cancel: CancellationToken::new(),
                done: None,
            }),
        }
    }

    /// Dormant construction: a saved session with no attached
    /// subprocess. The *done* signal is pre-satisfied (`done: None`)
    /// so `Resume` never blocks waiting on a loop that never ran
    /// (`spec.md` §4.4.1, §9 "Dormant processes").
    pub fn new_dormant(
        id: ProcessId,
        role: Role,
        session_id: SessionId,
        submitter: Arc<dyn CommandSubmitter>,
        events: Arc<Broker<ProcessEvent>>,
        buffer_capacity: usize,
    ) -> Self {
        Self {
            id,
            role,
            state: Arc::new(SupervisorState::new(Some(session_id), buffer_capacity)),
            submitter,
            events,
            run_state: Arc::new(std::sync::Mutex::new(RunState::Completed)),
            run: tokio::sync::Mutex::new(RunInner {
                subprocess: None,
                cancel: CancellationToken::new(),
                done: None,
            }),
        }
    }

    /// This supervisor's process id.
    pub fn id(&self) -> &ProcessId {
        &self.id
    }

    /// The role this supervisor's process plays.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Current lifecycle state.
    pub fn run_state(&self) -> RunState {
        *self.run_state.lock().expect("run state mutex poisoned")
    }

    /// Current session id.
    pub fn session_id(&self) -> Option<SessionId> {
        self.state.session_id()
    }

    /// Current metrics snapshot.
    pub fn metrics(&self) -> TokenMetrics {
        self.state.metrics()
    }

    /// The last recorded error, if any.
    pub fn last_error(&self) -> Option<TurnError> {
        self.state.last_error()
    }

    /// A snapshot of the recent output buffer, oldest first.
    pub fn buffer_lines(&self) -> Vec<String> {
        self.state.buffer().lines()
    }

    /// Start the event loop for a Live-constructed supervisor
    /// (`spec.md` §4.4.1, §4.4.3).
    ///
    /// Panics if called on a supervisor with no attached subprocess
    /// (a dormant supervisor must `resume` instead).
    pub async fn start(&self) {
        let mut run = self.run.lock().await;
        let subprocess = run
            .subprocess
            .clone()
            .expect("start called on a supervisor with no live subprocess; dormant supervisors must resume");
        self.spawn_loop(&mut run, subprocess);
    }

    fn spawn_loop(&self, run: &mut RunInner, subprocess: Arc<dyn Subprocess>) {
        let cancel = CancellationToken::new();
        run.cancel = cancel.clone();
        run.subprocess = Some(Arc::clone(&subprocess));
        *self.run_state.lock().expect("run state mutex poisoned") = RunState::Running;

        let id = self.id.clone();
        let state = Arc::clone(&self.state);
        let submitter = Arc::clone(&self.submitter);
        let events = Arc::clone(&self.events);
        let run_state = Arc::clone(&self.run_state);

        run.done = Some(tokio::spawn(async move {
            event_loop(id, subprocess, state, submitter, events, cancel, run_state).await;
        }));
    }

    /// Resume with a new subprocess: cancel and await the current
    /// loop (a no-op for a dormant or not-yet-started supervisor),
    /// then launch a fresh one. The session id is preserved; only the
    /// next `Init` event may overwrite it (`spec.md` §4.4.7).
    pub async fn resume(&self, new_subprocess: Arc<dyn Subprocess>) {
        let mut run = self.run.lock().await;
        run.cancel.cancel();
        if let Some(done) = run.done.take() {
            let _ = done.await;
        }
        self.spawn_loop(&mut run, new_subprocess);
    }

    /// Cancel the subprocess (closing its streams), cancel the loop's
    /// context, and await its exit. Idempotent and safe to call
    /// concurrently — both properties fall out of serializing on
    /// `run`'s lock (`spec.md` §4.4.8).
    pub async fn stop(&self) {
        let mut run = self.run.lock().await;
        if let Some(subprocess) = run.subprocess.clone() {
            let _ = subprocess.cancel().await;
        }
        run.cancel.cancel();
        if let Some(done) = run.done.take() {
            let _ = done.await;
        }
    }
}

/// Render a tool invocation the way both `Assistant` tool-use blocks
/// and standalone `ToolUse` events are rendered (`spec.md` §4.4.4:
/// "identical rendering path").
fn render_tool_call(name: &str, input: &str) -> String {
    format!("🔧 {name}({})", truncate_line(input, SOFT_LINE_LIMIT))
}

fn turn_error_from(error: &EventError) -> TurnError {
    if error.is_context_exceeded() {
        TurnError::ContextExceeded(ContextExceededError::new(error.message.clone()))
    } else {
        TurnError::Other(error.message.clone())
    }
}

/// Record an error observed inline in the output stream: stored
/// sticky, and always published for real-time visibility
/// (`spec.md` §4.4.4, §4.4.5 "in-flight error").
fn observe_in_flight_error(
    process_id: &ProcessId,
    state: &SupervisorState,
    events: &Broker<ProcessEvent>,
    error: &EventError,
) {
    let turn_error = turn_error_from(error);
    if error.is_context_exceeded() {
        state.buffer().append("⚠️ Context Exhausted");
    }
    state.record_error(turn_error);
    let message = if error.is_context_exceeded() {
        format!("context exceeded: {}", error.message)
    } else {
        error.message.clone()
    };
    events.publish(
        process_id.to_string(),
        ProcessEvent::ProcessError { process_id: process_id.clone(), message },
    );
}

/// Record an error read from the independent error channel: stored
/// sticky, never published — the caller surfaces it via the
/// turn-complete command instead (`spec.md` §4.4.5 "exit error").
fn observe_exit_error(state: &SupervisorState, message: String) {
    state.record_error(TurnError::Other(message));
}

fn handle_output_event(
    process_id: &ProcessId,
    state: &SupervisorState,
    events: &Broker<ProcessEvent>,
    event: SubprocessEvent,
) {
    let topic = process_id.to_string();
    match event {
        SubprocessEvent::Init { session_id } => {
            state.set_session_id(session_id);
        }
        SubprocessEvent::Assistant { content, delta, error } => {
            for block in content {
                match block {
                    ContentBlock::Text(text) => {
                        state.buffer().append(text.clone());
                        events.publish(
                            topic.clone(),
                            ProcessEvent::Output { process_id: process_id.clone(), text, delta },
                        );
                    }
                    ContentBlock::ToolUse { name, input } => {
                        let rendered = render_tool_call(&name, &input);
                        state.buffer().append(rendered.clone());
                        events.publish(
                            topic.clone(),
                            ProcessEvent::Output { process_id: process_id.clone(), text: rendered, delta: false },
                        );
                    }
                }
            }
            if let Some(error) = &error {
                observe_in_flight_error(process_id, state, events, error);
            }
        }
        SubprocessEvent::ToolUse { tool, message } => {
            let rendered = render_tool_call(&tool.name, &tool.input);
            state.buffer().append(rendered.clone());
            events.publish(
                topic,
                ProcessEvent::Output { process_id: process_id.clone(), text: rendered, delta: false },
            );
            if let Some(message) = message {
                state.buffer().append(message);
            }
        }
        SubprocessEvent::ToolResult { tool_name, output } => {
            let line = truncate_line(&format!("[{tool_name}] {output}"), SOFT_LINE_LIMIT);
            state.buffer().append(line);
        }
        SubprocessEvent::Result { usage, total_cost_usd, is_error_result, error } => {
            if let Some(usage) = usage {
                let turn_cost = total_cost_usd.unwrap_or(Decimal::ZERO);
                let metrics = state.record_usage(
                    usage.tokens_used,
                    usage.total_tokens,
                    usage.output_tokens,
                    turn_cost,
                    now_ms(),
                );
                if usage.tokens_used > 0 {
                    events.publish(
                        topic.clone(),
                        ProcessEvent::TokenUsage { process_id: process_id.clone(), metrics },
                    );
                }
            }
            if is_error_result {
                let message = error.as_ref().map(|e| e.message.clone()).unwrap_or_else(|| "unknown error".to_string());
                state.buffer().append(format!("⚠️ Error: {message}"));
            }
            if let Some(error) = &error {
                observe_in_flight_error(process_id, state, events, error);
            }
        }
        SubprocessEvent::Error { error } => {
            state.buffer().append(format!("⚠️ Error: {}", error.message));
            observe_in_flight_error(process_id, state, events, &error);
        }
    }
}

async fn event_loop(
    id: ProcessId,
    subprocess: Arc<dyn Subprocess>,
    state: Arc<SupervisorState>,
    submitter: Arc<dyn CommandSubmitter>,
    events: Arc<Broker<ProcessEvent>>,
    cancel: CancellationToken,
    run_state: Arc<std::sync::Mutex<RunState>>,
) {
    let session_at_turn_start = state.session_id();
    let mut events_done = false;
    let mut errors_done = false;

    loop {
        if events_done && errors_done {
            break;
        }
        tokio::select! {
            _ = cancel.cancelled() => {
                *run_state.lock().expect("run state mutex poisoned") = RunState::Cancelled;
                return;
            }
            event = subprocess.recv_event(), if !events_done => {
                match event {
                    Some(event) => handle_output_event(&id, &state, &events, event),
                    None => events_done = true,
                }
            }
            message = subprocess.recv_error(), if !errors_done => {
                match message {
                    Some(message) => observe_exit_error(&state, message),
                    None => errors_done = true,
                }
            }
        }
    }

    let status = subprocess.wait().await.unwrap_or_else(|error| {
        tracing::warn!(process_id = %id, %error, "subprocess wait failed, treating turn as failed");
        RunStatus::Failed
    });
    let succeeded = status == RunStatus::Completed;
    if !succeeded {
        state.rollback_session_id(session_at_turn_start);
    }
    *run_state.lock().expect("run state mutex poisoned") = if succeeded { RunState::Completed } else { RunState::Failed };

    submitter.submit(ProcessTurnCompleteCommand {
        process_id: id,
        succeeded,
        metrics: state.metrics(),
        error: state.last_error(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Usage;
    use crate::subprocess::MockSubprocess;
    use perles_types::SessionId;
    use std::sync::Mutex as StdMutex;
    use tokio_util::sync::CancellationToken as CancelToken;

    #[derive(Default)]
    struct RecordingSubmitter {
        submitted: StdMutex<Vec<ProcessTurnCompleteCommand>>,
    }

    impl CommandSubmitter for RecordingSubmitter {
        fn submit(&self, command: ProcessTurnCompleteCommand) {
            self.submitted.lock().expect("submitted mutex poisoned").push(command);
        }
    }

    fn supervisor_with(
        subprocess: Arc<dyn Subprocess>,
    ) -> (Supervisor, Arc<RecordingSubmitter>, Arc<Broker<ProcessEvent>>) {
        let submitter = Arc::new(RecordingSubmitter::default());
        let events = Arc::new(Broker::new(16));
        let supervisor = Supervisor::new(
            ProcessId::from("w1"),
            Role::Worker,
            subprocess,
            Arc::clone(&submitter) as Arc<dyn CommandSubmitter>,
            Arc::clone(&events),
            16,
        );
        (supervisor, submitter, events)
    }

    #[tokio::test]
    async fn s1_happy_turn_with_cost() {
        let (mock, handle) = MockSubprocess::new(None, "/tmp", 8);
        let (supervisor, submitter, _events) = supervisor_with(mock.clone());
        supervisor.start().await;

        handle
            .events_tx
            .send(SubprocessEvent::Init { session_id: SessionId::from("sess-A") })
            .await
            .unwrap();
        handle
            .events_tx
            .send(SubprocessEvent::Assistant {
                content: vec![ContentBlock::Text("hi".to_string())],
                delta: false,
                error: None,
            })
            .await
            .unwrap();
        handle
            .events_tx
            .send(SubprocessEvent::Result {
                usage: Some(Usage { tokens_used: 1000, total_tokens: 1000, output_tokens: 500 }),
                total_cost_usd: Some(Decimal::new(5, 2)),
                is_error_result: false,
                error: None,
            })
            .await
            .unwrap();
        drop(handle.events_tx);
        drop(handle.errors_tx);
        mock.set_status(RunStatus::Completed);

        wait_for_turn(&submitter).await;

        assert!(supervisor.buffer_lines().iter().any(|line| line == "hi"));
        assert_eq!(supervisor.session_id(), Some(SessionId::from("sess-A")));
        assert_eq!(supervisor.metrics().cumulative_cost_usd, Decimal::new(5, 2));

        let submitted = submitter.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert!(submitted[0].succeeded);
        assert!(submitted[0].error.is_none());
    }

    #[tokio::test]
    async fn s2_context_exhaustion() {
        let (mock, handle) = MockSubprocess::new(None, "/tmp", 8);
        let (supervisor, submitter, events) = supervisor_with(mock.clone());
        let mut subscription = events.subscribe(CancelToken::new());

        supervisor.start().await;

        handle
            .events_tx
            .send(SubprocessEvent::Init { session_id: SessionId::from("sess-B") })
            .await
            .unwrap();
        handle
            .events_tx
            .send(SubprocessEvent::Assistant {
                content: vec![],
                delta: false,
                error: Some(EventError {
                    message: "Prompt is too long".to_string(),
                    code: None,
                    reason: Some(crate::event::ErrorReason::ContextExceeded),
                }),
            })
            .await
            .unwrap();
        drop(handle.events_tx);
        drop(handle.errors_tx);
        mock.set_status(RunStatus::Failed);

        wait_for_turn(&submitter).await;

        let last_error = supervisor.last_error().expect("expected a recorded error");
        assert!(last_error.is_context_exceeded());
        assert!(supervisor.buffer_lines().iter().any(|line| line == "⚠️ Context Exhausted"));

        let submitted = submitter.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert!(!submitted[0].succeeded);
        assert!(submitted[0].error.as_ref().unwrap().is_context_exceeded());

        if let Ok(event) = subscription.try_recv() {
            match event.payload {
                ProcessEvent::ProcessError { message, .. } => assert!(message.contains("context exceeded")),
                other => panic!("expected ProcessError, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn s3_failed_resume_rolls_back_session() {
        let (mock, handle) = MockSubprocess::new(Some(SessionId::from("valid-123")), "/tmp", 8);
        let (supervisor, submitter, _events) = supervisor_with(mock.clone());
        supervisor.start().await;

        handle
            .events_tx
            .send(SubprocessEvent::Init { session_id: SessionId::from("invalid-456") })
            .await
            .unwrap();
        drop(handle.events_tx);
        drop(handle.errors_tx);
        mock.set_status(RunStatus::Failed);

        wait_for_turn(&submitter).await;

        assert_eq!(supervisor.session_id(), Some(SessionId::from("valid-123")));
    }

    #[tokio::test]
    async fn s4_dormant_resume_does_not_block() {
        let submitter = Arc::new(RecordingSubmitter::default());
        let events: Arc<Broker<ProcessEvent>> = Arc::new(Broker::new(8));
        let supervisor = Supervisor::new_dormant(
            ProcessId::from("w1"),
            Role::Worker,
            SessionId::from("sess-C"),
            Arc::clone(&submitter) as Arc<dyn CommandSubmitter>,
            events,
            16,
        );
        assert_eq!(supervisor.run_state(), RunState::Completed);

        let (mock, handle) = MockSubprocess::new(None, "/tmp", 8);
        let resumed = tokio::time::timeout(std::time::Duration::from_secs(1), supervisor.resume(mock.clone()));

        handle
            .events_tx
            .send(SubprocessEvent::Init { session_id: SessionId::from("sess-D") })
            .await
            .unwrap();
        drop(handle.events_tx);
        drop(handle.errors_tx);
        mock.set_status(RunStatus::Completed);

        resumed.await.expect("resume should not block waiting on a pre-signaled done channel");
        wait_for_turn(&submitter).await;

        assert_eq!(supervisor.session_id(), Some(SessionId::from("sess-D")));
    }

    #[tokio::test]
    async fn cancelling_emits_no_turn_complete_command() {
        let (mock, _handle) = MockSubprocess::new(None, "/tmp", 8);
        let (supervisor, submitter, _events) = supervisor_with(mock.clone());
        supervisor.start().await;

        supervisor.stop().await;

        assert!(submitter.submitted.lock().unwrap().is_empty());
        assert_eq!(supervisor.run_state(), RunState::Cancelled);
    }

    async fn wait_for_turn(submitter: &RecordingSubmitter) {
        for _ in 0..200 {
            if !submitter.submitted.lock().unwrap().is_empty() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for turn-complete command");
    }
}
