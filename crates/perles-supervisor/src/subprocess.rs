//! The subprocess harness interface the supervisor consumes
//! (`spec.md` §6.2) and a [`MockSubprocess`] test double.

use async_trait::async_trait;
use perles_types::SessionId;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

use crate::event::{RunStatus, SubprocessEvent};

/// Errors surfaced by a [`Subprocess`] implementation.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SubprocessError {
    /// Any other harness-level failure.
    #[error("subprocess error: {0}")]
    Other(String),
}

/// The external contract a running AI subprocess must satisfy
/// (`spec.md` §6.2). The concrete binary and its wire schema are out
/// of scope; this crate only consumes events shaped like
/// [`SubprocessEvent`].
///
/// Every method takes `&self` so implementations are shared behind an
/// `Arc<dyn Subprocess>`: the event loop holds one clone to receive
/// from, while `Supervisor::stop`/`resume` hold another to cancel it,
/// without the two contending over a `&mut self` borrow. Both streams
/// must be closed by the implementation on termination — the event
/// loop relies on `recv_event`/`recv_error` returning `None` to know
/// when to proceed to turn completion.
#[async_trait]
pub trait Subprocess: Send + Sync {
    /// Receive the next output-stream event, or `None` once the
    /// stream is closed.
    async fn recv_event(&self) -> Option<SubprocessEvent>;

    /// Receive the next error-stream message, or `None` once the
    /// stream is closed.
    async fn recv_error(&self) -> Option<String>;

    /// Current run status.
    fn status(&self) -> RunStatus;

    /// True iff `status() == RunStatus::Running`.
    fn is_running(&self) -> bool {
        self.status() == RunStatus::Running
    }

    /// The session id this subprocess was attached to, if known before
    /// any events have been consumed.
    fn session_ref(&self) -> Option<SessionId>;

    /// The working directory this subprocess was launched in.
    fn work_dir(&self) -> &str;

    /// OS process id, if the subprocess has one (not all test doubles do).
    fn pid(&self) -> Option<u32>;

    /// Signal the subprocess to stop, which must close both streams.
    async fn cancel(&self) -> Result<(), SubprocessError>;

    /// Block until the subprocess has exited, returning its final status.
    async fn wait(&self) -> Result<RunStatus, SubprocessError>;
}

/// A test double for [`Subprocess`], driven entirely by channel
/// senders a test holds onto (`spec.md` §6.2, mirrored by
/// `layer0::test_utils`'s approach to protocol-trait testing).
pub struct MockSubprocess {
    events_rx: Mutex<mpsc::Receiver<SubprocessEvent>>,
    errors_rx: Mutex<mpsc::Receiver<String>>,
    status: std::sync::Mutex<RunStatus>,
    session_ref: Option<SessionId>,
    work_dir: String,
}

/// The sender half of a [`MockSubprocess`], used by tests to drive it.
pub struct MockSubprocessHandle {
    /// Send an event on the output stream.
    pub events_tx: mpsc::Sender<SubprocessEvent>,
    /// Send an error on the error stream.
    pub errors_tx: mpsc::Sender<String>,
}

impl MockSubprocess {
    /// Build a mock subprocess plus the handle a test uses to drive
    /// it. `channel_capacity` bounds both streams.
    pub fn new(
        session_ref: Option<SessionId>,
        work_dir: impl Into<String>,
        channel_capacity: usize,
    ) -> (std::sync::Arc<Self>, MockSubprocessHandle) {
        let (events_tx, events_rx) = mpsc::channel(channel_capacity.max(1));
        let (errors_tx, errors_rx) = mpsc::channel(channel_capacity.max(1));
        let mock = std::sync::Arc::new(Self {
            events_rx: Mutex::new(events_rx),
            errors_rx: Mutex::new(errors_rx),
            status: std::sync::Mutex::new(RunStatus::Running),
            session_ref,
            work_dir: work_dir.into(),
        });
        let handle = MockSubprocessHandle { events_tx, errors_tx };
        (mock, handle)
    }

    /// Set the status [`Subprocess::wait`] will report.
    pub fn set_status(&self, status: RunStatus) {
        *self.status.lock().expect("mock subprocess status mutex poisoned") = status;
    }
}

#[async_trait]
impl Subprocess for MockSubprocess {
    async fn recv_event(&self) -> Option<SubprocessEvent> {
        self.events_rx.lock().await.recv().await
    }

    async fn recv_error(&self) -> Option<String> {
        self.errors_rx.lock().await.recv().await
    }

    fn status(&self) -> RunStatus {
        *self.status.lock().expect("mock subprocess status mutex poisoned")
    }

    fn session_ref(&self) -> Option<SessionId> {
        self.session_ref.clone()
    }

    fn work_dir(&self) -> &str {
        &self.work_dir
    }

    fn pid(&self) -> Option<u32> {
        None
    }

    async fn cancel(&self) -> Result<(), SubprocessError> {
        self.set_status(RunStatus::Cancelled);
        Ok(())
    }

    async fn wait(&self) -> Result<RunStatus, SubprocessError> {
        Ok(self.status())
    }
}
