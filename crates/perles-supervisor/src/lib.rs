#![deny(missing_docs)]
//! # perles-supervisor — the per-process event loop (`spec.md` §4.4)
//!
//! A [`Supervisor`] owns a single subprocess's event stream across one
//! turn: it tracks the session id, accumulates token/cost metrics,
//! detects and preserves context-exhaustion errors, renders output
//! into a bounded [`perles_buffer::OutputBuffer`], publishes live
//! [`perles_types::ProcessEvent`]s, and submits exactly one
//! [`perles_command::ProcessTurnCompleteCommand`] per completed turn.
//! It never touches a repository directly.

mod event;
mod state;
mod subprocess;
mod supervisor;

pub use event::{ContentBlock, ErrorReason, EventError, RunStatus, SubprocessEvent, ToolCall, Usage};
pub use state::SupervisorState;
pub use subprocess::{MockSubprocess, MockSubprocessHandle, Subprocess, SubprocessError};
pub use supervisor::{CommandSubmitter, RunState, Supervisor};
