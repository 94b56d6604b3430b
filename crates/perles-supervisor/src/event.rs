//! The consumed event shape a [`crate::Subprocess`] produces
//! (`spec.md` §4.4.2). Names are domain concepts, not wire labels —
//! the concrete subprocess binary and its JSON schema are out of
//! scope; this is only what the supervisor's event loop consumes.

use perles_types::SessionId;
use rust_decimal::Decimal;

/// A rendered chunk of an assistant turn: either plain text or a
/// tool-use block.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    /// Plain assistant text.
    Text(String),
    /// A tool invocation. `input` is already abbreviated for display.
    ToolUse {
        /// Tool name.
        name: String,
        /// Raw rendering of the tool's input; the supervisor abbreviates
        /// it when rendering a line into the output buffer.
        input: String,
    },
}

/// Why an error occurred, as reported by the subprocess. Only
/// `ContextExceeded` changes supervisor behavior; everything else is
/// folded into `Other`.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorReason {
    /// The model's context window was exceeded.
    ContextExceeded,
    /// Any other reason, carried verbatim.
    Other(String),
}

/// An error reported by the subprocess, either attached to an event
/// or standalone (`spec.md` §4.4.2/§4.4.4).
#[derive(Debug, Clone, PartialEq)]
pub struct EventError {
    /// Human-readable message.
    pub message: String,
    /// Provider-specific error code, if any.
    pub code: Option<String>,
    /// Structured reason, used for context-exhaustion detection.
    pub reason: Option<ErrorReason>,
}

impl EventError {
    /// True iff this error's reason is context exhaustion.
    pub fn is_context_exceeded(&self) -> bool {
        matches!(self.reason, Some(ErrorReason::ContextExceeded))
    }
}

/// Token/cost usage reported on a `Result` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Usage {
    /// Tokens used by this turn.
    pub tokens_used: u64,
    /// Total tokens across the session so far.
    pub total_tokens: u64,
    /// Output tokens produced by this turn.
    pub output_tokens: u64,
}

/// A single tool invocation (`spec.md` §4.4.2 `ToolUse`).
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    /// Provider-assigned tool-use id.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Raw rendering of the tool's input; the supervisor abbreviates it
    /// when rendering a line into the output buffer.
    pub input: String,
}

/// One event consumed from a subprocess's output stream
/// (`spec.md` §4.4.2).
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum SubprocessEvent {
    /// The subprocess (re)announced its session id.
    Init {
        /// The session id to adopt.
        session_id: SessionId,
    },
    /// An assistant turn chunk.
    Assistant {
        /// Content blocks carried by this chunk.
        content: Vec<ContentBlock>,
        /// True for an incremental streaming delta.
        delta: bool,
        /// An error attached to this chunk, if any.
        error: Option<EventError>,
    },
    /// A standalone tool-use event (distinct from an assistant chunk
    /// that happens to carry tool-use blocks).
    ToolUse {
        /// The tool invocation.
        tool: ToolCall,
        /// Optional accompanying message text.
        message: Option<String>,
    },
    /// The result of executing a tool.
    ToolResult {
        /// Name of the tool that produced this result.
        tool_name: String,
        /// Raw tool output, not yet truncated.
        output: String,
    },
    /// The turn's terminal result.
    Result {
        /// Usage for this turn, if reported.
        usage: Option<Usage>,
        /// Total cost in USD as of this turn.
        total_cost_usd: Option<Decimal>,
        /// True if this result represents a failed turn.
        is_error_result: bool,
        /// An error attached to this result, if any.
        error: Option<EventError>,
    },
    /// A standalone error event.
    Error {
        /// The reported error.
        error: EventError,
    },
}

/// Terminal or in-progress status of a subprocess
/// (`spec.md` §4.4.2, §4.4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Still executing.
    Running,
    /// Exited successfully.
    Completed,
    /// Exited with a failure.
    Failed,
    /// Cancelled before completion.
    Cancelled,
}
