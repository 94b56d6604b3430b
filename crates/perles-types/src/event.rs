//! Events published on the process-event broker (`spec.md` §4.4.4–§4.4.5,
//! §7: "Handlers... publish `ProcessError`/`WorkerError` events").

use crate::id::ProcessId;
use crate::metrics::TokenMetrics;
use serde::{Deserialize, Serialize};

/// An event published for live observers of a process's activity.
/// Carried as the payload type of the shared process-event broker;
/// the broker's own topic is always [`crate::id::ProcessId::as_str`]
/// of the originating process.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProcessEvent {
    /// Text appended to the process's output buffer. `delta` mirrors
    /// the subprocess's own streaming-delta flag when present.
    Output {
        /// The process this output came from.
        process_id: ProcessId,
        /// The appended text.
        text: String,
        /// True for incremental streaming chunks, false for complete
        /// renderings (tool-call descriptions, tool results).
        delta: bool,
    },
    /// A turn reported non-zero token usage (`spec.md` §4.4.4).
    TokenUsage {
        /// The process this usage belongs to.
        process_id: ProcessId,
        /// Metrics as of this usage update.
        metrics: TokenMetrics,
    },
    /// An in-flight or context-exhaustion error surfaced during a turn
    /// (`spec.md` §4.4.4–§4.4.5).
    ProcessError {
        /// The process the error occurred on.
        process_id: ProcessId,
        /// Human-readable error message.
        message: String,
    },
    /// An error a command handler encountered while applying a
    /// command's effect (`spec.md` §7).
    WorkerError {
        /// The process the error is attributed to.
        process_id: ProcessId,
        /// Human-readable error message.
        message: String,
    },
    /// A supervisor's turn finished (`spec.md` §4.4.6).
    TurnComplete {
        /// The process whose turn completed.
        process_id: ProcessId,
        /// Whether the turn succeeded.
        succeeded: bool,
    },
}

impl ProcessEvent {
    /// The process this event pertains to, regardless of variant.
    pub fn process_id(&self) -> &ProcessId {
        match self {
            ProcessEvent::Output { process_id, .. }
            | ProcessEvent::TokenUsage { process_id, .. }
            | ProcessEvent::ProcessError { process_id, .. }
            | ProcessEvent::WorkerError { process_id, .. }
            | ProcessEvent::TurnComplete { process_id, .. } => process_id,
        }
    }
}
