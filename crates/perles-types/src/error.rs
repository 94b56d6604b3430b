//! Sentinel and typed errors shared across the control plane.

use thiserror::Error;

/// Errors returned by the in-memory repositories.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepoError {
    /// No process exists with the given id.
    #[error("process not found: {0}")]
    ProcessNotFound(String),

    /// No task assignment exists with the given id.
    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// The queue is at its bound; the entry was not enqueued.
    #[error("queue full")]
    QueueFull,
}

/// The subprocess's context window was exceeded during a turn.
///
/// Sticky within a turn: once recorded, no later error (in-flight or
/// exit) may replace it. See `spec.md` §4.4.4 (context-exhaustion
/// detection) and §4.4.5 (in-flight vs exit error).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("context exceeded: {message}")]
pub struct ContextExceededError {
    /// The message reported by the subprocess, if any.
    pub message: String,
}

impl ContextExceededError {
    /// Build a new context-exceeded error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A turn-ending error: either a typed context-exhaustion marker, or a
/// free-form message surfaced from the subprocess or its harness.
///
/// `ProcessTurnCompleteCommand::error` carries this type so handlers
/// can distinguish "the context window was exceeded" (which a
/// coordinator might react to by retrying with a compacted prompt)
/// from a generic failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TurnError {
    /// The subprocess's context window was exceeded.
    #[error(transparent)]
    ContextExceeded(#[from] ContextExceededError),

    /// Any other error surfaced during the turn.
    #[error("{0}")]
    Other(String),
}

impl TurnError {
    /// True if this error is a context-exceeded marker.
    pub fn is_context_exceeded(&self) -> bool {
        matches!(self, TurnError::ContextExceeded(_))
    }

    /// Record `next` into `slot`, honoring stickiness: if `slot` already
    /// holds a `ContextExceeded`, it is never overwritten.
    pub fn record_sticky(slot: &mut Option<TurnError>, next: TurnError) {
        if matches!(slot, Some(TurnError::ContextExceeded(_))) {
            return;
        }
        *slot = Some(next);
    }
}

/// Errors surfaced while loading or rendering workflow registrations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The registry has no registration for the given key.
    #[error("registration not found: {0}")]
    NotFound(String),

    /// The rendering context did not carry a slug.
    #[error("slug is required to render this identifier")]
    SlugRequired,

    /// The identifier string did not parse as `namespace::key::version::chain`.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// The requested version does not match the loaded registration's version.
    #[error("version mismatch: requested {requested}, loaded {loaded}")]
    VersionMismatch {
        /// Version named in the identifier.
        requested: String,
        /// Version actually loaded for this registration.
        loaded: String,
    },

    /// A structural problem in a DAG definition, naming the offending element.
    #[error("invalid DAG in {registration}: {reason}")]
    InvalidDag {
        /// `namespace::key` of the registration that failed to load.
        registration: String,
        /// Human-readable description naming the offending element.
        reason: String,
    },

    /// A registration-level validation failure outside the DAG itself
    /// (bad assignee, missing instructions, duplicate argument key,
    /// missing template file, oversized file).
    #[error("invalid registration {registration}: {reason}")]
    InvalidRegistration {
        /// `namespace::key` of the registration that failed to load.
        registration: String,
        /// Human-readable description naming the offending element.
        reason: String,
    },

    /// Template rendering failed.
    #[error("template render error: {0}")]
    Render(String),

    /// An I/O error while reading the registry filesystem.
    #[error("io error: {0}")]
    Io(String),

    /// The registration's YAML did not parse.
    #[error("yaml parse error in {file}: {source}")]
    Yaml {
        /// Path of the file that failed to parse.
        file: String,
        /// Underlying parse error, rendered to a string.
        source: String,
    },

    /// Every registration file in a registry root failed to load
    /// (`spec.md` §7 RegistryLoadError: "if zero registrations load,
    /// startup fails").
    #[error("no registrations loaded from {source}")]
    NoRegistrationsLoaded {
        /// Label of the filesystem that produced zero registrations.
        source: String,
    },
}
