//! Errors the control-plane facade returns to its caller.
//!
//! `spec.md` §6.1: "HTTP maps errors to 400 (`invalid_json`), 404 (not
//! found), ..." — this crate returns typed values; the status mapping
//! is documented here but applied by the embedding HTTP layer, which
//! is out of scope (`spec.md` §1).

use perles_types::WorkflowId;
use thiserror::Error;

/// Errors surfaced by [`crate::ControlPlane`] methods.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ControlError {
    /// No instance exists with the given id. Maps to HTTP 404.
    #[error("workflow instance not found: {0}")]
    WorkflowNotFound(WorkflowId),

    /// The request was structurally invalid (bad JSON upstream, empty
    /// slug, unknown registration key). Maps to HTTP 400.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The requested transition is not valid for the instance's
    /// current status (e.g. `Start` on an already-`Stopped` instance).
    #[error("invalid state transition: {0}")]
    InvalidTransition(String),
}
