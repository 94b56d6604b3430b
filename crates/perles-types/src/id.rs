//! Typed ID wrappers for processes, tasks, workflows, sessions, and messages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed ID wrappers prevent mixing up a `ProcessId` with a `TaskId` at
/// the call site. These are just strings underneath — no UUID
/// enforcement, no format requirement.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new typed ID from anything that converts to `String`.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

typed_id!(ProcessId, "Unique identifier for a supervised process.");
typed_id!(TaskId, "External issue-tracker identifier for a task assignment.");
typed_id!(SessionId, "Opaque session id threaded back to a subprocess on resume.");
typed_id!(WorkflowId, "Unique identifier for a workflow instance.");
typed_id!(MessageId, "Unique identifier for a message log entry.");

/// The well-known id of the single coordinator process.
pub const COORDINATOR_ID: &str = "coordinator";

/// Build a `ProcessId` for the coordinator.
pub fn coordinator_id() -> ProcessId {
    ProcessId::new(COORDINATOR_ID)
}
