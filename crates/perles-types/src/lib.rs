#![deny(missing_docs)]
//! # perles-types — core domain model for the perles control plane
//!
//! This crate defines the entities `spec.md` §3 names: [`Process`],
//! [`TaskAssignment`], queue and message log entries, token/cost
//! metrics, and the workflow registration/DAG model. It has no
//! behavior of its own — repositories ([`perles_repo`](../perles_repo/index.html)),
//! the supervisor, and the workflow registry all build on these types
//! but own their own state.

pub mod clock;
pub mod error;
pub mod event;
pub mod id;
pub mod identifier;
pub mod message;
pub mod metrics;
pub mod process;
pub mod queue;
pub mod task;
pub mod workflow;

pub use clock::now_ms;
pub use error::{ContextExceededError, RepoError, TurnError, WorkflowError};
pub use event::ProcessEvent;
pub use id::{coordinator_id, MessageId, ProcessId, SessionId, TaskId, WorkflowId, COORDINATOR_ID};
pub use identifier::Identifier;
pub use message::{Message, MessageKind};
pub use metrics::TokenMetrics;
pub use process::{Phase, Process, Role, Status};
pub use queue::{QueueEntry, Sender};
pub use task::{TaskAssignment, TaskStatus};
pub use workflow::{Argument, Artifact, Dag, Node, RenderContext, Source, WorkflowRegistration};
