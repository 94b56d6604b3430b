//! Control-plane facade over the process supervisor, command stack,
//! and workflow registry: creates, starts, stops, and lists workflow
//! instances (`spec.md` §6.1).
//!
//! This crate stops at the facade. The HTTP/REST surface that maps
//! these calls onto routes and status codes is out of scope
//! (`spec.md` §1, Non-goals) and is left to the embedding binary.

#![deny(missing_docs)]

mod config;
mod error;
mod instance;
mod plane;

pub use config::{
    ControlPlaneConfig, DEFAULT_BROKER_CHANNEL_CAPACITY, DEFAULT_OUTPUT_BUFFER_CAPACITY, DEFAULT_QUEUE_MAX_SIZE,
};
pub use error::ControlError;
pub use instance::{
    format_arguments_markdown, HealthStatus, InstanceStatus, ListFilter, StopOptions, WorkflowInstance, WorkflowSpec,
};
pub use plane::ControlPlane;
