#![deny(missing_docs)]
//! # perles-workflow — workflow registry, DAG validation, and rendering
//!
//! `spec.md` §4.6: loads versioned DAG workflow registrations from a
//! filesystem tree (built-in + user-shadowed), validates their
//! structure at load time, and renders node/epic templates against a
//! [`perles_types::RenderContext`].
//!
//! Module layout:
//! - [`filesystem`] — the `WorkflowFilesystem` abstraction (built-in
//!   embedded dir vs. `~/.perles/workflows`).
//! - [`schema`] — the on-disk YAML wire format.
//! - [`chain`] — DAG structural validation (cycles, dangling inputs,
//!   duplicate outputs, unknown `after` targets).
//! - [`loader`] — converts YAML into validated registrations.
//! - [`registry`] — the loaded, shadowed registration set.
//! - [`render`] — `RenderTemplate`/`RenderEpicTemplate`.
//! - [`creator`] — `WorkflowCreator.CreateWithArgs` against an opaque
//!   issue-tracker executor.

pub mod chain;
pub mod creator;
pub mod filesystem;
pub mod loader;
pub mod registry;
pub mod render;
pub mod schema;

pub use creator::{CreatedWorkflow, IssueExecutor, IssueId, WorkflowCreator};
pub use registry::{LoadedRegistration, WorkflowRegistry};
pub use render::{render_epic_template, render_template};
