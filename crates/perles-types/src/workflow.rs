//! Workflow registration and DAG data model (`spec.md` §3, §6.3).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where a registration was loaded from. User registrations shadow
/// built-ins with the same `(namespace, key)` (`spec.md` §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Embedded at build time.
    BuiltIn,
    /// Loaded from `~/.perles/workflows`.
    User,
}

/// A named file produced or consumed by a DAG node. `filename` may
/// itself be a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Stable key used to address this artifact in rendering contexts.
    pub key: String,
    /// Filename, possibly a `{{ }}` template.
    pub file: String,
}

/// A single unit of work in a workflow DAG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Key unique within the owning registration.
    pub key: String,
    /// Human-readable name.
    pub name: String,
    /// Body template (content to render for this node).
    pub template: String,
    /// Input artifacts, each of whose filename must appear in some
    /// sibling node's `outputs`.
    #[serde(default)]
    pub inputs: Vec<Artifact>,
    /// Output artifacts. No two nodes may share an output filename.
    #[serde(default)]
    pub outputs: Vec<Artifact>,
    /// Sibling node keys that must complete before this one starts.
    #[serde(default)]
    pub after: Vec<String>,
    /// Optional assignee: `worker-[1..99]` or `human`. Presence marks
    /// this an orchestration node.
    #[serde(default)]
    pub assignee: Option<String>,
}

/// The directed acyclic graph of nodes in a registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dag {
    /// Nodes, in declaration order.
    pub nodes: Vec<Node>,
}

/// Declaration of a single workflow argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    /// Argument key (unique within a registration).
    pub key: String,
    /// Display label.
    #[serde(default)]
    pub label: String,
    /// Description shown to the user.
    #[serde(default)]
    pub description: String,
    /// Argument type (`string`, `select`, `multi_select`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Whether this argument must be supplied.
    #[serde(default)]
    pub required: bool,
    /// Default value, if any.
    #[serde(default)]
    pub default: Option<String>,
    /// Valid options; required (non-empty) when `kind` is a select type.
    #[serde(default)]
    pub options: Option<Vec<String>>,
}

/// A fully loaded, validated workflow registration (`spec.md` §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRegistration {
    /// Registration namespace (e.g. `"workflow"`).
    pub namespace: String,
    /// Registration key, unique within a namespace+source.
    pub key: String,
    /// Semver-ish version string.
    pub version: String,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Free-form labels.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Declared arguments.
    #[serde(default)]
    pub arguments: Vec<Argument>,
    /// Epic-level template, rendered by `RenderEpicTemplate`.
    #[serde(default)]
    pub epic_template: Option<String>,
    /// Instructions; required when any node has a non-empty `assignee`.
    #[serde(default)]
    pub instructions: Option<String>,
    /// Prefix prepended to every rendered artifact path.
    #[serde(default)]
    pub artifact_path: String,
    /// Where this registration was loaded from.
    #[serde(skip)]
    pub source: Source,
    /// The registration's directory name under the filesystem it was
    /// loaded from (e.g. `"research"` for `workflows/research/template.yaml`).
    /// Template resolution re-reads from this directory, on the same
    /// filesystem, so shadowing a built-in with a user registration
    /// also re-roots its template files (`spec.md` §4.6).
    #[serde(default)]
    pub registration_dir: String,
    /// The DAG of nodes.
    pub dag: Dag,
}

impl Default for Source {
    fn default() -> Self {
        Source::BuiltIn
    }
}

impl WorkflowRegistration {
    /// `namespace::key` pair, used as the shadowing key.
    pub fn namespace_key(&self) -> (String, String) {
        (self.namespace.clone(), self.key.clone())
    }

    /// True iff any node carries a non-empty assignee (an orchestration
    /// workflow, which requires `instructions`).
    pub fn is_orchestration(&self) -> bool {
        self.dag
            .nodes
            .iter()
            .any(|n| n.assignee.as_deref().is_some_and(|a| !a.is_empty()))
    }
}

/// Rendering context passed to template rendering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderContext {
    /// Feature/branch slug. Required (`ErrSlugRequired` if empty).
    pub slug: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// ISO-8601 date string.
    #[serde(default)]
    pub date: String,
    /// User-supplied argument values.
    #[serde(default)]
    pub args: HashMap<String, String>,
    /// Computed input artifact paths, keyed by artifact key.
    #[serde(default)]
    pub inputs: HashMap<String, String>,
    /// Computed output artifact paths, keyed by artifact key.
    #[serde(default)]
    pub outputs: HashMap<String, String>,
}
