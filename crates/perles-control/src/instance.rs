//! Workflow instance bookkeeping (`spec.md` §6.1).

use std::collections::HashMap;

use perles_types::{ProcessId, WorkflowId};
use serde::{Deserialize, Serialize};

/// Request to create a new workflow instance.
#[derive(Debug, Clone)]
pub struct WorkflowSpec {
    /// `workflow::<key>` registration key to instantiate.
    pub key: String,
    /// Feature/branch slug, threaded into the render context.
    pub slug: String,
    /// User-supplied argument values.
    pub args: HashMap<String, String>,
}

/// Lifecycle status of a created workflow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// Created but not yet started.
    Created,
    /// Started; work is in progress.
    Running,
    /// Stopped by request.
    Stopped,
    /// Stopped due to an unrecoverable error.
    Failed,
}

/// Options for [`crate::ControlPlane::stop`].
#[derive(Debug, Clone, Default)]
pub struct StopOptions {
    /// Human-readable reason, recorded on the instance.
    pub reason: String,
    /// Skip graceful draining and stop immediately.
    pub force: bool,
}

/// Health of a running workflow instance, as summarized from its
/// processes' statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum HealthStatus {
    /// No process backing this instance has failed.
    Healthy,
    /// At least one process failed but the instance overall continues.
    Degraded {
        /// Human-readable detail.
        detail: String,
    },
    /// The instance cannot make progress.
    Unhealthy {
        /// Human-readable detail.
        detail: String,
    },
}

/// A created workflow instance as the control plane tracks it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInstance {
    /// Unique instance id.
    pub id: WorkflowId,
    /// The registration key this instance was created from.
    pub key: String,
    /// Feature/branch slug.
    pub slug: String,
    /// Arguments the instance was created with.
    pub args: HashMap<String, String>,
    /// Rendered epic description (or the markdown fallback).
    pub description: String,
    /// Current lifecycle status.
    pub status: InstanceStatus,
    /// Epoch milliseconds this instance was created.
    pub created_at_ms: i64,
    /// Processes spawned on behalf of this instance (coordinator +
    /// one per distinct node assignee), in `Start` order.
    pub process_ids: Vec<ProcessId>,
    /// Reason recorded by the most recent `Stop` call, if any.
    pub stop_reason: Option<String>,
}

/// Filter applied by [`crate::ControlPlane::list`].
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Restrict to instances in this status, if given.
    pub status: Option<InstanceStatus>,
    /// Restrict to instances created from this registration key, if given.
    pub key: Option<String>,
}

impl ListFilter {
    /// True iff `instance` satisfies every set field of this filter.
    pub fn matches(&self, instance: &WorkflowInstance) -> bool {
        self.status.is_none_or(|s| s == instance.status) && self.key.as_deref().is_none_or(|k| k == instance.key)
    }
}

/// Render `args` into a fenced `# Arguments` markdown block
/// (`spec.md` §6.1: the fallback used when no registry service is
/// bound, or when a registration has no epic template).
pub fn format_arguments_markdown(args: &HashMap<String, String>) -> String {
    let mut keys: Vec<&String> = args.keys().collect();
    keys.sort();
    let mut out = String::from("# Arguments\n\n");
    for key in keys {
        out.push_str(&format!("- **{key}**: {}\n", args[key]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_arguments_as_sorted_fenced_block() {
        let mut args = HashMap::new();
        args.insert("priority".to_string(), "high".to_string());
        args.insert("area".to_string(), "backend".to_string());

        let rendered = format_arguments_markdown(&args);
        assert_eq!(rendered, "# Arguments\n\n- **area**: backend\n- **priority**: high\n");
    }

    #[test]
    fn list_filter_matches_on_every_set_field() {
        let instance = WorkflowInstance {
            id: WorkflowId::from("wf-1"),
            key: "feature".to_string(),
            slug: "x".to_string(),
            args: HashMap::new(),
            description: String::new(),
            status: InstanceStatus::Running,
            created_at_ms: 0,
            process_ids: vec![],
            stop_reason: None,
        };

        assert!(ListFilter::default().matches(&instance));
        assert!(ListFilter { status: Some(InstanceStatus::Running), ..Default::default() }.matches(&instance));
        assert!(!ListFilter { status: Some(InstanceStatus::Stopped), ..Default::default() }.matches(&instance));
        assert!(ListFilter { key: Some("feature".to_string()), ..Default::default() }.matches(&instance));
        assert!(!ListFilter { key: Some("other".to_string()), ..Default::default() }.matches(&instance));
    }
}
