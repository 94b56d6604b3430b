//! `WorkflowCreator.CreateWithArgs` (`spec.md` §4.6) — turns a
//! registration into a created epic + child tasks against an external
//! issue-tracker executor.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use perles_types::{RenderContext, WorkflowError};

use crate::registry::WorkflowRegistry;
use crate::render::render_epic_template;

/// Opaque external id for a created issue (epic or task).
pub type IssueId = String;

/// The issue-tracker executor this crate treats as an opaque
/// collaborator (`spec.md` §1: "Task store backend... treated as an
/// opaque executor behind an interface").
#[async_trait]
pub trait IssueExecutor: Send + Sync {
    /// Create the top-level epic issue, returning its id.
    async fn create_epic(&self, name: &str, description: &str) -> Result<IssueId, String>;

    /// Create a child task under `epic`, optionally assigned.
    async fn create_task(
        &self,
        epic: &IssueId,
        name: &str,
        body: &str,
        assignee: Option<&str>,
    ) -> Result<IssueId, String>;

    /// Add a dependency edge: `dependent` depends on `dependency`.
    async fn add_dependency(&self, dependent: &IssueId, dependency: &IssueId) -> Result<(), String>;
}

/// A fallback description used when a registration has no epic
/// template (`spec.md` §4.6 step 2: "render epic description (or
/// fallback to a stock string)").
fn stock_description(name: &str, slug: &str) -> String {
    format!("# {name}\n\nFeature: {slug}")
}

/// The result of a (possibly partial) `CreateWithArgs` call.
#[derive(Debug, Clone)]
pub struct CreatedWorkflow {
    /// The created epic's id.
    pub epic: IssueId,
    /// Created task ids, keyed by the DAG node key that produced them.
    /// Populated in DAG node order even on partial failure, so the
    /// caller can see exactly what was created before the error
    /// (`spec.md` §4.6 Partial-failure semantics).
    pub tasks: HashMap<String, IssueId>,
}

/// Drives [`IssueExecutor`] to materialize a workflow registration as
/// an epic + child tasks.
pub struct WorkflowCreator {
    registry: Arc<WorkflowRegistry>,
    executor: Arc<dyn IssueExecutor>,
}

impl WorkflowCreator {
    /// Build a creator over the given registry and issue executor.
    pub fn new(registry: Arc<WorkflowRegistry>, executor: Arc<dyn IssueExecutor>) -> Self {
        Self { registry, executor }
    }

    /// `CreateWithArgs(feature, workflowKey, args)` — `spec.md` §4.6.
    ///
    /// Any executor error short-circuits and returns it; entities
    /// already created are **not** rolled back (caller responsibility,
    /// `spec.md` §9 Open Question). The partially built
    /// [`CreatedWorkflow`] is returned alongside the error so the
    /// caller can see what exists.
    pub async fn create_with_args(
        &self,
        feature_slug: &str,
        workflow_key: &str,
        args: HashMap<String, String>,
    ) -> Result<CreatedWorkflow, (WorkflowError, CreatedWorkflow)> {
        let namespace = "workflow";
        let loaded = self.registry.get_by_key(namespace, workflow_key).ok_or_else(|| {
            (
                WorkflowError::NotFound(format!("{namespace}::{workflow_key}")),
                CreatedWorkflow { epic: String::new(), tasks: HashMap::new() },
            )
        })?;
        let registration = loaded.registration.clone();

        let ctx = RenderContext {
            slug: feature_slug.to_string(),
            name: registration.name.clone(),
            date: String::new(),
            args,
            inputs: HashMap::new(),
            outputs: HashMap::new(),
        };

        let description = match render_epic_template(&self.registry, namespace, workflow_key, &ctx) {
            Ok(rendered) if !rendered.is_empty() => rendered,
            _ => stock_description(&registration.name, feature_slug),
        };

        let mut created = CreatedWorkflow { epic: String::new(), tasks: HashMap::new() };
        let epic = self
            .executor
            .create_epic(&registration.name, &description)
            .await
            .map_err(|e| (WorkflowError::Render(e), created.clone()))?;
        created.epic = epic.clone();

        for node in &registration.dag.nodes {
            let identifier = perles_types::Identifier::build(namespace, workflow_key, &registration.version, &node.key);
            let body = crate::render::render_template(&self.registry, &identifier, ctx.clone()).unwrap_or_default();

            let task_id = self
                .executor
                .create_task(&epic, &node.name, &body, node.assignee.as_deref())
                .await
                .map_err(|e| (WorkflowError::Render(e), created.clone()))?;
            created.tasks.insert(node.key.clone(), task_id);
        }

        for node in &registration.dag.nodes {
            let Some(dependent) = created.tasks.get(&node.key).cloned() else { continue };
            for predecessor in &node.after {
                let Some(dependency) = created.tasks.get(predecessor).cloned() else { continue };
                self.executor
                    .add_dependency(&dependent, &dependency)
                    .await
                    .map_err(|e| (WorkflowError::Render(e), created.clone()))?;
            }
        }

        Ok(created)
    }
}
