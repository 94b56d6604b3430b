//! The control-plane facade (`spec.md` §6.1): creates, starts, stops,
//! and lists workflow instances, and fronts an HTTP layer this crate
//! does not implement.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use perles_broker::Broker;
use perles_command::{CommandProcessor, SpawnProcessCommand, StopProcessCommand};
use perles_handlers::HandlerContext;
use perles_repo::{MessageRepo, ProcessRepo, QueueRepo, TaskRepo};
use perles_types::{coordinator_id, now_ms, ProcessEvent, ProcessId, RenderContext, Role, Status, WorkflowId};
use perles_workflow::WorkflowRegistry;
use tokio::sync::RwLock;

use crate::config::ControlPlaneConfig;
use crate::error::ControlError;
use crate::instance::{format_arguments_markdown, HealthStatus, InstanceStatus, ListFilter, StopOptions, WorkflowInstance, WorkflowSpec};

/// The registration namespace every workflow instance is created under.
const WORKFLOW_NAMESPACE: &str = "workflow";

/// Creates/starts/stops/lists [`WorkflowInstance`]s over the shared
/// repository + command-processor stack (`spec.md` §6.1).
pub struct ControlPlane {
    config: ControlPlaneConfig,
    registry: Option<Arc<WorkflowRegistry>>,
    command_processor: Arc<CommandProcessor>,
    processes: Arc<ProcessRepo>,
    events: Arc<Broker<ProcessEvent>>,
    instances: RwLock<HashMap<WorkflowId, WorkflowInstance>>,
    next_id: AtomicU64,
}

impl ControlPlane {
    /// Build a control plane over a fresh set of repositories, a
    /// freshly spawned command processor, and the given (optional)
    /// workflow registry.
    ///
    /// `registry` is `None` when no registry service is bound, in
    /// which case `Create` always falls back to the `# Arguments`
    /// markdown rendering (`spec.md` §6.1).
    pub fn new(config: ControlPlaneConfig, registry: Option<Arc<WorkflowRegistry>>) -> Self {
        let processes = Arc::new(ProcessRepo::new());
        let tasks = Arc::new(TaskRepo::new());
        let queues = Arc::new(QueueRepo::new(config.queue_max_size));
        let messages = Arc::new(MessageRepo::new(config.broker_channel_capacity));
        let events = Arc::new(Broker::new(config.broker_channel_capacity));

        let ctx = HandlerContext {
            processes: Arc::clone(&processes),
            tasks,
            queues,
            messages,
            events: Arc::clone(&events),
        };
        let command_processor = Arc::new(CommandProcessor::spawn(perles_handlers::build_registry(ctx)));

        Self {
            config,
            registry,
            command_processor,
            processes,
            events,
            instances: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// The process-event broker backing this control plane, for a
    /// caller (e.g. a TUI attach point) to subscribe to.
    pub fn events(&self) -> &Arc<Broker<ProcessEvent>> {
        &self.events
    }

    /// Process repository backing this control plane.
    pub fn processes(&self) -> &Arc<ProcessRepo> {
        &self.processes
    }

    /// The command processor every command in this control plane's
    /// lifecycle is submitted through.
    pub fn command_processor(&self) -> &Arc<CommandProcessor> {
        &self.command_processor
    }

    fn alloc_id(&self) -> WorkflowId {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        WorkflowId::from(format!("wf-{n}"))
    }

    /// `Create(WorkflowSpec) -> WorkflowID | error` (`spec.md` §6.1).
    pub async fn create(&self, spec: WorkflowSpec) -> Result<WorkflowId, ControlError> {
        if spec.slug.is_empty() {
            return Err(ControlError::InvalidInput("slug must not be empty".to_string()));
        }

        let description = match &self.registry {
            Some(registry) => {
                let loaded = registry.get_by_key(WORKFLOW_NAMESPACE, &spec.key).ok_or_else(|| {
                    ControlError::InvalidInput(format!("unknown workflow key: {}", spec.key))
                })?;
                let ctx = RenderContext {
                    slug: spec.slug.clone(),
                    name: loaded.registration.name.clone(),
                    date: String::new(),
                    args: spec.args.clone(),
                    inputs: HashMap::new(),
                    outputs: HashMap::new(),
                };
                match perles_workflow::render_epic_template(registry, WORKFLOW_NAMESPACE, &spec.key, &ctx) {
                    Ok(rendered) if !rendered.is_empty() => rendered,
                    _ => format_arguments_markdown(&spec.args),
                }
            }
            None => format_arguments_markdown(&spec.args),
        };

        let id = self.alloc_id();
        let instance = WorkflowInstance {
            id: id.clone(),
            key: spec.key,
            slug: spec.slug,
            args: spec.args,
            description,
            status: InstanceStatus::Created,
            created_at_ms: now_ms(),
            process_ids: Vec::new(),
            stop_reason: None,
        };
        self.instances.write().await.insert(id.clone(), instance);
        Ok(id)
    }

    /// `Get(WorkflowID) -> WorkflowInstance | ErrWorkflowNotFound`.
    pub async fn get(&self, id: &WorkflowId) -> Result<WorkflowInstance, ControlError> {
        self.instances
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ControlError::WorkflowNotFound(id.clone()))
    }

    /// `Start(WorkflowID) -> error` (`spec.md` §6.1).
    ///
    /// Spawns a coordinator process plus one worker process per
    /// distinct node `assignee` named by the instance's registration
    /// (if a registry is bound), via [`SpawnProcessCommand`].
    pub async fn start(&self, id: &WorkflowId) -> Result<(), ControlError> {
        let mut instances = self.instances.write().await;
        let instance = instances.get_mut(id).ok_or_else(|| ControlError::WorkflowNotFound(id.clone()))?;
        if instance.status != InstanceStatus::Created {
            return Err(ControlError::InvalidTransition(format!(
                "cannot start an instance in status {:?}",
                instance.status
            )));
        }

        let mut process_ids = vec![coordinator_id()];
        self.command_processor.submit(SpawnProcessCommand { process_id: coordinator_id(), role: Role::Coordinator });

        if let Some(registry) = &self.registry {
            if let Some(loaded) = registry.get_by_key(WORKFLOW_NAMESPACE, &instance.key) {
                let mut seen = HashSet::new();
                for node in &loaded.registration.dag.nodes {
                    if let Some(assignee) = &node.assignee {
                        if seen.insert(assignee.clone()) {
                            let process_id = ProcessId::from(assignee.as_str());
                            self.command_processor
                                .submit(SpawnProcessCommand { process_id: process_id.clone(), role: Role::Worker });
                            process_ids.push(process_id);
                        }
                    }
                }
            }
        }

        instance.process_ids = process_ids;
        instance.status = InstanceStatus::Running;
        Ok(())
    }

    /// `Stop(WorkflowID, StopOptions) -> error` (`spec.md` §6.1).
    pub async fn stop(&self, id: &WorkflowId, options: StopOptions) -> Result<(), ControlError> {
        let mut instances = self.instances.write().await;
        let instance = instances.get_mut(id).ok_or_else(|| ControlError::WorkflowNotFound(id.clone()))?;
        if matches!(instance.status, InstanceStatus::Stopped | InstanceStatus::Failed) {
            return Ok(());
        }

        for process_id in &instance.process_ids {
            self.command_processor.submit(StopProcessCommand { process_id: process_id.clone() });
        }
        instance.status = InstanceStatus::Stopped;
        instance.stop_reason = Some(options.reason);
        Ok(())
    }

    /// `List(filter) -> []WorkflowInstance`.
    pub async fn list(&self, filter: ListFilter) -> Vec<WorkflowInstance> {
        self.instances.read().await.values().filter(|i| filter.matches(i)).cloned().collect()
    }

    /// `GetHealthStatus(WorkflowID) -> (HealthStatus, found)`.
    ///
    /// Summarizes the statuses of the instance's spawned processes:
    /// healthy if none have failed, degraded if some have, unhealthy
    /// if every spawned process has failed.
    pub async fn get_health_status(&self, id: &WorkflowId) -> (HealthStatus, bool) {
        let Ok(instance) = self.get(id).await else {
            return (HealthStatus::Unhealthy { detail: "workflow instance not found".to_string() }, false);
        };

        if instance.process_ids.is_empty() {
            return (HealthStatus::Healthy, true);
        }

        let mut failed = 0;
        for process_id in &instance.process_ids {
            if let Ok(process) = self.processes.get(process_id).await {
                if process.status == Status::Failed {
                    failed += 1;
                }
            }
        }

        let status = if failed == 0 {
            HealthStatus::Healthy
        } else if failed < instance.process_ids.len() {
            HealthStatus::Degraded { detail: format!("{failed}/{} processes failed", instance.process_ids.len()) }
        } else {
            HealthStatus::Unhealthy { detail: "every spawned process failed".to_string() }
        };
        (status, true)
    }

    /// The configuration this control plane was built with.
    pub fn config(&self) -> &ControlPlaneConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane() -> ControlPlane {
        ControlPlane::new(ControlPlaneConfig::default(), None)
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let plane = plane();
        let id = plane
            .create(WorkflowSpec { key: "feature".to_string(), slug: "widget".to_string(), args: HashMap::new() })
            .await
            .unwrap();

        let instance = plane.get(&id).await.unwrap();
        assert_eq!(instance.slug, "widget");
        assert_eq!(instance.status, InstanceStatus::Created);
    }

    #[tokio::test]
    async fn create_requires_a_non_empty_slug() {
        let plane = plane();
        let err = plane
            .create(WorkflowSpec { key: "feature".to_string(), slug: String::new(), args: HashMap::new() })
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn get_missing_instance_is_not_found() {
        let plane = plane();
        let err = plane.get(&WorkflowId::from("ghost")).await.unwrap_err();
        assert!(matches!(err, ControlError::WorkflowNotFound(_)));
    }

    #[tokio::test]
    async fn start_without_registry_spawns_only_the_coordinator() {
        let plane = plane();
        let id = plane
            .create(WorkflowSpec { key: "feature".to_string(), slug: "widget".to_string(), args: HashMap::new() })
            .await
            .unwrap();

        plane.start(&id).await.unwrap();
        let instance = plane.get(&id).await.unwrap();
        assert_eq!(instance.status, InstanceStatus::Running);
        assert_eq!(instance.process_ids, vec![coordinator_id()]);
    }

    #[tokio::test]
    async fn starting_twice_is_an_invalid_transition() {
        let plane = plane();
        let id = plane
            .create(WorkflowSpec { key: "feature".to_string(), slug: "widget".to_string(), args: HashMap::new() })
            .await
            .unwrap();
        plane.start(&id).await.unwrap();

        let err = plane.start(&id).await.unwrap_err();
        assert!(matches!(err, ControlError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let plane = plane();
        let id = plane
            .create(WorkflowSpec { key: "feature".to_string(), slug: "widget".to_string(), args: HashMap::new() })
            .await
            .unwrap();
        plane.start(&id).await.unwrap();

        plane.stop(&id, StopOptions { reason: "done".to_string(), force: false }).await.unwrap();
        plane.stop(&id, StopOptions { reason: "done again".to_string(), force: false }).await.unwrap();

        let instance = plane.get(&id).await.unwrap();
        assert_eq!(instance.status, InstanceStatus::Stopped);
    }

    #[tokio::test]
    async fn list_filters_by_key_and_status() {
        let plane = plane();
        let a = plane
            .create(WorkflowSpec { key: "feature".to_string(), slug: "a".to_string(), args: HashMap::new() })
            .await
            .unwrap();
        let _b = plane
            .create(WorkflowSpec { key: "other".to_string(), slug: "b".to_string(), args: HashMap::new() })
            .await
            .unwrap();
        plane.start(&a).await.unwrap();

        let running = plane.list(ListFilter { status: Some(InstanceStatus::Running), ..Default::default() }).await;
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].slug, "a");

        let by_key = plane.list(ListFilter { key: Some("other".to_string()), ..Default::default() }).await;
        assert_eq!(by_key.len(), 1);
        assert_eq!(by_key[0].slug, "b");
    }

    #[tokio::test]
    async fn health_status_for_missing_instance_reports_not_found() {
        let plane = plane();
        let (status, found) = plane.get_health_status(&WorkflowId::from("ghost")).await;
        assert!(!found);
        assert!(matches!(status, HealthStatus::Unhealthy { .. }));
    }

    #[tokio::test]
    async fn health_status_is_healthy_with_no_failed_processes() {
        let plane = plane();
        let id = plane
            .create(WorkflowSpec { key: "feature".to_string(), slug: "widget".to_string(), args: HashMap::new() })
            .await
            .unwrap();
        plane.start(&id).await.unwrap();

        // Allow the command processor to apply the spawn before checking.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let (status, found) = plane.get_health_status(&id).await;
        assert!(found);
        assert_eq!(status, HealthStatus::Healthy);
    }
}
