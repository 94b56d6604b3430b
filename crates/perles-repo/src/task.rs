//! In-memory repository of [`TaskAssignment`] entities.

use std::collections::HashMap;

use perles_types::{ProcessId, RepoError, TaskAssignment, TaskId};
use tokio::sync::RwLock;

/// `TaskRepo` — one entry per active task, keyed by [`TaskId`].
pub struct TaskRepo {
    tasks: RwLock<HashMap<TaskId, TaskAssignment>>,
}

impl TaskRepo {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self { tasks: RwLock::new(HashMap::new()) }
    }

    /// Fetch a single task assignment by id.
    pub async fn get(&self, id: &TaskId) -> Result<TaskAssignment, RepoError> {
        self.tasks
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RepoError::TaskNotFound(id.to_string()))
    }

    /// Insert or overwrite a task assignment.
    pub async fn save(&self, task: TaskAssignment) {
        self.tasks.write().await.insert(task.task_id.clone(), task);
    }

    /// Every task where `process` is the implementer or the reviewer.
    pub async fn get_by_worker(&self, process: &ProcessId) -> Vec<TaskAssignment> {
        self.tasks
            .read()
            .await
            .values()
            .filter(|t| t.involves(process))
            .cloned()
            .collect()
    }

    /// Every task where `process` is specifically the implementer.
    pub async fn get_by_implementer(&self, process: &ProcessId) -> Vec<TaskAssignment> {
        self.tasks
            .read()
            .await
            .values()
            .filter(|t| &t.implementer == process)
            .cloned()
            .collect()
    }

    /// Every task assignment currently tracked.
    pub async fn all(&self) -> Vec<TaskAssignment> {
        self.tasks.read().await.values().cloned().collect()
    }

    /// Remove a task assignment. No-op if it was not present.
    pub async fn delete(&self, id: &TaskId) {
        self.tasks.write().await.remove(id);
    }
}

impl Default for TaskRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_missing_task_is_a_sentinel_error() {
        let repo = TaskRepo::new();
        let err = repo.get(&TaskId::from("t1")).await.unwrap_err();
        assert_eq!(err, RepoError::TaskNotFound("t1".to_string()));
    }

    #[tokio::test]
    async fn get_by_worker_matches_implementer_or_reviewer() {
        let repo = TaskRepo::new();
        let mut t = TaskAssignment::new(TaskId::from("t1"), ProcessId::from("w1"), 0);
        t.reviewer = Some(ProcessId::from("w2"));
        repo.save(t).await;

        assert_eq!(repo.get_by_worker(&ProcessId::from("w1")).await.len(), 1);
        assert_eq!(repo.get_by_worker(&ProcessId::from("w2")).await.len(), 1);
        assert_eq!(repo.get_by_worker(&ProcessId::from("w3")).await.len(), 0);
    }

    #[tokio::test]
    async fn get_by_implementer_excludes_reviewer_only_matches() {
        let repo = TaskRepo::new();
        let mut t = TaskAssignment::new(TaskId::from("t1"), ProcessId::from("w1"), 0);
        t.reviewer = Some(ProcessId::from("w2"));
        repo.save(t).await;

        assert_eq!(repo.get_by_implementer(&ProcessId::from("w2")).await.len(), 0);
    }

    #[tokio::test]
    async fn delete_is_a_no_op_for_unknown_id() {
        let repo = TaskRepo::new();
        repo.delete(&TaskId::from("ghost")).await;
        assert!(repo.all().await.is_empty());
    }

    #[tokio::test]
    async fn save_then_delete_removes_from_all() {
        let repo = TaskRepo::new();
        let t = TaskAssignment::new(TaskId::from("t1"), ProcessId::from("w1"), 0);
        repo.save(t).await;
        assert_eq!(repo.all().await.len(), 1);
        repo.delete(&TaskId::from("t1")).await;
        assert!(repo.all().await.is_empty());
    }
}
