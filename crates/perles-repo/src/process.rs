//! In-memory repository of [`Process`] entities.

use std::collections::HashMap;

use perles_types::{Phase, Process, ProcessId, RepoError, Role, Status};
use tokio::sync::RwLock;

/// `ProcessRepo` — one entry per known process, keyed by [`ProcessId`].
///
/// Every read method returns owned copies (`Process: Clone`) so callers
/// can never mutate shared state except through [`ProcessRepo::save`].
pub struct ProcessRepo {
    processes: RwLock<HashMap<ProcessId, Process>>,
}

impl ProcessRepo {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self { processes: RwLock::new(HashMap::new()) }
    }

    /// Fetch a single process by id.
    pub async fn get(&self, id: &ProcessId) -> Result<Process, RepoError> {
        self.processes
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RepoError::ProcessNotFound(id.to_string()))
    }

    /// Insert or overwrite a process.
    pub async fn save(&self, process: Process) {
        self.processes.write().await.insert(process.id.clone(), process);
    }

    /// Every known process.
    pub async fn list(&self) -> Vec<Process> {
        self.processes.read().await.values().cloned().collect()
    }

    /// The single coordinator process, if one has been registered.
    pub async fn get_coordinator(&self) -> Option<Process> {
        self.processes
            .read()
            .await
            .values()
            .find(|p| p.role == Role::Coordinator)
            .cloned()
    }

    /// All processes with [`Role::Worker`].
    pub async fn workers(&self) -> Vec<Process> {
        self.processes
            .read()
            .await
            .values()
            .filter(|p| p.role == Role::Worker)
            .cloned()
            .collect()
    }

    /// Workers that are not in a terminal status.
    pub async fn active_workers(&self) -> Vec<Process> {
        self.processes
            .read()
            .await
            .values()
            .filter(|p| p.role == Role::Worker && !p.is_terminal())
            .cloned()
            .collect()
    }

    /// Workers that are `Ready` with `Phase ∈ {None, Some(Idle)}` — the
    /// set eligible for new task assignment.
    pub async fn ready_workers(&self) -> Vec<Process> {
        self.processes
            .read()
            .await
            .values()
            .filter(|p| {
                p.role == Role::Worker
                    && p.status == Status::Ready
                    && matches!(p.phase, None | Some(Phase::Idle))
            })
            .cloned()
            .collect()
    }

    /// Workers that have been retired or have failed.
    pub async fn retired_workers(&self) -> Vec<Process> {
        self.processes
            .read()
            .await
            .values()
            .filter(|p| {
                p.role == Role::Worker && matches!(p.status, Status::Retired | Status::Failed)
            })
            .cloned()
            .collect()
    }
}

impl Default for ProcessRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(id: &str, status: Status, phase: Option<Phase>) -> Process {
        let mut p = Process::new(ProcessId::from(id), Role::Worker, 0);
        p.status = status;
        p.phase = phase;
        p
    }

    #[tokio::test]
    async fn get_missing_process_is_a_sentinel_error() {
        let repo = ProcessRepo::new();
        let err = repo.get(&ProcessId::from("nope")).await.unwrap_err();
        assert_eq!(err, RepoError::ProcessNotFound("nope".to_string()));
    }

    #[tokio::test]
    async fn read_methods_return_copies_not_references() {
        let repo = ProcessRepo::new();
        repo.save(worker("w1", Status::Ready, Some(Phase::Idle))).await;

        let mut copy = repo.get(&ProcessId::from("w1")).await.unwrap();
        copy.status = Status::Failed;

        let fresh = repo.get(&ProcessId::from("w1")).await.unwrap();
        assert_eq!(fresh.status, Status::Ready);
    }

    #[tokio::test]
    async fn ready_workers_requires_idle_or_absent_phase() {
        let repo = ProcessRepo::new();
        repo.save(worker("w1", Status::Ready, Some(Phase::Idle))).await;
        repo.save(worker("w2", Status::Ready, Some(Phase::Implementing))).await;
        repo.save(worker("w3", Status::Working, Some(Phase::Idle))).await;

        let ready = repo.ready_workers().await;
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id, ProcessId::from("w1"));
    }

    #[tokio::test]
    async fn retired_workers_matches_retired_or_failed() {
        let repo = ProcessRepo::new();
        repo.save(worker("w1", Status::Retired, None)).await;
        repo.save(worker("w2", Status::Failed, None)).await;
        repo.save(worker("w3", Status::Ready, Some(Phase::Idle))).await;

        let retired = repo.retired_workers().await;
        assert_eq!(retired.len(), 2);
    }

    #[tokio::test]
    async fn active_workers_excludes_terminal_statuses() {
        let repo = ProcessRepo::new();
        repo.save(worker("w1", Status::Working, Some(Phase::Implementing))).await;
        repo.save(worker("w2", Status::Retired, None)).await;

        let active = repo.active_workers().await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, ProcessId::from("w1"));
    }

    #[tokio::test]
    async fn get_coordinator_ignores_workers() {
        let repo = ProcessRepo::new();
        repo.save(worker("w1", Status::Ready, Some(Phase::Idle))).await;
        repo.save(Process::new(perles_types::coordinator_id(), Role::Coordinator, 0)).await;

        let coordinator = repo.get_coordinator().await.unwrap();
        assert_eq!(coordinator.id, perles_types::coordinator_id());
    }
}
