use perles_types::{Phase, Process, ProcessId, Role, Status, TaskAssignment, TaskId, TaskStatus};

#[test]
fn coordinator_and_worker_active_iff_ready_or_working() {
    let coordinator = Process::new(ProcessId::new("coordinator"), Role::Coordinator, 0);
    assert!(!coordinator.is_active()); // starts Pending

    let mut worker = Process::new(ProcessId::new("worker-1"), Role::Worker, 0);
    worker.status = Status::Ready;
    assert!(worker.is_active());
    worker.status = Status::Working;
    assert!(worker.is_active());
    worker.status = Status::Paused;
    assert!(!worker.is_active());
}

#[test]
fn retired_and_failed_are_terminal() {
    let mut worker = Process::new(ProcessId::new("worker-1"), Role::Worker, 0);
    worker.status = Status::Retired;
    assert!(worker.is_terminal());
    worker.status = Status::Failed;
    assert!(worker.is_terminal());
    worker.status = Status::Ready;
    assert!(!worker.is_terminal());
}

#[test]
fn dormant_process_starts_ready_with_saved_session() {
    let p = Process::new_dormant(
        ProcessId::new("worker-2"),
        Role::Worker,
        "sess-C".into(),
        0,
    );
    assert_eq!(p.status, Status::Ready);
    assert_eq!(p.session_id.unwrap().as_str(), "sess-C");
}

#[test]
fn ready_worker_requires_idle_or_absent_phase() {
    let mut worker = Process::new(ProcessId::new("worker-1"), Role::Worker, 0);
    worker.status = Status::Ready;
    worker.phase = Some(Phase::Idle);
    assert!(worker.is_ready_worker());
    worker.phase = Some(Phase::Implementing);
    assert!(!worker.is_ready_worker());
}

#[test]
fn task_reviewer_invariant_holds_only_when_required() {
    let mut task = TaskAssignment::new(TaskId::new("T-1"), ProcessId::new("worker-1"), 0);
    assert!(task.satisfies_reviewer_invariant()); // Implementing: no reviewer needed

    task.status = TaskStatus::InReview;
    assert!(!task.satisfies_reviewer_invariant());

    task.reviewer = Some(ProcessId::new("worker-2"));
    assert!(task.satisfies_reviewer_invariant());
}

#[test]
fn task_involves_implementer_and_reviewer_but_no_one_else() {
    let mut task = TaskAssignment::new(TaskId::new("T-1"), ProcessId::new("worker-1"), 0);
    task.reviewer = Some(ProcessId::new("worker-2"));

    assert!(task.involves(&ProcessId::new("worker-1")));
    assert!(task.involves(&ProcessId::new("worker-2")));
    assert!(!task.involves(&ProcessId::new("worker-3")));
}
