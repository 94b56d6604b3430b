//! `perles` — a thin binary over [`perles_control::ControlPlane`], in
//! the style of the model codebase's `brain` binary: manual
//! `std::env::args()` parsing, no argument-parsing crate.
//!
//! Subcommands:
//! - `run`: create and start a workflow instance against a registry
//!   directory, drive its coordinator and worker processes to
//!   completion against [`perles_supervisor::MockSubprocess`], then
//!   print a JSON summary.
//! - `list-workflows`: print every registration visible after
//!   built-in + user shadowing.
//!
//! The real subprocess binaries and HTTP layer are out of scope
//! (`spec.md` §1); this binary exists to exercise the control plane
//! end to end.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use perles_control::{ControlPlane, ControlPlaneConfig, StopOptions, WorkflowSpec};
use perles_supervisor::{
    CommandSubmitter, ContentBlock, MockSubprocess, RunState, RunStatus, Supervisor, SubprocessEvent, Usage,
};
use perles_types::{coordinator_id, ProcessId, Role, SessionId, Source, WorkflowRegistration};
use perles_workflow::filesystem::{DirFilesystem, WorkflowFilesystem};
use perles_workflow::WorkflowRegistry;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors surfaced to `main`, printed to stderr with exit code 1.
#[non_exhaustive]
#[derive(Debug, Error)]
enum CliError {
    /// A command-line flag was missing, unknown, or malformed.
    #[error("usage error: {0}")]
    Usage(String),
    /// The workflow registry failed to load.
    #[error("registry error: {0}")]
    Registry(#[from] perles_types::WorkflowError),
    /// The control plane rejected a request.
    #[error("control plane error: {0}")]
    Control(#[from] perles_control::ControlError),
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("perles error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), CliError> {
    tracing_subscriber::fmt::try_init().ok();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        print_usage();
        return Ok(());
    }
    let command = args.remove(0);

    match command.as_str() {
        "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        "list-workflows" => cmd_list_workflows(args).await,
        "run" => cmd_run(args).await,
        other => Err(CliError::Usage(format!("unknown subcommand: {other}"))),
    }
}

fn print_usage() {
    println!(
        "perles run --slug SLUG [--key KEY] [--config PATH] [--arg KEY=VALUE]...\n\
perles list-workflows [--config PATH]"
    );
}

fn take_arg(flag: &str, remaining: &mut Vec<String>) -> Result<String, CliError> {
    if remaining.is_empty() {
        return Err(CliError::Usage(format!("missing value for {flag}")));
    }
    Ok(remaining.remove(0))
}

/// Build the layered registry a config describes: built-in, then the
/// user registry at `~/.perles/workflows` if present, then each of
/// `workflow_search_paths` in order — later entries shadow earlier
/// ones with the same `(namespace, key)` (`spec.md` §4.6, §8
/// property 8).
fn load_registry(config: &ControlPlaneConfig) -> Result<WorkflowRegistry, CliError> {
    let built_in: Arc<dyn WorkflowFilesystem> = Arc::new(DirFilesystem::built_in());
    let mut sources = vec![(built_in, Source::BuiltIn)];
    if let Some(user) = DirFilesystem::user() {
        sources.push((Arc::new(user), Source::User));
    }
    for path in &config.workflow_search_paths {
        sources.push((Arc::new(DirFilesystem::new(path.clone(), path.clone())), Source::User));
    }
    Ok(WorkflowRegistry::load_from(sources)?)
}

async fn cmd_list_workflows(args: Vec<String>) -> Result<(), CliError> {
    let mut config_path: Option<PathBuf> = None;
    let mut remaining = args;
    while let Some(flag) = remaining.first().cloned() {
        remaining.remove(0);
        match flag.as_str() {
            "--config" => config_path = Some(PathBuf::from(take_arg("--config", &mut remaining)?)),
            other => return Err(CliError::Usage(format!("unknown flag: {other}"))),
        }
    }

    let config = ControlPlaneConfig::load(config_path.as_deref());
    let registry = load_registry(&config)?;

    let mut rows: Vec<&WorkflowRegistration> = registry.all().map(|loaded| &loaded.registration).collect();
    rows.sort_by(|a, b| (a.namespace.as_str(), a.key.as_str()).cmp(&(b.namespace.as_str(), b.key.as_str())));
    for registration in rows {
        println!(
            "{}::{}::{} — {} ({} nodes)",
            registration.namespace,
            registration.key,
            registration.version,
            registration.name,
            registration.dag.nodes.len()
        );
    }
    Ok(())
}

async fn cmd_run(args: Vec<String>) -> Result<(), CliError> {
    let mut config_path: Option<PathBuf> = None;
    let mut key = "feature".to_string();
    let mut slug: Option<String> = None;
    let mut workflow_args: HashMap<String, String> = HashMap::new();

    let mut remaining = args;
    while let Some(flag) = remaining.first().cloned() {
        remaining.remove(0);
        match flag.as_str() {
            "--config" => config_path = Some(PathBuf::from(take_arg("--config", &mut remaining)?)),
            "--key" => key = take_arg("--key", &mut remaining)?,
            "--slug" => slug = Some(take_arg("--slug", &mut remaining)?),
            "--arg" => {
                let raw = take_arg("--arg", &mut remaining)?;
                let (k, v) = raw
                    .split_once('=')
                    .ok_or_else(|| CliError::Usage(format!("--arg must be KEY=VALUE, got {raw}")))?;
                workflow_args.insert(k.to_string(), v.to_string());
            }
            other => return Err(CliError::Usage(format!("unknown flag: {other}"))),
        }
    }
    let slug = slug.ok_or_else(|| CliError::Usage("--slug is required".to_string()))?;

    let config = ControlPlaneConfig::load(config_path.as_deref());
    let registry = load_registry(&config)?;
    let plane = ControlPlane::new(config.clone(), Some(Arc::new(registry)));

    let id = plane.create(WorkflowSpec { key, slug, args: workflow_args }).await?;
    plane.start(&id).await?;

    let instance = plane.get(&id).await?;
    for process_id in instance.process_ids.clone() {
        drive_mock_turn(&plane, process_id, config.output_buffer_capacity).await;
    }

    plane.stop(&id, StopOptions { reason: "run complete".to_string(), force: false }).await?;

    let (health, _found) = plane.get_health_status(&id).await;
    let instance = plane.get(&id).await?;
    let mut processes = Vec::new();
    for process_id in &instance.process_ids {
        if let Ok(process) = plane.processes().get(process_id).await {
            processes.push(process);
        }
    }

    let summary = serde_json::json!({
        "instance": instance,
        "health": health,
        "processes": processes,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).expect("JSON serialization of a plain data summary never fails")
    );
    Ok(())
}

/// Spawn a [`Supervisor`] over a [`MockSubprocess`], drive it through
/// one successful turn, and wait for its `ProcessTurnCompleteCommand`
/// to be queued before this function returns.
async fn drive_mock_turn(plane: &ControlPlane, process_id: ProcessId, buffer_capacity: usize) {
    let role = if process_id == coordinator_id() { Role::Coordinator } else { Role::Worker };
    let (mock, handle) = MockSubprocess::new(None, "/tmp/perles-run", 8);
    let submitter: Arc<dyn CommandSubmitter> = Arc::clone(plane.command_processor()) as Arc<dyn CommandSubmitter>;
    let supervisor = Supervisor::new(process_id, role, mock.clone(), submitter, Arc::clone(plane.events()), buffer_capacity);
    supervisor.start().await;

    let _ = handle.events_tx.send(SubprocessEvent::Init { session_id: SessionId::from("run-session") }).await;
    let _ = handle
        .events_tx
        .send(SubprocessEvent::Assistant {
            content: vec![ContentBlock::Text("done".to_string())],
            delta: false,
            error: None,
        })
        .await;
    let _ = handle
        .events_tx
        .send(SubprocessEvent::Result {
            usage: Some(Usage { tokens_used: 100, total_tokens: 100, output_tokens: 50 }),
            total_cost_usd: Some(Decimal::new(1, 2)),
            is_error_result: false,
            error: None,
        })
        .await;
    drop(handle.events_tx);
    drop(handle.errors_tx);
    mock.set_status(RunStatus::Completed);

    wait_for_turn_complete(&supervisor).await;
}

/// Poll until the supervisor's event loop has reached a terminal
/// state, i.e. its `ProcessTurnCompleteCommand` has been submitted
/// (mirrors the polling this crate's own tests use to avoid a race
/// between the loop's cancellation branch and its natural EOF path).
async fn wait_for_turn_complete(supervisor: &Supervisor) {
    for _ in 0..200 {
        match supervisor.run_state() {
            RunState::Completed | RunState::Failed | RunState::Cancelled => return,
            _ => tokio::time::sleep(std::time::Duration::from_millis(10)).await,
        }
    }
}
