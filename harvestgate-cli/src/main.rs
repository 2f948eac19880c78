// harvestgate-cli/src/main.rs
// ============================================================================
// Module: Harvestgate CLI Entry Point
// Description: Command dispatcher for submitting scrape Jobs, resolving
//              human interventions, and inspecting Runs.
// Purpose: A thin argument parser over `harvestgate_cli::{submission,
//          wiring}` and the collaborators they assemble.
// Dependencies: clap, harvestgate-core, harvestgate-config, tracing,
//               tracing-subscriber
// ============================================================================

//! ## Overview
//! Every subcommand loads configuration once (`--config`, defaulting per
//! `harvestgate_config::CONFIG_ENV_VAR` / `harvestgate.toml`), then either
//! opens the store directly (`show`) or assembles the full orchestrator
//! (`submit`, `resolve`). Because the broker is an in-process
//! `std::sync::mpsc` channel, `submit` and `resolve` each
//! drain their own queue to completion before exiting — there is no
//! separate long-running worker process in this CLI.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use harvestgate_broker::ChannelBroker;
use harvestgate_broker::ChannelBrokerError;
use harvestgate_cli::JobSubmission;
use harvestgate_cli::SubmissionError;
use harvestgate_cli::wiring;
use harvestgate_cli::wiring::CliOrchestrator;
use harvestgate_config::ConfigError;
use harvestgate_config::HarvestgateConfig;
use harvestgate_core::InterventionStatus;
use harvestgate_core::InterventionTask;
use harvestgate_core::Resolution;
use harvestgate_core::RuleCandidate;
use harvestgate_core::RuleCandidateKind;
use harvestgate_core::RunId;
use harvestgate_core::RunStatus;
use harvestgate_core::interfaces::Broker;
use harvestgate_core::interfaces::RunStore;
use harvestgate_core::interfaces::StoreError;
use harvestgate_core::orchestrator::OrchestratorError;
use harvestgate_store_sqlite::SqliteRunStore;
use harvestgate_store_sqlite::SqliteStoreError;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "harvestgate", arg_required_else_help = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Submit a Job from a JSON file and drive it to completion or pause.
    Submit(SubmitCommand),
    /// Resolve a Run's active intervention and resume it to completion.
    Resolve(ResolveCommand),
    /// Print a Run and its Records as JSON.
    Show(ShowCommand),
}

/// Arguments shared by every subcommand.
#[derive(Args, Debug)]
struct ConfigArg {
    /// Path to the TOML configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `submit`.
#[derive(Args, Debug)]
struct SubmitCommand {
    #[command(flatten)]
    config: ConfigArg,
    /// Path to a JSON Job submission file.
    #[arg(long, value_name = "PATH")]
    job: PathBuf,
}

/// Arguments for `resolve`.
#[derive(Args, Debug)]
struct ResolveCommand {
    #[command(flatten)]
    config: ConfigArg,
    /// The Run whose active intervention should be resolved.
    #[arg(long, value_name = "UUID")]
    run: uuid::Uuid,
    /// Path to a JSON file containing the `Resolution` to apply, tagged by
    /// `kind` (e.g. `{"kind": "captcha_solved"}`).
    #[arg(long, value_name = "PATH")]
    resolution: PathBuf,
}

/// Arguments for `show`.
#[derive(Args, Debug)]
struct ShowCommand {
    #[command(flatten)]
    config: ConfigArg,
    /// The Run to print.
    #[arg(long, value_name = "UUID")]
    run: uuid::Uuid,
    /// Also print the Run's persisted Records.
    #[arg(long)]
    records: bool,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors surfaced at the CLI boundary.
#[derive(Debug, Error)]
enum CliError {
    /// Configuration failed to load or validate.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// A collaborator could not be assembled.
    #[error("wiring error: {0}")]
    Wiring(#[from] wiring::WiringError),
    /// The repository failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// The `SQLite`-backed store failed while opened directly (not through
    /// the orchestrator's wiring).
    #[error("store error: {0}")]
    SqliteStore(#[from] SqliteStoreError),
    /// The orchestrator failed.
    #[error("orchestrator error: {0}")]
    Orchestrator(#[from] OrchestratorError),
    /// A Job submission file was malformed.
    #[error("job submission error: {0}")]
    Submission(#[from] SubmissionError),
    /// The broker's receiver was already taken (should not happen: each
    /// subcommand assembles its own broker).
    #[error("broker error: {0}")]
    Broker(#[from] ChannelBrokerError),
    /// A file argument could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// A JSON file argument was malformed.
    #[error("failed to parse {path} as JSON: {source}")]
    Json {
        /// The path that could not be parsed.
        path: PathBuf,
        /// The underlying parse error.
        source: serde_json::Error,
    },
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    Output(std::io::Error),
    /// The Run named on the command line does not exist.
    #[error("run {0} not found")]
    RunNotFound(RunId),
    /// The Run named on the command line has no active intervention.
    #[error("run {0} has no active intervention")]
    NoActiveIntervention(RunId),
}

type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            ExitCode::FAILURE
        }
    }
}

/// Installs a `tracing-subscriber` formatter honoring `RUST_LOG`
/// (`logging.level`/`logging.format` configure the same behavior at
/// startup).
fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Dispatches the parsed CLI command.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Submit(command) => command_submit(&command),
        Commands::Resolve(command) => command_resolve(&command),
        Commands::Show(command) => command_show(&command),
    }
}

// ============================================================================
// SECTION: Submit
// ============================================================================

/// Executes `submit`: persists a Job, FieldMaps, and a fresh Run, enqueues
/// it, and drains the worker loop until the queue is empty.
fn command_submit(command: &SubmitCommand) -> CliResult<ExitCode> {
    let config = HarvestgateConfig::load(command.config.config.as_deref())?;
    let bytes = read_file(&command.job)?;
    let submission = JobSubmission::from_json(&bytes)?;
    let resolved = submission.resolve(config.orchestrator.default_max_attempts, time::OffsetDateTime::now_utc())?;

    let (orchestrator, broker, store) = wiring::build_orchestrator(&config)?;
    store.save_job(&resolved.job)?;
    for field_map in &resolved.field_maps {
        store.save_field_map(field_map)?;
    }
    store.save_run(&resolved.run)?;

    let run_id = resolved.run.id;
    broker.enqueue(run_id)?;
    drain_queue(&orchestrator, &broker)?;

    print_run(&store, run_id)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Resolve
// ============================================================================

/// Executes `resolve`: applies a human [`Resolution`] to a Run's active
/// intervention, resumes the Run, and drains the worker loop.
fn command_resolve(command: &ResolveCommand) -> CliResult<ExitCode> {
    let config = HarvestgateConfig::load(command.config.config.as_deref())?;
    let run_id = RunId::from_uuid(command.run);
    let bytes = read_file(&command.resolution)?;
    let resolution: Resolution = parse_json(&command.resolution, &bytes)?;

    let (orchestrator, broker, store) = wiring::build_orchestrator(&config)?;

    let mut task = store.load_active_intervention(run_id)?.ok_or(CliError::NoActiveIntervention(run_id))?;
    let now = time::OffsetDateTime::now_utc();
    apply_resolution(&store, &task, &resolution, now)?;
    task.resolve(resolution, now);
    store.save_intervention(&task)?;

    orchestrator.resume_from_intervention(run_id)?;
    drain_queue(&orchestrator, &broker)?;

    print_run(&store, run_id)?;
    Ok(ExitCode::SUCCESS)
}

/// Applies the side effect of a [`Resolution`] that isn't captured by
/// [`InterventionTask::resolve`] alone: a selector edit bumps the named
/// FieldMap, a confirmed field optionally promotes a normalization rule.
/// A session refresh has no store-level effect here — the CLI has no live
/// browser to hand the orchestrator's session pool; an operator captures
/// the refreshed session into the session pool's persistence directory out
/// of band.
fn apply_resolution(store: &SqliteRunStore, task: &InterventionTask, resolution: &Resolution, now: time::OffsetDateTime) -> CliResult<()> {
    match resolution {
        Resolution::SelectorEdited { new_selector } => {
            let run = store.load_run(task.run_id)?.ok_or(CliError::RunNotFound(task.run_id))?;
            let job = store.load_job(run.job_id)?.ok_or(CliError::RunNotFound(task.run_id))?;
            let field_name = task.payload.get("field_name").and_then(serde_json::Value::as_str).unwrap_or_default();
            let mut field_maps = store.load_field_maps(job.id)?;
            if let Some(field_map) = field_maps.iter_mut().find(|field_map| field_map.field_name == field_name) {
                field_map.bump_selector(new_selector.clone(), now);
                store.save_field_map(field_map)?;
            }
        }
        Resolution::FieldConfirmed { confirmed_value: _, promote_to_rule } => {
            if *promote_to_rule {
                let run = store.load_run(task.run_id)?.ok_or(CliError::RunNotFound(task.run_id))?;
                let field_name = task.payload.get("field_name").and_then(serde_json::Value::as_str).unwrap_or_default().to_string();
                let rule = RuleCandidate::new(run.job_id, field_name, RuleCandidateKind::FieldOptional, task.id, now);
                store.save_rule_candidate(&rule)?;
            }
        }
        Resolution::SessionRefreshed { .. } | Resolution::CaptchaSolved | Resolution::ManualAccessGranted | Resolution::Declined { .. } => {}
    }
    Ok(())
}

// ============================================================================
// SECTION: Show
// ============================================================================

/// Executes `show`: prints a Run (and optionally its Records) as JSON.
fn command_show(command: &ShowCommand) -> CliResult<ExitCode> {
    let config = HarvestgateConfig::load(command.config.config.as_deref())?;
    let store = wiring::open_store(&config)?;
    let run_id = RunId::from_uuid(command.run);
    let run = store.load_run(run_id)?.ok_or(CliError::RunNotFound(run_id))?;

    if command.records {
        let records = store.load_records(run_id)?;
        write_stdout_line(&serde_json::json!({ "run": run, "records": records }).to_string())?;
    } else {
        let rendered = serde_json::to_string_pretty(&run).unwrap_or_else(|_| "{}".to_string());
        write_stdout_line(&rendered)?;
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Drains a broker's receiver, calling `execute_run` for every queued Run
/// until the channel is empty. Does not block waiting for more work —
/// `waiting_for_human` pauses end the drain for that Run.
fn drain_queue(orchestrator: &CliOrchestrator, broker: &ChannelBroker) -> CliResult<()> {
    let receiver = broker.receiver()?;
    while let Ok(run_id) = receiver.try_recv() {
        orchestrator.execute_run(run_id)?;
    }
    Ok(())
}

/// Prints a Run's terminal or paused state to stdout as one JSON line.
fn print_run(store: &SqliteRunStore, run_id: RunId) -> CliResult<()> {
    let run = store.load_run(run_id)?.ok_or(CliError::RunNotFound(run_id))?;
    let awaiting_human = if run.status == RunStatus::WaitingForHuman {
        store.load_active_intervention(run_id)?.map(|task| matches!(task.status, InterventionStatus::Pending | InterventionStatus::InProgress))
    } else {
        None
    };
    let summary = serde_json::json!({
        "run_id": run.id.to_string(),
        "status": run.status,
        "resolved_engine": run.resolved_engine,
        "attempt_count": run.attempt_count,
        "failure_kind": run.failure_kind,
        "awaiting_human": awaiting_human,
    });
    write_stdout_line(&summary.to_string())
}

/// Reads a file argument, wrapping I/O errors with the offending path.
fn read_file(path: &Path) -> CliResult<Vec<u8>> {
    fs::read(path).map_err(|source| CliError::Io { path: path.to_path_buf(), source })
}

/// Parses a file's bytes as JSON, wrapping parse errors with the offending
/// path.
fn parse_json<T: serde::de::DeserializeOwned>(path: &Path, bytes: &[u8]) -> CliResult<T> {
    serde_json::from_slice(bytes).map_err(|source| CliError::Json { path: path.to_path_buf(), source })
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    writeln!(&mut std::io::stdout(), "{message}").map_err(CliError::Output)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "test-only helper, panics are acceptable")]
    #![allow(clippy::expect_used, reason = "test-only helper, panics are acceptable")]
    #![allow(clippy::panic, reason = "let-else panic branches are the clearest way to assert an enum variant in a test")]

    use clap::Parser as _;

    use super::Cli;
    use super::Commands;

    #[test]
    fn submit_parses_config_and_job_paths() {
        let cli = Cli::try_parse_from(["harvestgate", "submit", "--job", "job.json", "--config", "harvestgate.toml"]).expect("parses");
        let Commands::Submit(command) = cli.command else { panic!("expected Submit") };
        assert_eq!(command.job.to_str(), Some("job.json"));
        assert_eq!(command.config.config.as_deref().and_then(|path| path.to_str()), Some("harvestgate.toml"));
    }

    #[test]
    fn resolve_requires_run_and_resolution() {
        let result = Cli::try_parse_from(["harvestgate", "resolve", "--run", "not-a-uuid", "--resolution", "r.json"]);
        assert!(result.is_err());
    }

    #[test]
    fn resolve_parses_a_valid_uuid() {
        let cli = Cli::try_parse_from(["harvestgate", "resolve", "--run", "00000000-0000-0000-0000-000000000001", "--resolution", "r.json"]).expect("parses");
        let Commands::Resolve(command) = cli.command else { panic!("expected Resolve") };
        assert_eq!(command.run.to_string(), "00000000-0000-0000-0000-000000000001");
    }

    #[test]
    fn show_defaults_records_flag_to_false() {
        let cli = Cli::try_parse_from(["harvestgate", "show", "--run", "00000000-0000-0000-0000-000000000001"]).expect("parses");
        let Commands::Show(command) = cli.command else { panic!("expected Show") };
        assert!(!command.records);
    }
}
