// mk10-cli/src/main.rs
// ============================================================================
// Module: MK10 CLI Entry Point
// Description: Command dispatcher for ingest, execute, promote, and verify.
// Purpose: Map operation outcomes onto stable exit codes.
// Dependencies: clap, mk10-cli, mk10-core, serde_json
// ============================================================================

//! ## Overview
//! The `mk10` binary is a thin dispatcher over the operations library. Exit
//! codes are part of the contract: 0 success, 1 user error, 2 verification or
//! policy failure, 3 internal error. The binary may read its environment for
//! paths, but it never injects wall-clock time or randomness into a run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use mk10_cli::ExecuteOutcome;
use mk10_cli::OpError;
use mk10_cli::PromoteOutcome;
use mk10_cli::ops::ExecuteArgs;
use mk10_cli::ops::PromoteArgs;
use mk10_core::MasterState;

// ============================================================================
// SECTION: Exit Codes
// ============================================================================

/// Exit code for user errors.
const EXIT_USER_ERROR: u8 = 1;
/// Exit code for verification or policy failures.
const EXIT_VERIFICATION_FAILURE: u8 = 2;
/// Exit code for internal errors.
const EXIT_INTERNAL_ERROR: u8 = 3;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "mk10", version, about = "MK10-PRO mastering evidence pipeline")]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest a source directory into a content-addressed manifest.
    Ingest(IngestCommand),
    /// Execute a plan against an ingest manifest and seal the bundle.
    Execute(ExecuteCommand),
    /// Promote a sealed bundle to the next lifecycle state.
    Promote(PromoteCommand),
    /// Verify a sealed bundle against a public rule file.
    Verify(VerifyCommand),
}

/// Arguments for the ingest command.
#[derive(Args, Debug)]
struct IngestCommand {
    /// Source directory to ingest.
    #[arg(long, value_name = "DIR")]
    source: PathBuf,
    /// Output path for the ingest manifest JSON.
    #[arg(long, value_name = "PATH", default_value = "ingest_manifest.json")]
    output: PathBuf,
}

/// Arguments for the execute command.
#[derive(Args, Debug)]
struct ExecuteCommand {
    /// Path to the plan JSON.
    #[arg(long, value_name = "PATH")]
    dag: PathBuf,
    /// Path to the ingest manifest JSON.
    #[arg(long, value_name = "PATH")]
    manifest: PathBuf,
    /// Directory the manifest's relative asset paths resolve against.
    #[arg(long, value_name = "DIR", default_value = ".")]
    asset_root: PathBuf,
    /// Workspace identifier.
    #[arg(long, value_name = "ID", default_value = "default")]
    workspace: String,
    /// Base time in unix milliseconds; derived from the plan when omitted.
    #[arg(long, value_name = "UNIX_MS")]
    base_time_unix_ms: Option<i64>,
    /// Format tags to validate; repeatable.
    #[arg(long = "format", value_name = "TAG")]
    formats: Vec<String>,
    /// Output path for the sealed bundle JSON.
    #[arg(long, value_name = "PATH", default_value = "bundle.json")]
    output: PathBuf,
}

/// Arguments for the promote command.
#[derive(Args, Debug)]
struct PromoteCommand {
    /// Path to the sealed bundle JSON.
    #[arg(long, value_name = "PATH")]
    bundle: PathBuf,
    /// Path to the declarative rule file.
    #[arg(long, value_name = "PATH")]
    rules: PathBuf,
    /// Desired lifecycle state.
    #[arg(long, value_enum, value_name = "STATE")]
    to: StateArg,
    /// Approver identity recorded on success.
    #[arg(long, value_name = "NAME")]
    approver: Option<String>,
    /// Archive declarer identity (required with --archive-location).
    #[arg(long, value_name = "NAME", requires = "archive_location")]
    archive_by: Option<String>,
    /// Archive location label (required with --archive-by).
    #[arg(long, value_name = "LOCATION", requires = "archive_by")]
    archive_location: Option<String>,
    /// Output path for the re-sealed bundle JSON.
    #[arg(long, value_name = "PATH")]
    output: PathBuf,
}

/// Arguments for the verify command.
#[derive(Args, Debug)]
struct VerifyCommand {
    /// Path to the sealed bundle JSON.
    #[arg(long, value_name = "PATH")]
    bundle: PathBuf,
    /// Path to the public rule file.
    #[arg(long, value_name = "PATH")]
    rules: PathBuf,
}

/// Lifecycle states addressable from the command line.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum StateArg {
    /// Work in progress.
    Draft,
    /// Evidence and validations exist.
    Candidate,
    /// All policy rules pass.
    Release,
    /// Declared archived.
    Archived,
}

impl From<StateArg> for MasterState {
    fn from(state: StateArg) -> Self {
        match state {
            StateArg::Draft => Self::Draft,
            StateArg::Candidate => Self::Candidate,
            StateArg::Release => Self::Release,
            StateArg::Archived => Self::Archived,
        }
    }
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(code) => code,
        Err(OpError::User(message)) => {
            eprintln!("error: {message}");
            ExitCode::from(EXIT_USER_ERROR)
        }
        Err(OpError::Internal(message)) => {
            eprintln!("internal error: {message}");
            ExitCode::from(EXIT_INTERNAL_ERROR)
        }
    }
}

/// Dispatches the selected subcommand.
fn run(command: Commands) -> Result<ExitCode, OpError> {
    match command {
        Commands::Ingest(command) => command_ingest(&command),
        Commands::Execute(command) => command_execute(&command),
        Commands::Promote(command) => command_promote(&command),
        Commands::Verify(command) => command_verify(&command),
    }
}

// ============================================================================
// SECTION: Command Handlers
// ============================================================================

/// Executes the ingest command.
fn command_ingest(command: &IngestCommand) -> Result<ExitCode, OpError> {
    let manifest = mk10_cli::ingest_directory(&command.source, &command.output)?;
    println!("ingested {} assets into {}", manifest.len(), command.output.display());
    Ok(ExitCode::SUCCESS)
}

/// Executes the execute command.
fn command_execute(command: &ExecuteCommand) -> Result<ExitCode, OpError> {
    let args = ExecuteArgs {
        dag_path: command.dag.clone(),
        manifest_path: command.manifest.clone(),
        asset_root: command.asset_root.clone(),
        workspace: command.workspace.clone(),
        base_time_unix_ms: command.base_time_unix_ms,
        formats: command.formats.clone(),
        output: command.output.clone(),
    };
    let ExecuteOutcome {
        bundle,
        event_count,
    } = mk10_cli::execute_plan(&args)?;
    println!(
        "sealed bundle for execution {} with {event_count} evidence events at {}",
        bundle.lineage_dag.execution_id,
        command.output.display()
    );
    Ok(ExitCode::SUCCESS)
}

/// Executes the promote command.
fn command_promote(command: &PromoteCommand) -> Result<ExitCode, OpError> {
    let archive = match (&command.archive_by, &command.archive_location) {
        (Some(by), Some(location)) => Some((by.clone(), location.clone())),
        _ => None,
    };
    let args = PromoteArgs {
        bundle_path: command.bundle.clone(),
        rules_path: command.rules.clone(),
        desired: command.to.into(),
        approver: command.approver.clone(),
        archive,
        output: command.output.clone(),
    };
    let PromoteOutcome {
        decision,
        written,
    } = mk10_cli::promote_bundle(&args)?;

    for check in &decision.checks {
        let verdict = if check.passed { "pass" } else { "fail" };
        println!("{verdict} {}: {}", check.rule_id, check.details);
    }
    if written {
        println!(
            "promoted to {:?}; re-sealed bundle at {}",
            decision.to,
            command.output.display()
        );
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("promotion to {:?} denied; state unchanged", decision.to);
        Ok(ExitCode::from(EXIT_VERIFICATION_FAILURE))
    }
}

/// Executes the verify command.
fn command_verify(command: &VerifyCommand) -> Result<ExitCode, OpError> {
    let report = mk10_cli::verify_bundle(&command.bundle, &command.rules)?;
    let rendered = serde_json::to_string_pretty(&report)
        .map_err(|err| OpError::Internal(err.to_string()))?;
    println!("{rendered}");
    if report.valid {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_VERIFICATION_FAILURE))
    }
}
