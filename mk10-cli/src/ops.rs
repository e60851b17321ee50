// mk10-cli/src/ops.rs
// ============================================================================
// Module: MK10 CLI Operations
// Description: Ingest, execute, promote, and verify over filesystem inputs.
// Purpose: Implement the command workflows the binary dispatches to.
// Dependencies: mk10-core, mk10-config, mk10-validators
// ============================================================================

//! ## Overview
//! Each operation reads untrusted files with size limits, drives the core
//! pipeline, and writes canonical outputs through the file transport. The
//! host may read environment variables elsewhere; nothing here passes a wall
//! clock or randomness into the execution context. Base times come from the
//! caller or from the plan fingerprint.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use mk10_config::RuleError;
use mk10_config::load_rules;
use mk10_core::ArtifactStore;
use mk10_core::BundleBuilder;
use mk10_core::BundleReader;
use mk10_core::BundleSink;
use mk10_core::BundleVerifier;
use mk10_core::ContextError;
use mk10_core::DagError;
use mk10_core::DagSpec;
use mk10_core::Engine;
use mk10_core::EngineError;
use mk10_core::EvidenceLog;
use mk10_core::EvidenceRecorder;
use mk10_core::ExecutionContext;
use mk10_core::FormatTag;
use mk10_core::HashDigest;
use mk10_core::IngestAsset;
use mk10_core::IngestManifest;
use mk10_core::MasterState;
use mk10_core::PolicyContext;
use mk10_core::PolicyEngine;
use mk10_core::PolicyError;
use mk10_core::RuleSet;
use mk10_core::StateTransitionRecord;
use mk10_core::Timestamp;
use mk10_core::TransitionDecision;
use mk10_core::TruthBundle;
use mk10_core::ValidationTarget;
use mk10_core::VerificationReport;
use mk10_core::WorkspaceId;
use mk10_core::hashing::DEFAULT_HASH_ALGORITHM;
use mk10_core::hashing::canonical_json_bytes;
use mk10_core::hashing::content_address_for_bytes;
use mk10_core::hashing::content_address_for_file;
use mk10_core::interfaces::ArtifactAccess;
use mk10_core::seal;
use mk10_validators::ValidatorRegistry;
use thiserror::Error;

use crate::transport::FileBundleStore;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a plan or manifest JSON input.
const MAX_JSON_BYTES: u64 = 8 * 1024 * 1024;
/// Maximum size of a bundle JSON input.
const MAX_BUNDLE_BYTES: u64 = 64 * 1024 * 1024;
/// Maximum size of a single ingest asset loaded for execution.
const MAX_ASSET_BYTES: u64 = 4 * 1024 * 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Operation errors, partitioned for exit-code mapping.
#[derive(Debug, Error)]
pub enum OpError {
    /// The caller supplied bad input.
    #[error("{0}")]
    User(String),
    /// The pipeline itself failed.
    #[error("{0}")]
    Internal(String),
}

impl From<RuleError> for OpError {
    fn from(err: RuleError) -> Self {
        Self::User(err.to_string())
    }
}

// ============================================================================
// SECTION: Ingest
// ============================================================================

/// Walks a source directory deterministically and writes the ingest manifest.
///
/// # Errors
///
/// Returns [`OpError::User`] when the directory cannot be read and
/// [`OpError::Internal`] when hashing or writing fails.
pub fn ingest_directory(source: &Path, output: &Path) -> Result<IngestManifest, OpError> {
    let mut files = Vec::new();
    collect_files(source, &mut files)
        .map_err(|err| OpError::User(format!("cannot read {}: {err}", source.display())))?;
    files.sort();

    let mut manifest = IngestManifest::new();
    for file in files {
        let ext = file.extension().and_then(|ext| ext.to_str());
        let address = content_address_for_file(&file, ext)
            .map_err(|err| OpError::Internal(err.to_string()))?;
        let size = fs::metadata(&file)
            .map_err(|err| OpError::User(format!("cannot stat {}: {err}", file.display())))?
            .len();
        let relative = file
            .strip_prefix(source)
            .unwrap_or(&file)
            .to_string_lossy()
            .replace('\\', "/");
        manifest.push(IngestAsset {
            hash: HashDigest {
                algorithm: DEFAULT_HASH_ALGORITHM,
                value: address.digest_hex().to_string(),
            },
            content_address: address,
            path: relative,
            size,
            metadata: BTreeMap::new(),
            ingest_timestamp: Timestamp::EPOCH,
        });
    }

    let bytes = serde_json::to_vec_pretty(&manifest)
        .map_err(|err| OpError::Internal(err.to_string()))?;
    fs::write(output, bytes)
        .map_err(|err| OpError::User(format!("cannot write {}: {err}", output.display())))?;
    Ok(manifest)
}

/// Collects regular files under a directory recursively.
fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Execute
// ============================================================================

/// Inputs to plan execution.
#[derive(Debug, Clone)]
pub struct ExecuteArgs {
    /// Path to the plan JSON.
    pub dag_path: PathBuf,
    /// Path to the ingest manifest JSON.
    pub manifest_path: PathBuf,
    /// Directory the manifest's relative asset paths resolve against.
    pub asset_root: PathBuf,
    /// Workspace identifier.
    pub workspace: String,
    /// Caller-supplied base time in unix milliseconds.
    pub base_time_unix_ms: Option<i64>,
    /// Declared formats to validate.
    pub formats: Vec<String>,
    /// Output path for the sealed bundle JSON.
    pub output: PathBuf,
}

/// Result of a successful execution.
#[derive(Debug)]
pub struct ExecuteOutcome {
    /// The sealed bundle.
    pub bundle: TruthBundle,
    /// Number of evidence events recorded.
    pub event_count: usize,
}

/// Executes a plan end to end and writes the sealed bundle.
///
/// # Errors
///
/// Returns [`OpError::User`] for bad inputs and [`OpError::Internal`] when
/// the pipeline fails; no bundle is written on failure.
pub fn execute_plan(args: &ExecuteArgs) -> Result<ExecuteOutcome, OpError> {
    let dag: DagSpec = read_json(&args.dag_path, MAX_JSON_BYTES)?;
    let manifest: IngestManifest = read_json(&args.manifest_path, MAX_JSON_BYTES)?;

    let mut store = ArtifactStore::new();
    for asset in &manifest.assets {
        let path = args.asset_root.join(&asset.path);
        let bytes = read_limited(&path, MAX_ASSET_BYTES)?;
        let address = content_address_for_bytes(&bytes, asset.content_address.ext());
        if !address.same_content(&asset.content_address) {
            return Err(OpError::User(format!(
                "asset {} changed since ingest: expected {}, found {}",
                asset.path,
                asset.content_address.digest_hex(),
                address.digest_hex()
            )));
        }
        store.put(bytes, asset.content_address.ext());
    }

    let ctx = ExecutionContext::new(
        dag,
        WorkspaceId::new(args.workspace.clone()),
        args.base_time_unix_ms.map(Timestamp::from_unix_millis),
        manifest,
    )
    .map_err(|err| match err {
        ContextError::Dag(err) => OpError::User(err.to_string()),
        ContextError::Hash(err) => OpError::Internal(err.to_string()),
    })?;

    let registry = mk10_core::NodeRegistry::with_builtin();
    let engine = Engine::new(&registry);
    let report = engine.execute(&ctx, &mut store, None);
    report.outcome.map_err(|err| match err {
        EngineError::UnknownNodeType(_)
        | EngineError::PortMismatch { .. }
        | EngineError::Dag(DagError::SchemaInvalid(..))
        | EngineError::Dag(DagError::CycleDetected(_)) => OpError::User(err.to_string()),
        other => OpError::Internal(other.to_string()),
    })?;

    let mut recorder = EvidenceRecorder::continuation(ctx.base_time(), &report.log);
    let validators = ValidatorRegistry::with_builtin_validators();
    let target = ValidationTarget {
        manifest: ctx.ingest(),
        outputs: &report.outputs,
        artifacts: &store,
    };
    for format in &args.formats {
        let result = validators
            .validate(&FormatTag::new(format.clone()), &target)
            .map_err(|err| OpError::User(err.to_string()))?;
        recorder.record_validation(&result).map_err(|err| OpError::Internal(err.to_string()))?;
    }

    let mut events: Vec<_> = report.log.events().to_vec();
    events.extend(recorder.events().iter().cloned());

    let bundle = BundleBuilder::new()
        .build(&ctx, &events, &report.outputs, Vec::new(), None)
        .map_err(|err| OpError::Internal(err.to_string()))?;
    let sealed = seal(bundle).map_err(|err| OpError::Internal(err.to_string()))?;
    write_bundle(&sealed, &args.output)?;

    Ok(ExecuteOutcome {
        event_count: events.len(),
        bundle: sealed,
    })
}

// ============================================================================
// SECTION: Promote
// ============================================================================

/// Inputs to bundle promotion.
#[derive(Debug, Clone)]
pub struct PromoteArgs {
    /// Path to the sealed bundle JSON.
    pub bundle_path: PathBuf,
    /// Path to the declarative rule file.
    pub rules_path: PathBuf,
    /// Desired lifecycle state.
    pub desired: MasterState,
    /// Optional approver recorded on success.
    pub approver: Option<String>,
    /// Optional archive declaration `(declared_by, location)`.
    pub archive: Option<(String, String)>,
    /// Output path for the re-sealed bundle JSON.
    pub output: PathBuf,
}

/// Result of a promotion attempt.
#[derive(Debug)]
pub struct PromoteOutcome {
    /// The transition decision with its checks.
    pub decision: TransitionDecision,
    /// True when the promoted bundle was re-sealed and written.
    pub written: bool,
}

/// Applies an evidence-gated transition to a sealed bundle.
///
/// On a denied transition the state is unchanged and nothing is written; the
/// decision's checks explain the denial.
///
/// # Errors
///
/// Returns [`OpError::User`] for bad inputs and illegal transitions, and
/// [`OpError::Internal`] when resealing fails.
pub fn promote_bundle(args: &PromoteArgs) -> Result<PromoteOutcome, OpError> {
    let mut bundle: TruthBundle = read_json(&args.bundle_path, MAX_BUNDLE_BYTES)?;
    let rules = load_rules(&args.rules_path)?;

    let events: Vec<_> = bundle.all_events().into_iter().cloned().collect();
    let log = EvidenceLog::from_verified_events(events)
        .map_err(|err| OpError::User(format!("bundle evidence does not verify: {err}")))?;
    let base_time = log
        .events()
        .first()
        .map(|event| event.timestamp)
        .ok_or_else(|| OpError::User("bundle carries no evidence to promote".to_string()))?;

    let current = current_state(&bundle);
    let context = PolicyContext {
        frozen: true,
        declared_formats: Vec::new(),
        archive_declared: bundle.archive_declaration.is_some() || args.archive.is_some(),
        sealed: bundle.is_sealed(),
    };

    let mut recorder = EvidenceRecorder::continuation(base_time, &log);
    let engine = PolicyEngine::new(rules);
    let decision = engine
        .apply_transition(current, args.desired, &log, &context, &mut recorder)
        .map_err(|err| match err {
            PolicyError::InvalidStateTransition { .. } => OpError::User(err.to_string()),
            PolicyError::Evidence(err) => OpError::Internal(err.to_string()),
        })?;

    if !decision.allowed {
        return Ok(PromoteOutcome {
            decision,
            written: false,
        });
    }

    bundle.policy_evidence.extend(recorder.events().iter().cloned());
    let approval_timestamp = recorder
        .events()
        .last()
        .map(|event| event.timestamp)
        .unwrap_or(base_time);
    if let Some(approver) = &args.approver {
        bundle.approval_events.push(mk10_core::ApprovalEvent {
            approver: approver.clone(),
            target_state: args.desired,
            timestamp: approval_timestamp,
            note: None,
            signature: None,
        });
    }
    if let Some((declared_by, location)) = &args.archive {
        bundle.archive_declaration = Some(mk10_core::ArchiveDeclaration {
            declared_by: declared_by.clone(),
            location: location.clone(),
            timestamp: approval_timestamp,
        });
    }

    let sealed = seal(bundle).map_err(|err| OpError::Internal(err.to_string()))?;
    write_bundle(&sealed, &args.output)?;
    Ok(PromoteOutcome {
        decision,
        written: true,
    })
}

/// Folds the recorded transitions into the bundle's current state.
#[must_use]
pub fn current_state(bundle: &TruthBundle) -> MasterState {
    let mut state = MasterState::Draft;
    for event in bundle.all_events() {
        if event.kind != mk10_core::EvidenceKind::StateTransition {
            continue;
        }
        if let Ok(record) = serde_json::from_value::<StateTransitionRecord>(event.payload.clone())
        {
            if record.allowed {
                state = record.to;
            }
        }
    }
    state
}

// ============================================================================
// SECTION: Verify
// ============================================================================

/// Verifies a sealed bundle against a public rule file.
///
/// # Errors
///
/// Returns [`OpError::User`] when the bundle or rule file cannot be read.
pub fn verify_bundle(bundle_path: &Path, rules_path: &Path) -> Result<VerificationReport, OpError> {
    let metadata = fs::metadata(bundle_path)
        .map_err(|err| OpError::User(format!("cannot read {}: {err}", bundle_path.display())))?;
    if metadata.len() > MAX_BUNDLE_BYTES {
        return Err(OpError::User(format!(
            "{} exceeds the {MAX_BUNDLE_BYTES}-byte input limit",
            bundle_path.display()
        )));
    }

    let root = bundle_path.parent().filter(|parent| !parent.as_os_str().is_empty());
    let name = bundle_path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| OpError::User(format!("{} is not a file path", bundle_path.display())))?;
    let reader = FileBundleStore::new(root.unwrap_or_else(|| Path::new(".")));
    let bytes = reader.read(name).map_err(|err| OpError::User(err.to_string()))?;

    let rules: RuleSet = load_rules(rules_path)?;
    Ok(BundleVerifier::new(rules).verify_bytes(&bytes))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a file with a size limit.
fn read_limited(path: &Path, limit: u64) -> Result<Vec<u8>, OpError> {
    let metadata = fs::metadata(path)
        .map_err(|err| OpError::User(format!("cannot read {}: {err}", path.display())))?;
    if metadata.len() > limit {
        return Err(OpError::User(format!(
            "{} exceeds the {limit}-byte input limit",
            path.display()
        )));
    }
    fs::read(path).map_err(|err| OpError::User(format!("cannot read {}: {err}", path.display())))
}

/// Reads and parses a JSON file with a size limit.
fn read_json<T: serde::de::DeserializeOwned>(path: &Path, limit: u64) -> Result<T, OpError> {
    let bytes = read_limited(path, limit)?;
    serde_json::from_slice(&bytes)
        .map_err(|err| OpError::User(format!("cannot parse {}: {err}", path.display())))
}

/// Writes a sealed bundle as canonical JSON through the file transport.
fn write_bundle(bundle: &TruthBundle, output: &Path) -> Result<(), OpError> {
    let bytes = canonical_json_bytes(bundle).map_err(|err| OpError::Internal(err.to_string()))?;
    let root = output.parent().filter(|parent| !parent.as_os_str().is_empty());
    let name = output
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| OpError::User(format!("{} is not a file path", output.display())))?;
    let mut sink = FileBundleStore::new(root.unwrap_or_else(|| Path::new(".")));
    sink.write(name, &bytes).map_err(|err| OpError::User(err.to_string()))
}
