// mk10-cli/src/tests.rs
// ============================================================================
// Module: CLI Operation Tests
// Description: End-to-end ingest, execute, promote, and verify workflows.
// ============================================================================

//! Exercises the full command workflows over temporary directories.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use mk10_core::EvidenceKind;
use mk10_core::MasterState;
use mk10_core::hashing::sha256_hex;

use crate::ops::ExecuteArgs;
use crate::ops::PromoteArgs;
use crate::ops::current_state;
use crate::ops::execute_plan;
use crate::ops::ingest_directory;
use crate::ops::promote_bundle;
use crate::ops::verify_bundle;

/// Identity plan over one passthrough node.
const IDENTITY_DAG: &str = r#"{
    "id": "identity",
    "nodes": [{"id": "master", "type": "passthrough"}],
    "edges": []
}"#;

/// Rule file requiring the full predicate set.
const FULL_RULES: &str = r#"
[[rules]]
id = "determinism.audit"
predicate = "determinism_required"

[[rules]]
id = "evidence.complete"
predicate = "evidence_required"

[[rules]]
id = "lineage.closed"
predicate = "lineage_required"

[[rules]]
id = "validation.present"
predicate = "validation_required"

[[rules]]
id = "log.frozen"
predicate = "immutability_required"

[[rules]]
id = "playable.structure"
predicate = "playability_required"
"#;

/// Prepares a workspace with one three-byte source asset.
fn workspace_with_source(root: &Path) -> (PathBuf, PathBuf, PathBuf) {
    let source = root.join("source");
    fs::create_dir_all(source.join("media")).expect("mkdir");
    fs::write(source.join("media/master.bin"), b"abc").expect("write");

    let dag_path = root.join("dag.json");
    fs::write(&dag_path, IDENTITY_DAG).expect("write dag");

    let rules_path = root.join("rules.toml");
    fs::write(&rules_path, FULL_RULES).expect("write rules");

    (source, dag_path, rules_path)
}

/// Runs ingest + execute, returning the bundle path.
fn ingest_and_execute(root: &Path, formats: &[&str]) -> PathBuf {
    let (source, dag_path, _) = workspace_with_source(root);
    let manifest_path = root.join("manifest.json");
    ingest_directory(&source, &manifest_path).expect("ingest");

    let bundle_path = root.join("bundle.json");
    let args = ExecuteArgs {
        dag_path,
        manifest_path,
        asset_root: source,
        workspace: "test-ws".to_string(),
        base_time_unix_ms: Some(1_000),
        formats: formats.iter().map(ToString::to_string).collect(),
        output: bundle_path.clone(),
    };
    execute_plan(&args).expect("execute");
    bundle_path
}

#[test]
fn ingest_records_content_addresses() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (source, _, _) = workspace_with_source(dir.path());
    let manifest_path = dir.path().join("manifest.json");
    let manifest = ingest_directory(&source, &manifest_path).expect("ingest");

    assert_eq!(manifest.len(), 1);
    let asset = &manifest.assets[0];
    assert_eq!(asset.path, "media/master.bin");
    assert_eq!(asset.size, 3);
    assert_eq!(asset.content_address.digest_hex(), sha256_hex(b"abc"));
    assert_eq!(asset.content_address.ext(), Some("bin"));
}

#[test]
fn execute_seals_identity_bundle_with_expected_events() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bundle_path = ingest_and_execute(dir.path(), &["structural"]);

    let bundle: mk10_core::TruthBundle =
        serde_json::from_slice(&fs::read(bundle_path).expect("read")).expect("parse");
    assert!(bundle.is_sealed());

    let kinds: Vec<EvidenceKind> = bundle.build_evidence.iter().map(|event| event.kind).collect();
    assert_eq!(
        kinds,
        [
            EvidenceKind::ExecutionStart,
            EvidenceKind::IngestRecorded,
            EvidenceKind::NodeExecution,
            EvidenceKind::ExecutionComplete,
        ]
    );
    assert_eq!(bundle.validation_evidence.len(), 1);

    // Passthrough: the output address equals the ingested address.
    let outputs = &bundle.lineage_dag.outputs;
    let master = outputs.get(&mk10_core::NodeId::new("master")).expect("outputs");
    let out = master.get(&mk10_core::PortName::new("out")).expect("out port");
    assert_eq!(out.digest_hex(), sha256_hex(b"abc"));
}

#[test]
fn tampered_asset_bytes_are_rejected_before_execution() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (source, dag_path, _) = workspace_with_source(dir.path());
    let manifest_path = dir.path().join("manifest.json");
    ingest_directory(&source, &manifest_path).expect("ingest");

    fs::write(source.join("media/master.bin"), b"abX").expect("tamper");

    let args = ExecuteArgs {
        dag_path,
        manifest_path,
        asset_root: source,
        workspace: "test-ws".to_string(),
        base_time_unix_ms: Some(1_000),
        formats: Vec::new(),
        output: dir.path().join("bundle.json"),
    };
    let err = execute_plan(&args).unwrap_err();
    assert!(matches!(err, crate::OpError::User(message) if message.contains("changed since ingest")));
}

#[test]
fn promotion_walks_the_lifecycle_and_verifies() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bundle_path = ingest_and_execute(dir.path(), &["structural"]);
    let rules_path = dir.path().join("rules.toml");

    let candidate_path = dir.path().join("candidate.json");
    let outcome = promote_bundle(&PromoteArgs {
        bundle_path,
        rules_path: rules_path.clone(),
        desired: MasterState::Candidate,
        approver: Some("qc-lead".to_string()),
        archive: None,
        output: candidate_path.clone(),
    })
    .expect("promote");
    assert!(outcome.decision.allowed);
    assert!(outcome.written);

    let release_path = dir.path().join("release.json");
    let outcome = promote_bundle(&PromoteArgs {
        bundle_path: candidate_path,
        rules_path: rules_path.clone(),
        desired: MasterState::Release,
        approver: Some("mastering-lead".to_string()),
        archive: None,
        output: release_path.clone(),
    })
    .expect("promote");
    assert!(outcome.decision.allowed, "checks: {:?}", outcome.decision.checks);

    let bundle: mk10_core::TruthBundle =
        serde_json::from_slice(&fs::read(&release_path).expect("read")).expect("parse");
    assert_eq!(current_state(&bundle), MasterState::Release);
    assert_eq!(bundle.approval_events.len(), 2);

    let report = verify_bundle(&release_path, &rules_path).expect("verify");
    assert!(report.valid, "errors: {:?}", report.errors);
    assert!(!report.warnings.is_empty(), "unsigned approvals warn");
}

#[test]
fn promotion_without_validation_evidence_is_denied() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bundle_path = ingest_and_execute(dir.path(), &[]);
    let rules_path = dir.path().join("rules.toml");

    let output = dir.path().join("candidate.json");
    let outcome = promote_bundle(&PromoteArgs {
        bundle_path,
        rules_path,
        desired: MasterState::Candidate,
        approver: None,
        archive: None,
        output: output.clone(),
    })
    .expect("promote");
    assert!(!outcome.decision.allowed);
    assert!(!outcome.written);
    assert!(!output.exists(), "denied promotions write nothing");
    let failed: Vec<_> =
        outcome.decision.checks.iter().filter(|check| !check.passed).collect();
    assert!(
        failed.iter().any(|check| check.rule_id.as_str() == "validation.present"),
        "failed checks: {failed:?}"
    );
}

#[test]
fn skipping_a_lifecycle_state_is_an_invalid_transition() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bundle_path = ingest_and_execute(dir.path(), &["structural"]);
    let rules_path = dir.path().join("rules.toml");

    let err = promote_bundle(&PromoteArgs {
        bundle_path,
        rules_path,
        desired: MasterState::Release,
        approver: None,
        archive: None,
        output: dir.path().join("release.json"),
    })
    .unwrap_err();
    assert!(matches!(err, crate::OpError::User(message) if message.contains("invalid state transition")));
}

#[test]
fn verify_rejects_a_tampered_bundle() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bundle_path = ingest_and_execute(dir.path(), &["structural"]);
    let rules_path = dir.path().join("rules.toml");

    let text = fs::read_to_string(&bundle_path).expect("read");
    let tampered = text.replacen("passthrough", "passthrouhg", 1);
    assert_ne!(text, tampered, "tamper target must exist");
    fs::write(&bundle_path, tampered).expect("write");

    let report = verify_bundle(&bundle_path, &rules_path).expect("verify");
    assert!(!report.valid);
    assert!(report.errors.iter().any(|error| error.contains("SealMismatch")));
}
