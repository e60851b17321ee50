// mk10-core/tests/bundle.rs
// ============================================================================
// Module: Bundle Pipeline Tests
// Description: Build, seal, tamper, and hostile verification of bundles.
// ============================================================================
//! ## Overview
//! Exercises the full bundle pipeline: a valid identity run seals and
//! verifies from bytes alone; a single flipped byte inside the evidence
//! breaks the seal; resealing an unsealed bundle reproduces the same proof;
//! signed approvals verify and unsigned ones warn.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeMap;

use mk10_core::ApprovalRequest;
use mk10_core::ArtifactStore;
use mk10_core::BuilderError;
use mk10_core::BundleBuilder;
use mk10_core::BundleVerifier;
use mk10_core::DagSpec;
use mk10_core::Engine;
use mk10_core::EvidenceSigner;
use mk10_core::ExecutionContext;
use mk10_core::IngestAsset;
use mk10_core::IngestManifest;
use mk10_core::MasterState;
use mk10_core::NodeRegistry;
use mk10_core::NodeSpec;
use mk10_core::PolicyRule;
use mk10_core::PredicateKind;
use mk10_core::RuleId;
use mk10_core::RuleSet;
use mk10_core::SealError;
use mk10_core::Timestamp;
use mk10_core::TruthBundle;
use mk10_core::WorkspaceId;
use mk10_core::hashing::DEFAULT_HASH_ALGORITHM;
use mk10_core::hashing::canonical_json_bytes;
use mk10_core::hashing::hash_bytes;
use mk10_core::interfaces::ArtifactAccess;
use mk10_core::seal;
use mk10_core::sign_approval;
use mk10_core::verify_seal;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Runs the identity pipeline and returns the sealed bundle.
fn sealed_identity_bundle(approvals: Vec<ApprovalRequest>) -> TruthBundle {
    let mut store = ArtifactStore::new();
    let address = store.put(b"abc".to_vec(), None);
    let mut manifest = IngestManifest::new();
    manifest.push(IngestAsset {
        content_address: address,
        path: "ingest/source".to_string(),
        hash: hash_bytes(DEFAULT_HASH_ALGORITHM, b"abc"),
        size: 3,
        metadata: BTreeMap::new(),
        ingest_timestamp: Timestamp::EPOCH,
    });
    let mut dag = DagSpec::new("identity");
    dag.add_node(NodeSpec::new("master", "passthrough")).expect("node");
    let ctx = ExecutionContext::new(dag, WorkspaceId::new("ws"), None, manifest).expect("context");

    let registry = NodeRegistry::with_builtin();
    let report = Engine::new(&registry).execute(&ctx, &mut store, None);
    report.outcome.expect("run");

    let bundle = BundleBuilder::new()
        .build(&ctx, report.log.events(), &report.outputs, approvals, None)
        .expect("build");
    seal(bundle).expect("seal")
}

/// Public rule set used by the hostile verifier in these tests.
fn public_rules() -> RuleSet {
    let rules = [
        ("determinism.audit", PredicateKind::DeterminismRequired),
        ("evidence.complete", PredicateKind::EvidenceRequired),
        ("lineage.closed", PredicateKind::LineageRequired),
        ("log.frozen", PredicateKind::ImmutabilityRequired),
    ];
    RuleSet::new(
        rules
            .into_iter()
            .map(|(id, predicate_kind)| PolicyRule {
                id: RuleId::new(id),
                predicate_kind,
                parameters: BTreeMap::new(),
            })
            .collect(),
    )
}

#[test]
fn sealed_identity_bundle_verifies_from_bytes_alone() {
    let sealed = sealed_identity_bundle(Vec::new());
    let bytes = canonical_json_bytes(&sealed).expect("canonical");

    // Hostile: only bytes and public rules cross this line.
    let report = BundleVerifier::new(public_rules()).verify_bytes(&bytes);
    assert!(report.valid, "errors: {:?}", report.errors);
    assert!(report.errors.is_empty());
    assert!(report.warnings.is_empty());
    assert_eq!(report.details.checked_events, 4);
    assert_eq!(report.details.checked_rules, 4);
}

#[test]
fn a_flipped_byte_inside_the_evidence_breaks_the_seal() {
    let sealed = sealed_identity_bundle(Vec::new());
    let mut value = serde_json::to_value(&sealed).expect("value");
    value["build_evidence"][2]["payload"]["node_type"] =
        serde_json::Value::String("passthrouhg".to_string());
    let bytes = serde_json::to_vec(&value).expect("bytes");

    let report = BundleVerifier::new(public_rules()).verify_bytes(&bytes);
    assert!(!report.valid);
    assert!(report.errors.iter().any(|error| error.contains("SealMismatch")));
    assert!(report.errors.iter().any(|error| error.contains("EvidenceInvalid")));
    assert!(!report.details.seal_ok);
    assert!(!report.details.evidence_ok);
}

#[test]
fn resealing_an_unsealed_bundle_reproduces_the_proof() {
    let sealed = sealed_identity_bundle(Vec::new());
    let original_proof = sealed.integrity_proof.clone().expect("proof");

    let mut unsealed = sealed;
    unsealed.integrity_proof = None;
    assert!(matches!(verify_seal(&unsealed), Err(SealError::Unsealed)));

    let resealed = seal(unsealed).expect("seal");
    assert_eq!(resealed.integrity_proof.as_ref(), Some(&original_proof));
    verify_seal(&resealed).expect("seal verifies");
}

#[test]
fn missing_sections_are_schema_errors() {
    let sealed = sealed_identity_bundle(Vec::new());
    let mut value = serde_json::to_value(&sealed).expect("value");
    value.as_object_mut().expect("object").remove("ingest_manifest");
    let bytes = serde_json::to_vec(&value).expect("bytes");

    let report = BundleVerifier::new(public_rules()).verify_bytes(&bytes);
    assert!(!report.valid);
    assert!(report
        .errors
        .iter()
        .any(|error| error.contains("SchemaInvalid(ingest_manifest)")));
}

#[test]
fn garbage_bytes_fail_schema_checking_only() {
    let report = BundleVerifier::new(public_rules()).verify_bytes(b"not json at all");
    assert!(!report.valid);
    assert!(!report.details.schema_ok);
}

#[test]
fn signed_approvals_verify_and_tampered_ones_fail() {
    let mut sealed = sealed_identity_bundle(vec![ApprovalRequest {
        approver: "mastering-lead".to_string(),
        target_state: MasterState::Candidate,
        timestamp: None,
        note: Some("looks right".to_string()),
    }]);

    let mut rng = StdRng::seed_from_u64(7);
    let signer = EvidenceSigner::generate(&mut rng, 1024).expect("keygen");

    let mut unsealed = sealed.clone();
    unsealed.integrity_proof = None;
    sign_approval(&mut unsealed.approval_events[0], &signer).expect("sign");
    sealed = seal(unsealed).expect("seal");

    let bytes = canonical_json_bytes(&sealed).expect("canonical");
    let report = BundleVerifier::new(public_rules()).verify_bytes(&bytes);
    assert!(report.valid, "errors: {:?}", report.errors);
    assert!(report.warnings.is_empty(), "signed approvals do not warn");

    // Tamper with the approved note after signing.
    let mut tampered = sealed.clone();
    tampered.integrity_proof = None;
    tampered.approval_events[0].note = Some("looks wrong".to_string());
    let tampered = seal(tampered).expect("seal");
    let bytes = canonical_json_bytes(&tampered).expect("canonical");
    let report = BundleVerifier::new(public_rules()).verify_bytes(&bytes);
    assert!(!report.valid);
    assert!(report.errors.iter().any(|error| error.contains("SignatureInvalid")));
}

#[test]
fn unsigned_approvals_warn_but_do_not_fail() {
    let sealed = sealed_identity_bundle(vec![ApprovalRequest {
        approver: "qc-lead".to_string(),
        target_state: MasterState::Candidate,
        timestamp: None,
        note: None,
    }]);
    let bytes = canonical_json_bytes(&sealed).expect("canonical");
    let report = BundleVerifier::new(public_rules()).verify_bytes(&bytes);
    assert!(report.valid, "errors: {:?}", report.errors);
    assert_eq!(report.warnings.len(), 1);
}

#[test]
fn an_empty_plan_still_seals_and_verifies() {
    let mut store = ArtifactStore::new();
    let ctx = ExecutionContext::new(
        DagSpec::new("empty"),
        WorkspaceId::new("ws"),
        None,
        IngestManifest::new(),
    )
    .expect("context");
    let registry = NodeRegistry::with_builtin();
    let report = Engine::new(&registry).execute(&ctx, &mut store, None);
    report.outcome.expect("run");

    let bundle = BundleBuilder::new()
        .build(&ctx, report.log.events(), &report.outputs, Vec::new(), None)
        .expect("build");
    let sealed = seal(bundle).expect("seal");
    let bytes = canonical_json_bytes(&sealed).expect("canonical");

    // Lineage and determinism hold vacuously; only the evidence rule bites.
    let report = BundleVerifier::new(public_rules()).verify_bytes(&bytes);
    assert!(report.valid, "errors: {:?}", report.errors);
    assert_eq!(report.details.checked_events, 2);
}

#[test]
fn approvals_without_any_evidence_are_rejected() {
    let ctx = ExecutionContext::new(
        DagSpec::new("empty"),
        WorkspaceId::new("ws"),
        None,
        IngestManifest::new(),
    )
    .expect("context");

    let err = BundleBuilder::new()
        .build(
            &ctx,
            &[],
            &BTreeMap::new(),
            vec![ApprovalRequest {
                approver: "eager".to_string(),
                target_state: MasterState::Candidate,
                timestamp: None,
                note: None,
            }],
            None,
        )
        .unwrap_err();
    assert!(matches!(err, BuilderError::InvalidStateTransition));
}

#[test]
fn derived_approval_timestamps_come_from_the_evidence() {
    let sealed = sealed_identity_bundle(vec![ApprovalRequest {
        approver: "qc-lead".to_string(),
        target_state: MasterState::Candidate,
        timestamp: None,
        note: None,
    }]);
    let last_event =
        sealed.all_events().last().map(|event| event.timestamp).expect("events");
    assert_eq!(sealed.approval_events[0].timestamp, last_event);
}
