// mk10-core/examples/minimal.rs
// ============================================================================
// Module: MK10 Minimal Example
// Description: Minimal end-to-end run, seal, and hostile verification.
// Purpose: Demonstrate the identity pipeline producing a valid sealed bundle.
// Dependencies: mk10-core
// ============================================================================

//! ## Overview
//! Ingests one three-byte artifact, runs a single passthrough node, builds
//! and seals the Master Truth Bundle, and verifies it from bytes alone.

use std::collections::BTreeMap;

use mk10_core::ArtifactStore;
use mk10_core::BundleBuilder;
use mk10_core::BundleVerifier;
use mk10_core::DagSpec;
use mk10_core::Engine;
use mk10_core::ExecutionContext;
use mk10_core::IngestAsset;
use mk10_core::IngestManifest;
use mk10_core::NodeRegistry;
use mk10_core::NodeSpec;
use mk10_core::PolicyRule;
use mk10_core::PredicateKind;
use mk10_core::RuleId;
use mk10_core::RuleSet;
use mk10_core::Timestamp;
use mk10_core::WorkspaceId;
use mk10_core::hashing::DEFAULT_HASH_ALGORITHM;
use mk10_core::hashing::canonical_json_bytes;
use mk10_core::hashing::content_address_for_bytes;
use mk10_core::hashing::hash_bytes;
use mk10_core::interfaces::ArtifactAccess;
use mk10_core::seal;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let source = b"abc".to_vec();
    let address = content_address_for_bytes(&source, None);

    let mut manifest = IngestManifest::new();
    manifest.push(IngestAsset {
        content_address: address.clone(),
        path: "ingest/abc".to_string(),
        hash: hash_bytes(DEFAULT_HASH_ALGORITHM, &source),
        size: source.len() as u64,
        metadata: BTreeMap::new(),
        ingest_timestamp: Timestamp::EPOCH,
    });

    let mut dag = DagSpec::new("identity");
    dag.add_node(NodeSpec::new("master", "passthrough"))?;

    let ctx = ExecutionContext::new(dag, WorkspaceId::new("demo"), None, manifest)?;

    let registry = NodeRegistry::with_builtin();
    let engine = Engine::new(&registry);
    let mut store = ArtifactStore::new();
    store.put(source, None);
    let report = engine.execute(&ctx, &mut store, None);
    report.outcome?;

    let bundle =
        BundleBuilder::new().build(&ctx, report.log.events(), &report.outputs, Vec::new(), None)?;
    let sealed = seal(bundle)?;
    let bytes = canonical_json_bytes(&sealed)?;

    let rules = RuleSet::new(vec![PolicyRule {
        id: RuleId::new("evidence.complete"),
        predicate_kind: PredicateKind::EvidenceRequired,
        parameters: BTreeMap::new(),
    }]);
    let verdict = BundleVerifier::new(rules).verify_bytes(&bytes);
    println!("valid: {}", verdict.valid);
    for warning in &verdict.warnings {
        println!("warning: {warning}");
    }
    for error in &verdict.errors {
        println!("error: {error}");
    }
    Ok(())
}
