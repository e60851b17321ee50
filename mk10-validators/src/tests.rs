// mk10-validators/src/tests.rs
// ============================================================================
// Module: Validator Tests
// Description: Unit tests for the registry and built-in validators.
// ============================================================================

//! Unit tests for validator routing, access policy, and structural checks.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use mk10_core::ArtifactStore;
use mk10_core::ContentAddress;
use mk10_core::FormatTag;
use mk10_core::IngestAsset;
use mk10_core::IngestManifest;
use mk10_core::NodeId;
use mk10_core::PortName;
use mk10_core::Timestamp;
use mk10_core::ValidationKind;
use mk10_core::ValidationTarget;
use mk10_core::hashing::DEFAULT_HASH_ALGORITHM;
use mk10_core::hashing::hash_bytes;
use mk10_core::interfaces::ArtifactAccess;

use crate::ValidatorAccessPolicy;
use crate::ValidatorRegistry;

/// Builds a manifest with one asset backed by the given bytes.
fn manifest_with_asset(
    store: &mut ArtifactStore,
    bytes: &[u8],
    ext: Option<&str>,
    path: &str,
) -> IngestManifest {
    let address = store.put(bytes.to_vec(), ext);
    let mut manifest = IngestManifest::new();
    manifest.push(IngestAsset {
        content_address: address,
        path: path.to_string(),
        hash: hash_bytes(DEFAULT_HASH_ALGORITHM, bytes),
        size: bytes.len() as u64,
        metadata: BTreeMap::new(),
        ingest_timestamp: Timestamp::EPOCH,
    });
    manifest
}

#[test]
fn structural_validator_passes_consistent_sets() {
    let mut store = ArtifactStore::new();
    let manifest = manifest_with_asset(&mut store, b"picture", None, "ingest/picture");
    let outputs = BTreeMap::new();
    let target = ValidationTarget {
        manifest: &manifest,
        outputs: &outputs,
        artifacts: &store,
    };

    let registry = ValidatorRegistry::with_builtin_validators();
    let result = registry.validate(&FormatTag::new("structural"), &target).expect("validate");
    assert!(result.passed, "defects: {}", result.details);
    assert_eq!(result.kind, ValidationKind::StructuralConformance);
}

#[test]
fn structural_validator_rejects_unresolvable_outputs() {
    let mut store = ArtifactStore::new();
    let manifest = manifest_with_asset(&mut store, b"picture", None, "ingest/picture");
    let mut outputs = BTreeMap::new();
    let mut ports = BTreeMap::new();
    ports.insert(PortName::new("out"), ContentAddress::new("deadbeef"));
    outputs.insert(NodeId::new("grade"), ports);
    let target = ValidationTarget {
        manifest: &manifest,
        outputs: &outputs,
        artifacts: &store,
    };

    let registry = ValidatorRegistry::with_builtin_validators();
    let result = registry.validate(&FormatTag::new("structural"), &target).expect("validate");
    assert!(!result.passed);
}

#[test]
fn structural_validator_rejects_mismatched_digest() {
    let mut store = ArtifactStore::new();
    let mut manifest = manifest_with_asset(&mut store, b"picture", None, "ingest/picture");
    manifest.assets[0].hash.value = "0".repeat(64);
    let outputs = BTreeMap::new();
    let target = ValidationTarget {
        manifest: &manifest,
        outputs: &outputs,
        artifacts: &store,
    };

    let registry = ValidatorRegistry::with_builtin_validators();
    let result = registry.validate(&FormatTag::new("structural"), &target).expect("validate");
    assert!(!result.passed);
}

#[test]
fn dcp_validator_needs_a_composition_document() {
    let mut store = ArtifactStore::new();
    let manifest = manifest_with_asset(&mut store, b"essence", Some("mxf"), "pkg/essence.mxf");
    let outputs = BTreeMap::new();
    let target = ValidationTarget {
        manifest: &manifest,
        outputs: &outputs,
        artifacts: &store,
    };

    let registry = ValidatorRegistry::with_builtin_validators();
    let result = registry.validate(&FormatTag::new("DCP"), &target).expect("validate");
    assert!(!result.passed);
}

#[test]
fn dcp_validator_passes_a_complete_package() {
    let mut store = ArtifactStore::new();
    let mut manifest = manifest_with_asset(&mut store, b"essence", Some("mxf"), "pkg/essence.mxf");
    let cpl = manifest_with_asset(&mut store, b"<cpl/>", Some("xml"), "pkg/cpl.xml");
    manifest.push(cpl.assets[0].clone());
    let outputs = BTreeMap::new();
    let target = ValidationTarget {
        manifest: &manifest,
        outputs: &outputs,
        artifacts: &store,
    };

    let registry = ValidatorRegistry::with_builtin_validators();
    let result = registry.validate(&FormatTag::new("DCP"), &target).expect("validate");
    assert!(result.passed, "defects: {}", result.details);
}

#[test]
fn denied_formats_fail_closed() {
    let mut registry = ValidatorRegistry::new(ValidatorAccessPolicy {
        allowlist: None,
        denylist: BTreeSet::from(["DCP".to_string()]),
    });
    registry.register_validator(crate::DcpValidator::new());

    let store = ArtifactStore::new();
    let manifest = IngestManifest::new();
    let outputs = BTreeMap::new();
    let target = ValidationTarget {
        manifest: &manifest,
        outputs: &outputs,
        artifacts: &store,
    };

    assert!(registry.validate(&FormatTag::new("DCP"), &target).is_err());
}

#[test]
fn unregistered_formats_fail_closed() {
    let registry = ValidatorRegistry::with_builtin_validators();
    let store = ArtifactStore::new();
    let manifest = IngestManifest::new();
    let outputs = BTreeMap::new();
    let target = ValidationTarget {
        manifest: &manifest,
        outputs: &outputs,
        artifacts: &store,
    };
    assert!(registry.validate(&FormatTag::new("IMF"), &target).is_err());
}
