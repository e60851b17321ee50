// mk10-core/tests/proptest_determinism.rs
// ============================================================================
// Module: Determinism Property-Based Tests
// Description: Property tests for canonicalization, ordering, and replay.
// Purpose: Detect nondeterminism and round-trip drift across wide inputs.
// ============================================================================

//! Property-based tests for the determinism invariants.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeMap;

use mk10_core::ArtifactStore;
use mk10_core::DagSpec;
use mk10_core::EdgeEndpoint;
use mk10_core::EdgeSpec;
use mk10_core::Engine;
use mk10_core::EvidenceClock;
use mk10_core::ExecutionContext;
use mk10_core::IngestAsset;
use mk10_core::IngestManifest;
use mk10_core::NodeRegistry;
use mk10_core::NodeSpec;
use mk10_core::Timestamp;
use mk10_core::WorkspaceId;
use mk10_core::hashing::DEFAULT_HASH_ALGORITHM;
use mk10_core::hashing::canonical_evidence_bytes;
use mk10_core::hashing::canonical_json_bytes;
use mk10_core::hashing::hash_bytes;
use mk10_core::hashing::hex_decode;
use mk10_core::hashing::hex_encode;
use mk10_core::interfaces::ArtifactAccess;
use proptest::prelude::*;
use serde_json::Value;

/// Strategy over values in the canonical evidence subset (no floats).
fn evidence_value_strategy(max_depth: u32) -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|v| Value::Number(v.into())),
        "[a-zA-Z0-9 _-]{0,12}".prop_map(Value::String),
    ];

    leaf.prop_recursive(max_depth, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0 .. 4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0 .. 4).prop_map(|map| {
                let mut object = serde_json::Map::new();
                for (key, value) in map {
                    object.insert(key, value);
                }
                Value::Object(object)
            }),
        ]
    })
}

/// Strategy over linear-ancestry plans: node `i` may feed node `i + 1`.
fn chain_dag_strategy() -> impl Strategy<Value = DagSpec> {
    (1_usize ..= 5, prop::collection::vec(any::<bool>(), 0 .. 4)).prop_map(|(nodes, links)| {
        let mut dag = DagSpec::new("generated");
        for idx in 0 .. nodes {
            dag.add_node(NodeSpec::new(format!("n{idx}"), "passthrough")).expect("node");
        }
        for (idx, linked) in links.iter().enumerate().take(nodes.saturating_sub(1)) {
            if *linked {
                dag.add_edge(EdgeSpec::new(
                    EdgeEndpoint::new(format!("n{idx}"), "out"),
                    EdgeEndpoint::new(format!("n{}", idx + 1), "in"),
                ));
            }
        }
        dag
    })
}

proptest! {
    #[test]
    fn canonical_encoding_round_trips(value in evidence_value_strategy(3)) {
        let bytes = canonical_evidence_bytes(&value).expect("canonical");
        let decoded: Value = serde_json::from_slice(&bytes).expect("decode");
        let again = canonical_evidence_bytes(&decoded).expect("canonical");
        prop_assert_eq!(bytes, again);
    }

    #[test]
    fn canonical_hash_is_stable_across_reserialization(value in evidence_value_strategy(3)) {
        let first = hash_bytes(
            DEFAULT_HASH_ALGORITHM,
            &canonical_evidence_bytes(&value).expect("canonical"),
        );
        let reparsed: Value = serde_json::from_slice(
            &serde_json::to_vec(&value).expect("serialize"),
        )
        .expect("decode");
        let second = hash_bytes(
            DEFAULT_HASH_ALGORITHM,
            &canonical_evidence_bytes(&reparsed).expect("canonical"),
        );
        prop_assert_eq!(first, second);
    }

    #[test]
    fn hex_round_trips(bytes in prop::collection::vec(any::<u8>(), 0 .. 64)) {
        let encoded = hex_encode(&bytes);
        prop_assert_eq!(hex_decode(&encoded).expect("decode"), bytes);
    }

    #[test]
    fn clock_is_strictly_monotone(base in -1_000_000_i64 .. 1_000_000, seq in 0_u64 .. 10_000) {
        let clock = EvidenceClock::new(Timestamp::from_unix_millis(base));
        prop_assert!(clock.at_seq(seq + 1) > clock.at_seq(seq));
    }

    #[test]
    fn topo_order_respects_every_edge(dag in chain_dag_strategy()) {
        let order = dag.topo_order().expect("order");
        prop_assert_eq!(order.len(), dag.nodes.len());
        for edge in &dag.edges {
            let src = order.iter().position(|id| id == &edge.from.node).expect("src");
            let dst = order.iter().position(|id| id == &edge.to.node).expect("dst");
            prop_assert!(src < dst, "edge {} -> {} violated", edge.from, edge.to);
        }
    }

    #[test]
    fn fingerprint_ignores_node_declaration_order(dag in chain_dag_strategy()) {
        let mut reversed = DagSpec::new("generated");
        for node in dag.nodes.iter().rev() {
            reversed.add_node(node.clone()).expect("node");
        }
        for edge in &dag.edges {
            reversed.add_edge(edge.clone());
        }
        prop_assert_eq!(
            dag.fingerprint().expect("fp").value,
            reversed.fingerprint().expect("fp").value
        );
    }

    #[test]
    fn replayed_runs_are_byte_identical(dag in chain_dag_strategy(), payload in prop::collection::vec(any::<u8>(), 1 .. 32)) {
        let run = || {
            let mut store = ArtifactStore::new();
            let address = store.put(payload.clone(), None);
            let mut manifest = IngestManifest::new();
            manifest.push(IngestAsset {
                content_address: address,
                path: "ingest/source".to_string(),
                hash: hash_bytes(DEFAULT_HASH_ALGORITHM, &payload),
                size: payload.len() as u64,
                metadata: BTreeMap::new(),
                ingest_timestamp: Timestamp::EPOCH,
            });
            let ctx = ExecutionContext::new(
                dag.clone(),
                WorkspaceId::new("ws"),
                None,
                manifest,
            )
            .expect("context");
            let registry = NodeRegistry::with_builtin();
            let report = Engine::new(&registry).execute(&ctx, &mut store, None);
            report.outcome.expect("run");
            canonical_json_bytes(&report.log).expect("canonical")
        };
        prop_assert_eq!(run(), run());
    }
}
