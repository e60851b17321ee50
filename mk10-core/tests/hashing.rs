// mk10-core/tests/hashing.rs
// ============================================================================
// Module: Canonical Hashing Tests
// Description: Verifies canonical JSON hashing and content addressing.
// ============================================================================
//! ## Overview
//! Ensures canonical hashing is deterministic across key ordering, that the
//! evidence subset rejects floats, and that streaming content addresses are
//! independent of chunking.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::io::Write;

use mk10_core::HashAlgorithm;
use mk10_core::hashing::CONTENT_CHUNK_BYTES;
use mk10_core::hashing::HashError;
use mk10_core::hashing::canonical_evidence_bytes;
use mk10_core::hashing::canonical_json_bytes;
use mk10_core::hashing::content_address_for_bytes;
use mk10_core::hashing::content_address_for_file;
use mk10_core::hashing::hash_bytes;
use mk10_core::hashing::hash_canonical_json;
use mk10_core::hashing::sha256_hex;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

#[test]
fn canonical_hash_is_order_independent_for_maps() {
    let mut map_a = Map::new();
    map_a.insert("b".to_string(), json!(2));
    map_a.insert("a".to_string(), json!(1));

    let mut map_b = Map::new();
    map_b.insert("a".to_string(), json!(1));
    map_b.insert("b".to_string(), json!(2));

    let hash_a = hash_canonical_json(HashAlgorithm::Sha256, &Value::Object(map_a)).expect("a");
    let hash_b = hash_canonical_json(HashAlgorithm::Sha256, &Value::Object(map_b)).expect("b");
    assert_eq!(hash_a, hash_b);
}

#[test]
fn canonical_bytes_have_no_insignificant_whitespace() {
    let bytes = canonical_json_bytes(&json!({"b": [1, 2], "a": "x"})).expect("canonical");
    assert_eq!(bytes, br#"{"a":"x","b":[1,2]}"#);
}

#[test]
fn evidence_subset_rejects_floats_anywhere() {
    let err = canonical_evidence_bytes(&json!({"nested": {"deep": [true, 1.25]}})).unwrap_err();
    assert!(matches!(err, HashError::NonCanonicalizable(path, _) if path == "$.nested.deep[1]"));
}

#[test]
fn evidence_subset_accepts_large_integers() {
    canonical_evidence_bytes(&json!({"n": i64::MAX, "m": i64::MIN})).expect("canonical");
}

#[test]
fn sha256_matches_the_known_abc_vector() {
    assert_eq!(
        sha256_hex(b"abc"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn sha512_digests_are_twice_as_long() {
    let digest = hash_bytes(HashAlgorithm::Sha512, b"abc");
    assert_eq!(digest.value.len(), 128);
    assert_eq!(digest.algorithm, HashAlgorithm::Sha512);
}

#[test]
fn content_address_suffix_never_affects_the_digest() {
    let plain = content_address_for_bytes(b"abc", None);
    let tagged = content_address_for_bytes(b"abc", Some("wav"));
    assert_eq!(plain.digest_hex(), tagged.digest_hex());
    assert_eq!(tagged.ext(), Some("wav"));
}

#[test]
fn streaming_file_address_matches_in_memory_address() {
    // Larger than one chunk so the streaming path actually iterates.
    let payload: Vec<u8> =
        (0 .. CONTENT_CHUNK_BYTES * 2 + 17).map(|idx| (idx % 251) as u8).collect();

    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    file.write_all(&payload).expect("write");
    file.flush().expect("flush");

    let streamed = content_address_for_file(file.path(), Some("bin")).expect("address");
    let direct = content_address_for_bytes(&payload, Some("bin"));
    assert_eq!(streamed, direct);
}

#[test]
fn missing_file_is_an_io_error() {
    let err =
        content_address_for_file(std::path::Path::new("/nonexistent/artifact"), None).unwrap_err();
    assert!(matches!(err, HashError::Io { .. }));
}
