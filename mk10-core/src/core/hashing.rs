// mk10-core/src/core/hashing.rs
// ============================================================================
// Module: MK10 Canonical Hashing
// Description: RFC 8785 JSON canonicalization, content hashing, and addresses.
// Purpose: Provide deterministic hashes for plans, evidence, and bundles.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! MK10-PRO hashes all canonical JSON using RFC 8785 (JCS) to guarantee
//! stable, replayable digests. Evidence payloads are additionally restricted
//! to a float-free subset: non-integer numbers cannot be canonicalized and
//! must be expressed as rationals or strings. File contents are hashed
//! directly over raw bytes, streamed in fixed-size chunks; the chunk size
//! never affects the digest.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;
use sha2::Sha512;
use thiserror::Error;

use crate::core::identifiers::ContentAddress;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Chunk size for streaming file hashing. An implementation constant; the
/// resulting digest is independent of its value.
pub const CONTENT_CHUNK_BYTES: usize = 64 * 1024;

// ============================================================================
// SECTION: Hash Algorithm
// ============================================================================

/// Supported hash algorithms for MK10 artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256 hashing (default; content addresses always use it).
    Sha256,
    /// SHA-512 hashing, available on request.
    Sha512,
}

/// Default hash algorithm for MK10.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

// ============================================================================
// SECTION: Hash Digest
// ============================================================================

/// Deterministic content hash representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashDigest {
    /// Hash algorithm identifier.
    pub algorithm: HashAlgorithm,
    /// Lowercase hex-encoded digest bytes.
    pub value: String,
}

impl HashDigest {
    /// Creates a new digest from raw bytes.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, bytes: &[u8]) -> Self {
        Self {
            algorithm,
            value: hex_encode(bytes),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when computing canonical hashes or content addresses.
#[derive(Debug, Error)]
pub enum HashError {
    /// JSON canonicalization failed.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
    /// The value lies outside the canonical evidence subset.
    #[error("value is not canonicalizable at {0}: {1}")]
    NonCanonicalizable(String, String),
    /// Reading artifact bytes failed.
    #[error("io error reading {path}: {message}")]
    Io {
        /// Path that failed to read.
        path: String,
        /// Underlying error message.
        message: String,
    },
}

// ============================================================================
// SECTION: Canonical Encoding
// ============================================================================

/// Returns canonical JSON bytes for a serializable value using RFC 8785.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Returns canonical bytes for an evidence value.
///
/// Evidence values are restricted to null, booleans, integers, strings,
/// arrays, and objects. Non-integer numbers are rejected so that every
/// evidence byte sequence is reproducible across platforms.
///
/// # Errors
///
/// Returns [`HashError::NonCanonicalizable`] when the value contains a
/// non-integer number, and [`HashError::Canonicalization`] when encoding fails.
pub fn canonical_evidence_bytes(value: &Value) -> Result<Vec<u8>, HashError> {
    reject_non_integers(value, "$")?;
    canonical_json_bytes(value)
}

/// Walks a value and rejects any non-integer number, reporting its path.
fn reject_non_integers(value: &Value, path: &str) -> Result<(), HashError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(number) => {
            if number.is_i64() || number.is_u64() {
                Ok(())
            } else {
                Err(HashError::NonCanonicalizable(
                    path.to_string(),
                    "non-integer numbers are not permitted in evidence".to_string(),
                ))
            }
        }
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                reject_non_integers(item, &format!("{path}[{idx}]"))?;
            }
            Ok(())
        }
        Value::Object(map) => {
            for (key, item) in map {
                reject_non_integers(item, &format!("{path}.{key}"))?;
            }
            Ok(())
        }
    }
}

// ============================================================================
// SECTION: Hashing Helpers
// ============================================================================

/// Hashes canonical JSON using the provided algorithm.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn hash_canonical_json<T: Serialize + ?Sized>(
    algorithm: HashAlgorithm,
    value: &T,
) -> Result<HashDigest, HashError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(hash_bytes(algorithm, &bytes))
}

/// Hashes raw bytes using the provided algorithm.
#[must_use]
pub fn hash_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> HashDigest {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            let digest = hasher.finalize();
            HashDigest::new(HashAlgorithm::Sha256, &digest)
        }
        HashAlgorithm::Sha512 => {
            let mut hasher = Sha512::new();
            hasher.update(bytes);
            let digest = hasher.finalize();
            HashDigest::new(HashAlgorithm::Sha512, &digest)
        }
    }
}

/// Returns the lowercase hex SHA-256 of the given bytes.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    hash_bytes(HashAlgorithm::Sha256, bytes).value
}

// ============================================================================
// SECTION: Content Addresses
// ============================================================================

/// Computes the content address for in-memory artifact bytes.
#[must_use]
pub fn content_address_for_bytes(bytes: &[u8], ext: Option<&str>) -> ContentAddress {
    ContentAddress::from_digest(sha256_hex(bytes), ext)
}

/// Computes the content address for a file, streaming its contents in
/// [`CONTENT_CHUNK_BYTES`] chunks.
///
/// # Errors
///
/// Returns [`HashError::Io`] when the file cannot be read.
pub fn content_address_for_file(
    path: &Path,
    ext: Option<&str>,
) -> Result<ContentAddress, HashError> {
    let io_err = |err: std::io::Error| HashError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    };
    let mut file = File::open(path).map_err(io_err)?;
    let mut hasher = Sha256::new();
    let mut chunk = vec![0u8; CONTENT_CHUNK_BYTES];
    loop {
        let read = file.read(&mut chunk).map_err(io_err)?;
        if read == 0 {
            break;
        }
        hasher.update(&chunk[.. read]);
    }
    let digest = hasher.finalize();
    Ok(ContentAddress::from_digest(hex_encode(&digest), ext))
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Encodes bytes as a lowercase hex string.
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let hi = usize::from(byte >> 4);
        let lo = usize::from(byte & 0x0f);
        out.push(char::from(HEX[hi]));
        out.push(char::from(HEX[lo]));
    }
    out
}

/// Decodes a lowercase or uppercase hex string into bytes.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when the input is not valid hex.
pub fn hex_decode(hex: &str) -> Result<Vec<u8>, HashError> {
    if hex.len() % 2 != 0 {
        return Err(HashError::Canonicalization("odd-length hex string".to_string()));
    }
    let mut out = Vec::with_capacity(hex.len() / 2);
    let bytes = hex.as_bytes();
    for pair in bytes.chunks_exact(2) {
        let hi = hex_nibble(pair[0])?;
        let lo = hex_nibble(pair[1])?;
        out.push((hi << 4) | lo);
    }
    Ok(out)
}

/// Decodes a single hex nibble.
fn hex_nibble(byte: u8) -> Result<u8, HashError> {
    match byte {
        b'0' ..= b'9' => Ok(byte - b'0'),
        b'a' ..= b'f' => Ok(byte - b'a' + 10),
        b'A' ..= b'F' => Ok(byte - b'A' + 10),
        _ => Err(HashError::Canonicalization(format!("invalid hex byte {byte:#04x}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sha256_of_abc_matches_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn evidence_bytes_reject_floats_with_path() {
        let value = json!({"ok": 1, "bad": [1, 2.5]});
        let err = canonical_evidence_bytes(&value).unwrap_err();
        assert!(matches!(err, HashError::NonCanonicalizable(path, _) if path == "$.bad[1]"));
    }

    #[test]
    fn evidence_bytes_accept_integer_subset() {
        let value = json!({"n": -3, "s": "x", "b": true, "z": null});
        let bytes = canonical_evidence_bytes(&value).expect("canonical");
        assert_eq!(bytes, br#"{"b":true,"n":-3,"s":"x","z":null}"#);
    }

    #[test]
    fn hex_round_trip() {
        let bytes = [0u8, 1, 0xab, 0xff];
        assert_eq!(hex_decode(&hex_encode(&bytes)).expect("decode"), bytes);
    }
}
