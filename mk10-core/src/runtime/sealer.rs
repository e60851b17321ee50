// mk10-core/src/runtime/sealer.rs
// ============================================================================
// Module: MK10 Bundle Sealer
// Description: Canonical hash-seal of the Master Truth Bundle.
// Purpose: Bind a self-verifying integrity proof into the bundle.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Sealing strips any existing proof, canonicalizes the bundle, hashes the
//! bytes, and inserts the proof. Verification is the exact inverse: strip,
//! recompute, compare. Any divergence is a seal mismatch; a bundle without a
//! proof cannot be verified at all.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::bundle::TruthBundle;
use crate::core::evidence::IntegrityProof;
use crate::core::evidence::PROOF_ALGORITHM;
use crate::core::hashing::HashError;
use crate::core::hashing::canonical_json_bytes;
use crate::core::hashing::sha256_hex;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while sealing or checking a seal.
#[derive(Debug, Error)]
pub enum SealError {
    /// The bundle carries no integrity proof.
    #[error("bundle is unsealed")]
    Unsealed,
    /// The recomputed digest differs from the embedded proof.
    #[error("seal mismatch: expected {expected}, computed {computed}")]
    SealMismatch {
        /// Digest embedded in the bundle.
        expected: String,
        /// Digest recomputed from the canonical bytes.
        computed: String,
    },
    /// The proof names an algorithm the sealer does not produce.
    #[error("unknown seal algorithm {0}")]
    UnknownAlgorithm(String),
    /// Canonicalization failed.
    #[error(transparent)]
    Canonicalization(#[from] HashError),
}

// ============================================================================
// SECTION: Sealing
// ============================================================================

/// Seals a bundle: strips any existing proof, canonicalizes, hashes, and
/// inserts the fresh proof.
///
/// # Errors
///
/// Returns [`SealError::Canonicalization`] when the bundle cannot be encoded.
pub fn seal(mut bundle: TruthBundle) -> Result<TruthBundle, SealError> {
    bundle.integrity_proof = None;
    let bytes = canonical_json_bytes(&bundle)?;
    bundle.integrity_proof = Some(IntegrityProof {
        alg: PROOF_ALGORITHM.to_string(),
        hash: sha256_hex(&bytes),
    });
    Ok(bundle)
}

/// Verifies a bundle's seal: strips the proof, recomputes, compares.
///
/// # Errors
///
/// Returns [`SealError::Unsealed`] when no proof is present,
/// [`SealError::UnknownAlgorithm`] for foreign algorithms, and
/// [`SealError::SealMismatch`] when the digests differ.
pub fn verify_seal(bundle: &TruthBundle) -> Result<(), SealError> {
    let proof = bundle.integrity_proof.as_ref().ok_or(SealError::Unsealed)?;
    if proof.alg != PROOF_ALGORITHM {
        return Err(SealError::UnknownAlgorithm(proof.alg.clone()));
    }
    let mut stripped = bundle.clone();
    stripped.integrity_proof = None;
    let bytes = canonical_json_bytes(&stripped)?;
    let computed = sha256_hex(&bytes);
    if computed != proof.hash {
        return Err(SealError::SealMismatch {
            expected: proof.hash.clone(),
            computed,
        });
    }
    Ok(())
}
