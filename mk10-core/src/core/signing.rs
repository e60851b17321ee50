// mk10-core/src/core/signing.rs
// ============================================================================
// Module: MK10 Signing
// Description: Optional RSA-PSS signing over canonical bytes.
// Purpose: Produce bit-identical detached signatures verifiable with only a public key.
// Dependencies: rand, rsa, serde, sha2
// ============================================================================

//! ## Overview
//! Signatures in MK10-PRO are evidence, not prerequisites: a missing
//! signature is a warning during verification, never an error. Signing uses
//! RSA-PSS over the SHA-256 of canonical bytes with a zero-length salt, so
//! repeated signatures over the same bytes are bit-identical. Verification
//! requires only the embedded PEM public key; no trusted authority exists.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rand::SeedableRng;
use rand::rngs::StdRng;
use rsa::Pss;
use rsa::RsaPrivateKey;
use rsa::RsaPublicKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::pkcs8::EncodePrivateKey;
use rsa::pkcs8::EncodePublicKey;
use rsa::pkcs8::LineEnding;
use rsa::rand_core::CryptoRngCore;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

use crate::core::hashing::hex_decode;
use crate::core::hashing::hex_encode;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Signature algorithm label embedded in detached signatures.
pub const SIGNATURE_ALGORITHM: &str = "rsa-pss-sha256";

/// PSS salt length. Zero keeps signatures deterministic: the padding consumes
/// no randomness, so the same key and bytes always produce the same signature.
const PSS_SALT_LEN: usize = 0;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while signing or verifying evidence.
#[derive(Debug, Error)]
pub enum SignError {
    /// Key material could not be generated, parsed, or encoded.
    #[error("signing key error: {0}")]
    Key(String),
    /// The signature does not verify against the canonical bytes.
    #[error("signature invalid: {0}")]
    SignatureInvalid(String),
}

// ============================================================================
// SECTION: Detached Signature
// ============================================================================

/// Detached signature over canonical bytes, carrying its own public key.
///
/// # Invariants
/// - `public_key_pem` is the PKCS#8 PEM encoding of the verification key.
/// - `signature` is lowercase hex over the raw RSA-PSS signature bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetachedSignature {
    /// Signature algorithm label.
    pub algorithm: String,
    /// PEM-encoded public key used for verification.
    pub public_key_pem: String,
    /// Lowercase hex signature bytes.
    pub signature: String,
}

// ============================================================================
// SECTION: Signer
// ============================================================================

/// Evidence signer holding an RSA private key.
pub struct EvidenceSigner {
    /// RSA private key.
    private_key: RsaPrivateKey,
    /// Cached PEM encoding of the public key.
    public_key_pem: String,
}

impl EvidenceSigner {
    /// Generates a fresh signing key from the caller-supplied RNG.
    ///
    /// Key generation is the only randomized operation in this module; the
    /// caller owns the RNG so runs stay reproducible when they need to be.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::Key`] when key generation fails.
    pub fn generate<R: CryptoRngCore + ?Sized>(rng: &mut R, bits: usize) -> Result<Self, SignError> {
        let private_key =
            RsaPrivateKey::new(rng, bits).map_err(|err| SignError::Key(err.to_string()))?;
        Self::from_private_key(private_key)
    }

    /// Loads a signer from a PKCS#8 PEM private key.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::Key`] when the PEM cannot be parsed.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self, SignError> {
        let private_key =
            RsaPrivateKey::from_pkcs8_pem(pem).map_err(|err| SignError::Key(err.to_string()))?;
        Self::from_private_key(private_key)
    }

    /// Wraps an existing private key.
    fn from_private_key(private_key: RsaPrivateKey) -> Result<Self, SignError> {
        let public_key_pem = RsaPublicKey::from(&private_key)
            .to_public_key_pem(LineEnding::LF)
            .map_err(|err| SignError::Key(err.to_string()))?;
        Ok(Self {
            private_key,
            public_key_pem,
        })
    }

    /// Returns the PKCS#8 PEM encoding of the private key.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::Key`] when encoding fails.
    pub fn to_pkcs8_pem(&self) -> Result<String, SignError> {
        self.private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map(|pem| pem.to_string())
            .map_err(|err| SignError::Key(err.to_string()))
    }

    /// Returns the PEM encoding of the verification key.
    #[must_use]
    pub fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }

    /// Signs canonical bytes, producing a detached, deterministic signature.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::Key`] when the signing operation fails.
    pub fn sign(&self, canonical_bytes: &[u8]) -> Result<DetachedSignature, SignError> {
        let digest = Sha256::digest(canonical_bytes);
        // The PSS API demands an RNG handle even though a zero-length salt
        // consumes no randomness; seed it from the digest so the operation is
        // a pure function of key and input.
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&digest);
        let mut rng = StdRng::from_seed(seed);
        let signature = self
            .private_key
            .sign_with_rng(&mut rng, Pss::new_with_salt::<Sha256>(PSS_SALT_LEN), &digest)
            .map_err(|err| SignError::Key(err.to_string()))?;
        Ok(DetachedSignature {
            algorithm: SIGNATURE_ALGORITHM.to_string(),
            public_key_pem: self.public_key_pem.clone(),
            signature: hex_encode(&signature),
        })
    }
}

// ============================================================================
// SECTION: Verification
// ============================================================================

/// Verifies a detached signature against canonical bytes using only the
/// public key embedded in the signature.
///
/// # Errors
///
/// Returns [`SignError::SignatureInvalid`] when the algorithm label is
/// unknown, the key or signature cannot be decoded, or the signature does not
/// match the bytes.
pub fn verify_signature(
    signature: &DetachedSignature,
    canonical_bytes: &[u8],
) -> Result<(), SignError> {
    if signature.algorithm != SIGNATURE_ALGORITHM {
        return Err(SignError::SignatureInvalid(format!(
            "unsupported signature algorithm {}",
            signature.algorithm
        )));
    }
    let public_key = RsaPublicKey::from_public_key_pem(&signature.public_key_pem)
        .map_err(|err| SignError::SignatureInvalid(format!("bad public key: {err}")))?;
    let signature_bytes = hex_decode(&signature.signature)
        .map_err(|err| SignError::SignatureInvalid(format!("bad signature hex: {err}")))?;
    let digest = Sha256::digest(canonical_bytes);
    public_key
        .verify(Pss::new_with_salt::<Sha256>(PSS_SALT_LEN), &digest, &signature_bytes)
        .map_err(|err| SignError::SignatureInvalid(err.to_string()))
}
