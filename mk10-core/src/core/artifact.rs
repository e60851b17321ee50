// mk10-core/src/core/artifact.rs
// ============================================================================
// Module: MK10 Ingest Artifacts
// Description: Ingest asset records and the ordered ingest manifest.
// Purpose: Bind source material to content addresses with scalar metadata.
// Dependencies: crate::core::{hashing, identifiers, time}, serde
// ============================================================================

//! ## Overview
//! Ingested source material enters the system as immutable artifacts keyed by
//! content address. The manifest preserves ingest order; timestamps are
//! derived from the execution context, never from the wall clock. Metadata is
//! limited to scalars so every asset record stays canonicalizable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::hashing::HashDigest;
use crate::core::identifiers::ContentAddress;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Metadata Scalars
// ============================================================================

/// Scalar metadata value attached to an ingest asset.
///
/// # Invariants
/// - Only scalars are representable; nested structures cannot appear in
///   asset metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    /// Boolean metadata value.
    Bool(bool),
    /// Integer metadata value.
    Integer(i64),
    /// Text metadata value.
    Text(String),
}

// ============================================================================
// SECTION: Ingest Asset
// ============================================================================

/// Ingest asset record.
///
/// # Invariants
/// - `content_address` embeds the digest in `hash`.
/// - `ingest_timestamp` is derived from the execution context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestAsset {
    /// Content address of the asset bytes.
    pub content_address: ContentAddress,
    /// Source path the asset was ingested from.
    pub path: String,
    /// Digest of the asset bytes.
    pub hash: HashDigest,
    /// Size of the asset in bytes.
    pub size: u64,
    /// Scalar metadata attached at ingest.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, ScalarValue>,
    /// Ingest timestamp derived from the context.
    pub ingest_timestamp: Timestamp,
}

// ============================================================================
// SECTION: Ingest Manifest
// ============================================================================

/// Ordered ingest manifest.
///
/// # Invariants
/// - Asset order is the ingest order and is preserved byte-for-byte.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestManifest {
    /// Assets in ingest order.
    pub assets: Vec<IngestAsset>,
}

impl IngestManifest {
    /// Creates an empty manifest.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            assets: Vec::new(),
        }
    }

    /// Appends an asset to the manifest.
    pub fn push(&mut self, asset: IngestAsset) {
        self.assets.push(asset);
    }

    /// Looks up an asset by content address.
    #[must_use]
    pub fn asset(&self, address: &ContentAddress) -> Option<&IngestAsset> {
        self.assets.iter().find(|asset| &asset.content_address == address)
    }

    /// Returns the number of assets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Returns true when the manifest holds no assets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
