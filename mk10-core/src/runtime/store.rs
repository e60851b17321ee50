// mk10-core/src/runtime/store.rs
// ============================================================================
// Module: MK10 Artifact Store
// Description: In-memory write-once content-addressed store and test transport.
// Purpose: Hold run artifacts keyed by hash; no pointers, no lifetimes puzzles.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The in-memory store maps content addresses to bytes. Because addresses
//! are the hash of the bytes, the store is write-once by construction: a
//! repeated put of identical bytes lands on the same address, and two
//! different byte sequences can never collide on one address. The in-memory
//! bundle sink and reader serve tests and any host that wants to keep sealed
//! bundles off the filesystem.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::core::hashing::content_address_for_bytes;
use crate::core::identifiers::ContentAddress;
use crate::interfaces::ArtifactAccess;
use crate::interfaces::ArtifactLookup;
use crate::interfaces::BundleReader;
use crate::interfaces::BundleSink;
use crate::interfaces::TransportError;

// ============================================================================
// SECTION: Artifact Store
// ============================================================================

/// In-memory content-addressed artifact store.
///
/// # Invariants
/// - Entries are write-once; an address always maps to the bytes it hashes.
#[derive(Debug, Clone, Default)]
pub struct ArtifactStore {
    /// Artifact bytes keyed by content address.
    entries: BTreeMap<ContentAddress, Vec<u8>>,
}

impl ArtifactStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true when the address is present.
    #[must_use]
    pub fn contains(&self, address: &ContentAddress) -> bool {
        self.entries.contains_key(address)
    }
}

impl ArtifactLookup for ArtifactStore {
    fn get(&self, address: &ContentAddress) -> Option<&[u8]> {
        self.entries.get(address).map(Vec::as_slice)
    }
}

impl ArtifactAccess for ArtifactStore {
    fn put(&mut self, bytes: Vec<u8>, ext: Option<&str>) -> ContentAddress {
        let address = content_address_for_bytes(&bytes, ext);
        self.entries.entry(address.clone()).or_insert(bytes);
        address
    }
}

// ============================================================================
// SECTION: In-Memory Transport
// ============================================================================

/// In-memory bundle sink and reader backed by one path map.
#[derive(Debug, Clone, Default)]
pub struct MemoryBundleStore {
    /// File bytes keyed by transport-relative path.
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryBundleStore {
    /// Creates an empty transport store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored paths in sorted order.
    #[must_use]
    pub fn paths(&self) -> Vec<&str> {
        self.files.keys().map(String::as_str).collect()
    }
}

impl BundleSink for MemoryBundleStore {
    fn write(&mut self, path: &str, bytes: &[u8]) -> Result<(), TransportError> {
        self.files.insert(path.to_string(), bytes.to_vec());
        Ok(())
    }
}

impl BundleReader for MemoryBundleStore {
    fn read(&self, path: &str) -> Result<Vec<u8>, TransportError> {
        self.files.get(path).cloned().ok_or_else(|| TransportError::Io {
            path: path.to_string(),
            message: "not found".to_string(),
        })
    }
}
