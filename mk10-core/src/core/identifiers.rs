// mk10-core/src/core/identifiers.rs
// ============================================================================
// Module: MK10 Identifiers
// Description: Canonical opaque identifiers for plans, artifacts, and runs.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the canonical identifiers used throughout MK10-PRO.
//! Identifiers are opaque UTF-8 strings that serialize transparently on the
//! wire. The one exception is [`ContentAddress`], which carries structure: a
//! lowercase hex SHA-256 digest optionally followed by a `.<ext>` suffix. The
//! content address is the only legitimate handle to an artifact; equality of
//! addresses implies equality of content.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Content Address
// ============================================================================

/// Content address for an immutable artifact.
///
/// # Invariants
/// - The digest part is lowercase hex SHA-256 of the artifact bytes.
/// - An optional `.<ext>` suffix follows the digest; it never participates in
///   content comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentAddress(String);

impl ContentAddress {
    /// Creates a content address from a digest and an optional extension.
    #[must_use]
    pub fn from_digest(digest_hex: impl Into<String>, ext: Option<&str>) -> Self {
        let digest_hex = digest_hex.into();
        match ext {
            Some(ext) if !ext.is_empty() => Self(format!("{digest_hex}.{ext}")),
            _ => Self(digest_hex),
        }
    }

    /// Creates a content address from its wire form without validation.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Returns the full address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the digest part of the address (hex, no suffix).
    #[must_use]
    pub fn digest_hex(&self) -> &str {
        self.0.split_once('.').map_or(self.0.as_str(), |(digest, _)| digest)
    }

    /// Returns the extension suffix when present.
    #[must_use]
    pub fn ext(&self) -> Option<&str> {
        self.0.split_once('.').map(|(_, ext)| ext)
    }

    /// Returns true when two addresses refer to the same content.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.digest_hex() == other.digest_hex()
    }
}

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// SECTION: Plan Identifiers
// ============================================================================

/// Plan (DAG) identifier.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DagId(String);

impl DagId {
    /// Creates a new plan identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Node identifier, unique within its plan.
///
/// # Invariants
/// - Opaque UTF-8 string; ordering is byte-lexicographic and is used to break
///   scheduling ties deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a new node identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Port name on a node.
///
/// # Invariants
/// - Opaque UTF-8 string; must not contain `.` (reserved as the wire-form
///   separator between node and port).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortName(String);

impl PortName {
    /// Creates a new port name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the port name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// SECTION: Run Identifiers
// ============================================================================

/// Workspace identifier for a run.
///
/// # Invariants
/// - Opaque UTF-8 string; participates byte-for-byte in the execution id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(String);

impl WorkspaceId {
    /// Creates a new workspace identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Execution identifier derived from the plan and workspace.
///
/// # Invariants
/// - Always `sha256(canonical(dag) || workspace_id)` in lowercase hex;
///   construction happens only inside the execution context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(String);

impl ExecutionId {
    /// Creates an execution identifier from its derived hex form.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// SECTION: Policy and Validation Identifiers
// ============================================================================

/// Policy rule identifier.
///
/// # Invariants
/// - Opaque UTF-8 string; unique within a rule set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(String);

impl RuleId {
    /// Creates a new rule identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Format tag identifying a structural validation provider (e.g. `DCP`).
///
/// # Invariants
/// - Opaque UTF-8 string; registry lookups are byte-exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormatTag(String);

impl FormatTag {
    /// Creates a new format tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_address_splits_digest_and_ext() {
        let addr = ContentAddress::from_digest("ab12", Some("wav"));
        assert_eq!(addr.as_str(), "ab12.wav");
        assert_eq!(addr.digest_hex(), "ab12");
        assert_eq!(addr.ext(), Some("wav"));
    }

    #[test]
    fn content_address_without_ext_has_no_suffix() {
        let addr = ContentAddress::from_digest("ab12", None);
        assert_eq!(addr.as_str(), "ab12");
        assert_eq!(addr.ext(), None);
    }

    #[test]
    fn same_content_ignores_suffix() {
        let a = ContentAddress::from_digest("ab12", Some("wav"));
        let b = ContentAddress::from_digest("ab12", Some("mxf"));
        assert!(a.same_content(&b));
        assert_ne!(a, b);
    }
}
