// mk10-core/src/core/validation.rs
// ============================================================================
// Module: MK10 Validation Results
// Description: Uniform result type for format validation providers.
// Purpose: Record structural inspections as canonical evidence payloads.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! Format validators are pure inspectors registered by format tag. Whatever
//! the provider, its outcome is reduced to this uniform result, which the
//! recorder seals as `validation` evidence and the policy engine consumes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::FormatTag;

// ============================================================================
// SECTION: Validation Kind
// ============================================================================

/// Kind of validation a provider performed.
///
/// # Invariants
/// - Variants are stable for serialization and policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationKind {
    /// Structural conformance of the artifact container.
    StructuralConformance,
}

// ============================================================================
// SECTION: Validation Result
// ============================================================================

/// Result of one format validator invocation.
///
/// # Invariants
/// - `details` lies within the canonical evidence subset (no floats).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Format tag of the provider that ran.
    pub format: FormatTag,
    /// Kind of validation performed.
    pub kind: ValidationKind,
    /// True when the artifact set passed.
    pub passed: bool,
    /// Provider-specific detail payload.
    pub details: Value,
}
