// mk10-validators/src/structural.rs
// ============================================================================
// Module: Structural Conformance Validator
// Description: Generic container-level conformance inspection.
// Purpose: Confirm that every addressed artifact is present and hash-consistent.
// Dependencies: mk10-core
// ============================================================================

//! ## Overview
//! The structural validator is format-agnostic: it checks that the ingest
//! manifest is internally consistent (each asset's digest matches its content
//! address), that artifact bytes available in the store re-hash to their
//! address, and that every final output address resolves. It carries the
//! `structural_conformance` kind, so a passing run satisfies playability
//! gating without any device in the loop.

// ============================================================================
// SECTION: Imports
// ============================================================================

use mk10_core::FormatTag;
use mk10_core::FormatValidator;
use mk10_core::ValidationError;
use mk10_core::ValidationKind;
use mk10_core::ValidationResult;
use mk10_core::ValidationTarget;
use mk10_core::hashing::sha256_hex;

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Generic structural-conformance validator.
pub struct StructuralValidator {
    /// Format tag the validator registers under.
    format: FormatTag,
}

impl StructuralValidator {
    /// Creates a structural validator registered under the given tag.
    #[must_use]
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: FormatTag::new(format),
        }
    }
}

impl FormatValidator for StructuralValidator {
    fn format(&self) -> FormatTag {
        self.format.clone()
    }

    fn validate(&self, target: &ValidationTarget<'_>) -> Result<ValidationResult, ValidationError> {
        let mut defects: Vec<String> = Vec::new();
        let mut checked_assets = 0usize;
        let mut hashed_bytes = 0usize;

        if target.manifest.is_empty() {
            defects.push("ingest manifest is empty".to_string());
        }

        for asset in &target.manifest.assets {
            checked_assets += 1;
            if asset.hash.value != asset.content_address.digest_hex() {
                defects.push(format!(
                    "asset {} digest does not match its content address",
                    asset.path
                ));
            }
            if let Some(bytes) = target.artifacts.get(&asset.content_address) {
                hashed_bytes += 1;
                if sha256_hex(bytes) != asset.content_address.digest_hex() {
                    defects.push(format!(
                        "asset {} bytes do not hash to their content address",
                        asset.path
                    ));
                }
            }
        }

        let mut checked_outputs = 0usize;
        for (node, ports) in target.outputs {
            for (port, address) in ports {
                checked_outputs += 1;
                let resolvable = target.artifacts.get(address).is_some()
                    || target
                        .manifest
                        .assets
                        .iter()
                        .any(|asset| asset.content_address.same_content(address));
                if !resolvable {
                    defects.push(format!("output {node}.{port} address {address} is unresolvable"));
                }
            }
        }

        Ok(ValidationResult {
            format: self.format.clone(),
            kind: ValidationKind::StructuralConformance,
            passed: defects.is_empty(),
            details: serde_json::json!({
                "checked_assets": checked_assets,
                "checked_outputs": checked_outputs,
                "hashed_bytes": hashed_bytes,
                "defects": defects,
            }),
        })
    }
}
