// mk10-validators/src/dcp.rs
// ============================================================================
// Module: DCP Validator
// Description: Structural conformance for digital cinema package asset sets.
// Purpose: Confirm DCP asset-map completeness without any playback device.
// Dependencies: mk10-core
// ============================================================================

//! ## Overview
//! The DCP validator inspects the ingested asset set as a digital cinema
//! package: every asset must carry a typed extension, track files must be
//! MXF, the package needs at least one composition document, and sizes and
//! digests must be internally consistent. It never opens a player and never
//! mutates anything.

// ============================================================================
// SECTION: Imports
// ============================================================================

use mk10_core::FormatTag;
use mk10_core::FormatValidator;
use mk10_core::ValidationError;
use mk10_core::ValidationKind;
use mk10_core::ValidationResult;
use mk10_core::ValidationTarget;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Extensions accepted for DCP track files.
const TRACK_EXTENSIONS: &[&str] = &["mxf"];
/// Extensions accepted for DCP composition and packing documents.
const DOCUMENT_EXTENSIONS: &[&str] = &["xml"];

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Digital cinema package structural validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct DcpValidator;

impl DcpValidator {
    /// Creates a DCP validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl FormatValidator for DcpValidator {
    fn format(&self) -> FormatTag {
        FormatTag::new("DCP")
    }

    fn validate(&self, target: &ValidationTarget<'_>) -> Result<ValidationResult, ValidationError> {
        let mut defects: Vec<String> = Vec::new();
        let mut tracks = 0usize;
        let mut documents = 0usize;

        if target.manifest.is_empty() {
            defects.push("package has no assets".to_string());
        }

        for asset in &target.manifest.assets {
            match asset.content_address.ext() {
                None => {
                    defects.push(format!("asset {} has no typed extension", asset.path));
                }
                Some(ext) if TRACK_EXTENSIONS.contains(&ext) => tracks += 1,
                Some(ext) if DOCUMENT_EXTENSIONS.contains(&ext) => documents += 1,
                Some(ext) => {
                    defects.push(format!("asset {} has foreign extension {ext}", asset.path));
                }
            }
            if asset.size == 0 {
                defects.push(format!("asset {} is empty", asset.path));
            }
            if asset.hash.value != asset.content_address.digest_hex() {
                defects.push(format!(
                    "asset {} digest does not match its content address",
                    asset.path
                ));
            }
        }

        if documents == 0 && !target.manifest.is_empty() {
            defects.push("package has no composition document".to_string());
        }

        Ok(ValidationResult {
            format: self.format(),
            kind: ValidationKind::StructuralConformance,
            passed: defects.is_empty(),
            details: serde_json::json!({
                "tracks": tracks,
                "documents": documents,
                "defects": defects,
            }),
        })
    }
}
