// mk10-core/src/runtime/verifier.rs
// ============================================================================
// Module: MK10 Bundle Verifier
// Description: Hostile verification of sealed Master Truth Bundles.
// Purpose: Decide bundle validity from bytes and public rules alone.
// Dependencies: crate::{core, runtime}
// ============================================================================

//! ## Overview
//! The verifier trusts nothing: not the producer, not the engine, not any
//! authority. It consumes only the bundle bytes and the public rule set, runs
//! every check independently, and accumulates all failures instead of
//! stopping at the first. Missing signatures are warnings; everything else
//! that diverges is an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::bundle::TruthBundle;
use crate::core::evidence::EvidenceEvent;
use crate::core::evidence::EvidenceKind;
use crate::core::evidence::IngestRecordedPayload;
use crate::core::evidence::NodeExecutionPayload;
use crate::core::hashing::canonical_evidence_bytes;
use crate::core::identifiers::ContentAddress;
use crate::core::identifiers::RuleId;
use crate::core::policy::PolicyContext;
use crate::core::policy::RuleSet;
use crate::core::policy::evaluate_rule;
use crate::core::signing::verify_signature;
use crate::runtime::sealer::SealError;
use crate::runtime::sealer::verify_seal;

// ============================================================================
// SECTION: Report
// ============================================================================

/// Per-step outcomes and counters for a verification run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationDetails {
    /// Schema check passed.
    pub schema_ok: bool,
    /// Seal check passed.
    pub seal_ok: bool,
    /// Evidence chain check passed.
    pub evidence_ok: bool,
    /// Policy check passed.
    pub policy_ok: bool,
    /// Lineage closure check passed.
    pub lineage_ok: bool,
    /// Signature check passed (missing signatures do not fail it).
    pub signatures_ok: bool,
    /// Number of evidence events checked.
    pub checked_events: usize,
    /// Number of policy rules applied.
    pub checked_rules: usize,
    /// Identifiers of rules that failed.
    pub failed_rules: Vec<RuleId>,
}

impl Default for VerificationDetails {
    fn default() -> Self {
        Self {
            schema_ok: true,
            seal_ok: true,
            evidence_ok: true,
            policy_ok: true,
            lineage_ok: true,
            signatures_ok: true,
            checked_events: 0,
            checked_rules: 0,
            failed_rules: Vec::new(),
        }
    }
}

/// Verification result: validity plus accumulated errors and warnings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// True when no errors were found.
    pub valid: bool,
    /// Accumulated errors.
    pub errors: Vec<String>,
    /// Accumulated warnings; warnings never fail verification.
    pub warnings: Vec<String>,
    /// Per-step outcomes.
    pub details: VerificationDetails,
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Hostile bundle verifier.
pub struct BundleVerifier {
    /// Public rule set applied to the contained evidence.
    rules: RuleSet,
}

impl BundleVerifier {
    /// Creates a verifier over the public rule set.
    #[must_use]
    pub const fn new(rules: RuleSet) -> Self {
        Self {
            rules,
        }
    }

    /// Verifies bundle bytes: schema, seal, evidence chain, policy, lineage,
    /// and signatures. All checks run; all failures are reported.
    #[must_use]
    pub fn verify_bytes(&self, bytes: &[u8]) -> VerificationReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut details = VerificationDetails::default();

        let value: Value = match serde_json::from_slice(bytes) {
            Ok(value) => value,
            Err(err) => {
                details.schema_ok = false;
                errors.push(format!("SchemaInvalid($): not valid json: {err}"));
                return VerificationReport {
                    valid: false,
                    errors,
                    warnings,
                    details,
                };
            }
        };

        check_schema(&value, &mut errors, &mut details);

        let bundle: TruthBundle = match serde_json::from_value(value) {
            Ok(bundle) => bundle,
            Err(err) => {
                details.schema_ok = false;
                errors.push(format!("SchemaInvalid($): {err}"));
                return VerificationReport {
                    valid: false,
                    errors,
                    warnings,
                    details,
                };
            }
        };

        self.verify_bundle(&bundle, &mut errors, &mut warnings, &mut details);
        VerificationReport {
            valid: errors.is_empty(),
            errors,
            warnings,
            details,
        }
    }

    /// Runs the typed checks against a parsed bundle.
    fn verify_bundle(
        &self,
        bundle: &TruthBundle,
        errors: &mut Vec<String>,
        warnings: &mut Vec<String>,
        details: &mut VerificationDetails,
    ) {
        // Seal check.
        match verify_seal(bundle) {
            Ok(()) => {}
            Err(SealError::SealMismatch { .. } | SealError::Unsealed) => {
                details.seal_ok = false;
                errors.push("SealMismatch".to_string());
            }
            Err(err) => {
                details.seal_ok = false;
                errors.push(format!("SealMismatch: {err}"));
            }
        }

        // Evidence chain check.
        let events: Vec<EvidenceEvent> = bundle.all_events().into_iter().cloned().collect();
        details.checked_events = events.len();
        for (idx, event) in events.iter().enumerate() {
            let expected = idx as u64;
            if event.seq != expected {
                details.evidence_ok = false;
                errors.push(format!(
                    "EvidenceInvalid: sequence gap, expected {expected} found {}",
                    event.seq
                ));
            }
            if let Err(err) = event.verify_proof() {
                details.evidence_ok = false;
                errors.push(format!("EvidenceInvalid: {err}"));
            }
        }

        // Policy check: apply every public rule to the contained evidence.
        let context = PolicyContext {
            frozen: true,
            declared_formats: Vec::new(),
            archive_declared: bundle.archive_declaration.is_some(),
            sealed: bundle.is_sealed(),
        };
        details.checked_rules = self.rules.len();
        for rule in self.rules.rules() {
            let check = evaluate_rule(rule, &events, &context);
            if !check.passed {
                details.policy_ok = false;
                details.failed_rules.push(check.rule_id.clone());
                errors.push(format!("RuleViolation({}): {}", check.rule_id, check.details));
            }
        }

        // Lineage closure check.
        check_lineage(bundle, &events, errors, details);

        // Signature check: verify where present, warn where absent.
        for (idx, approval) in bundle.approval_events.iter().enumerate() {
            match &approval.signature {
                None => {
                    warnings.push(format!(
                        "approval_events[{idx}] by {} carries no signature",
                        approval.approver
                    ));
                }
                Some(signature) => match canonical_evidence_bytes(&approval.unsigned_view()) {
                    Ok(bytes) => {
                        if let Err(err) = verify_signature(signature, &bytes) {
                            details.signatures_ok = false;
                            errors.push(format!("SignatureInvalid(approval_events[{idx}]): {err}"));
                        }
                    }
                    Err(err) => {
                        details.signatures_ok = false;
                        errors.push(format!("SignatureInvalid(approval_events[{idx}]): {err}"));
                    }
                },
            }
        }
    }
}

// ============================================================================
// SECTION: Schema Check
// ============================================================================

/// Section names and the JSON types they must carry.
const REQUIRED_SECTIONS: &[(&str, SectionShape)] = &[
    ("ingest_manifest", SectionShape::Object),
    ("lineage_dag", SectionShape::Object),
    ("build_evidence", SectionShape::Array),
    ("policy_evidence", SectionShape::Array),
    ("validation_evidence", SectionShape::Array),
    ("approval_events", SectionShape::Array),
    ("integrity_proof", SectionShape::Object),
];

/// JSON shapes a section may take.
#[derive(Clone, Copy)]
enum SectionShape {
    Object,
    Array,
}

/// Structural check over the raw JSON value; reports every defect found.
fn check_schema(value: &Value, errors: &mut Vec<String>, details: &mut VerificationDetails) {
    let Some(map) = value.as_object() else {
        details.schema_ok = false;
        errors.push("SchemaInvalid($): bundle must be a json object".to_string());
        return;
    };

    for (section, shape) in REQUIRED_SECTIONS {
        match map.get(*section) {
            None => {
                details.schema_ok = false;
                errors.push(format!("SchemaInvalid({section}): missing section"));
            }
            Some(found) => {
                let ok = match shape {
                    SectionShape::Object => found.is_object(),
                    SectionShape::Array => found.is_array(),
                };
                if !ok {
                    details.schema_ok = false;
                    errors.push(format!("SchemaInvalid({section}): wrong type"));
                }
            }
        }
    }

    for section in ["build_evidence", "policy_evidence", "validation_evidence"] {
        let Some(events) = map.get(section).and_then(Value::as_array) else {
            continue;
        };
        for (idx, event) in events.iter().enumerate() {
            for field in ["seq", "kind", "timestamp", "payload", "integrity_proof"] {
                if event.get(field).is_none() {
                    details.schema_ok = false;
                    errors.push(format!("SchemaInvalid({section}[{idx}].{field}): missing field"));
                }
            }
        }
    }
}

// ============================================================================
// SECTION: Lineage Check
// ============================================================================

/// Checks that every address referenced by the build evidence traces back to
/// ingest or to the output of some node.
fn check_lineage(
    bundle: &TruthBundle,
    events: &[EvidenceEvent],
    errors: &mut Vec<String>,
    details: &mut VerificationDetails,
) {
    let mut known: BTreeSet<ContentAddress> = bundle
        .ingest_manifest
        .assets
        .iter()
        .map(|asset| asset.content_address.clone())
        .collect();
    for event in events {
        if event.kind != EvidenceKind::IngestRecorded {
            continue;
        }
        if let Ok(payload) = serde_json::from_value::<IngestRecordedPayload>(event.payload.clone())
        {
            known.insert(payload.asset.content_address);
        }
    }

    let mut produced: BTreeSet<ContentAddress> = BTreeSet::new();
    for event in events {
        if event.kind != EvidenceKind::NodeExecution {
            continue;
        }
        let Ok(payload) = serde_json::from_value::<NodeExecutionPayload>(event.payload.clone())
        else {
            details.lineage_ok = false;
            errors.push(format!(
                "LineageInvalid: malformed node_execution payload at seq {}",
                event.seq
            ));
            continue;
        };
        for (port, address) in &payload.inputs {
            let covered = known.iter().any(|seen| seen.same_content(address));
            if !covered {
                details.lineage_ok = false;
                errors.push(format!(
                    "LineageInvalid: input {}.{port} address {address} has no recorded origin",
                    payload.node_id
                ));
            }
        }
        for address in payload.outputs.values() {
            known.insert(address.clone());
            produced.insert(address.clone());
        }
    }

    for (node, ports) in &bundle.lineage_dag.outputs {
        for (port, address) in ports {
            let covered = produced.iter().any(|seen| seen.same_content(address))
                || known.iter().any(|seen| seen.same_content(address));
            if !covered {
                details.lineage_ok = false;
                errors.push(format!(
                    "LineageInvalid: lineage output {node}.{port} address {address} never produced"
                ));
            }
        }
    }
}
