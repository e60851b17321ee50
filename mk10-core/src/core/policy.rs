// mk10-core/src/core/policy.rs
// ============================================================================
// Module: MK10 Policy Model
// Description: Immutable rule sets and evidence-only predicate evaluation.
// Purpose: Gate lifecycle transitions from recorded evidence with no overrides.
// Dependencies: crate::core::{evidence, identifiers, validation}, serde
// ============================================================================

//! ## Overview
//! Policy is law. Rules are loaded once from a declarative source and are
//! immutable for the process lifetime; no API exists to override or relax
//! them. Every predicate evaluates against evidence alone: the frozen event
//! log, the ingest closure it implies, and the declared format set. The same
//! evaluation runs inside the engine and inside the hostile verifier, so a
//! bundle can never pass in one place and fail in the other.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::evidence::EvidenceEvent;
use crate::core::evidence::EvidenceKind;
use crate::core::evidence::IngestRecordedPayload;
use crate::core::evidence::NodeExecutionPayload;
use crate::core::identifiers::ContentAddress;
use crate::core::identifiers::FormatTag;
use crate::core::identifiers::RuleId;
use crate::core::validation::ValidationKind;
use crate::core::validation::ValidationResult;

// ============================================================================
// SECTION: Predicate Kinds
// ============================================================================

/// Fixed set of policy predicate kinds.
///
/// # Invariants
/// - The set is closed; rule loaders reject anything else as an unknown rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateKind {
    /// Every node execution carries a determinism-audit confirmation.
    DeterminismRequired,
    /// At least one completed execution exists.
    EvidenceRequired,
    /// The lineage closure covers every referenced content address.
    LineageRequired,
    /// Each declared format has a passing validation.
    ValidationRequired,
    /// The evidence log is frozen.
    ImmutabilityRequired,
    /// A structural-conformance validation exists; device playback is out of scope.
    PlayabilityRequired,
}

// ============================================================================
// SECTION: Rules
// ============================================================================

/// One immutable policy rule.
///
/// # Invariants
/// - `id` is unique within its rule set.
/// - `parameters` lies within the canonical evidence subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Rule identifier.
    pub id: RuleId,
    /// Predicate the rule applies.
    pub predicate_kind: PredicateKind,
    /// Predicate parameters.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, Value>,
}

/// Immutable rule set.
///
/// # Invariants
/// - No mutators exist after construction; the engine cannot add, remove, or
///   weaken rules at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Rules in declaration order.
    rules: Vec<PolicyRule>,
}

impl RuleSet {
    /// Builds a rule set from loaded rules.
    #[must_use]
    pub fn new(rules: Vec<PolicyRule>) -> Self {
        Self {
            rules,
        }
    }

    /// Returns the rules in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    /// Returns the rules applying the given predicate kind.
    #[must_use]
    pub fn rules_of_kind(&self, kind: PredicateKind) -> Vec<&PolicyRule> {
        self.rules.iter().filter(|rule| rule.predicate_kind == kind).collect()
    }

    /// Returns the number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true when the set holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ============================================================================
// SECTION: Checks
// ============================================================================

/// Outcome of evaluating one rule against evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyCheck {
    /// Rule that was evaluated.
    pub rule_id: RuleId,
    /// True when the predicate held.
    pub passed: bool,
    /// Human-readable explanation.
    pub details: String,
}

// ============================================================================
// SECTION: Evaluation Context
// ============================================================================

/// Evidence-derived context a predicate may consult.
///
/// # Invariants
/// - Everything here is computed from the bundle or the frozen log; nothing
///   comes from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyContext {
    /// True when the evidence log is frozen.
    pub frozen: bool,
    /// Format tags the title declares and must validate against.
    pub declared_formats: Vec<FormatTag>,
    /// True when an archive declaration exists for the title.
    pub archive_declared: bool,
    /// True when the bundle carries an integrity proof.
    pub sealed: bool,
}

impl PolicyContext {
    /// Builds a context for a frozen log with the given declared formats.
    #[must_use]
    pub fn frozen_with_formats(declared_formats: Vec<FormatTag>) -> Self {
        Self {
            frozen: true,
            declared_formats,
            archive_declared: false,
            sealed: false,
        }
    }
}

// ============================================================================
// SECTION: Predicate Evaluation
// ============================================================================

/// Evaluates one rule against an event slice, producing a check.
#[must_use]
pub fn evaluate_rule(
    rule: &PolicyRule,
    events: &[EvidenceEvent],
    context: &PolicyContext,
) -> PolicyCheck {
    let (passed, details) = match rule.predicate_kind {
        PredicateKind::DeterminismRequired => determinism_required(events),
        PredicateKind::EvidenceRequired => evidence_required(events),
        PredicateKind::LineageRequired => lineage_required(events),
        PredicateKind::ValidationRequired => validation_required(rule, events, context),
        PredicateKind::ImmutabilityRequired => immutability_required(events, context),
        PredicateKind::PlayabilityRequired => playability_required(events),
    };
    PolicyCheck {
        rule_id: rule.id.clone(),
        passed,
        details,
    }
}

/// Every `node_execution` event must carry a determinism-audit confirmation.
fn determinism_required(events: &[EvidenceEvent]) -> (bool, String) {
    let mut audited = 0usize;
    for event in events_of_kind(events, EvidenceKind::NodeExecution) {
        match serde_json::from_value::<NodeExecutionPayload>(event.payload.clone()) {
            Ok(payload) if payload.determinism_audit => audited += 1,
            Ok(payload) => {
                return (
                    false,
                    format!("node {} executed without a determinism audit", payload.node_id),
                );
            }
            Err(err) => {
                return (false, format!("malformed node_execution payload at seq {}: {err}", event.seq));
            }
        }
    }
    (true, format!("{audited} node executions audited"))
}

/// At least one `execution_complete` event must exist.
fn evidence_required(events: &[EvidenceEvent]) -> (bool, String) {
    let completed = events_of_kind(events, EvidenceKind::ExecutionComplete).count();
    if completed == 0 {
        (false, "no completed execution in evidence".to_string())
    } else {
        (true, format!("{completed} completed executions"))
    }
}

/// Every consumed address must come from ingest or from an earlier node output.
fn lineage_required(events: &[EvidenceEvent]) -> (bool, String) {
    let mut known: BTreeSet<ContentAddress> = BTreeSet::new();
    for event in events_of_kind(events, EvidenceKind::IngestRecorded) {
        if let Ok(payload) = serde_json::from_value::<IngestRecordedPayload>(event.payload.clone())
        {
            known.insert(payload.asset.content_address);
        }
    }
    let mut checked = 0usize;
    for event in events_of_kind(events, EvidenceKind::NodeExecution) {
        let payload =
            match serde_json::from_value::<NodeExecutionPayload>(event.payload.clone()) {
                Ok(payload) => payload,
                Err(err) => {
                    return (
                        false,
                        format!("malformed node_execution payload at seq {}: {err}", event.seq),
                    );
                }
            };
        for address in payload.inputs.values() {
            checked += 1;
            if !known.iter().any(|seen| seen.same_content(address)) {
                return (
                    false,
                    format!("address {address} consumed by node {} has no recorded origin", payload.node_id),
                );
            }
        }
        known.extend(payload.outputs.values().cloned());
    }
    (true, format!("{checked} input addresses covered by lineage"))
}

/// Each required format must have a passing validation event.
fn validation_required(
    rule: &PolicyRule,
    events: &[EvidenceEvent],
    context: &PolicyContext,
) -> (bool, String) {
    let required: Vec<FormatTag> = rule
        .parameters
        .get("formats")
        .and_then(Value::as_array)
        .map(|formats| {
            formats
                .iter()
                .filter_map(Value::as_str)
                .map(FormatTag::new)
                .collect()
        })
        .unwrap_or_else(|| context.declared_formats.clone());

    let results = validation_results(events);
    if required.is_empty() {
        let passed = results.iter().filter(|result| result.passed).count();
        if passed == 0 {
            return (false, "no passing validation in evidence".to_string());
        }
        return (true, format!("{passed} passing validations"));
    }
    for format in &required {
        let satisfied =
            results.iter().any(|result| result.passed && &result.format == format);
        if !satisfied {
            return (false, format!("no passing validation for format {format}"));
        }
    }
    (true, format!("{} required formats validated", required.len()))
}

/// The evidence log must be frozen and terminated.
fn immutability_required(events: &[EvidenceEvent], context: &PolicyContext) -> (bool, String) {
    if !context.frozen {
        return (false, "evidence log is not frozen".to_string());
    }
    let terminated = events.iter().any(|event| {
        matches!(event.kind, EvidenceKind::ExecutionComplete | EvidenceKind::ExecutionFailure)
    });
    if terminated {
        (true, "evidence log frozen with a terminal execution event".to_string())
    } else {
        (false, "evidence log has no terminal execution event".to_string())
    }
}

/// A structural-conformance validation must exist and pass.
fn playability_required(events: &[EvidenceEvent]) -> (bool, String) {
    let satisfied = validation_results(events)
        .iter()
        .any(|result| result.passed && result.kind == ValidationKind::StructuralConformance);
    if satisfied {
        (true, "structural conformance validated".to_string())
    } else {
        (false, "no passing structural-conformance validation".to_string())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Iterates events of one kind.
fn events_of_kind(
    events: &[EvidenceEvent],
    kind: EvidenceKind,
) -> impl Iterator<Item = &EvidenceEvent> {
    events.iter().filter(move |event| event.kind == kind)
}

/// Collects parsed validation results from the evidence.
fn validation_results(events: &[EvidenceEvent]) -> Vec<ValidationResult> {
    events_of_kind(events, EvidenceKind::Validation)
        .filter_map(|event| serde_json::from_value(event.payload.clone()).ok())
        .collect()
}
