// mk10-core/src/runtime/policy.rs
// ============================================================================
// Module: MK10 Policy Engine
// Description: Evidence-gated lifecycle transitions with no override path.
// Purpose: Decide transitions from the frozen log and record the checks as evidence.
// Dependencies: crate::{core, runtime}
// ============================================================================

//! ## Overview
//! The policy engine applies the immutable rule set to a frozen evidence log
//! and decides whether a lifecycle transition is allowed. Strictness is not a
//! setting: `is_strict` returns true unconditionally, and required predicates
//! are evaluated even when the rule file names no rule for them, so an empty
//! rule file cannot weaken a gate. Applying a transition records every check
//! and the transition outcome as evidence continuing the run's chain.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::evidence::EvidenceError;
use crate::core::evidence::EvidenceLog;
use crate::core::identifiers::RuleId;
use crate::core::policy::PolicyCheck;
use crate::core::policy::PolicyContext;
use crate::core::policy::PolicyRule;
use crate::core::policy::PredicateKind;
use crate::core::policy::RuleSet;
use crate::core::policy::evaluate_rule;
use crate::core::state::MasterState;
use crate::core::state::StateTransitionRecord;
use crate::runtime::recorder::EvidenceRecorder;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while applying a transition.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The requested pair is not a legal transition at all.
    #[error("invalid state transition {from:?} -> {to:?}")]
    InvalidStateTransition {
        /// State the title is in.
        from: MasterState,
        /// State that was requested.
        to: MasterState,
    },
    /// Recording checks as evidence failed.
    #[error(transparent)]
    Evidence(#[from] EvidenceError),
}

// ============================================================================
// SECTION: Decision
// ============================================================================

/// Outcome of a transition check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionDecision {
    /// State the title was in.
    pub from: MasterState,
    /// State that was requested.
    pub to: MasterState,
    /// Whether the transition is allowed.
    pub allowed: bool,
    /// Checks evaluated, in rule order.
    pub checks: Vec<PolicyCheck>,
}

// ============================================================================
// SECTION: Policy Engine
// ============================================================================

/// Policy engine over an immutable rule set.
pub struct PolicyEngine {
    /// Immutable rule set loaded at startup.
    rules: RuleSet,
}

impl PolicyEngine {
    /// Creates a policy engine over the given rule set.
    #[must_use]
    pub const fn new(rules: RuleSet) -> Self {
        Self {
            rules,
        }
    }

    /// Strict enforcement is not configurable.
    #[must_use]
    pub const fn is_strict(&self) -> bool {
        true
    }

    /// Returns the rule set.
    #[must_use]
    pub const fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Checks whether the transition is allowed, evaluating every applicable
    /// rule against the frozen log.
    ///
    /// Rules from the set whose predicate kind gates this transition are
    /// evaluated under their own ids; required kinds with no named rule are
    /// evaluated as builtin rules so that a sparse rule file cannot bypass a
    /// gate. An illegal pair yields `allowed = false` with no checks.
    #[must_use]
    pub fn check_transition(
        &self,
        current: MasterState,
        desired: MasterState,
        log: &EvidenceLog,
        context: &PolicyContext,
    ) -> TransitionDecision {
        let Some(required) = current.required_predicates(desired) else {
            return TransitionDecision {
                from: current,
                to: desired,
                allowed: false,
                checks: Vec::new(),
            };
        };

        let mut checks = Vec::new();
        for kind in required {
            let named = self.rules.rules_of_kind(*kind);
            if named.is_empty() {
                let builtin = builtin_rule(*kind);
                checks.push(evaluate_rule(&builtin, log.events(), context));
            } else {
                for rule in named {
                    checks.push(evaluate_rule(rule, log.events(), context));
                }
            }
        }

        if current.requires_archive_declaration(desired) {
            checks.push(archive_check(context));
        }

        let allowed = checks.iter().all(|check| check.passed);
        TransitionDecision {
            from: current,
            to: desired,
            allowed,
            checks,
        }
    }

    /// Checks the transition and records every check plus the transition
    /// outcome as evidence continuing the run's chain.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidStateTransition`] for illegal pairs
    /// (nothing is recorded), and [`PolicyError::Evidence`] when recording fails.
    pub fn apply_transition(
        &self,
        current: MasterState,
        desired: MasterState,
        log: &EvidenceLog,
        context: &PolicyContext,
        recorder: &mut EvidenceRecorder,
    ) -> Result<TransitionDecision, PolicyError> {
        if current.required_predicates(desired).is_none() {
            return Err(PolicyError::InvalidStateTransition {
                from: current,
                to: desired,
            });
        }
        let decision = self.check_transition(current, desired, log, context);
        for check in &decision.checks {
            recorder.record_policy_check(check)?;
        }
        let record = StateTransitionRecord {
            from: decision.from,
            to: decision.to,
            allowed: decision.allowed,
            checks: decision.checks.clone(),
            timestamp: recorder.upcoming_timestamp(),
        };
        recorder.record_state_transition(&record)?;
        Ok(decision)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the builtin rule evaluated when the rule file names none of a
/// required kind.
fn builtin_rule(kind: PredicateKind) -> PolicyRule {
    let id = match kind {
        PredicateKind::DeterminismRequired => "builtin.determinism_required",
        PredicateKind::EvidenceRequired => "builtin.evidence_required",
        PredicateKind::LineageRequired => "builtin.lineage_required",
        PredicateKind::ValidationRequired => "builtin.validation_required",
        PredicateKind::ImmutabilityRequired => "builtin.immutability_required",
        PredicateKind::PlayabilityRequired => "builtin.playability_required",
    };
    PolicyRule {
        id: RuleId::new(id),
        predicate_kind: kind,
        parameters: std::collections::BTreeMap::new(),
    }
}

/// Archive transitions additionally require a declaration and a sealed bundle.
fn archive_check(context: &PolicyContext) -> PolicyCheck {
    let passed = context.archive_declared && context.sealed;
    let details = if passed {
        "archive declaration present and bundle sealed".to_string()
    } else if !context.archive_declared {
        "no archive declaration".to_string()
    } else {
        "bundle is not sealed".to_string()
    };
    PolicyCheck {
        rule_id: RuleId::new("builtin.archive_declaration"),
        passed,
        details,
    }
}
