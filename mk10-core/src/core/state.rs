// mk10-core/src/core/state.rs
// ============================================================================
// Module: MK10 Lifecycle State
// Description: Title/version lifecycle states and their evidence gates.
// Purpose: Make every state transition a function of recorded evidence.
// Dependencies: crate::core::{policy, time}, serde
// ============================================================================

//! ## Overview
//! A mastered title moves through `DRAFT`, `CANDIDATE`, `RELEASE`, and
//! `ARCHIVED`. No transition is configurable: each legal pair names the
//! predicate kinds that must pass against the frozen evidence log, and the
//! archive step additionally demands a declaration plus a sealed bundle.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::policy::PolicyCheck;
use crate::core::policy::PredicateKind;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Master State
// ============================================================================

/// Lifecycle state of a mastered title version.
///
/// # Invariants
/// - Wire form is the uppercase state name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MasterState {
    /// Work in progress; nothing is promised.
    Draft,
    /// Execution evidence and validations exist.
    Candidate,
    /// All policy rules pass; the bundle is publishable.
    Release,
    /// Declared archived with a sealed integrity proof.
    Archived,
}

impl MasterState {
    /// Returns the predicate kinds gating the transition to `desired`, or
    /// `None` when the pair is not a legal transition at all.
    #[must_use]
    pub fn required_predicates(self, desired: Self) -> Option<&'static [PredicateKind]> {
        match (self, desired) {
            (Self::Draft, Self::Candidate) => {
                Some(&[PredicateKind::EvidenceRequired, PredicateKind::ValidationRequired])
            }
            (Self::Candidate, Self::Release) => Some(&[
                PredicateKind::DeterminismRequired,
                PredicateKind::EvidenceRequired,
                PredicateKind::LineageRequired,
                PredicateKind::ValidationRequired,
                PredicateKind::ImmutabilityRequired,
                PredicateKind::PlayabilityRequired,
            ]),
            (Self::Release, Self::Archived) => Some(&[PredicateKind::ImmutabilityRequired]),
            _ => None,
        }
    }

    /// Returns true when the transition to `desired` additionally requires an
    /// archive declaration and a sealed bundle.
    #[must_use]
    pub const fn requires_archive_declaration(self, desired: Self) -> bool {
        matches!((self, desired), (Self::Release, Self::Archived))
    }
}

// ============================================================================
// SECTION: Transition Records
// ============================================================================

/// Recorded outcome of a transition attempt.
///
/// # Invariants
/// - `allowed` is true only when every check in `checks` passed and the pair
///   is a legal transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransitionRecord {
    /// State the title was in.
    pub from: MasterState,
    /// State that was requested.
    pub to: MasterState,
    /// Whether the transition was allowed.
    pub allowed: bool,
    /// Policy checks evaluated for the transition.
    pub checks: Vec<PolicyCheck>,
    /// Derived timestamp of the attempt.
    pub timestamp: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_requires_every_predicate() {
        let required =
            MasterState::Candidate.required_predicates(MasterState::Release).expect("legal");
        assert_eq!(required.len(), 6);
    }

    #[test]
    fn skipping_candidate_is_illegal() {
        assert!(MasterState::Draft.required_predicates(MasterState::Release).is_none());
    }

    #[test]
    fn archive_needs_a_declaration() {
        assert!(MasterState::Release.requires_archive_declaration(MasterState::Archived));
        assert!(!MasterState::Draft.requires_archive_declaration(MasterState::Candidate));
    }

    #[test]
    fn wire_form_is_uppercase() {
        let json = serde_json::to_string(&MasterState::Draft).expect("serialize");
        assert_eq!(json, "\"DRAFT\"");
    }
}
