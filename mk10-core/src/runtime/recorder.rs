// mk10-core/src/runtime/recorder.rs
// ============================================================================
// Module: MK10 Evidence Recorder
// Description: Ordered, sealed, append-only event recording.
// Purpose: Assign sequence numbers, derive timestamps, and seal every event.
// Dependencies: crate::core, serde_json
// ============================================================================

//! ## Overview
//! The recorder owns the append-only event list during a run. On every
//! `record` it assigns the next sequence number, derives the timestamp from
//! the evidence clock (never the wall clock), canonicalizes the payload, and
//! seals the event with its integrity proof. Freezing hands out an immutable
//! log; recording afterwards fails with `LogFrozen`. A continuation recorder
//! resumes the sequence after a frozen build log so promotion-time evidence
//! (policy checks, validations, transitions) extends the same chain.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;

use crate::core::evidence::EvidenceError;
use crate::core::evidence::EvidenceEvent;
use crate::core::evidence::EvidenceKind;
use crate::core::evidence::EvidenceLog;
use crate::core::evidence::IntegrityProof;
use crate::core::evidence::PROOF_ALGORITHM;
use crate::core::hashing::canonical_evidence_bytes;
use crate::core::hashing::sha256_hex;
use crate::core::policy::PolicyCheck;
use crate::core::state::StateTransitionRecord;
use crate::core::time::EvidenceClock;
use crate::core::time::Timestamp;
use crate::core::validation::ValidationResult;

// ============================================================================
// SECTION: Recorder
// ============================================================================

/// Append-only evidence recorder.
///
/// # Invariants
/// - `seq` increases by exactly one per recorded event.
/// - Timestamps come from the evidence clock only.
/// - Once frozen, every further `record` fails with [`EvidenceError::LogFrozen`].
#[derive(Debug, Clone)]
pub struct EvidenceRecorder {
    /// Deterministic clock for the run.
    clock: EvidenceClock,
    /// Events recorded so far.
    events: Vec<EvidenceEvent>,
    /// Sequence number of the next event.
    next_seq: u64,
    /// Whether the log has been frozen.
    frozen: bool,
}

impl EvidenceRecorder {
    /// Creates a recorder starting at sequence zero.
    #[must_use]
    pub fn new(base_time: Timestamp) -> Self {
        Self {
            clock: EvidenceClock::new(base_time),
            events: Vec::new(),
            next_seq: 0,
            frozen: false,
        }
    }

    /// Creates a recorder that continues a frozen log's sequence. The clock
    /// stays anchored at the original base time so `timestamp = base_time +
    /// seq * interval` holds across the whole chain.
    #[must_use]
    pub fn continuation(base_time: Timestamp, log: &EvidenceLog) -> Self {
        Self {
            clock: EvidenceClock::new(base_time),
            events: Vec::new(),
            next_seq: log.len() as u64,
            frozen: false,
        }
    }

    /// Returns the events recorded so far.
    #[must_use]
    pub fn events(&self) -> &[EvidenceEvent] {
        &self.events
    }

    /// Returns the sequence number the next event will receive.
    #[must_use]
    pub const fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Returns true when the recorder has been frozen.
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Returns the timestamp the next recorded event will carry.
    #[must_use]
    pub fn upcoming_timestamp(&self) -> Timestamp {
        self.clock.at_seq(self.next_seq)
    }

    /// Records one event: assigns the sequence number, derives the timestamp,
    /// canonicalizes the payload, and seals the event.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError::LogFrozen`] after `freeze`, and
    /// [`EvidenceError::Canonicalization`] when the payload lies outside the
    /// canonical evidence subset.
    pub fn record(
        &mut self,
        kind: EvidenceKind,
        payload: Value,
    ) -> Result<&EvidenceEvent, EvidenceError> {
        if self.frozen {
            return Err(EvidenceError::LogFrozen);
        }
        let seq = self.next_seq;
        let timestamp = self.clock.at_seq(seq);
        let unsigned = serde_json::json!({
            "kind": kind,
            "payload": payload,
            "seq": seq,
            "timestamp": timestamp,
        });
        let bytes = canonical_evidence_bytes(&unsigned)?;
        let event = EvidenceEvent {
            seq,
            kind,
            timestamp,
            payload,
            integrity_proof: IntegrityProof {
                alg: PROOF_ALGORITHM.to_string(),
                hash: sha256_hex(&bytes),
            },
        };
        self.events.push(event);
        self.next_seq += 1;
        Ok(self.events.last().unwrap_or_else(|| unreachable!("event was just pushed")))
    }

    /// Records a typed payload by serializing it into the evidence subset.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError`] as for [`Self::record`].
    pub fn record_typed<T: Serialize>(
        &mut self,
        kind: EvidenceKind,
        payload: &T,
    ) -> Result<&EvidenceEvent, EvidenceError> {
        let value = serde_json::to_value(payload).map_err(|err| {
            EvidenceError::Canonicalization(crate::core::hashing::HashError::Canonicalization(
                err.to_string(),
            ))
        })?;
        self.record(kind, value)
    }

    /// Records a policy check as evidence.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError`] as for [`Self::record`].
    pub fn record_policy_check(
        &mut self,
        check: &PolicyCheck,
    ) -> Result<&EvidenceEvent, EvidenceError> {
        self.record_typed(EvidenceKind::PolicyCheck, check)
    }

    /// Records a validation result as evidence.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError`] as for [`Self::record`].
    pub fn record_validation(
        &mut self,
        result: &ValidationResult,
    ) -> Result<&EvidenceEvent, EvidenceError> {
        self.record_typed(EvidenceKind::Validation, result)
    }

    /// Records a state transition attempt as evidence.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError`] as for [`Self::record`].
    pub fn record_state_transition(
        &mut self,
        record: &StateTransitionRecord,
    ) -> Result<&EvidenceEvent, EvidenceError> {
        self.record_typed(EvidenceKind::StateTransition, record)
    }

    /// Freezes the recorder and returns the immutable log. Further `record`
    /// calls fail with [`EvidenceError::LogFrozen`].
    pub fn freeze(&mut self) -> EvidenceLog {
        self.frozen = true;
        EvidenceLog::from_events(self.events.clone())
    }
}
