// mk10-core/src/core/evidence.rs
// ============================================================================
// Module: MK10 Evidence Model
// Description: Sealed evidence events, integrity proofs, and the frozen log.
// Purpose: Capture execution facts as canonical, independently checkable records.
// Dependencies: crate::core::{artifact, hashing, identifiers, time}, serde
// ============================================================================

//! ## Overview
//! Evidence is the product of a run: an ordered, append-only sequence of
//! events, each sealed by the hash of its own canonical bytes. Sequence
//! numbers start at zero and increase by exactly one; timestamps are derived
//! from the run's base time and the sequence number. A frozen log exposes no
//! mutators, and its whole chain can be re-verified by anyone from the bytes
//! alone.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::artifact::IngestAsset;
use crate::core::hashing::HashError;
use crate::core::hashing::canonical_evidence_bytes;
use crate::core::hashing::sha256_hex;
use crate::core::identifiers::ContentAddress;
use crate::core::identifiers::DagId;
use crate::core::identifiers::ExecutionId;
use crate::core::identifiers::NodeId;
use crate::core::identifiers::PortName;
use crate::core::identifiers::WorkspaceId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Integrity proof algorithm label for evidence events.
pub const PROOF_ALGORITHM: &str = "sha256";

// ============================================================================
// SECTION: Event Kinds
// ============================================================================

/// Enumerated evidence event kinds.
///
/// # Invariants
/// - Variants are stable for serialization and bundle verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    /// A run began.
    ExecutionStart,
    /// A run completed with final output addresses.
    ExecutionComplete,
    /// A run aborted.
    ExecutionFailure,
    /// One node executed, with audited input and output addresses.
    NodeExecution,
    /// A policy rule was evaluated.
    PolicyCheck,
    /// A format validator reported its result.
    Validation,
    /// The lifecycle state changed.
    StateTransition,
    /// A source asset was recorded at ingest.
    IngestRecorded,
}

// ============================================================================
// SECTION: Integrity Proof
// ============================================================================

/// Hash seal over an event's canonical bytes (without the proof itself).
///
/// # Invariants
/// - `alg` is always `"sha256"`.
/// - `hash` is the lowercase hex digest of the unsigned canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityProof {
    /// Proof algorithm label.
    pub alg: String,
    /// Lowercase hex digest.
    pub hash: String,
}

// ============================================================================
// SECTION: Evidence Event
// ============================================================================

/// One sealed evidence event.
///
/// # Invariants
/// - `seq` is assigned by the recorder and increases by exactly one.
/// - `timestamp` equals `base_time + seq * EVENT_INTERVAL_MILLIS`.
/// - `integrity_proof` seals the canonical bytes of the event without the proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceEvent {
    /// Monotone sequence number starting at zero.
    pub seq: u64,
    /// Event kind.
    pub kind: EvidenceKind,
    /// Derived timestamp.
    pub timestamp: Timestamp,
    /// Kind-specific payload in the canonical evidence subset.
    pub payload: Value,
    /// Hash seal over the event.
    pub integrity_proof: IntegrityProof,
}

impl EvidenceEvent {
    /// Returns the unsigned view of the event: everything except the proof.
    #[must_use]
    pub fn unsigned_view(&self) -> Value {
        serde_json::json!({
            "kind": self.kind,
            "payload": self.payload,
            "seq": self.seq,
            "timestamp": self.timestamp,
        })
    }

    /// Verifies the integrity proof against the event's own canonical bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError::ProofMismatch`] when the recomputed digest
    /// differs, and [`EvidenceError::ProofAlgorithm`] for unknown algorithms.
    pub fn verify_proof(&self) -> Result<(), EvidenceError> {
        if self.integrity_proof.alg != PROOF_ALGORITHM {
            return Err(EvidenceError::ProofAlgorithm {
                seq: self.seq,
                alg: self.integrity_proof.alg.clone(),
            });
        }
        let bytes = canonical_evidence_bytes(&self.unsigned_view())?;
        if sha256_hex(&bytes) != self.integrity_proof.hash {
            return Err(EvidenceError::ProofMismatch {
                seq: self.seq,
            });
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while recording or verifying evidence.
#[derive(Debug, Error)]
pub enum EvidenceError {
    /// The log is frozen; no further events can be recorded.
    #[error("evidence log is frozen")]
    LogFrozen,
    /// Sequence numbers do not form a gapless range from zero.
    #[error("evidence sequence gap: expected {expected}, found {found}")]
    SequenceGap {
        /// Sequence number that should appear next.
        expected: u64,
        /// Sequence number actually found.
        found: u64,
    },
    /// An event's integrity proof does not match its canonical bytes.
    #[error("integrity proof mismatch at seq {seq}")]
    ProofMismatch {
        /// Sequence number of the offending event.
        seq: u64,
    },
    /// An event carries an unknown proof algorithm.
    #[error("unknown proof algorithm {alg} at seq {seq}")]
    ProofAlgorithm {
        /// Sequence number of the offending event.
        seq: u64,
        /// Algorithm label found.
        alg: String,
    },
    /// Canonicalization of a payload failed.
    #[error(transparent)]
    Canonicalization(#[from] HashError),
}

// ============================================================================
// SECTION: Frozen Log
// ============================================================================

/// Frozen, immutable evidence log.
///
/// # Invariants
/// - Exposes no mutators; freezing is one-way.
/// - `seq` values form the range `[0, n)` without gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceLog {
    /// Events in sequence order.
    events: Vec<EvidenceEvent>,
}

impl EvidenceLog {
    /// Wraps recorded events into a frozen log. Used by the recorder.
    #[must_use]
    pub(crate) fn from_events(events: Vec<EvidenceEvent>) -> Self {
        Self {
            events,
        }
    }

    /// Reconstructs a frozen log from externally held events, verifying the
    /// whole chain first. This is the only door back into a frozen log for
    /// events that left the process (e.g. inside a bundle).
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError`] when the chain has gaps or a proof fails.
    pub fn from_verified_events(events: Vec<EvidenceEvent>) -> Result<Self, EvidenceError> {
        verify_event_chain(&events)?;
        Ok(Self {
            events,
        })
    }

    /// Returns the events in sequence order.
    #[must_use]
    pub fn events(&self) -> &[EvidenceEvent] {
        &self.events
    }

    /// Returns the number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true when the log holds no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the events of the given kind, in sequence order.
    #[must_use]
    pub fn events_of_kind(&self, kind: EvidenceKind) -> Vec<&EvidenceEvent> {
        self.events.iter().filter(|event| event.kind == kind).collect()
    }

    /// Verifies the whole chain: gapless sequence from zero and per-event proofs.
    ///
    /// # Errors
    ///
    /// Returns the first [`EvidenceError`] encountered.
    pub fn verify_chain(&self) -> Result<(), EvidenceError> {
        verify_event_chain(&self.events)
    }
}

/// Verifies that a slice of events forms a sealed, gapless chain from zero.
///
/// # Errors
///
/// Returns the first [`EvidenceError`] encountered.
pub fn verify_event_chain(events: &[EvidenceEvent]) -> Result<(), EvidenceError> {
    for (idx, event) in events.iter().enumerate() {
        let expected = idx as u64;
        if event.seq != expected {
            return Err(EvidenceError::SequenceGap {
                expected,
                found: event.seq,
            });
        }
        event.verify_proof()?;
    }
    Ok(())
}

// ============================================================================
// SECTION: Typed Payloads
// ============================================================================

/// Payload of an `execution_start` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStartPayload {
    /// Deterministic execution identifier.
    pub execution_id: ExecutionId,
    /// Plan identifier.
    pub dag_id: DagId,
    /// Workspace identifier.
    pub workspace_id: WorkspaceId,
    /// Canonical plan fingerprint (hex).
    pub dag_fingerprint: String,
    /// Scheduled node order.
    pub node_order: Vec<NodeId>,
}

/// Payload of an `ingest_recorded` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestRecordedPayload {
    /// The recorded asset.
    pub asset: IngestAsset,
}

/// Payload of a `node_execution` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeExecutionPayload {
    /// Node identifier.
    pub node_id: NodeId,
    /// Node type tag.
    pub node_type: String,
    /// Canonical hash of the node configuration (hex).
    pub config_fingerprint: String,
    /// Input addresses by port.
    pub inputs: BTreeMap<PortName, ContentAddress>,
    /// Output addresses by port.
    pub outputs: BTreeMap<PortName, ContentAddress>,
    /// True when the determinism audit re-executed the node and the output
    /// addresses matched byte-for-byte.
    pub determinism_audit: bool,
    /// Behavior-supplied evidence payload.
    pub evidence: Value,
}

/// Payload of an `execution_complete` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionCompletePayload {
    /// Deterministic execution identifier.
    pub execution_id: ExecutionId,
    /// Final output addresses per node and port.
    pub outputs: BTreeMap<NodeId, BTreeMap<PortName, ContentAddress>>,
}

/// Payload of an `execution_failure` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionFailurePayload {
    /// Deterministic execution identifier.
    pub execution_id: ExecutionId,
    /// Node that failed, when the failure is node-scoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    /// Stable failure kind label (e.g. `cancelled`, `nondeterministic_node`).
    pub kind: String,
    /// Human-readable failure message.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sealed_event(seq: u64, payload: Value) -> EvidenceEvent {
        let timestamp = Timestamp::from_unix_millis(i64::try_from(seq).expect("seq"));
        let unsigned = serde_json::json!({
            "kind": EvidenceKind::PolicyCheck,
            "payload": payload,
            "seq": seq,
            "timestamp": timestamp,
        });
        let bytes = canonical_evidence_bytes(&unsigned).expect("canonical");
        EvidenceEvent {
            seq,
            kind: EvidenceKind::PolicyCheck,
            timestamp,
            payload: unsigned["payload"].clone(),
            integrity_proof: IntegrityProof {
                alg: PROOF_ALGORITHM.to_string(),
                hash: sha256_hex(&bytes),
            },
        }
    }

    #[test]
    fn proof_verifies_against_own_bytes() {
        let event = sealed_event(0, serde_json::json!({"ok": true}));
        event.verify_proof().expect("proof");
    }

    #[test]
    fn tampered_payload_fails_proof() {
        let mut event = sealed_event(0, serde_json::json!({"ok": true}));
        event.payload = serde_json::json!({"ok": false});
        let err = event.verify_proof().unwrap_err();
        assert!(matches!(err, EvidenceError::ProofMismatch { seq: 0 }));
    }

    #[test]
    fn chain_rejects_sequence_gaps() {
        let events =
            vec![sealed_event(0, serde_json::json!({})), sealed_event(2, serde_json::json!({}))];
        let err = verify_event_chain(&events).unwrap_err();
        assert!(matches!(
            err,
            EvidenceError::SequenceGap {
                expected: 1,
                found: 2
            }
        ));
    }
}
