// mk10-core/src/core/bundle.rs
// ============================================================================
// Module: MK10 Master Truth Bundle
// Description: Bundle sections, approvals, and the archive declaration.
// Purpose: Package a run's complete evidence into one sealable structure.
// Dependencies: crate::core::{artifact, dag, evidence, identifiers, signing, state, time}, serde
// ============================================================================

//! ## Overview
//! The Master Truth Bundle is the product of mastering: ingest manifest,
//! lineage plan, the sealed evidence partitioned into build, policy, and
//! validation sections, approvals, the archive declaration, and finally the
//! bundle-level integrity proof. Section order is fixed by this declaration;
//! once the sealer has stamped the proof, every substructure is immutable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::artifact::IngestManifest;
use crate::core::dag::DagSpec;
use crate::core::evidence::EvidenceEvent;
use crate::core::evidence::IntegrityProof;
use crate::core::identifiers::ContentAddress;
use crate::core::identifiers::ExecutionId;
use crate::core::identifiers::NodeId;
use crate::core::identifiers::PortName;
use crate::core::signing::DetachedSignature;
use crate::core::state::MasterState;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Lineage Section
// ============================================================================

/// Lineage section: the executed plan and its derived identity.
///
/// # Invariants
/// - `execution_id` is `sha256(canonical(dag) || workspace_id)`.
/// - `node_order` is the deterministic topological order that ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageSection {
    /// The executed plan.
    pub dag: DagSpec,
    /// Deterministic execution identifier.
    pub execution_id: ExecutionId,
    /// Canonical plan fingerprint (hex).
    pub dag_fingerprint: String,
    /// Node order the engine followed.
    pub node_order: Vec<NodeId>,
    /// Final output addresses per node and port.
    pub outputs: BTreeMap<NodeId, BTreeMap<PortName, ContentAddress>>,
}

// ============================================================================
// SECTION: Approvals and Archive
// ============================================================================

/// Approval event promoting the title toward a target state.
///
/// # Invariants
/// - `timestamp` is caller-supplied or derived from the run's evidence; never
///   the wall clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalEvent {
    /// Identity of the approver (opaque).
    pub approver: String,
    /// State the approval targets.
    pub target_state: MasterState,
    /// Derived or caller-supplied timestamp.
    pub timestamp: Timestamp,
    /// Optional free-form note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Optional detached signature over the approval's canonical bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<DetachedSignature>,
}

impl ApprovalEvent {
    /// Returns the unsigned view of the approval: everything except the
    /// signature. Signing and verification both operate over these bytes.
    #[must_use]
    pub fn unsigned_view(&self) -> serde_json::Value {
        serde_json::json!({
            "approver": self.approver,
            "note": self.note,
            "target_state": self.target_state,
            "timestamp": self.timestamp,
        })
    }
}

/// Archive declaration closing out a released title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveDeclaration {
    /// Identity of the declarer (opaque).
    pub declared_by: String,
    /// Archival location label (opaque to the core).
    pub location: String,
    /// Derived or caller-supplied timestamp.
    pub timestamp: Timestamp,
}

// ============================================================================
// SECTION: Truth Bundle
// ============================================================================

/// The Master Truth Bundle.
///
/// # Invariants
/// - Section order is fixed by this declaration.
/// - `build_evidence`, `policy_evidence`, and `validation_evidence` partition
///   one gapless event chain by kind.
/// - After sealing, `integrity_proof` covers the canonical bytes of the
///   bundle without the proof field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruthBundle {
    /// Ordered ingest manifest.
    pub ingest_manifest: IngestManifest,
    /// Lineage plan and execution identity.
    pub lineage_dag: LineageSection,
    /// Execution evidence: start, ingest, node, and terminal events.
    pub build_evidence: Vec<EvidenceEvent>,
    /// Policy evidence: rule checks and state transitions.
    pub policy_evidence: Vec<EvidenceEvent>,
    /// Validation evidence from format validators.
    pub validation_evidence: Vec<EvidenceEvent>,
    /// Approval events.
    pub approval_events: Vec<ApprovalEvent>,
    /// Archive declaration, present once the title is archived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_declaration: Option<ArchiveDeclaration>,
    /// Bundle-level integrity proof, present once sealed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity_proof: Option<IntegrityProof>,
}

impl TruthBundle {
    /// Returns every evidence event across the three sections, sorted by
    /// sequence number.
    #[must_use]
    pub fn all_events(&self) -> Vec<&EvidenceEvent> {
        let mut events: Vec<&EvidenceEvent> = self
            .build_evidence
            .iter()
            .chain(self.policy_evidence.iter())
            .chain(self.validation_evidence.iter())
            .collect();
        events.sort_by_key(|event| event.seq);
        events
    }

    /// Returns true when the bundle carries an integrity proof.
    #[must_use]
    pub const fn is_sealed(&self) -> bool {
        self.integrity_proof.is_some()
    }
}
