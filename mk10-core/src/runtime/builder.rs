// mk10-core/src/runtime/builder.rs
// ============================================================================
// Module: MK10 Bundle Builder
// Description: Assembles run evidence into the Master Truth Bundle sections.
// Purpose: Produce an unsealed bundle whose every timestamp derives from evidence.
// Dependencies: crate::{core, runtime}
// ============================================================================

//! ## Overview
//! The builder partitions the run's event chain into the fixed bundle
//! sections and attaches approvals and the archive declaration. Timestamps on
//! approvals and declarations are caller-supplied; when omitted they are
//! derived from the evidence (`base_time + last_seq * interval`). The builder
//! never consults the wall clock, and it rejects approvals for a run with no
//! evidence at all: an approval of nothing is not a state transition. The
//! returned bundle is owned by the caller; the builder retains nothing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::bundle::ApprovalEvent;
use crate::core::bundle::ArchiveDeclaration;
use crate::core::bundle::LineageSection;
use crate::core::bundle::TruthBundle;
use crate::core::dag::DagError;
use crate::core::evidence::EvidenceEvent;
use crate::core::evidence::EvidenceKind;
use crate::core::hashing::HashError;
use crate::core::hashing::canonical_evidence_bytes;
use crate::core::identifiers::ContentAddress;
use crate::core::identifiers::NodeId;
use crate::core::identifiers::PortName;
use crate::core::signing::EvidenceSigner;
use crate::core::signing::SignError;
use crate::core::state::MasterState;
use crate::core::time::EVENT_INTERVAL_MILLIS;
use crate::core::time::Timestamp;
use crate::runtime::context::ExecutionContext;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while assembling a bundle.
#[derive(Debug, Error)]
pub enum BuilderError {
    /// An approval or archive declaration was requested for a run with no
    /// evidence; there is nothing to approve.
    #[error("invalid state transition: no evidence exists to approve")]
    InvalidStateTransition,
    /// The plan could not be re-ordered.
    #[error(transparent)]
    Dag(#[from] DagError),
    /// Canonicalization failed.
    #[error(transparent)]
    Hash(#[from] HashError),
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Approval input to the builder; the timestamp may be omitted and derived.
#[derive(Debug, Clone)]
pub struct ApprovalRequest {
    /// Identity of the approver (opaque).
    pub approver: String,
    /// State the approval targets.
    pub target_state: MasterState,
    /// Caller-supplied timestamp; derived from evidence when `None`.
    pub timestamp: Option<Timestamp>,
    /// Optional free-form note.
    pub note: Option<String>,
}

/// Archive declaration input; the timestamp may be omitted and derived.
#[derive(Debug, Clone)]
pub struct ArchiveRequest {
    /// Identity of the declarer (opaque).
    pub declared_by: String,
    /// Archival location label (opaque to the core).
    pub location: String,
    /// Caller-supplied timestamp; derived from evidence when `None`.
    pub timestamp: Option<Timestamp>,
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Assembles evidence into an unsealed Master Truth Bundle.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundleBuilder;

impl BundleBuilder {
    /// Creates a builder.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Builds the unsealed bundle from the run's unified event chain.
    ///
    /// `events` must be the full chain (execution evidence plus any
    /// promotion-time evidence) in sequence order. The builder partitions it
    /// into the build, policy, and validation sections by kind.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::InvalidStateTransition`] when approvals or an
    /// archive declaration are requested with no evidence to anchor them, and
    /// [`BuilderError::Dag`] when the plan cannot be ordered.
    pub fn build(
        &self,
        ctx: &ExecutionContext,
        events: &[EvidenceEvent],
        outputs: &BTreeMap<NodeId, BTreeMap<PortName, ContentAddress>>,
        approvals: Vec<ApprovalRequest>,
        archive: Option<ArchiveRequest>,
    ) -> Result<TruthBundle, BuilderError> {
        let derived_timestamp = last_event_timestamp(ctx, events);
        if derived_timestamp.is_none() && (!approvals.is_empty() || archive.is_some()) {
            return Err(BuilderError::InvalidStateTransition);
        }

        let mut build_evidence = Vec::new();
        let mut policy_evidence = Vec::new();
        let mut validation_evidence = Vec::new();
        for event in events {
            match event.kind {
                EvidenceKind::PolicyCheck | EvidenceKind::StateTransition => {
                    policy_evidence.push(event.clone());
                }
                EvidenceKind::Validation => validation_evidence.push(event.clone()),
                _ => build_evidence.push(event.clone()),
            }
        }

        let approval_events = approvals
            .into_iter()
            .map(|request| ApprovalEvent {
                approver: request.approver,
                target_state: request.target_state,
                timestamp: request
                    .timestamp
                    .or(derived_timestamp)
                    .unwrap_or(Timestamp::EPOCH),
                note: request.note,
                signature: None,
            })
            .collect();

        let archive_declaration = archive.map(|request| ArchiveDeclaration {
            declared_by: request.declared_by,
            location: request.location,
            timestamp: request.timestamp.or(derived_timestamp).unwrap_or(Timestamp::EPOCH),
        });

        Ok(TruthBundle {
            ingest_manifest: ctx.ingest().clone(),
            lineage_dag: LineageSection {
                dag: ctx.dag().clone(),
                execution_id: ctx.execution_id().clone(),
                dag_fingerprint: ctx.dag_fingerprint().to_string(),
                node_order: ctx.dag().topo_order()?,
                outputs: outputs.clone(),
            },
            build_evidence,
            policy_evidence,
            validation_evidence,
            approval_events,
            archive_declaration,
            integrity_proof: None,
        })
    }
}

/// Signs an approval in place over its canonical unsigned bytes.
///
/// # Errors
///
/// Returns [`SignError`] when canonicalization or signing fails.
pub fn sign_approval(
    approval: &mut ApprovalEvent,
    signer: &EvidenceSigner,
) -> Result<(), SignError> {
    let bytes = canonical_evidence_bytes(&approval.unsigned_view())
        .map_err(|err| SignError::Key(err.to_string()))?;
    approval.signature = Some(signer.sign(&bytes)?);
    Ok(())
}

/// Returns `base_time + last_seq * interval` for a non-empty chain.
fn last_event_timestamp(ctx: &ExecutionContext, events: &[EvidenceEvent]) -> Option<Timestamp> {
    let last_seq = events.last().map(|event| event.seq)?;
    let offset = i64::try_from(last_seq).ok()?.saturating_mul(EVENT_INTERVAL_MILLIS);
    Some(ctx.base_time().plus_millis(offset))
}
