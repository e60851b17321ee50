// mk10-core/src/runtime/context.rs
// ============================================================================
// Module: MK10 Execution Context
// Description: Immutable per-run inputs and the deterministic time base.
// Purpose: Fix everything a run may observe before the first event is recorded.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! The execution context is the single source of truth about "when" and
//! "what inputs" for evidence purposes. It is constructed once per run,
//! validates the plan up front (a cyclic plan never constructs a context, so
//! no run and no events exist for it), and exposes no mutators. The execution
//! id is `sha256(canonical(dag) || workspace_id)`; the base time is caller
//! supplied or derived from the plan fingerprint so that runs without a host
//! clock stay fully deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::artifact::IngestManifest;
use crate::core::dag::DagError;
use crate::core::dag::DagSpec;
use crate::core::hashing::HashError;
use crate::core::hashing::canonical_json_bytes;
use crate::core::hashing::sha256_hex;
use crate::core::identifiers::ExecutionId;
use crate::core::identifiers::WorkspaceId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while constructing an execution context.
#[derive(Debug, Error)]
pub enum ContextError {
    /// The plan failed structural validation.
    #[error(transparent)]
    Dag(#[from] DagError),
    /// Canonicalizing the plan failed.
    #[error(transparent)]
    Hash(#[from] HashError),
}

// ============================================================================
// SECTION: Execution Context
// ============================================================================

/// Immutable inputs to a run.
///
/// # Invariants
/// - The plan is structurally valid (unique ids, resolvable edges, acyclic).
/// - Ingest timestamps equal the base time; nothing here came from the wall clock.
/// - No field is mutable after construction.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// The plan to execute; exclusively owned for the duration of the run.
    dag: DagSpec,
    /// Workspace identifier.
    workspace_id: WorkspaceId,
    /// Base instant all evidence timestamps derive from.
    base_time: Timestamp,
    /// Ordered ingest assets.
    ingest: IngestManifest,
    /// Deterministic execution identifier.
    execution_id: ExecutionId,
    /// Canonical plan fingerprint (hex).
    dag_fingerprint: String,
}

impl ExecutionContext {
    /// Builds a context, validating the plan and deriving the run identity.
    ///
    /// When `base_time` is `None`, it is derived from the plan fingerprint as
    /// `epoch + (fingerprint mod 2^31) seconds`.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Dag`] when the plan is invalid (including
    /// cycles) and [`ContextError::Hash`] when it cannot be canonicalized.
    pub fn new(
        dag: DagSpec,
        workspace_id: WorkspaceId,
        base_time: Option<Timestamp>,
        mut ingest: IngestManifest,
    ) -> Result<Self, ContextError> {
        dag.validate_structure()?;
        let dag_fingerprint = dag.fingerprint()?.value;
        let base_time =
            base_time.unwrap_or_else(|| Timestamp::from_fingerprint_hex(&dag_fingerprint));

        let mut preimage = canonical_json_bytes(&dag)?;
        preimage.extend_from_slice(workspace_id.as_str().as_bytes());
        let execution_id = ExecutionId::new(sha256_hex(&preimage));

        for asset in &mut ingest.assets {
            asset.ingest_timestamp = base_time;
        }

        Ok(Self {
            dag,
            workspace_id,
            base_time,
            ingest,
            execution_id,
            dag_fingerprint,
        })
    }

    /// Returns the plan.
    #[must_use]
    pub fn dag(&self) -> &DagSpec {
        &self.dag
    }

    /// Returns the workspace identifier.
    #[must_use]
    pub fn workspace_id(&self) -> &WorkspaceId {
        &self.workspace_id
    }

    /// Returns the base time of the run.
    #[must_use]
    pub const fn base_time(&self) -> Timestamp {
        self.base_time
    }

    /// Returns the ingest manifest.
    #[must_use]
    pub fn ingest(&self) -> &IngestManifest {
        &self.ingest
    }

    /// Returns the deterministic execution identifier.
    #[must_use]
    pub fn execution_id(&self) -> &ExecutionId {
        &self.execution_id
    }

    /// Returns the canonical plan fingerprint (hex).
    #[must_use]
    pub fn dag_fingerprint(&self) -> &str {
        &self.dag_fingerprint
    }
}
