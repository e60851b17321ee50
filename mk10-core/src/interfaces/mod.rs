// mk10-core/src/interfaces/mod.rs
// ============================================================================
// Module: MK10 Interfaces
// Description: Seams for node behaviors, format validators, and transport.
// Purpose: Define the contract surfaces the runtime integrates through.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how MK10-PRO integrates with pluggable collaborators
//! without embedding their details. Node behaviors must be pure: no wall
//! clock, no randomness, no environment, no network; the engine audits this
//! at run time by re-executing every node. Format validators are pure
//! inspectors. Transport sinks and readers move sealed bundle bytes and are
//! the only parties that touch storage.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::core::artifact::IngestManifest;
use crate::core::identifiers::ContentAddress;
use crate::core::identifiers::FormatTag;
use crate::core::identifiers::NodeId;
use crate::core::identifiers::PortName;
use crate::core::validation::ValidationResult;

// ============================================================================
// SECTION: Artifact Access
// ============================================================================

/// Read-only lookup of artifact bytes by content address.
pub trait ArtifactLookup {
    /// Returns the bytes stored at the address, if present.
    fn get(&self, address: &ContentAddress) -> Option<&[u8]>;
}

/// Read-write artifact access handed to executing nodes.
///
/// Writes are keyed by the hash of the bytes, so the store is write-once by
/// construction: the same bytes always land at the same address.
pub trait ArtifactAccess: ArtifactLookup {
    /// Stores bytes and returns their content address.
    fn put(&mut self, bytes: Vec<u8>, ext: Option<&str>) -> ContentAddress;
}

// ============================================================================
// SECTION: Node Behavior
// ============================================================================

/// Node execution errors.
#[derive(Debug, Error)]
pub enum NodeError {
    /// The node received ports it does not declare, or is missing some.
    #[error("port mismatch on node {node}: {detail}")]
    PortMismatch {
        /// Node whose ports do not line up.
        node: NodeId,
        /// Description of the mismatch.
        detail: String,
    },
    /// The transformation itself failed.
    #[error("node {node} failed: {message}")]
    Failed {
        /// Node that failed.
        node: NodeId,
        /// Failure message.
        message: String,
    },
}

/// Pure transformation contract for a node type.
///
/// Implementations consume inputs addressed by content address and produce
/// outputs addressed by content address. For fixed inputs and configuration
/// the outputs must be fixed; the engine enforces this with a determinism
/// audit on every execution.
pub trait NodeBehavior {
    /// Returns the type tag this behavior registers under.
    fn node_type(&self) -> &str;

    /// Returns the declared input port names.
    fn input_ports(&self) -> Vec<PortName>;

    /// Returns the declared output port names.
    fn output_ports(&self) -> Vec<PortName>;

    /// Executes the transformation.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError`] when ports do not line up or the transformation
    /// fails.
    fn execute(
        &self,
        node_id: &NodeId,
        config: &BTreeMap<String, Value>,
        inputs: &BTreeMap<PortName, ContentAddress>,
        artifacts: &mut dyn ArtifactAccess,
    ) -> Result<BTreeMap<PortName, ContentAddress>, NodeError>;

    /// Returns the behavior's evidence payload for a given configuration.
    fn evidence(&self, config: &BTreeMap<String, Value>) -> Value;
}

// ============================================================================
// SECTION: Format Validators
// ============================================================================

/// Validation provider errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The provider reported an error distinct from a failed validation.
    #[error("format validator {format} error: {message}")]
    Provider {
        /// Format tag of the provider.
        format: FormatTag,
        /// Error message.
        message: String,
    },
}

/// Artifact set handed to a format validator.
#[derive(Clone, Copy)]
pub struct ValidationTarget<'a> {
    /// Ingest manifest of the run.
    pub manifest: &'a IngestManifest,
    /// Final output addresses per node and port.
    pub outputs: &'a BTreeMap<NodeId, BTreeMap<PortName, ContentAddress>>,
    /// Read-only access to artifact bytes.
    pub artifacts: &'a dyn ArtifactLookup,
}

/// Uniform contract for structural validation providers.
///
/// Validators are pure inspectors: they must not mutate artifacts nor consult
/// the wall clock.
pub trait FormatValidator {
    /// Returns the format tag this validator registers under.
    fn format(&self) -> FormatTag;

    /// Validates the artifact set.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when inspection itself fails; a structural
    /// defect is a `passed = false` result, not an error.
    fn validate(&self, target: &ValidationTarget<'_>) -> Result<ValidationResult, ValidationError>;
}

// ============================================================================
// SECTION: Bundle Transport
// ============================================================================

/// Bundle transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The sink or reader reported an error.
    #[error("bundle transport error at {path}: {message}")]
    Io {
        /// Transport-relative path.
        path: String,
        /// Error message.
        message: String,
    },
}

/// Sink for sealed bundle bytes.
pub trait BundleSink {
    /// Writes bytes at a transport-relative path.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when writing fails.
    fn write(&mut self, path: &str, bytes: &[u8]) -> Result<(), TransportError>;
}

/// Reader for sealed bundle bytes.
pub trait BundleReader {
    /// Reads bytes from a transport-relative path.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when reading fails.
    fn read(&self, path: &str) -> Result<Vec<u8>, TransportError>;
}
