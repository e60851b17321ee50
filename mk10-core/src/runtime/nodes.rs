// mk10-core/src/runtime/nodes.rs
// ============================================================================
// Module: MK10 Node Registry
// Description: Immutable node-type registry and the canonical passthrough.
// Purpose: Resolve node type tags to pure transformation behaviors.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Node types are resolved by string tag against an immutable registry;
//! polymorphism is the capability set on [`NodeBehavior`], not an inheritance
//! hierarchy. The framework ships one canonical implementation,
//! `passthrough`, whose outputs equal its inputs. All other node types are
//! external collaborators that must guarantee their own determinism; the
//! engine audits them at run time regardless.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;

use crate::core::identifiers::ContentAddress;
use crate::core::identifiers::NodeId;
use crate::core::identifiers::PortName;
use crate::interfaces::ArtifactAccess;
use crate::interfaces::NodeBehavior;
use crate::interfaces::NodeError;

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Immutable registry of node behaviors keyed by type tag.
///
/// # Invariants
/// - Registration happens before any run starts; runs only read.
#[derive(Default)]
pub struct NodeRegistry {
    /// Behaviors keyed by their type tag.
    behaviors: BTreeMap<String, Box<dyn NodeBehavior + Send + Sync>>,
}

impl NodeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in behaviors registered.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(PassthroughNode);
        registry
    }

    /// Registers a behavior under its own type tag.
    pub fn register(&mut self, behavior: impl NodeBehavior + Send + Sync + 'static) {
        self.behaviors.insert(behavior.node_type().to_string(), Box::new(behavior));
    }

    /// Resolves a behavior by type tag.
    #[must_use]
    pub fn get(&self, node_type: &str) -> Option<&(dyn NodeBehavior + Send + Sync)> {
        self.behaviors.get(node_type).map(AsRef::as_ref)
    }

    /// Returns the registered type tags in sorted order.
    #[must_use]
    pub fn node_types(&self) -> Vec<&str> {
        self.behaviors.keys().map(String::as_str).collect()
    }
}

// ============================================================================
// SECTION: Passthrough
// ============================================================================

/// Canonical passthrough node: outputs equal inputs.
pub struct PassthroughNode;

/// Input port of the passthrough node.
pub const PASSTHROUGH_IN: &str = "in";
/// Output port of the passthrough node.
pub const PASSTHROUGH_OUT: &str = "out";

impl NodeBehavior for PassthroughNode {
    fn node_type(&self) -> &str {
        "passthrough"
    }

    fn input_ports(&self) -> Vec<PortName> {
        vec![PortName::new(PASSTHROUGH_IN)]
    }

    fn output_ports(&self) -> Vec<PortName> {
        vec![PortName::new(PASSTHROUGH_OUT)]
    }

    fn execute(
        &self,
        node_id: &NodeId,
        _config: &BTreeMap<String, Value>,
        inputs: &BTreeMap<PortName, ContentAddress>,
        _artifacts: &mut dyn ArtifactAccess,
    ) -> Result<BTreeMap<PortName, ContentAddress>, NodeError> {
        let input = inputs.get(&PortName::new(PASSTHROUGH_IN)).ok_or_else(|| {
            NodeError::PortMismatch {
                node: node_id.clone(),
                detail: format!("missing input port {PASSTHROUGH_IN}"),
            }
        })?;
        let mut outputs = BTreeMap::new();
        outputs.insert(PortName::new(PASSTHROUGH_OUT), input.clone());
        Ok(outputs)
    }

    fn evidence(&self, _config: &BTreeMap<String, Value>) -> Value {
        serde_json::json!({"behavior": "passthrough"})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::store::ArtifactStore;

    #[test]
    fn passthrough_output_address_equals_input_address() {
        let mut store = ArtifactStore::new();
        let address = store.put(b"abc".to_vec(), None);
        let mut inputs = BTreeMap::new();
        inputs.insert(PortName::new(PASSTHROUGH_IN), address.clone());

        let outputs = PassthroughNode
            .execute(&NodeId::new("n"), &BTreeMap::new(), &inputs, &mut store)
            .expect("execute");
        assert_eq!(outputs.get(&PortName::new(PASSTHROUGH_OUT)), Some(&address));
    }

    #[test]
    fn builtin_registry_resolves_passthrough() {
        let registry = NodeRegistry::with_builtin();
        assert!(registry.get("passthrough").is_some());
        assert!(registry.get("unknown").is_none());
        assert_eq!(registry.node_types(), ["passthrough"]);
    }
}
