// mk10-core/src/core/dag.rs
// ============================================================================
// Module: MK10 Plan Graph
// Description: Typed node and edge graph with deterministic ordering.
// Purpose: Validate transformation plans and derive their canonical fingerprints.
// Dependencies: crate::core::{hashing, identifiers}, serde
// ============================================================================

//! ## Overview
//! A plan is an ordered sequence of nodes plus a set of directed edges between
//! named ports. Edges are a set, so duplicates collapse on insertion and on
//! deserialization. Scheduling is deterministic: topological order uses
//! Kahn's algorithm with ties broken by the byte-lexicographic order of node
//! ids, and cycle detection uses three-color depth-first search so failures
//! name the offending nodes. The fingerprint is the canonical hash of the
//! sorted node list and sorted edge set.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde::de;
use serde_json::Value;
use thiserror::Error;

use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::DagId;
use crate::core::identifiers::NodeId;
use crate::core::identifiers::PortName;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while building or validating a plan.
#[derive(Debug, Error)]
pub enum DagError {
    /// The plan violates a structural constraint.
    #[error("invalid plan schema at {0}: {1}")]
    SchemaInvalid(String, String),
    /// The plan contains a cycle through the listed nodes.
    #[error("cycle detected through nodes {}", format_node_ids(.0))]
    CycleDetected(Vec<NodeId>),
    /// An edge references a port the node does not declare, or a declared
    /// input port is not satisfied by exactly one edge.
    #[error("port mismatch on node {node}: {detail}")]
    PortMismatch {
        /// Node whose ports do not line up.
        node: NodeId,
        /// Description of the mismatch.
        detail: String,
    },
    /// Hashing the plan failed.
    #[error(transparent)]
    Hash(#[from] HashError),
}

/// Formats node ids for error display.
fn format_node_ids(ids: &[NodeId]) -> String {
    let parts: Vec<&str> = ids.iter().map(NodeId::as_str).collect();
    parts.join(", ")
}

// ============================================================================
// SECTION: Node Specification
// ============================================================================

/// Node specification inside a plan.
///
/// # Invariants
/// - `id` is unique within the plan.
/// - `config` keys and values are restricted to the canonical evidence subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Node identifier, unique within the plan.
    pub id: NodeId,
    /// Node type tag resolved against the node registry.
    #[serde(rename = "type")]
    pub node_type: String,
    /// Node configuration mapping.
    #[serde(default)]
    pub config: BTreeMap<String, Value>,
}

impl NodeSpec {
    /// Creates a node specification with an empty configuration.
    #[must_use]
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(id),
            node_type: node_type.into(),
            config: BTreeMap::new(),
        }
    }

    /// Returns the canonical hash of the node configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the configuration cannot be canonicalized.
    pub fn config_fingerprint(&self) -> Result<HashDigest, HashError> {
        hash_canonical_json(DEFAULT_HASH_ALGORITHM, &self.config)
    }
}

// ============================================================================
// SECTION: Edge Specification
// ============================================================================

/// One endpoint of an edge: a node and one of its ports.
///
/// # Invariants
/// - Wire form is `"node.port"`; the port name contains no `.`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeEndpoint {
    /// Node the endpoint belongs to.
    pub node: NodeId,
    /// Port on the node.
    pub port: PortName,
}

impl EdgeEndpoint {
    /// Creates an endpoint.
    #[must_use]
    pub fn new(node: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            node: NodeId::new(node),
            port: PortName::new(port),
        }
    }
}

impl fmt::Display for EdgeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.port)
    }
}

impl Serialize for EdgeEndpoint {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EdgeEndpoint {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let (node, port) = raw
            .rsplit_once('.')
            .ok_or_else(|| de::Error::custom(format!("expected node.port, got {raw}")))?;
        if node.is_empty() || port.is_empty() {
            return Err(de::Error::custom(format!("expected node.port, got {raw}")));
        }
        Ok(Self::new(node, port))
    }
}

/// Directed dependency between two node ports.
///
/// # Invariants
/// - Edges form a set; duplicates collapse silently.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeSpec {
    /// Producing endpoint.
    pub from: EdgeEndpoint,
    /// Consuming endpoint.
    pub to: EdgeEndpoint,
}

impl EdgeSpec {
    /// Creates an edge between two endpoints.
    #[must_use]
    pub fn new(from: EdgeEndpoint, to: EdgeEndpoint) -> Self {
        Self {
            from,
            to,
        }
    }
}

// ============================================================================
// SECTION: Plan Specification
// ============================================================================

/// Plan specification: an ordered node sequence plus an edge set.
///
/// # Invariants
/// - Node ids are unique.
/// - Every edge endpoint references an existing node.
/// - No two edges write the same `(node, port)` input.
/// - The graph is acyclic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagSpec {
    /// Plan identifier.
    pub id: DagId,
    /// Nodes in declaration order.
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    /// Edge set; duplicates collapse.
    #[serde(default)]
    pub edges: BTreeSet<EdgeSpec>,
}

impl DagSpec {
    /// Creates an empty plan.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: DagId::new(id),
            nodes: Vec::new(),
            edges: BTreeSet::new(),
        }
    }

    /// Adds a node to the plan.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::SchemaInvalid`] when the node id already exists.
    pub fn add_node(&mut self, node: NodeSpec) -> Result<(), DagError> {
        if self.node(&node.id).is_some() {
            return Err(DagError::SchemaInvalid(
                format!("nodes.{}", node.id),
                "duplicate node id".to_string(),
            ));
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Adds an edge to the plan. Returns false when the edge already existed.
    pub fn add_edge(&mut self, edge: EdgeSpec) -> bool {
        self.edges.insert(edge)
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&NodeSpec> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    /// Returns the incoming edges of a node, sorted.
    #[must_use]
    pub fn incoming(&self, id: &NodeId) -> Vec<&EdgeSpec> {
        self.edges.iter().filter(|edge| &edge.to.node == id).collect()
    }

    /// Returns the outgoing edges of a node, sorted.
    #[must_use]
    pub fn outgoing(&self, id: &NodeId) -> Vec<&EdgeSpec> {
        self.edges.iter().filter(|edge| &edge.from.node == id).collect()
    }

    /// Returns true when the node has no incoming edges.
    #[must_use]
    pub fn is_source(&self, id: &NodeId) -> bool {
        self.incoming(id).is_empty()
    }

    /// Validates the structural invariants of the plan.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::SchemaInvalid`] for duplicate ids, dangling edge
    /// endpoints, or doubly written input ports, and [`DagError::CycleDetected`]
    /// when the graph is not acyclic.
    pub fn validate_structure(&self) -> Result<(), DagError> {
        let mut seen: BTreeSet<&NodeId> = BTreeSet::new();
        for node in &self.nodes {
            if !seen.insert(&node.id) {
                return Err(DagError::SchemaInvalid(
                    format!("nodes.{}", node.id),
                    "duplicate node id".to_string(),
                ));
            }
        }

        let mut written: BTreeSet<(&NodeId, &PortName)> = BTreeSet::new();
        for edge in &self.edges {
            for endpoint in [&edge.from, &edge.to] {
                if !seen.contains(&endpoint.node) {
                    return Err(DagError::SchemaInvalid(
                        format!("edges.{endpoint}"),
                        "edge references unknown node".to_string(),
                    ));
                }
            }
            if !written.insert((&edge.to.node, &edge.to.port)) {
                return Err(DagError::PortMismatch {
                    node: edge.to.node.clone(),
                    detail: format!("input port {} has more than one incoming edge", edge.to.port),
                });
            }
        }

        self.detect_cycles()
    }

    /// Detects cycles with three-color depth-first search.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::CycleDetected`] listing the nodes on the cycle.
    pub fn detect_cycles(&self) -> Result<(), DagError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        fn visit(
            dag: &DagSpec,
            id: &NodeId,
            colors: &mut BTreeMap<NodeId, Color>,
            path: &mut Vec<NodeId>,
        ) -> Result<(), DagError> {
            colors.insert(id.clone(), Color::Gray);
            path.push(id.clone());
            let mut successors: Vec<&NodeId> =
                dag.outgoing(id).into_iter().map(|edge| &edge.to.node).collect();
            successors.sort();
            successors.dedup();
            for next in successors {
                match colors.get(next).copied().unwrap_or(Color::White) {
                    Color::Gray => {
                        let start =
                            path.iter().position(|seen| seen == next).unwrap_or(0);
                        return Err(DagError::CycleDetected(path[start ..].to_vec()));
                    }
                    Color::White => visit(dag, next, colors, path)?,
                    Color::Black => {}
                }
            }
            path.pop();
            colors.insert(id.clone(), Color::Black);
            Ok(())
        }

        let mut colors: BTreeMap<NodeId, Color> = BTreeMap::new();
        let mut ids: Vec<&NodeId> = self.nodes.iter().map(|node| &node.id).collect();
        ids.sort();
        for id in ids {
            if colors.get(id).copied().unwrap_or(Color::White) == Color::White {
                let mut path = Vec::new();
                visit(self, id, &mut colors, &mut path)?;
            }
        }
        Ok(())
    }

    /// Returns the deterministic topological order of the plan.
    ///
    /// Uses Kahn's algorithm; when several nodes are ready, the one with the
    /// byte-lexicographically smallest id runs first.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::CycleDetected`] when no topological order exists.
    pub fn topo_order(&self) -> Result<Vec<NodeId>, DagError> {
        let mut in_degree: BTreeMap<&NodeId, usize> =
            self.nodes.iter().map(|node| (&node.id, 0)).collect();
        for edge in &self.edges {
            if let Some(degree) = in_degree.get_mut(&edge.to.node) {
                *degree += 1;
            }
        }

        let mut ready: BTreeSet<&NodeId> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(next) = ready.iter().next().copied() {
            ready.remove(next);
            order.push(next.clone());
            for edge in self.outgoing(next) {
                if let Some(degree) = in_degree.get_mut(&edge.to.node) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        ready.insert(&edge.to.node);
                    }
                }
            }
        }

        if order.len() != self.nodes.len() {
            // Kahn cannot name the cycle; the three-color walk can.
            self.detect_cycles()?;
            return Err(DagError::CycleDetected(Vec::new()));
        }
        Ok(order)
    }

    /// Returns the canonical fingerprint of the plan: the hash of its sorted
    /// node list and sorted edge set.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Hash`] when canonicalization fails.
    pub fn fingerprint(&self) -> Result<HashDigest, DagError> {
        let mut nodes = self.nodes.clone();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        let canonical = serde_json::json!({
            "edges": self.edges,
            "nodes": nodes,
        });
        Ok(hash_canonical_json(DEFAULT_HASH_ALGORITHM, &canonical)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passthrough(id: &str) -> NodeSpec {
        NodeSpec::new(id, "passthrough")
    }

    fn edge(from: &str, to: &str) -> EdgeSpec {
        let (from_node, from_port) = from.rsplit_once('.').expect("from");
        let (to_node, to_port) = to.rsplit_once('.').expect("to");
        EdgeSpec::new(
            EdgeEndpoint::new(from_node, from_port),
            EdgeEndpoint::new(to_node, to_port),
        )
    }

    #[test]
    fn duplicate_edges_collapse() {
        let mut dag = DagSpec::new("plan");
        dag.add_node(passthrough("a")).expect("a");
        dag.add_node(passthrough("b")).expect("b");
        assert!(dag.add_edge(edge("a.out", "b.in")));
        assert!(!dag.add_edge(edge("a.out", "b.in")));
        assert_eq!(dag.edges.len(), 1);
    }

    #[test]
    fn topo_order_breaks_ties_lexicographically() {
        let mut dag = DagSpec::new("plan");
        for id in ["c", "a", "b"] {
            dag.add_node(passthrough(id)).expect("node");
        }
        let order = dag.topo_order().expect("order");
        let ids: Vec<&str> = order.iter().map(NodeId::as_str).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn cycle_detection_names_the_cycle() {
        let mut dag = DagSpec::new("plan");
        dag.add_node(passthrough("A")).expect("A");
        dag.add_node(passthrough("B")).expect("B");
        dag.add_edge(edge("A.out", "B.in"));
        dag.add_edge(edge("B.out", "A.in"));
        let err = dag.validate_structure().unwrap_err();
        match err {
            DagError::CycleDetected(ids) => {
                let ids: Vec<&str> = ids.iter().map(NodeId::as_str).collect();
                assert_eq!(ids, ["A", "B"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn double_written_input_port_is_a_port_mismatch() {
        let mut dag = DagSpec::new("plan");
        for id in ["a", "b", "c"] {
            dag.add_node(passthrough(id)).expect("node");
        }
        dag.add_edge(edge("a.out", "c.in"));
        dag.add_edge(edge("b.out", "c.in"));
        let err = dag.validate_structure().unwrap_err();
        assert!(matches!(err, DagError::PortMismatch { node, .. } if node.as_str() == "c"));
    }

    #[test]
    fn fingerprint_ignores_node_declaration_order() {
        let mut forward = DagSpec::new("plan");
        forward.add_node(passthrough("a")).expect("a");
        forward.add_node(passthrough("b")).expect("b");

        let mut reversed = DagSpec::new("plan");
        reversed.add_node(passthrough("b")).expect("b");
        reversed.add_node(passthrough("a")).expect("a");

        assert_eq!(
            forward.fingerprint().expect("fp").value,
            reversed.fingerprint().expect("fp").value
        );
    }

    #[test]
    fn wire_form_round_trips_edge_endpoints() {
        let json = r#"{
            "id": "plan",
            "nodes": [{"id": "a", "type": "passthrough"}, {"id": "b", "type": "passthrough"}],
            "edges": [{"from": "a.out", "to": "b.in"}, {"from": "a.out", "to": "b.in"}]
        }"#;
        let dag: DagSpec = serde_json::from_str(json).expect("parse");
        assert_eq!(dag.edges.len(), 1, "duplicate wire edges collapse");
        let back = serde_json::to_value(&dag).expect("serialize");
        assert_eq!(back["edges"][0]["from"], "a.out");
    }
}
