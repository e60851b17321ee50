// mk10-core/src/runtime/engine.rs
// ============================================================================
// Module: MK10 Execution Engine
// Description: Deterministic plan execution with per-node determinism audits.
// Purpose: Drive a plan against a context and record sealed evidence for it.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The engine is the single canonical execution path. It plans first (port
//! resolution and node-type lookup happen before any event exists), then
//! records `execution_start`, one `ingest_recorded` per asset, one audited
//! `node_execution` per node in deterministic topological order, and finally
//! `execution_complete`. Every node is executed twice with identical inputs
//! and configuration; if the output addresses differ the run aborts with a
//! nondeterminism failure. Execution is single-threaded and cooperative: a
//! cancel flag is honored between nodes, never mid-node. There are no
//! retries; determinism plus purity makes a retry identical to a rerun, which
//! is the caller's concern.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use serde_json::Value;
use thiserror::Error;

use crate::core::dag::DagError;
use crate::core::evidence::EvidenceError;
use crate::core::evidence::EvidenceKind;
use crate::core::evidence::EvidenceLog;
use crate::core::evidence::ExecutionCompletePayload;
use crate::core::evidence::ExecutionFailurePayload;
use crate::core::evidence::ExecutionStartPayload;
use crate::core::evidence::IngestRecordedPayload;
use crate::core::evidence::NodeExecutionPayload;
use crate::core::hashing::HashError;
use crate::core::identifiers::ContentAddress;
use crate::core::identifiers::NodeId;
use crate::core::identifiers::PortName;
use crate::interfaces::NodeBehavior;
use crate::interfaces::NodeError;
use crate::runtime::context::ExecutionContext;
use crate::runtime::nodes::NodeRegistry;
use crate::runtime::recorder::EvidenceRecorder;
use crate::runtime::store::ArtifactStore;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while planning or executing a run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A node references a type tag absent from the registry.
    #[error("unknown node type {0}")]
    UnknownNodeType(String),
    /// Ports could not be resolved during planning or execution.
    #[error("port mismatch on node {node}: {detail}")]
    PortMismatch {
        /// Node whose ports do not line up.
        node: NodeId,
        /// Description of the mismatch.
        detail: String,
    },
    /// A node produced different output addresses on re-execution.
    #[error("node {0} is nondeterministic")]
    NondeterministicNode(NodeId),
    /// A node-level transformation failed.
    #[error("node {node} failed: {message}")]
    NodeFailed {
        /// Node that failed.
        node: NodeId,
        /// Failure message.
        message: String,
    },
    /// The run was cancelled between nodes.
    #[error("execution cancelled")]
    Cancelled,
    /// The plan is invalid.
    #[error(transparent)]
    Dag(#[from] DagError),
    /// Recording evidence failed; no partial bundle is emitted.
    #[error(transparent)]
    Evidence(#[from] EvidenceError),
    /// Canonicalization failed.
    #[error(transparent)]
    Hash(#[from] HashError),
}

// ============================================================================
// SECTION: Cancellation
// ============================================================================

/// Cooperative cancel flag checked between nodes.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates a flag in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true when cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// SECTION: Execution Report
// ============================================================================

/// Result of one run: the frozen log plus the outcome.
///
/// The log is always returned: a failed run still ends in a frozen log whose
/// last event is the `execution_failure` describing the abort.
#[derive(Debug)]
pub struct ExecutionReport {
    /// The frozen evidence log.
    pub log: EvidenceLog,
    /// Output addresses per node and port for the nodes that completed.
    pub outputs: BTreeMap<NodeId, BTreeMap<PortName, ContentAddress>>,
    /// Overall outcome of the run.
    pub outcome: Result<(), EngineError>,
}

// ============================================================================
// SECTION: Planning
// ============================================================================

/// Source of one input port's content address.
#[derive(Debug, Clone)]
enum InputBinding {
    /// Bound to an upstream node's output port.
    Upstream(NodeId, PortName),
    /// Bound to an ingest asset.
    Ingest(ContentAddress),
}

/// One node with fully resolved behavior and input bindings.
struct PlannedNode<'a> {
    /// Node identifier.
    id: NodeId,
    /// Node type tag.
    node_type: String,
    /// Node configuration.
    config: BTreeMap<String, Value>,
    /// Canonical hash of the node configuration (hex).
    config_fingerprint: String,
    /// Resolved behavior from the registry.
    behavior: &'a (dyn NodeBehavior + Send + Sync),
    /// Input bindings per declared input port.
    bindings: BTreeMap<PortName, InputBinding>,
    /// Declared output ports.
    output_ports: BTreeSet<PortName>,
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Deterministic execution engine.
pub struct Engine<'a> {
    /// Node-type registry; immutable for the process lifetime.
    registry: &'a NodeRegistry,
}

impl<'a> Engine<'a> {
    /// Creates an engine over the given registry.
    #[must_use]
    pub const fn new(registry: &'a NodeRegistry) -> Self {
        Self {
            registry,
        }
    }

    /// Executes the context's plan, recording sealed evidence into a fresh
    /// log and storing outputs in the given write-once store.
    ///
    /// Planning failures (unknown node types, port mismatches) surface before
    /// any event is recorded. Node-level failures record an
    /// `execution_failure` event and abort.
    #[must_use]
    pub fn execute(
        &self,
        ctx: &ExecutionContext,
        store: &mut ArtifactStore,
        cancel: Option<&CancelFlag>,
    ) -> ExecutionReport {
        let mut recorder = EvidenceRecorder::new(ctx.base_time());
        let mut outputs: BTreeMap<NodeId, BTreeMap<PortName, ContentAddress>> = BTreeMap::new();

        let planned = match self.plan(ctx) {
            Ok(planned) => planned,
            Err(err) => {
                return ExecutionReport {
                    log: recorder.freeze(),
                    outputs,
                    outcome: Err(err),
                };
            }
        };

        let outcome = self.run(ctx, store, cancel, &mut recorder, &mut outputs, &planned);
        ExecutionReport {
            log: recorder.freeze(),
            outputs,
            outcome,
        }
    }

    /// Resolves the topological order, node behaviors, and input bindings.
    fn plan(&self, ctx: &ExecutionContext) -> Result<Vec<PlannedNode<'a>>, EngineError> {
        let dag = ctx.dag();
        let order = dag.topo_order()?;
        let mut planned = Vec::with_capacity(order.len());

        for id in &order {
            let node = dag.node(id).ok_or_else(|| {
                DagError::SchemaInvalid(format!("nodes.{id}"), "node vanished".to_string())
            })?;
            let behavior = self
                .registry
                .get(&node.node_type)
                .ok_or_else(|| EngineError::UnknownNodeType(node.node_type.clone()))?;
            let input_ports: BTreeSet<PortName> = behavior.input_ports().into_iter().collect();
            let output_ports: BTreeSet<PortName> = behavior.output_ports().into_iter().collect();

            let incoming = dag.incoming(id);
            let mut bindings: BTreeMap<PortName, InputBinding> = BTreeMap::new();

            if incoming.is_empty() {
                // Source node: bind declared input ports to ingest assets in
                // manifest order.
                let assets = &ctx.ingest().assets;
                for (idx, port) in input_ports.iter().enumerate() {
                    let asset = assets.get(idx).ok_or_else(|| EngineError::PortMismatch {
                        node: id.clone(),
                        detail: format!(
                            "input port {port} has no incoming edge and no ingest asset at position {idx}"
                        ),
                    })?;
                    bindings
                        .insert(port.clone(), InputBinding::Ingest(asset.content_address.clone()));
                }
            } else {
                for edge in &incoming {
                    if !input_ports.contains(&edge.to.port) {
                        return Err(EngineError::PortMismatch {
                            node: id.clone(),
                            detail: format!("undeclared input port {}", edge.to.port),
                        });
                    }
                    let upstream = dag.node(&edge.from.node).ok_or_else(|| {
                        DagError::SchemaInvalid(
                            format!("edges.{}", edge.from),
                            "edge references unknown node".to_string(),
                        )
                    })?;
                    let upstream_behavior =
                        self.registry.get(&upstream.node_type).ok_or_else(|| {
                            EngineError::UnknownNodeType(upstream.node_type.clone())
                        })?;
                    if !upstream_behavior.output_ports().contains(&edge.from.port) {
                        return Err(EngineError::PortMismatch {
                            node: edge.from.node.clone(),
                            detail: format!("undeclared output port {}", edge.from.port),
                        });
                    }
                    bindings.insert(
                        edge.to.port.clone(),
                        InputBinding::Upstream(edge.from.node.clone(), edge.from.port.clone()),
                    );
                }
                let bound: BTreeSet<&PortName> = bindings.keys().collect();
                for port in &input_ports {
                    if !bound.contains(port) {
                        return Err(EngineError::PortMismatch {
                            node: id.clone(),
                            detail: format!("input port {port} has no incoming edge"),
                        });
                    }
                }
            }

            planned.push(PlannedNode {
                id: id.clone(),
                node_type: node.node_type.clone(),
                config: node.config.clone(),
                config_fingerprint: node.config_fingerprint()?.value,
                behavior,
                bindings,
                output_ports,
            });
        }
        Ok(planned)
    }

    /// Runs the planned nodes, recording evidence as it goes.
    fn run(
        &self,
        ctx: &ExecutionContext,
        store: &mut ArtifactStore,
        cancel: Option<&CancelFlag>,
        recorder: &mut EvidenceRecorder,
        outputs: &mut BTreeMap<NodeId, BTreeMap<PortName, ContentAddress>>,
        planned: &[PlannedNode<'a>],
    ) -> Result<(), EngineError> {
        recorder.record_typed(
            EvidenceKind::ExecutionStart,
            &ExecutionStartPayload {
                execution_id: ctx.execution_id().clone(),
                dag_id: ctx.dag().id.clone(),
                workspace_id: ctx.workspace_id().clone(),
                dag_fingerprint: ctx.dag_fingerprint().to_string(),
                node_order: planned.iter().map(|plan| plan.id.clone()).collect(),
            },
        )?;

        for asset in &ctx.ingest().assets {
            recorder.record_typed(
                EvidenceKind::IngestRecorded,
                &IngestRecordedPayload {
                    asset: asset.clone(),
                },
            )?;
        }

        for plan in planned {
            if cancel.is_some_and(CancelFlag::is_cancelled) {
                self.record_failure(ctx, recorder, None, "cancelled", "run cancelled")?;
                return Err(EngineError::Cancelled);
            }

            let mut inputs: BTreeMap<PortName, ContentAddress> = BTreeMap::new();
            for (port, binding) in &plan.bindings {
                let address = match binding {
                    InputBinding::Ingest(address) => address.clone(),
                    InputBinding::Upstream(src_node, src_port) => outputs
                        .get(src_node)
                        .and_then(|ports| ports.get(src_port))
                        .cloned()
                        .ok_or_else(|| EngineError::PortMismatch {
                            node: plan.id.clone(),
                            detail: format!("upstream output {src_node}.{src_port} missing"),
                        })?,
                };
                inputs.insert(port.clone(), address);
            }

            let first = match plan.behavior.execute(&plan.id, &plan.config, &inputs, store) {
                Ok(result) => result,
                Err(err) => return self.fail_node(ctx, recorder, &plan.id, &err),
            };

            // Determinism audit: re-execute with identical inputs and
            // configuration, then compare output addresses byte-for-byte.
            let second = match plan.behavior.execute(&plan.id, &plan.config, &inputs, store) {
                Ok(result) => result,
                Err(err) => return self.fail_node(ctx, recorder, &plan.id, &err),
            };
            if first != second {
                self.record_failure(
                    ctx,
                    recorder,
                    Some(&plan.id),
                    "nondeterministic_node",
                    "re-execution produced different output addresses",
                )?;
                return Err(EngineError::NondeterministicNode(plan.id.clone()));
            }

            let produced: BTreeSet<PortName> = first.keys().cloned().collect();
            if produced != plan.output_ports {
                self.record_failure(
                    ctx,
                    recorder,
                    Some(&plan.id),
                    "port_mismatch",
                    "produced ports do not match declared output ports",
                )?;
                return Err(EngineError::PortMismatch {
                    node: plan.id.clone(),
                    detail: "produced ports do not match declared output ports".to_string(),
                });
            }

            recorder.record_typed(
                EvidenceKind::NodeExecution,
                &NodeExecutionPayload {
                    node_id: plan.id.clone(),
                    node_type: plan.node_type.clone(),
                    config_fingerprint: plan.config_fingerprint.clone(),
                    inputs,
                    outputs: first.clone(),
                    determinism_audit: true,
                    evidence: plan.behavior.evidence(&plan.config),
                },
            )?;
            outputs.insert(plan.id.clone(), first);
        }

        recorder.record_typed(
            EvidenceKind::ExecutionComplete,
            &ExecutionCompletePayload {
                execution_id: ctx.execution_id().clone(),
                outputs: outputs.clone(),
            },
        )?;
        Ok(())
    }

    /// Records a node-scoped failure and maps the node error into the engine error.
    fn fail_node(
        &self,
        ctx: &ExecutionContext,
        recorder: &mut EvidenceRecorder,
        id: &NodeId,
        err: &NodeError,
    ) -> Result<(), EngineError> {
        let (kind, mapped) = match err {
            NodeError::PortMismatch {
                node,
                detail,
            } => (
                "port_mismatch",
                EngineError::PortMismatch {
                    node: node.clone(),
                    detail: detail.clone(),
                },
            ),
            NodeError::Failed {
                node,
                message,
            } => (
                "node_failure",
                EngineError::NodeFailed {
                    node: node.clone(),
                    message: message.clone(),
                },
            ),
        };
        self.record_failure(ctx, recorder, Some(id), kind, &err.to_string())?;
        Err(mapped)
    }

    /// Records an `execution_failure` event.
    fn record_failure(
        &self,
        ctx: &ExecutionContext,
        recorder: &mut EvidenceRecorder,
        node_id: Option<&NodeId>,
        kind: &str,
        message: &str,
    ) -> Result<(), EngineError> {
        recorder.record_typed(
            EvidenceKind::ExecutionFailure,
            &ExecutionFailurePayload {
                execution_id: ctx.execution_id().clone(),
                node_id: node_id.cloned(),
                kind: kind.to_string(),
                message: message.to_string(),
            },
        )?;
        Ok(())
    }
}
