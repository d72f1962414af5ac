use super::typing::compute_node;
use super::{EdgeId, NodeId, PipelineEdge, PipelineGraph, ProposedEdge};
use crate::error::GraphError;
use crate::schedule::{PostOrder, Reachable};
use crate::types::Type;
use ahash::{AHashMap, AHashSet};
use serde::Serialize;

/// Runs every structural and type check on a proposed edge against the
/// committed graph, in a fixed order, and reports the first failure.
pub(crate) fn check_edge(graph: &PipelineGraph, edge: &ProposedEdge) -> Result<(), GraphError> {
    // 0. Endpoints
    let source_exists = graph
        .node(&edge.source)
        .is_some_and(|n| edge.source_socket < n.outputs.len());
    if !source_exists {
        return Err(GraphError::DanglingReference {
            node: edge.source.clone(),
            socket: edge.source_socket,
            side: "output",
        });
    }
    let Some(target) = graph
        .node(&edge.target)
        .filter(|n| edge.target_socket < n.inputs.len())
    else {
        return Err(GraphError::DanglingReference {
            node: edge.target.clone(),
            socket: edge.target_socket,
            side: "input",
        });
    };

    // 1. Self-loop
    if edge.source == edge.target {
        return Err(GraphError::SelfLoop(edge.source.clone()));
    }

    // 2. Cycle: the new edge closes one iff the source is already reachable from the target.
    let adjacency = graph.adjacency();
    if let (Some(s), Some(t)) = (adjacency.index_of(&edge.source), adjacency.index_of(&edge.target)) {
        if Reachable::forward(&adjacency, t).any(|n| n == s) {
            return Err(GraphError::Cycle {
                source_node: edge.source.clone(),
                target_node: edge.target.clone(),
            });
        }
    }

    // 3. Arity
    let arity = graph.effective_arity(&target.inputs[edge.target_socket]);
    let occupied = graph
        .edges()
        .filter(|e| e.target == edge.target && e.target_socket == edge.target_socket)
        .count();
    if occupied >= arity {
        return Err(GraphError::ArityExceeded {
            node: edge.target.clone(),
            socket: edge.target_socket,
            arity,
        });
    }

    // 4. Disjoint types
    let source_type = graph.output_type(&edge.source, edge.source_socket)?;
    let target_type = graph.declared_input_type(&edge.target, edge.target_socket)?;
    if source_type.is_disjoint_with(&target_type) {
        return Err(GraphError::DisjointType {
            source_node: edge.source.clone(),
            source_socket: edge.source_socket,
            source_type,
            target_node: edge.target.clone(),
            target_socket: edge.target_socket,
            target_type,
        });
    }

    // 5. Committed edges downstream of the target must stay compatible once
    //    the new edge narrows the target's inputs.
    check_downstream(graph, edge, source_type)
}

/// Re-types the target and its descendants as if `edge` were committed and
/// rejects the edge if any committed edge among them turns disjoint.
fn check_downstream(
    graph: &PipelineGraph,
    edge: &ProposedEdge,
    source_type: Type,
) -> Result<(), GraphError> {
    let adjacency = graph.adjacency();
    let Some(start) = adjacency.index_of(&edge.target) else {
        return Ok(());
    };
    let affected: AHashSet<usize> = Reachable::forward(&adjacency, start).collect();
    let mut outputs: AHashMap<NodeId, Vec<Type>> = AHashMap::new();

    for index in PostOrder::new(&adjacency).filter(|i| affected.contains(i)) {
        let id = adjacency.id(index);
        let Some(node) = graph.node(id) else {
            continue;
        };

        let mut incoming = vec![Vec::new(); node.inputs.len()];
        for committed in graph.edges().filter(|e| &e.target == id) {
            let ty = match outputs.get(&committed.source) {
                Some(types) => types.get(committed.source_socket).cloned().unwrap_or(Type::Any),
                None => graph.output_type(&committed.source, committed.source_socket)?,
            };
            if let Some(slot) = incoming.get_mut(committed.target_socket) {
                slot.push(ty);
            }
        }
        if id == &edge.target {
            if let Some(slot) = incoming.get_mut(edge.target_socket) {
                slot.push(source_type.clone());
            }
        }

        let types = compute_node(graph.scope(), graph.config(), node, incoming);
        for committed in graph.edges().filter(|e| &e.target == id) {
            let Some(trial) = outputs.get(&committed.source) else {
                continue;
            };
            let source_type = trial.get(committed.source_socket).cloned().unwrap_or(Type::Any);
            let Some(target_type) = types.declared_inputs.get(committed.target_socket).cloned()
            else {
                continue;
            };
            if source_type.is_disjoint_with(&target_type) {
                return Err(GraphError::DisjointType {
                    source_node: committed.source.clone(),
                    source_socket: committed.source_socket,
                    source_type,
                    target_node: committed.target.clone(),
                    target_socket: committed.target_socket,
                    target_type,
                });
            }
        }
        outputs.insert(id.clone(), types.outputs);
    }

    Ok(())
}

/// A committed edge that no longer passed its checks after the graph changed.
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedEdge {
    pub edge: PipelineEdge,
    pub reason: GraphError,
}

/// Edges that left the graph as a consequence of a mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RevalidationReport {
    /// Edges removed together with a node.
    pub removed: Vec<PipelineEdge>,
    /// Edges dropped because they failed re-validation.
    pub dropped: Vec<DroppedEdge>,
}

impl RevalidationReport {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.dropped.is_empty()
    }
}

/// A proposed edge that `load` could not commit.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedEdge {
    pub edge: ProposedEdge,
    pub reason: GraphError,
}

/// Outcome of loading a whole pipeline definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub committed: Vec<EdgeId>,
    pub rejected: Vec<RejectedEdge>,
}

/// Serializable summary of a rejection, for reporting to the editing surface.
#[derive(Debug, Clone, Serialize)]
pub struct Rejection {
    pub edge: ProposedEdge,
    pub reason: String,
}

impl From<&RejectedEdge> for Rejection {
    fn from(rejected: &RejectedEdge) -> Self {
        Self {
            edge: rejected.edge.clone(),
            reason: rejected.reason.to_string(),
        }
    }
}

impl From<&DroppedEdge> for Rejection {
    fn from(dropped: &DroppedEdge) -> Self {
        Self {
            edge: dropped.edge.to_proposed(),
            reason: dropped.reason.to_string(),
        }
    }
}
