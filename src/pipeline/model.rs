use crate::ast::Expression;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a node on the canvas. Chosen by the editing surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        NodeId(id)
    }
}

/// Identifies a committed edge. Assigned by the graph in commit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub u64);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A connection requested by the editing surface but not yet checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedEdge {
    pub source: NodeId,
    pub source_socket: usize,
    pub target: NodeId,
    pub target_socket: usize,
}

impl ProposedEdge {
    pub fn new(
        source: impl Into<NodeId>,
        source_socket: usize,
        target: impl Into<NodeId>,
        target_socket: usize,
    ) -> Self {
        Self {
            source: source.into(),
            source_socket,
            target: target.into(),
            target_socket,
        }
    }
}

/// A committed connection from an output socket to an input socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineEdge {
    pub id: EdgeId,
    pub source: NodeId,
    pub source_socket: usize,
    pub target: NodeId,
    pub target_socket: usize,
}

impl PipelineEdge {
    pub(crate) fn commit(id: EdgeId, edge: ProposedEdge) -> Self {
        Self {
            id,
            source: edge.source,
            source_socket: edge.source_socket,
            target: edge.target,
            target_socket: edge.target_socket,
        }
    }

    pub fn to_proposed(&self) -> ProposedEdge {
        ProposedEdge {
            source: self.source.clone(),
            source_socket: self.source_socket,
            target: self.target.clone(),
            target_socket: self.target_socket,
        }
    }
}

/// Where an edge stands in its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeState {
    /// Passed every check against the current graph but is not part of it.
    Valid,
    Committed(EdgeId),
    Rejected(crate::error::GraphError),
}

/// Stage a node plays in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeCategory {
    Input,
    Transform,
    Output,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputSocket {
    pub label: String,
    /// `None` accepts anything.
    pub declared: Option<Expression>,
    /// Maximum number of incoming edges; `None` uses the graph's default.
    pub arity: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputSocket {
    pub label: String,
    /// May reference `Input0`, `Input1`, … and `data`. `None` produces `any`.
    pub declared: Option<Expression>,
}

/// The open, user-editable settings of a node.
pub type NodeData = serde_json::Map<String, serde_json::Value>;

/// A node instance: fixed socket structure from its kind plus open data.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineNode {
    pub id: NodeId,
    pub kind: String,
    pub category: NodeCategory,
    pub data: NodeData,
    pub inputs: Vec<InputSocket>,
    pub outputs: Vec<OutputSocket>,
}

impl PipelineNode {
    /// Deserializes the node's data into a strongly-typed view.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(serde_json::Value::Object(self.data.clone()))
    }
}
