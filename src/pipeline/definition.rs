use super::model::{NodeData, NodeId, ProposedEdge};
use serde::{Deserialize, Serialize};

/// The complete, canonical description of a pipeline, ready to be loaded into a graph.
/// This is the target structure for any custom data model conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineDefinition {
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
    #[serde(default)]
    pub edges: Vec<EdgeDefinition>,
}

/// A node instance: its id, the registered kind it instantiates, and its data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub id: NodeId,
    pub kind: String,
    #[serde(default)]
    pub data: NodeData,
}

/// A connection between an output socket and an input socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDefinition {
    pub source: NodeId,
    #[serde(default)]
    pub source_socket: usize,
    pub target: NodeId,
    #[serde(default)]
    pub target_socket: usize,
}

impl From<EdgeDefinition> for ProposedEdge {
    fn from(edge: EdgeDefinition) -> Self {
        ProposedEdge {
            source: edge.source,
            source_socket: edge.source_socket,
            target: edge.target,
            target_socket: edge.target_socket,
        }
    }
}
