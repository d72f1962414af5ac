//! The pipeline graph model, its validator, and socket typing.
//!
//! Nodes instantiate registered [`NodeKind`]s. Edges enter the graph only
//! through the validator, which keeps the committed graph a DAG with bounded
//! socket arity and compatible endpoint types.

mod config;
mod conversion;
mod definition;
mod graph;
mod kind;
mod model;
mod typing;
mod validator;

pub use config::GraphConfig;
pub use conversion::IntoPipeline;
pub use definition::{EdgeDefinition, NodeDefinition, PipelineDefinition};
pub use graph::{GraphBuilder, PipelineGraph};
pub use kind::{
    DATA_BINDING, InputSocketDefinition, KindDefinition, NodeKind, NodeKindBuilder,
    OutputSocketDefinition, input_binding,
};
pub use model::{
    EdgeId, EdgeState, InputSocket, NodeCategory, NodeData, NodeId, OutputSocket, PipelineEdge,
    PipelineNode, ProposedEdge,
};
pub use typing::{DATA_STRUCT, Diagnostic, SocketRef};
pub use validator::{DroppedEdge, LoadReport, RejectedEdge, Rejection, RevalidationReport};
