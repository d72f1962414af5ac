//! Common test utilities for building scopes, node kinds and graphs.
use keiro::prelude::*;
use std::sync::Arc;

/// Definitions layered over the prelude in most tests.
#[allow(dead_code)]
pub const SESSION_DEFINITIONS: &str = r#"
struct Dataset { shape: int(0..) }

enum Format { Csv, Parquet, Json(string) }

# Doubles whatever number flows in.
def scaled(x: number) { x * 2 }

let percent = 0..100;
"#;

/// The prelude plus [`SESSION_DEFINITIONS`].
#[allow(dead_code)]
pub fn session_scope() -> Arc<Scope> {
    scope_with(SESSION_DEFINITIONS)
}

#[allow(dead_code)]
pub fn scope_with(source: &str) -> Arc<Scope> {
    let mut builder = ScopeBuilder::new("session").with_parent(prelude().expect("prelude builds"));
    builder.add_source(source).expect("definitions parse");
    builder.create_scope().expect("definitions resolve")
}

/// Node kinds used across the graph tests.
///
/// - `load`: produces a `Dataset`
/// - `text`: produces a `string`
/// - `setting`: produces whatever its `value` data field holds
/// - `relay`: passes one input of any type through unchanged
/// - `join`: like `relay`, but its input accepts two connections
/// - `threshold`: consumes a `number`
/// - `describe`: consumes a `Dataset`
#[allow(dead_code)]
pub fn test_kinds() -> Vec<NodeKind> {
    let kinds = [
        NodeKind::builder("load", NodeCategory::Input).output("dataset", "Dataset"),
        NodeKind::builder("text", NodeCategory::Input).output("text", "string"),
        NodeKind::builder("setting", NodeCategory::Input).output("value", "data.value"),
        NodeKind::builder("relay", NodeCategory::Transform)
            .input("value", "any")
            .output("value", "Input0"),
        NodeKind::builder("join", NodeCategory::Transform)
            .input_with_arity("values", "any", 2)
            .output("value", "Input0"),
        NodeKind::builder("threshold", NodeCategory::Output).input("limit", "number"),
        NodeKind::builder("describe", NodeCategory::Output).input("dataset", "Dataset"),
    ];
    kinds
        .into_iter()
        .map(|kind| kind.build().expect("test kind is valid"))
        .collect()
}

#[allow(dead_code)]
pub fn graph_builder() -> GraphBuilder {
    test_kinds()
        .into_iter()
        .fold(GraphBuilder::new(session_scope()), GraphBuilder::with_kind)
}

/// An empty graph with every test kind registered and the default config.
#[allow(dead_code)]
pub fn empty_graph() -> PipelineGraph {
    graph_builder().build().expect("test graph builds")
}

/// A graph holding the given `(id, kind)` nodes without data and no edges.
#[allow(dead_code)]
pub fn graph_with_nodes(nodes: &[(&str, &str)]) -> PipelineGraph {
    let mut graph = empty_graph();
    for (id, kind) in nodes {
        graph
            .add_node(*id, kind, NodeData::new())
            .expect("test node is valid");
    }
    graph
}

/// Connects output 0 of `source` to input 0 of `target`.
#[allow(dead_code)]
pub fn connect(graph: &mut PipelineGraph, source: &str, target: &str) -> std::result::Result<EdgeId, GraphError> {
    graph.add_edge(ProposedEdge::new(source, 0, target, 0))
}

/// Builds node data from a JSON object literal.
#[allow(dead_code)]
pub fn data(value: serde_json::Value) -> NodeData {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("node data must be a JSON object, got {}", other),
    }
}

#[allow(dead_code)]
pub fn id(value: &str) -> NodeId {
    NodeId::from(value)
}

#[allow(dead_code)]
pub fn ids(values: &[&str]) -> Vec<NodeId> {
    values.iter().map(|v| NodeId::from(*v)).collect()
}

#[allow(dead_code)]
pub fn eval(scope: &Scope, source: &str) -> std::result::Result<Type, EvaluationError> {
    Evaluator::new(scope).evaluate_str(source, &Bindings::default())
}
