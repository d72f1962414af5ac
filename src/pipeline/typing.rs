use super::kind::{DATA_BINDING, input_binding};
use super::{GraphConfig, NodeData, NodeId, PipelineNode};
use crate::ast::Expression;
use crate::error::EvaluationError;
use crate::evaluator::{Bindings, Evaluator};
use crate::scope::Scope;
use crate::types::{Type, union_all};
use ahash::AHashMap;
use log::warn;
use serde::Serialize;
use std::fmt;

/// Name of the struct type a node's data map is exposed as.
pub const DATA_STRUCT: &str = "NodeData";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "side", content = "index", rename_all = "camelCase")]
pub enum SocketRef {
    Input(usize),
    Output(usize),
}

impl fmt::Display for SocketRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketRef::Input(i) => write!(f, "input {}", i),
            SocketRef::Output(i) => write!(f, "output {}", i),
        }
    }
}

/// A socket expression that failed to evaluate. The socket was typed `any` instead.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub node: NodeId,
    pub socket: SocketRef,
    pub error: EvaluationError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of '{}': {}", self.socket, self.node, self.error)
    }
}

/// Every socket type of one node, computed together.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NodeTypes {
    /// Input types as declared, before narrowing by connections.
    pub declared_inputs: Vec<Type>,
    pub inputs: Vec<Type>,
    pub outputs: Vec<Type>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Default)]
pub(crate) struct TypeCache {
    nodes: AHashMap<NodeId, NodeTypes>,
}

impl TypeCache {
    pub fn get(&self, id: &NodeId) -> Option<&NodeTypes> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn insert(&mut self, id: NodeId, types: NodeTypes) {
        self.nodes.insert(id, types);
    }

    pub fn invalidate(&mut self, id: &NodeId) {
        self.nodes.remove(id);
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

/// Types every socket of `node`. `incoming[i]` holds the output types of the
/// edges connected to input `i`.
///
/// Unconnected inputs keep their declared type; connected ones are narrowed to
/// the union of what flows in. Outputs see the narrowed inputs as `Input0`,
/// `Input1`, … and the data map as `data`.
pub(crate) fn compute_node(
    scope: &Scope,
    config: &GraphConfig,
    node: &PipelineNode,
    incoming: Vec<Vec<Type>>,
) -> NodeTypes {
    let evaluator = Evaluator::new(scope).with_max_call_depth(config.max_call_depth);
    let mut diagnostics = Vec::new();
    let mut evaluate = |socket: SocketRef, declared: &Option<Expression>, bindings: &Bindings| {
        let Some(expression) = declared else {
            return Type::Any;
        };
        evaluator.evaluate(expression, bindings).unwrap_or_else(|error| {
            warn!("Typing {} of '{}' as any: {}", socket, node.id, error);
            diagnostics.push(Diagnostic {
                node: node.id.clone(),
                socket,
                error,
            });
            Type::Any
        })
    };

    let mut bindings = Bindings::default();
    bindings.insert(DATA_BINDING.to_string(), data_type(&node.data));

    let declared_inputs: Vec<Type> = node
        .inputs
        .iter()
        .enumerate()
        .map(|(i, socket)| evaluate(SocketRef::Input(i), &socket.declared, &bindings))
        .collect();

    let inputs: Vec<Type> = declared_inputs
        .iter()
        .zip(incoming)
        .map(|(declared, connected)| {
            if connected.is_empty() {
                declared.clone()
            } else {
                union_all(connected).intersect(declared)
            }
        })
        .collect();
    for (i, ty) in inputs.iter().enumerate() {
        bindings.insert(input_binding(i), ty.clone());
    }

    let outputs: Vec<Type> = node
        .outputs
        .iter()
        .enumerate()
        .map(|(i, socket)| evaluate(SocketRef::Output(i), &socket.declared, &bindings))
        .collect();

    NodeTypes {
        declared_inputs,
        inputs,
        outputs,
        diagnostics,
    }
}

/// The data map as a struct type whose fields are the literal types of the values.
pub(crate) fn data_type(data: &NodeData) -> Type {
    Type::structure(DATA_STRUCT, object_fields(data))
}

fn object_fields(data: &NodeData) -> Vec<(String, Type)> {
    data.iter()
        .map(|(key, value)| (key.clone(), value_type(key, value)))
        .collect()
}

fn value_type(key: &str, value: &serde_json::Value) -> Type {
    use serde_json::Value;
    match value {
        Value::Bool(b) => Type::bool_literal(*b),
        Value::Number(n) => n.as_f64().map_or(Type::Number, Type::literal),
        Value::String(s) => Type::string_literal(s.clone()),
        Value::Object(map) => Type::structure(key, object_fields(map)),
        // No list or null types exist.
        Value::Null | Value::Array(_) => Type::Any,
    }
}
