use crate::pipeline::{EdgeId, NodeId};
use crate::types::Type;
use thiserror::Error;

/// A syntax error in definition source or a type expression.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Parse error at {line}:{column}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Errors raised while building a scope. These are fatal for the scope being built.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DefinitionError {
    #[error("Definition '{name}' is already declared in scope '{scope}'")]
    Duplicate { name: String, scope: String },

    #[error("Definition '{definition}' references '{name}', which is not defined in any enclosing scope")]
    UndefinedReference { name: String, definition: String },

    #[error("Definition '{0}' refers to itself without an intervening function call")]
    Recursive(String),

    #[error("Node kind '{kind}' is invalid: {message}")]
    InvalidNodeKind { kind: String, message: String },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Errors raised while evaluating a single expression.
///
/// These never escape a node: the pipeline substitutes `any` for the affected
/// socket and keeps the error as a diagnostic.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("'{0}' is not defined")]
    UndefinedReference(String),

    #[error("Type mismatch during '{operation}': expected {expected}, but found {found}")]
    TypeMismatch {
        operation: String,
        expected: String,
        found: Type,
    },

    #[error("'{function}' expects {expected} argument(s), but received {found}")]
    Arity {
        function: String,
        expected: String,
        found: usize,
    },

    #[error("No match arm accepts a value of type {scrutinee}")]
    IncompleteMatch { scrutinee: Type },

    #[error("Evaluation of '{function}' exceeded the maximum call depth of {depth}")]
    RecursionLimit { function: String, depth: usize },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Reasons a graph mutation is rejected. A rejected mutation leaves the graph untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Node '{0}' already exists")]
    DuplicateNode(NodeId),

    #[error("Node '{node}' has an unregistered kind: '{kind}'")]
    UnknownNodeKind { node: NodeId, kind: String },

    #[error("Node '{0}' not found")]
    NodeNotFound(NodeId),

    #[error("Edge '{0}' not found")]
    EdgeNotFound(EdgeId),

    #[error("Edge references {side} socket {socket} of node '{node}', which does not exist")]
    DanglingReference {
        node: NodeId,
        socket: usize,
        side: &'static str,
    },

    #[error("Node '{0}' cannot be connected to itself")]
    SelfLoop(NodeId),

    #[error("Connecting '{source_node}' to '{target_node}' would create a cycle")]
    Cycle {
        source_node: NodeId,
        target_node: NodeId,
    },

    #[error("Input {socket} of node '{node}' already holds its maximum of {arity} connection(s)")]
    ArityExceeded {
        node: NodeId,
        socket: usize,
        arity: usize,
    },

    #[error(
        "Output {source_socket} of '{source_node}' ({source_type}) is incompatible with input {target_socket} of '{target_node}' ({target_type})"
    )]
    DisjointType {
        source_node: NodeId,
        source_socket: usize,
        source_type: Type,
        target_node: NodeId,
        target_socket: usize,
        target_type: Type,
    },
}

/// Errors that can occur when converting a custom user format into a `PipelineDefinition`.
#[derive(Error, Debug, Clone)]
pub enum ConversionError {
    #[error("Invalid custom data: {0}")]
    ValidationError(String),
}

/// Errors raised by `PipelineGraph::load_from`.
#[derive(Error, Debug, Clone)]
pub enum LoadError {
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Errors reported by an execution backend when a plan is submitted.
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    #[error("The execution backend rejected the plan: {0}")]
    Rejected(String),

    #[error("Backend error: {0}")]
    Generic(String),
}
