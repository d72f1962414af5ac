//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the keiro crate.
//! Import this module to get access to the core functionality without having to import
//! each type individually.
//!
//! # Example
//!
//! ```rust,no_run
//! use keiro::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let scope = prelude()?;
//! let evaluator = Evaluator::new(&scope);
//! let ty = evaluator.evaluate_str("uint & int(-5..5)", &Bindings::default())?;
//! println!("{}", ty);
//! # Ok(())
//! # }
//! ```

// Types and evaluation
pub use crate::evaluator::{Bindings, Evaluator};
pub use crate::scope::{BuiltinFunction, Definition, Scope, ScopeBuilder, prelude};
pub use crate::types::{Bound, Interval, NumericSet, Type, union_all};

// Pipeline editing
pub use crate::pipeline::{
    EdgeDefinition, EdgeId, EdgeState, GraphBuilder, GraphConfig, IntoPipeline, NodeCategory,
    NodeData, NodeDefinition, NodeId, NodeKind, PipelineDefinition, PipelineGraph, ProposedEdge,
};

// Scheduling and execution
pub use crate::backend::{Acknowledgement, ExecutionBackend};
pub use crate::schedule::{ExecutionPlan, ScheduleMode, Scheduler};

// Error types
pub use crate::error::{DefinitionError, EvaluationError, GraphError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
