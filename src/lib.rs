//! # Keiro - Typed Data-Pipeline Graph Engine
//!
//! **Keiro** is the engine behind a node-based data-pipeline editor. Users wire
//! input, transform and output stages on a canvas; keiro infers the type of the
//! data flowing through every connection, rejects connections that would break
//! the pipeline, and orders the result for execution.
//!
//! ## Core Workflow
//!
//! 1.  **Define Types**: Write `struct`, `enum`, `def` and `let` definitions and build a
//!     [`Scope`](scope::Scope) on top of the [`prelude`](scope::prelude).
//! 2.  **Register Node Kinds**: Describe each kind's sockets with type expressions and
//!     register them through a [`GraphBuilder`](pipeline::GraphBuilder).
//! 3.  **Edit**: Add nodes and propose edges. Each edge is checked for dangling sockets,
//!     self-loops, cycles, arity and disjoint types before it is committed.
//! 4.  **Schedule**: Ask the graph for a global order or a path decomposition and hand
//!     the [`ExecutionPlan`](schedule::ExecutionPlan) to an
//!     [`ExecutionBackend`](backend::ExecutionBackend).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use keiro::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let mut builder = ScopeBuilder::new("session").with_parent(prelude()?);
//!     builder.add_source("struct Dataset { shape: int(0..) }")?;
//!     let scope = builder.create_scope()?;
//!
//!     let mut graph = GraphBuilder::new(scope)
//!         .with_kind(
//!             NodeKind::builder("load", NodeCategory::Input)
//!                 .output("dataset", "Dataset")
//!                 .build()?,
//!         )
//!         .with_kind(
//!             NodeKind::builder("describe", NodeCategory::Output)
//!                 .input("dataset", "Dataset")
//!                 .build()?,
//!         )
//!         .build()?;
//!
//!     graph.add_node("source", "load", NodeData::new())?;
//!     graph.add_node("report", "describe", NodeData::new())?;
//!     graph.add_edge(ProposedEdge::new("source", 0, "report", 0))?;
//!
//!     println!("{:?}", graph.plan(ScheduleMode::Global));
//!     Ok(())
//! }
//! ```

pub mod ast;
pub mod backend;
pub mod error;
pub mod evaluator;
pub mod parser;
pub mod pipeline;
pub mod prelude;
pub mod schedule;
pub mod scope;
pub mod types;
