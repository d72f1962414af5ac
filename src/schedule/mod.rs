//! Orders a committed pipeline for execution.
//!
//! Two plans are offered: a single global topological order, or a
//! decomposition into root-to-sink paths where shared nodes appear in every
//! path passing through them.

mod search;

pub use search::{Adjacency, Direction, PathEnumerator, PostOrder, Reachable, find_cycle};

use crate::pipeline::NodeId;
use serde::{Deserialize, Serialize};

/// Which shape of [`ExecutionPlan`] to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScheduleMode {
    #[default]
    Global,
    Paths,
}

/// What the scheduler hands to an execution backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "order", rename_all = "camelCase")]
pub enum ExecutionPlan {
    Global(Vec<NodeId>),
    Paths(Vec<Vec<NodeId>>),
}

impl ExecutionPlan {
    pub fn mode(&self) -> ScheduleMode {
        match self {
            ExecutionPlan::Global(_) => ScheduleMode::Global,
            ExecutionPlan::Paths(_) => ScheduleMode::Paths,
        }
    }
}

pub struct Scheduler {
    adjacency: Adjacency,
}

impl Scheduler {
    pub fn new(adjacency: Adjacency) -> Self {
        Self { adjacency }
    }

    pub fn adjacency(&self) -> &Adjacency {
        &self.adjacency
    }

    /// Every node after all of its ancestors. Components are started in node
    /// insertion order, so the result is deterministic.
    pub fn global_order(&self) -> Vec<NodeId> {
        self.adjacency.ids_of(PostOrder::new(&self.adjacency))
    }

    /// Every root-to-sink path. An isolated node forms a path of its own.
    pub fn paths(&self) -> Vec<Vec<NodeId>> {
        PathEnumerator::new(&self.adjacency)
            .map(|path| self.adjacency.ids_of(path))
            .collect()
    }

    pub fn plan(&self, mode: ScheduleMode) -> ExecutionPlan {
        match mode {
            ScheduleMode::Global => ExecutionPlan::Global(self.global_order()),
            ScheduleMode::Paths => ExecutionPlan::Paths(self.paths()),
        }
    }
}
