use crate::error::BackendError;
use crate::schedule::{ExecutionPlan, ScheduleMode};
use serde::Serialize;

/// Receipt returned by a backend that accepted a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Acknowledgement {
    /// Name of the backend that accepted the plan.
    pub backend: String,
    pub mode: ScheduleMode,
    /// Number of node executions the plan schedules. Nodes shared between
    /// paths are counted once per path.
    pub scheduled: usize,
}

impl Acknowledgement {
    pub fn for_plan(backend: impl Into<String>, plan: &ExecutionPlan) -> Self {
        let scheduled = match plan {
            ExecutionPlan::Global(order) => order.len(),
            ExecutionPlan::Paths(paths) => paths.iter().map(Vec::len).sum(),
        };
        Self {
            backend: backend.into(),
            mode: plan.mode(),
            scheduled,
        }
    }
}

/// A trait for the external engine that runs a scheduled pipeline.
/// keiro only computes plans; running them is entirely up to the implementor.
pub trait ExecutionBackend {
    /// Hands over a plan for execution.
    fn submit(&self, plan: &ExecutionPlan) -> Result<Acknowledgement, BackendError>;
}
