use crate::evaluator::DEFAULT_MAX_CALL_DEPTH;
use serde::{Deserialize, Serialize};

/// Tunables for a [`PipelineGraph`](super::PipelineGraph).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Arity of input sockets that do not declare one.
    pub default_arity: usize,
    /// Deepest chain of user function calls a socket expression may make.
    pub max_call_depth: usize,
    /// Replay every committed edge after a removal or data update, dropping
    /// edges that no longer pass. When off, only caches are invalidated.
    pub revalidate_on_change: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            default_arity: 1,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            revalidate_on_change: true,
        }
    }
}

impl GraphConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
