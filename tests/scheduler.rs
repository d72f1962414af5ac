//! Tests for graph searches, execution plans and backends.
mod common;
use common::*;
use keiro::error::BackendError;
use keiro::schedule::{Adjacency, PostOrder, Reachable, find_cycle};
use keiro::prelude::*;
use std::cell::RefCell;

/// Two roots feeding one sink: A -> B -> C and D -> C.
fn diamond_graph() -> PipelineGraph {
    let mut graph = graph_with_nodes(&[("A", "relay"), ("B", "relay"), ("C", "join"), ("D", "relay")]);
    connect(&mut graph, "A", "B").unwrap();
    connect(&mut graph, "B", "C").unwrap();
    connect(&mut graph, "D", "C").unwrap();
    graph
}

fn adjacency(nodes: &[&str], edges: &[(&str, &str)]) -> Adjacency {
    let nodes = ids(nodes);
    let edges: Vec<(NodeId, NodeId)> = edges.iter().map(|(s, t)| (id(s), id(t))).collect();
    Adjacency::new(&nodes, edges.iter().map(|(s, t)| (s, t)))
}

fn position(order: &[NodeId], node: &str) -> usize {
    order
        .iter()
        .position(|n| n.as_str() == node)
        .unwrap_or_else(|| panic!("'{}' missing from order", node))
}

#[cfg(test)]
mod plan_tests {
    use super::*;

    #[test]
    fn test_global_order_respects_edges() {
        let order = diamond_graph().execution_order();
        assert_eq!(order.len(), 4);
        assert!(position(&order, "A") < position(&order, "B"));
        assert!(position(&order, "B") < position(&order, "C"));
        assert!(position(&order, "D") < position(&order, "C"));
    }

    #[test]
    fn test_global_order_is_deterministic() {
        assert_eq!(diamond_graph().execution_order(), ids(&["A", "B", "D", "C"]));
    }

    #[test]
    fn test_path_decomposition_repeats_shared_nodes() {
        let paths = diamond_graph().path_decomposition();
        assert_eq!(paths, vec![ids(&["A", "B", "C"]), ids(&["D", "C"])]);
    }

    #[test]
    fn test_isolated_node_is_its_own_path() {
        let graph = graph_with_nodes(&[("solo", "relay")]);
        assert_eq!(graph.path_decomposition(), vec![ids(&["solo"])]);
        assert_eq!(graph.execution_order(), ids(&["solo"]));
    }

    #[test]
    fn test_empty_graph_has_empty_plans() {
        let graph = empty_graph();
        assert_eq!(graph.plan(ScheduleMode::Global), ExecutionPlan::Global(Vec::new()));
        assert_eq!(graph.plan(ScheduleMode::Paths), ExecutionPlan::Paths(Vec::new()));
    }

    #[test]
    fn test_plan_serialization() {
        let graph = graph_with_nodes(&[("A", "relay")]);
        let json = serde_json::to_value(graph.plan(ScheduleMode::Global)).unwrap();
        assert_eq!(json, serde_json::json!({ "mode": "global", "order": ["A"] }));

        let mode: ScheduleMode = serde_json::from_str("\"paths\"").unwrap();
        assert_eq!(mode, ScheduleMode::Paths);
        assert_eq!(ScheduleMode::default(), ScheduleMode::Global);
    }
}

#[cfg(test)]
mod search_tests {
    use super::*;

    #[test]
    fn test_post_order_yields_ancestors_first() {
        let adjacency = adjacency(&["c", "b", "a"], &[("a", "b"), ("b", "c")]);
        let order = adjacency.ids_of(PostOrder::new(&adjacency));
        assert_eq!(order, ids(&["a", "b", "c"]));

        let b = adjacency.index_of(&id("b")).unwrap();
        let ancestors = adjacency.ids_of(PostOrder::ancestors_of(&adjacency, b));
        assert_eq!(ancestors, ids(&["a", "b"]));
    }

    #[test]
    fn test_reachable_in_both_directions() {
        let adjacency = adjacency(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c")]);
        let b = adjacency.index_of(&id("b")).unwrap();

        let mut forward = adjacency.ids_of(Reachable::forward(&adjacency, b));
        forward.sort();
        assert_eq!(forward, ids(&["b", "c"]));

        let mut backward = adjacency.ids_of(Reachable::backward(&adjacency, b));
        backward.sort();
        assert_eq!(backward, ids(&["a", "b"]));
    }

    #[test]
    fn test_adjacency_ignores_unknown_nodes_and_parallel_edges() {
        let adjacency = adjacency(&["a", "b"], &[("a", "b"), ("a", "b"), ("a", "ghost")]);
        let a = adjacency.index_of(&id("a")).unwrap();
        assert_eq!(adjacency.successors(a).len(), 1);
        assert_eq!(adjacency.roots().count(), 1);
    }

    #[test]
    fn test_find_cycle() {
        let acyclic = adjacency(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("a", "c")]);
        assert_eq!(find_cycle(&acyclic), None);

        let cyclic = adjacency(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "b")]);
        let cycle = find_cycle(&cyclic).expect("b and c form a cycle");
        assert_eq!(cyclic.ids_of(cycle), ids(&["b", "c"]));
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let names: Vec<String> = (0..20_000).map(|i| format!("n{}", i)).collect();
        let nodes: Vec<NodeId> = names.iter().map(|n| id(n)).collect();
        let edges: Vec<(NodeId, NodeId)> = nodes.windows(2).map(|w| (w[0].clone(), w[1].clone())).collect();
        let adjacency = Adjacency::new(&nodes, edges.iter().map(|(s, t)| (s, t)));

        let last = adjacency.index_of(&nodes[nodes.len() - 1]).unwrap();
        assert_eq!(PostOrder::ancestors_of(&adjacency, last).count(), nodes.len());
        assert_eq!(Reachable::forward(&adjacency, 0).count(), nodes.len());
        assert_eq!(find_cycle(&adjacency), None);
    }
}

#[cfg(test)]
mod backend_tests {
    use super::*;

    /// Records every plan it receives.
    #[derive(Default)]
    struct RecordingBackend {
        received: RefCell<Vec<ExecutionPlan>>,
    }

    impl ExecutionBackend for RecordingBackend {
        fn submit(&self, plan: &ExecutionPlan) -> std::result::Result<Acknowledgement, BackendError> {
            self.received.borrow_mut().push(plan.clone());
            Ok(Acknowledgement::for_plan("recording", plan))
        }
    }

    struct RefusingBackend;

    impl ExecutionBackend for RefusingBackend {
        fn submit(&self, _plan: &ExecutionPlan) -> std::result::Result<Acknowledgement, BackendError> {
            Err(BackendError::Rejected("offline".into()))
        }
    }

    #[test]
    fn test_backend_receives_plan() {
        let graph = diamond_graph();
        let backend = RecordingBackend::default();

        let ack = backend.submit(&graph.plan(ScheduleMode::Paths)).unwrap();
        assert_eq!(ack.backend, "recording");
        assert_eq!(ack.mode, ScheduleMode::Paths);
        // C is scheduled once per path.
        assert_eq!(ack.scheduled, 5);

        let ack = backend.submit(&graph.plan(ScheduleMode::Global)).unwrap();
        assert_eq!(ack.scheduled, 4);
        assert_eq!(backend.received.borrow().len(), 2);
    }

    #[test]
    fn test_backend_errors_propagate() {
        let graph = diamond_graph();
        let error = RefusingBackend
            .submit(&graph.plan(ScheduleMode::Global))
            .expect_err("backend is offline");
        assert_eq!(
            error.to_string(),
            "The execution backend rejected the plan: offline"
        );
    }
}
