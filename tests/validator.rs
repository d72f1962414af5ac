//! Tests for graph editing, edge validation and socket typing.
mod common;
use common::*;
use keiro::pipeline::{
    DroppedEdge, KindDefinition, PipelineEdge, RejectedEdge, Rejection, SocketRef,
};
use keiro::prelude::*;
use serde_json::json;

#[cfg(test)]
mod validation_tests {
    use super::*;

    #[test]
    fn test_cycle_is_rejected_and_graph_unchanged() {
        let mut graph = graph_with_nodes(&[("A", "relay"), ("B", "relay"), ("C", "relay")]);
        connect(&mut graph, "A", "B").unwrap();
        connect(&mut graph, "B", "C").unwrap();
        let before: Vec<PipelineEdge> = graph.edges().cloned().collect();

        let error = connect(&mut graph, "C", "A").expect_err("C -> A closes a cycle");
        assert_eq!(
            error,
            GraphError::Cycle {
                source_node: id("C"),
                target_node: id("A")
            }
        );
        let after: Vec<PipelineEdge> = graph.edges().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_disjoint_types_are_rejected() {
        let mut graph = graph_with_nodes(&[("X", "text"), ("Y", "describe")]);
        let error = connect(&mut graph, "X", "Y").expect_err("string is not a Dataset");
        match error {
            GraphError::DisjointType {
                source_type,
                target_type,
                ..
            } => {
                assert_eq!(source_type, Type::String);
                assert_eq!(target_type.to_string(), "Dataset { shape: int(0..) }");
            }
            other => panic!("expected DisjointType, got {:?}", other),
        }
        assert_eq!(graph.edges().count(), 0);
    }

    #[test]
    fn test_compatible_types_are_accepted() {
        let mut graph = graph_with_nodes(&[("load", "load"), ("report", "describe")]);
        assert_eq!(connect(&mut graph, "load", "report"), Ok(EdgeId(0)));
    }

    #[test]
    fn test_edge_that_breaks_downstream_edge_is_rejected() {
        let mut graph = graph_with_nodes(&[
            ("words", "text"),
            ("first", "relay"),
            ("second", "relay"),
            ("limit", "threshold"),
        ]);
        connect(&mut graph, "first", "second").unwrap();
        connect(&mut graph, "second", "limit").unwrap();

        let error = connect(&mut graph, "words", "first")
            .expect_err("a string would reach the number input");
        match error {
            GraphError::DisjointType {
                source_node,
                target_node,
                source_type,
                ..
            } => {
                assert_eq!(source_node, id("second"));
                assert_eq!(target_node, id("limit"));
                assert_eq!(source_type, Type::String);
            }
            other => panic!("expected DisjointType, got {:?}", other),
        }

        assert_eq!(graph.edges().count(), 2);
        assert_eq!(graph.output_type(&id("second"), 0), Ok(Type::Any));
        assert!(graph.remove_edge(EdgeId(0)).unwrap().dropped.is_empty());
    }

    #[test]
    fn test_edge_compatible_downstream_is_accepted() {
        let mut graph = graph_with_nodes(&[("a", "setting"), ("r", "relay"), ("limit", "threshold")]);
        graph
            .update_node_data(&id("a"), data(json!({ "value": 3 })))
            .unwrap();
        connect(&mut graph, "r", "limit").unwrap();
        assert_eq!(connect(&mut graph, "a", "r"), Ok(EdgeId(1)));
        assert_eq!(graph.output_type(&id("r"), 0), Ok(Type::literal(3.0)));
    }

    #[test]
    fn test_self_loop_is_rejected() {
        let mut graph = graph_with_nodes(&[("A", "relay")]);
        assert_eq!(
            connect(&mut graph, "A", "A"),
            Err(GraphError::SelfLoop(id("A")))
        );
    }

    #[test]
    fn test_dangling_references_are_rejected() {
        let mut graph = graph_with_nodes(&[("A", "relay"), ("B", "relay")]);
        assert_eq!(
            connect(&mut graph, "A", "missing"),
            Err(GraphError::DanglingReference {
                node: id("missing"),
                socket: 0,
                side: "input"
            })
        );
        assert_eq!(
            graph.add_edge(ProposedEdge::new("A", 3, "B", 0)),
            Err(GraphError::DanglingReference {
                node: id("A"),
                socket: 3,
                side: "output"
            })
        );
        assert!(graph.add_edge(ProposedEdge::new("A", 0, "B", 1)).is_err());
    }

    #[test]
    fn test_default_arity_is_one() {
        let mut graph = graph_with_nodes(&[("a", "load"), ("b", "load"), ("report", "describe")]);
        connect(&mut graph, "a", "report").unwrap();
        assert_eq!(
            connect(&mut graph, "b", "report"),
            Err(GraphError::ArityExceeded {
                node: id("report"),
                socket: 0,
                arity: 1
            })
        );
    }

    #[test]
    fn test_declared_arity_is_enforced() {
        let mut graph = graph_with_nodes(&[
            ("a", "relay"),
            ("b", "relay"),
            ("c", "relay"),
            ("join", "join"),
        ]);
        connect(&mut graph, "a", "join").unwrap();
        connect(&mut graph, "b", "join").unwrap();
        assert!(matches!(
            connect(&mut graph, "c", "join"),
            Err(GraphError::ArityExceeded { arity: 2, .. })
        ));
    }

    #[test]
    fn test_default_arity_comes_from_config() {
        let config = GraphConfig::from_json(r#"{ "default_arity": 2 }"#).unwrap();
        assert_eq!(config.max_call_depth, 64);
        assert!(config.revalidate_on_change);

        let mut graph = graph_builder().with_config(config).build().unwrap();
        for (node, kind) in [("a", "load"), ("b", "load"), ("report", "describe")] {
            graph.add_node(node, kind, NodeData::new()).unwrap();
        }
        connect(&mut graph, "a", "report").unwrap();
        assert!(connect(&mut graph, "b", "report").is_ok());
    }

    #[test]
    fn test_propose_edge_does_not_commit() {
        let mut graph = graph_with_nodes(&[("load", "load"), ("report", "describe")]);
        let edge = ProposedEdge::new("load", 0, "report", 0);
        assert_eq!(graph.propose_edge(&edge), EdgeState::Valid);
        assert_eq!(graph.edges().count(), 0);

        assert_eq!(graph.apply_edge(edge.clone()), EdgeState::Committed(EdgeId(0)));
        assert!(matches!(
            graph.apply_edge(edge),
            EdgeState::Rejected(GraphError::ArityExceeded { .. })
        ));
    }

    #[test]
    fn test_node_errors() {
        let mut graph = graph_with_nodes(&[("A", "relay")]);
        assert_eq!(
            graph.add_node("A", "relay", NodeData::new()),
            Err(GraphError::DuplicateNode(id("A")))
        );
        assert_eq!(
            graph.add_node("B", "teleport", NodeData::new()),
            Err(GraphError::UnknownNodeKind {
                node: id("B"),
                kind: "teleport".into()
            })
        );
        assert_eq!(
            graph.remove_node(&id("nope")),
            Err(GraphError::NodeNotFound(id("nope")))
        );
        assert_eq!(
            graph.remove_edge(EdgeId(9)),
            Err(GraphError::EdgeNotFound(EdgeId(9)))
        );
    }
}

#[cfg(test)]
mod typing_tests {
    use super::*;

    #[test]
    fn test_types_flow_downstream() {
        let mut graph = empty_graph();
        graph
            .add_node("limit", "setting", data(json!({ "value": 5 })))
            .unwrap();
        graph.add_node("pass", "relay", NodeData::new()).unwrap();
        connect(&mut graph, "limit", "pass").unwrap();

        assert_eq!(graph.output_type(&id("limit"), 0), Ok(Type::literal(5.0)));
        assert_eq!(graph.input_type(&id("pass"), 0), Ok(Type::literal(5.0)));
        assert_eq!(graph.declared_input_type(&id("pass"), 0), Ok(Type::Any));
        assert_eq!(graph.output_type(&id("pass"), 0), Ok(Type::literal(5.0)));
    }

    #[test]
    fn test_join_unions_incoming_types() {
        let mut graph = empty_graph();
        graph.add_node("n", "setting", data(json!({ "value": 1 }))).unwrap();
        graph.add_node("s", "setting", data(json!({ "value": "csv" }))).unwrap();
        graph.add_node("join", "join", NodeData::new()).unwrap();
        connect(&mut graph, "n", "join").unwrap();
        connect(&mut graph, "s", "join").unwrap();

        let joined = graph.output_type(&id("join"), 0).unwrap();
        assert_eq!(joined, Type::literal(1.0).union(&Type::string_literal("csv")));
    }

    #[test]
    fn test_data_update_recomputes_downstream_types() {
        let mut graph = empty_graph();
        graph.add_node("limit", "setting", data(json!({ "value": 5 }))).unwrap();
        graph.add_node("pass", "relay", NodeData::new()).unwrap();
        connect(&mut graph, "limit", "pass").unwrap();
        assert_eq!(graph.output_type(&id("pass"), 0), Ok(Type::literal(5.0)));

        let report = graph
            .update_node_data(&id("limit"), data(json!({ "value": true })))
            .unwrap();
        assert!(report.is_empty());
        assert_eq!(graph.output_type(&id("pass"), 0), Ok(Type::bool_literal(true)));
    }

    #[test]
    fn test_failed_socket_expression_becomes_any_with_diagnostic() {
        let mut graph = empty_graph();
        graph.add_node("empty", "setting", NodeData::new()).unwrap();

        assert_eq!(graph.output_type(&id("empty"), 0), Ok(Type::Any));
        let diagnostics = graph.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].node, id("empty"));
        assert_eq!(diagnostics[0].socket, SocketRef::Output(0));
        assert!(matches!(
            diagnostics[0].error,
            EvaluationError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn test_nested_data_is_typed_structurally() {
        let mut graph = empty_graph();
        graph
            .add_node("cfg", "setting", data(json!({ "value": { "rows": 10, "name": "x" } })))
            .unwrap();
        let ty = graph.output_type(&id("cfg"), 0).unwrap();
        match ty {
            Type::Struct(s) => {
                assert_eq!(s.name(), "value");
                assert_eq!(s.field("rows"), Some(&Type::literal(10.0)));
                assert_eq!(s.field("name"), Some(&Type::string_literal("x")));
            }
            other => panic!("expected a struct, got {}", other),
        }
    }

    #[test]
    fn test_typed_view_of_node_data() {
        #[derive(serde::Deserialize)]
        struct Setting {
            value: f64,
        }
        let mut graph = empty_graph();
        graph.add_node("limit", "setting", data(json!({ "value": 2.5 }))).unwrap();
        let setting: Setting = graph.node(&id("limit")).unwrap().data_as().unwrap();
        assert_eq!(setting.value, 2.5);
    }

    #[test]
    fn test_out_of_range_socket_query() {
        let graph = graph_with_nodes(&[("A", "relay")]);
        assert!(matches!(
            graph.output_type(&id("A"), 4),
            Err(GraphError::DanglingReference { side: "output", .. })
        ));
        assert!(matches!(
            graph.input_type(&id("B"), 0),
            Err(GraphError::NodeNotFound(_))
        ));
    }
}

#[cfg(test)]
mod revalidation_tests {
    use super::*;

    #[test]
    fn test_data_change_drops_incompatible_edges() {
        let mut graph = empty_graph();
        graph.add_node("limit", "setting", data(json!({ "value": 5 }))).unwrap();
        graph.add_node("gate", "threshold", NodeData::new()).unwrap();
        let edge = connect(&mut graph, "limit", "gate").unwrap();

        let report = graph
            .update_node_data(&id("limit"), data(json!({ "value": "high" })))
            .unwrap();
        assert_eq!(report.dropped.len(), 1);
        let DroppedEdge { edge: dropped, reason } = &report.dropped[0];
        assert_eq!(dropped.id, edge);
        assert!(matches!(reason, GraphError::DisjointType { .. }));
        assert_eq!(graph.edges().count(), 0);

        let rejection = Rejection::from(&report.dropped[0]);
        assert_eq!(rejection.edge, ProposedEdge::new("limit", 0, "gate", 0));
    }

    #[test]
    fn test_revalidation_can_be_disabled() {
        let config = GraphConfig {
            revalidate_on_change: false,
            ..GraphConfig::default()
        };
        let mut graph = graph_builder().with_config(config).build().unwrap();
        graph.add_node("limit", "setting", data(json!({ "value": 5 }))).unwrap();
        graph.add_node("gate", "threshold", NodeData::new()).unwrap();
        connect(&mut graph, "limit", "gate").unwrap();

        let report = graph
            .update_node_data(&id("limit"), data(json!({ "value": "high" })))
            .unwrap();
        assert!(report.is_empty());
        assert_eq!(graph.edges().count(), 1);

        // An explicit pass still catches it.
        assert_eq!(graph.revalidate().dropped.len(), 1);
    }

    #[test]
    fn test_remove_node_removes_incident_edges() {
        let mut graph = graph_with_nodes(&[("A", "relay"), ("B", "relay"), ("C", "relay")]);
        connect(&mut graph, "A", "B").unwrap();
        connect(&mut graph, "B", "C").unwrap();

        let report = graph.remove_node(&id("B")).unwrap();
        assert_eq!(report.removed.len(), 2);
        assert!(report.dropped.is_empty());
        assert_eq!(graph.edges().count(), 0);
        assert!(graph.node(&id("B")).is_none());

        // The freed sockets accept new connections.
        assert!(connect(&mut graph, "A", "C").is_ok());
    }

    #[test]
    fn test_remove_edge_keeps_other_edges() {
        let mut graph = graph_with_nodes(&[("A", "relay"), ("B", "relay"), ("C", "relay")]);
        let first = connect(&mut graph, "A", "B").unwrap();
        let second = connect(&mut graph, "B", "C").unwrap();

        let report = graph.remove_edge(first).unwrap();
        assert!(report.is_empty());
        assert!(graph.edge(first).is_none());
        assert!(graph.edge(second).is_some());
    }
}

#[cfg(test)]
mod loading_tests {
    use super::*;

    fn definition(json: serde_json::Value) -> PipelineDefinition {
        serde_json::from_value(json).expect("valid pipeline definition")
    }

    #[test]
    fn test_load_commits_valid_edges_and_reports_rejected() {
        let mut graph = empty_graph();
        let report = graph
            .load(definition(json!({
                "nodes": [
                    { "id": "source", "kind": "load" },
                    { "id": "words", "kind": "text" },
                    { "id": "report", "kind": "describe" }
                ],
                "edges": [
                    { "source": "source", "target": "report" },
                    { "source": "words", "target": "report", "targetSocket": 0 }
                ]
            })))
            .unwrap();

        assert_eq!(report.committed, vec![EdgeId(0)]);
        assert_eq!(report.rejected.len(), 1);
        let RejectedEdge { edge, reason } = &report.rejected[0];
        assert_eq!(edge.source, id("words"));
        assert!(matches!(reason, GraphError::ArityExceeded { .. }));
        assert_eq!(graph.nodes().len(), 3);
    }

    #[test]
    fn test_load_aborts_on_unknown_kind() {
        let mut graph = empty_graph();
        let result = graph.load(definition(json!({
            "nodes": [{ "id": "x", "kind": "mystery" }]
        })));
        assert!(matches!(result, Err(GraphError::UnknownNodeKind { .. })));
    }

    #[test]
    fn test_failed_load_leaves_graph_untouched() {
        let mut graph = graph_with_nodes(&[("existing", "relay")]);

        let result = graph.load(definition(json!({
            "nodes": [
                { "id": "a", "kind": "relay" },
                { "id": "x", "kind": "mystery" }
            ]
        })));
        assert!(matches!(result, Err(GraphError::UnknownNodeKind { .. })));
        assert_eq!(graph.nodes().len(), 1);

        let result = graph.load(definition(json!({
            "nodes": [
                { "id": "a", "kind": "relay" },
                { "id": "a", "kind": "join" }
            ]
        })));
        assert_eq!(result, Err(GraphError::DuplicateNode(id("a"))));

        let result = graph.load(definition(json!({
            "nodes": [
                { "id": "b", "kind": "relay" },
                { "id": "existing", "kind": "relay" }
            ]
        })));
        assert_eq!(result, Err(GraphError::DuplicateNode(id("existing"))));
        assert_eq!(graph.nodes().len(), 1);
        assert!(graph.node(&id("a")).is_none());
    }

    #[test]
    fn test_load_from_custom_format() {
        struct Chain(Vec<&'static str>);

        impl IntoPipeline for Chain {
            fn into_pipeline(self) -> std::result::Result<PipelineDefinition, keiro::error::ConversionError> {
                let nodes = self
                    .0
                    .iter()
                    .map(|name| NodeDefinition {
                        id: id(name),
                        kind: "relay".into(),
                        data: NodeData::new(),
                    })
                    .collect();
                let edges = self
                    .0
                    .windows(2)
                    .map(|pair| EdgeDefinition {
                        source: id(pair[0]),
                        source_socket: 0,
                        target: id(pair[1]),
                        target_socket: 0,
                    })
                    .collect();
                Ok(PipelineDefinition { nodes, edges })
            }
        }

        let mut graph = empty_graph();
        let report = graph.load_from(Chain(vec!["a", "b", "c"])).unwrap();
        assert_eq!(report.committed.len(), 2);
        assert_eq!(graph.execution_order(), ids(&["a", "b", "c"]));
    }

    #[test]
    fn test_kind_alias() {
        let mut graph = graph_builder()
            .with_kind_alias("csvSource", "load")
            .build()
            .unwrap();
        graph.add_node("csv", "csvSource", NodeData::new()).unwrap();
        assert_eq!(graph.node(&id("csv")).unwrap().kind, "load");

        let error = graph_builder()
            .with_kind_alias("broken", "nothing")
            .build()
            .expect_err("alias target is not registered");
        assert!(matches!(error, DefinitionError::InvalidNodeKind { .. }));
    }

    #[test]
    fn test_kind_with_undefined_reference_is_rejected() {
        let kind = NodeKind::builder("bad", NodeCategory::Output)
            .input("in", "Missing")
            .build()
            .unwrap();
        let error = GraphBuilder::new(session_scope())
            .with_kind(kind)
            .build()
            .expect_err("Missing is undefined");
        assert!(matches!(error, DefinitionError::InvalidNodeKind { .. }));

        // Inputs cannot see other inputs.
        let kind = NodeKind::builder("peek", NodeCategory::Transform)
            .input("a", "any")
            .input("b", "Input0")
            .build()
            .unwrap();
        assert!(GraphBuilder::new(session_scope()).with_kind(kind).build().is_err());
    }

    #[test]
    fn test_kind_with_syntax_error_is_rejected() {
        let error = NodeKind::builder("broken", NodeCategory::Input)
            .output("out", "int(")
            .build()
            .expect_err("unbalanced parenthesis");
        assert!(matches!(error, DefinitionError::InvalidNodeKind { .. }));
    }

    #[test]
    fn test_kind_from_json() {
        let definition: KindDefinition = serde_json::from_value(json!({
            "name": "merge",
            "category": "transform",
            "inputs": [{ "label": "left", "type": "Dataset", "arity": 3 }, { "label": "right" }],
            "outputs": [{ "label": "merged", "type": "Input0" }]
        }))
        .unwrap();
        let kind = NodeKind::try_from(definition).unwrap();
        assert_eq!(kind.category(), NodeCategory::Transform);
        assert_eq!(kind.inputs().len(), 2);
        assert_eq!(kind.inputs()[0].arity, Some(3));
        assert!(kind.inputs()[1].declared.is_none());
        assert_eq!(kind.outputs()[0].label, "merged");
    }
}
