//! Tests for the expression parser and evaluator.
mod common;
use common::*;
use keiro::error::ParseError;
use keiro::parser::{parse_definitions, parse_expression};
use keiro::prelude::*;

#[cfg(test)]
mod evaluator_tests {
    use super::*;

    #[test]
    fn test_field_access_narrowed_by_range() {
        let scope = session_scope();
        let ty = eval(&scope, "Dataset.shape & int(-5..5)").unwrap();
        assert_eq!(ty.to_string(), "int(0..5)");
        assert_eq!(
            ty,
            Type::int_interval(Bound::inclusive(0.0), Bound::inclusive(5.0))
        );
    }

    #[test]
    fn test_match_without_covering_arm_fails() {
        let scope = scope_with("enum Stage { X, Y, Z }");
        let error = eval(&scope, "match Stage::Z { Stage::X => 1, Stage::Y => 2 }")
            .expect_err("Z is not covered");
        match error {
            EvaluationError::IncompleteMatch { scrutinee } => {
                assert_eq!(scrutinee.to_string(), "Stage::Z");
            }
            other => panic!("expected IncompleteMatch, got {:?}", other),
        }
    }

    #[test]
    fn test_match_picks_first_overlapping_arm() {
        let scope = scope_with("enum Stage { X, Y, Z }");
        assert_eq!(
            eval(&scope, "match Stage::Y { Stage::X => 1, Stage::Y => 2, _ => 3 }"),
            Ok(Type::literal(2.0))
        );
        assert_eq!(
            eval(&scope, "match Stage::Z { Stage::X => 1, _ => 3 }"),
            Ok(Type::literal(3.0))
        );
    }

    #[test]
    fn test_match_binding_holds_narrowed_type() {
        let scope = session_scope();
        let ty = eval(&scope, "match 0..10 { int as n => n, _ => string }").unwrap();
        assert_eq!(ty.to_string(), "int(0..10)");
    }

    #[test]
    fn test_enum_payload_variant() {
        let scope = session_scope();
        assert_eq!(
            eval(&scope, "Format::Json(\"x\")").unwrap().to_string(),
            "Format::Json(\"x\")"
        );
        assert!(matches!(
            eval(&scope, "Format::Json(3)"),
            Err(EvaluationError::TypeMismatch { .. })
        ));
        assert!(matches!(
            eval(&scope, "Format::Csv(3)"),
            Err(EvaluationError::Arity { .. })
        ));
        assert_eq!(eval(&scope, "Format::Csv").unwrap().to_string(), "Format::Csv");
        assert_eq!(
            eval(&scope, "Format::Avro"),
            Err(EvaluationError::UndefinedReference("Format::Avro".into()))
        );
    }

    #[test]
    fn test_user_function_call() {
        let scope = session_scope();
        assert_eq!(eval(&scope, "scaled(0..5)").unwrap().to_string(), "0..10");
        assert_eq!(
            eval(&scope, "scaled(1, 2)"),
            Err(EvaluationError::Arity {
                function: "scaled".into(),
                expected: "1".into(),
                found: 2
            })
        );
        assert!(matches!(
            eval(&scope, "scaled(\"text\")"),
            Err(EvaluationError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_function_body_does_not_see_caller_bindings() {
        let scope = scope_with("def leak() { hidden }\nlet hidden = 1;");
        let mut bindings = Bindings::default();
        bindings.insert("hidden".into(), Type::String);
        let ty = Evaluator::new(&scope).evaluate_str("leak()", &bindings).unwrap();
        assert_eq!(ty, Type::literal(1.0));
    }

    #[test]
    fn test_call_depth_is_configurable() {
        let scope = scope_with("def spin(x: number) { spin(x) }");
        let error = Evaluator::new(&scope)
            .with_max_call_depth(3)
            .evaluate_str("spin(1)", &Bindings::default())
            .expect_err("recursion never ends");
        assert_eq!(
            error,
            EvaluationError::RecursionLimit {
                function: "spin".into(),
                depth: 3
            }
        );
    }

    #[test]
    fn test_struct_literal_narrows_fields() {
        let scope = session_scope();
        assert_eq!(
            eval(&scope, "Dataset { shape: 3 }").unwrap().to_string(),
            "Dataset { shape: 3 }"
        );
        assert!(eval(&scope, "Dataset { shape: -1 }").is_err());
        assert!(eval(&scope, "Dataset { rows: 1 }").is_err());
    }

    #[test]
    fn test_arithmetic_and_builtins() {
        let scope = session_scope();
        assert_eq!(eval(&scope, "1 + 2 * 3").unwrap(), Type::literal(7.0));
        assert_eq!(eval(&scope, "(0..1) + (10..20)").unwrap().to_string(), "10..21");
        assert_eq!(eval(&scope, "-(1..2)").unwrap().to_string(), "-2..-1");
        assert_eq!(eval(&scope, "abs(-3..2)").unwrap().to_string(), "0..3");
        assert_eq!(eval(&scope, "max(1, 5)").unwrap(), Type::literal(5.0));
        assert_eq!(eval(&scope, "concat(\"a\", \"b\")").unwrap(), Type::string_literal("ab"));
        assert_eq!(eval(&scope, "concat(\"a\", string)").unwrap(), Type::String);
        assert!(matches!(
            eval(&scope, "\"a\" + 1"),
            Err(EvaluationError::TypeMismatch { .. })
        ));
        assert_eq!(eval(&scope, "any + 1").unwrap(), Type::Any);
        assert_eq!(eval(&scope, "never * 2").unwrap(), Type::Never);
    }

    #[test]
    fn test_logic_builtins() {
        let scope = session_scope();
        assert_eq!(eval(&scope, "not(bool::true)").unwrap(), Type::bool_literal(false));
        assert_eq!(eval(&scope, "and(bool, bool::false)").unwrap(), Type::bool_literal(false));
        assert_eq!(eval(&scope, "or(bool, bool::false)").unwrap(), Type::bool());
        assert!(eval(&scope, "not(1)").is_err());
    }

    #[test]
    fn test_union_and_intersection_operators() {
        let scope = session_scope();
        assert_eq!(eval(&scope, "string | number").unwrap().to_string(), "number | string");
        assert_eq!(eval(&scope, "(string | 0..5) & number").unwrap().to_string(), "0..5");
        assert_eq!(eval(&scope, "percent & uint").unwrap().to_string(), "int(0..100)");
    }

    #[test]
    fn test_bindings_shadow_definitions() {
        let scope = session_scope();
        let mut bindings = Bindings::default();
        bindings.insert("Dataset".into(), Type::Number);
        let ty = Evaluator::new(&scope).evaluate_str("Dataset", &bindings).unwrap();
        assert_eq!(ty, Type::Number);
    }

    #[test]
    fn test_undefined_names() {
        let scope = session_scope();
        assert_eq!(
            eval(&scope, "Missing"),
            Err(EvaluationError::UndefinedReference("Missing".into()))
        );
        assert!(matches!(
            eval(&scope, "Dataset.rows"),
            Err(EvaluationError::TypeMismatch { .. })
        ));
    }
}

#[cfg(test)]
mod parser_tests {
    use super::*;

    #[test]
    fn test_range_forms() {
        let scope = session_scope();
        assert_eq!(eval(&scope, "0..<1").unwrap().to_string(), "0..<1");
        assert_eq!(eval(&scope, "0<..1").unwrap().to_string(), "0<..1");
        assert_eq!(eval(&scope, "..5").unwrap().to_string(), "..5");
        assert_eq!(eval(&scope, "-3..").unwrap().to_string(), "-3..");
        assert_eq!(eval(&scope, "1.5").unwrap(), Type::literal(1.5));
    }

    #[test]
    fn test_open_ranges_need_their_bound() {
        assert!(parse_expression("<..5").is_err());
        assert!(parse_expression("0..<").is_err());
    }

    #[test]
    fn test_parse_error_position() {
        let error: ParseError = parse_expression("1 +\n  )").expect_err("dangling operator");
        assert_eq!(error.line, 2);
        assert_eq!(error.column, 3);
    }

    #[test]
    fn test_deep_nesting_is_a_parse_error() {
        let deep = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
        let error = parse_expression(&deep).expect_err("nesting is bounded");
        assert!(error.message.contains("nests deeper"), "{}", error.message);

        let long_chain = vec!["1"; 100_000].join(" + ");
        assert!(parse_expression(&long_chain).is_err());

        let negations = format!("{}(1)", "-".repeat(100_000));
        assert!(parse_expression(&negations).is_err());

        let mut bindings = Bindings::default();
        bindings.insert("x".into(), Type::literal(1.0));
        let shallow = format!("{}x{}", "(".repeat(40), ")".repeat(40));
        let scope = session_scope();
        let ty = Evaluator::new(&scope).evaluate_str(&shallow, &bindings).unwrap();
        assert_eq!(ty, Type::literal(1.0));
    }

    #[test]
    fn test_definition_nesting_is_bounded() {
        let source = format!("let deep = {}1{};", "(".repeat(10_000), ")".repeat(10_000));
        assert!(parse_definitions(&source).is_err());
    }

    #[test]
    fn test_trailing_input_is_rejected() {
        assert!(parse_expression("1 2").is_err());
        assert!(parse_expression("").is_err());
    }

    #[test]
    fn test_definitions_with_comments_and_separators() {
        let source = r#"
            # a comment
            struct Empty;
            // another comment
            enum Mode { Fast, Slow(0..1), }
            def Mode::pick(m: Mode) { m };
            let limit = 10;
        "#;
        let declarations = parse_definitions(source).expect("definitions parse");
        assert_eq!(declarations.len(), 4);
    }

    #[test]
    fn test_empty_enum_is_rejected() {
        assert!(parse_definitions("enum Nothing { }").is_err());
    }

    #[test]
    fn test_match_needs_an_arm() {
        assert!(parse_expression("match 1 { }").is_err());
    }

    #[test]
    fn test_string_escapes() {
        let scope = session_scope();
        assert_eq!(
            eval(&scope, r#""a\"b""#).unwrap(),
            Type::string_literal("a\"b")
        );
    }
}
