//! Expression grammar coverage
//!
//! Validates:
//! - Operator precedence and associativity
//! - Member / index / call chains and optional chaining
//! - Arrow functions, assignment and update forms
//! - Statement lists for event handlers

use petal_parser::ast::*;
use petal_parser::{parse_expression, parse_statements, ParseError};

#[test]
fn test_assignment_is_right_associative() {
    let expr = parse_expression("a = b = 1").unwrap();
    let Expression::Assign { value, .. } = expr else {
        panic!("expected assignment");
    };
    assert!(matches!(*value, Expression::Assign { .. }));
}

#[test]
fn test_compound_assignment_on_member() {
    let expr = parse_expression("state.count += 2").unwrap();
    match expr {
        Expression::Assign {
            target, operator, ..
        } => {
            assert_eq!(operator, AssignOp::Add);
            assert!(matches!(*target, Expression::Member { ref property, .. } if property == "count"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_nullish_binds_looser_than_or() {
    let expr = parse_expression("a || b ?? c").unwrap();
    match expr {
        Expression::Logical { operator, left, .. } => {
            assert_eq!(operator, LogicalOp::Nullish);
            assert!(matches!(
                *left,
                Expression::Logical {
                    operator: LogicalOp::Or,
                    ..
                }
            ));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_ternary_nests_in_alternate() {
    let expr = parse_expression("a ? 1 : b ? 2 : 3").unwrap();
    let Expression::Conditional { alternate, .. } = expr else {
        panic!("expected conditional");
    };
    assert!(matches!(*alternate, Expression::Conditional { .. }));
}

#[test]
fn test_call_chain() {
    let expr = parse_expression("list.filter(x => x.ok)[0]?.name").unwrap();
    match expr {
        Expression::Member {
            optional, object, ..
        } => {
            assert!(optional);
            assert!(matches!(*object, Expression::Index { .. }));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_object_literal_shorthand_and_keys() {
    let expr = parse_expression("{ a, 'b-c': 1, 2: x, null: y }").unwrap();
    let Expression::Object { properties, .. } = expr else {
        panic!("expected object");
    };
    let keys: Vec<_> = properties.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, vec!["a", "b-c", "2", "null"]);
    assert!(matches!(&properties[0].value, Expression::Identifier { name, .. } if name == "a"));
}

#[test]
fn test_arrow_block_body() {
    let expr = parse_expression("(a, b) => { a++; b-- }").unwrap();
    match expr {
        Expression::Arrow { params, body, .. } => {
            assert_eq!(params, vec!["a".to_string(), "b".to_string()]);
            match body {
                ArrowBody::Block(program) => assert_eq!(program.statements.len(), 2),
                other => panic!("unexpected {:?}", other),
            }
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_prefix_and_postfix_update() {
    assert!(matches!(
        parse_expression("++count").unwrap(),
        Expression::Update { prefix: true, .. }
    ));
    assert!(matches!(
        parse_expression("items[0].n--").unwrap(),
        Expression::Update {
            prefix: false,
            operator: UpdateOp::Decrement,
            ..
        }
    ));
    assert!(parse_expression("1++").is_err());
}

#[test]
fn test_statement_list() {
    let program = parse_statements("count++; ; save($event);").unwrap();
    assert_eq!(program.statements.len(), 2);
    assert!(parse_statements("").unwrap().statements.is_empty());
}

#[test]
fn test_simple_path_detection() {
    assert!(parse_expression("save").unwrap().is_simple_path());
    assert!(parse_expression("todo.remove").unwrap().is_simple_path());
    assert!(parse_expression("handlers['click']").unwrap().is_simple_path());
    assert!(!parse_expression("save()").unwrap().is_simple_path());
    assert!(!parse_expression("a?.b").unwrap().is_simple_path());
}

#[test]
fn test_trailing_garbage_is_rejected() {
    let err = parse_expression("a b").unwrap_err();
    match err {
        ParseError::UnexpectedToken { span, .. } => assert_eq!(span, 2..3),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_eof_error() {
    assert!(matches!(
        parse_expression("foo(").unwrap_err(),
        ParseError::UnexpectedEof { .. }
    ));
}

#[test]
fn test_ast_serializes_with_type_tag() {
    let expr = parse_expression("x").unwrap();
    let json = serde_json::to_value(&expr).unwrap();
    assert_eq!(json["type"], "Identifier");
    assert_eq!(json["name"], "x");
}
