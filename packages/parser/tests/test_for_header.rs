//! `v-for` header parsing
//!
//! Validates:
//! - `in` / `of` separators, with and without parentheses
//! - Index and object-index aliases
//! - Array and object destructuring patterns
//! - Error offsets point into the original header

use petal_parser::ast::*;
use petal_parser::{parse_for_header, ParseError};

#[test]
fn test_plain_alias() {
    let header = parse_for_header("item in items").unwrap();
    assert_eq!(
        header.value,
        BindingPattern::Identifier {
            name: "item".to_string()
        }
    );
    assert_eq!(header.index, None);
    assert_eq!(header.source_text, "items");
}

#[test]
fn test_index_and_object_index() {
    let header = parse_for_header("(value, key, i) of object.entries").unwrap();
    assert_eq!(header.index.as_deref(), Some("key"));
    assert_eq!(header.object_index.as_deref(), Some("i"));
    assert!(matches!(header.source, Expression::Member { .. }));
}

#[test]
fn test_destructuring_patterns() {
    let header = parse_for_header("({ id, label: title }, index) in rows").unwrap();
    assert_eq!(header.value.names(), vec!["id".to_string(), "title".to_string()]);
    assert_eq!(header.index.as_deref(), Some("index"));

    let header = parse_for_header("[first, , third] in pairs").unwrap();
    match header.value {
        BindingPattern::Array { elements } => {
            assert_eq!(elements.len(), 3);
            assert!(elements[1].is_none());
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_numeric_source() {
    let header = parse_for_header("n in 10").unwrap();
    assert!(matches!(header.source, Expression::Number { value, .. } if value == 10.0));
}

#[test]
fn test_missing_separator() {
    assert!(matches!(
        parse_for_header("items").unwrap_err(),
        ParseError::InvalidSyntax { .. }
    ));
}

#[test]
fn test_error_offsets() {
    let err = parse_for_header("item in items +").unwrap_err();
    assert!(err.span().start >= 8);

    let err = parse_for_header("(a b) in list").unwrap_err();
    assert_eq!(err.span(), 3..4);
}
