use super::call_function;
use crate::dom::{Event, NodeRef};
use crate::error::{EvalError, EvalResult};
use crate::reactive::{format_number, Callable, ReactiveArray, ReactiveObject, Value};
use petal_parser::{BinaryOp, Span};
use std::cmp::Ordering;
use tracing::{info, warn};

const ARRAY_METHODS: &[&str] = &[
    "push", "pop", "shift", "unshift", "splice", "slice", "indexOf", "includes", "join", "reverse",
    "concat", "map", "filter", "find", "findIndex", "some", "every", "forEach",
];

const STRING_METHODS: &[&str] = &[
    "toUpperCase",
    "toLowerCase",
    "trim",
    "includes",
    "startsWith",
    "endsWith",
    "split",
    "slice",
    "indexOf",
    "replace",
    "charAt",
    "toString",
];

thread_local! {
    static GLOBALS: ReactiveObject = build_globals();
}

pub(super) fn global(name: &str) -> Option<Value> {
    GLOBALS.with(|globals| {
        globals
            .contains_key(name)
            .then(|| globals.get_untracked(name))
    })
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

fn to_primitive(value: &Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Node(_) => {
            Value::String(value.to_js_string())
        }
        other => other.clone(),
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (to_primitive(left), to_primitive(right)) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(&b)),
        (a, b) => a.to_number().partial_cmp(&b.to_number()),
    }
}

pub(super) fn binary_op(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => match (to_primitive(left), to_primitive(right)) {
            (a @ Value::String(_), b) | (a, b @ Value::String(_)) => {
                Value::String(a.to_js_string() + &b.to_js_string())
            }
            (a, b) => Value::Number(a.to_number() + b.to_number()),
        },
        BinaryOp::Subtract => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Multiply => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Divide => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Remainder => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Equals => Value::Bool(left.loose_equals(right)),
        BinaryOp::NotEquals => Value::Bool(!left.loose_equals(right)),
        BinaryOp::StrictEquals => Value::Bool(left.strict_equals(right)),
        BinaryOp::StrictNotEquals => Value::Bool(!left.strict_equals(right)),
        BinaryOp::LessThan => Value::Bool(compare(left, right) == Some(Ordering::Less)),
        BinaryOp::LessThanOrEqual => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::GreaterThan => Value::Bool(compare(left, right) == Some(Ordering::Greater)),
        BinaryOp::GreaterThanOrEqual => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
    }
}

fn property_key(key: &Value) -> String {
    match key {
        Value::Number(n) => format_number(*n),
        other => other.to_js_string(),
    }
}

fn array_index(key: &Value) -> Option<usize> {
    match key {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as usize),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Clamp a possibly negative relative position into `0..=len`
fn relative_index(value: &Value, len: usize, default: usize) -> usize {
    if matches!(value, Value::Undefined) {
        return default;
    }
    let n = value.to_number();
    let n = if n.is_nan() { 0.0 } else { n.trunc() };
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        (n as usize).min(len)
    }
}

pub(super) fn get_member(target: &Value, name: &str, span: Span) -> EvalResult<Value> {
    match target {
        Value::Undefined | Value::Null => Err(EvalError::type_error(
            format!(
                "Cannot read properties of {} (reading '{}')",
                target.to_js_string(),
                name
            ),
            span,
        )),
        Value::Object(object) => Ok(object.get(name)),
        Value::Array(array) => Ok(array_member(array, name)),
        Value::String(s) => Ok(string_member(s, name)),
        Value::Number(n) => Ok(number_member(*n, name)),
        Value::Node(node) => Ok(node_member(node, name)),
        Value::Bool(_) | Value::Function(_) => Ok(Value::Undefined),
    }
}

pub(super) fn get_index(target: &Value, key: &Value, span: Span) -> EvalResult<Value> {
    match (target, array_index(key)) {
        (Value::Array(array), Some(index)) => Ok(array.get(index)),
        (Value::String(s), Some(index)) => Ok(s
            .chars()
            .nth(index)
            .map(|c| Value::String(c.to_string()))
            .unwrap_or_default()),
        _ => get_member(target, &property_key(key), span),
    }
}

pub(super) fn set_member(target: &Value, name: &str, value: Value, span: Span) -> EvalResult<()> {
    match target {
        Value::Undefined | Value::Null => Err(EvalError::type_error(
            format!(
                "Cannot set properties of {} (setting '{}')",
                target.to_js_string(),
                name
            ),
            span,
        )),
        Value::Object(object) => {
            object.set(name, value);
            Ok(())
        }
        Value::Array(array) => {
            if name == "length" {
                let len = array.len();
                let next = value.to_number().max(0.0) as usize;
                if next < len {
                    array.splice(next, len - next, Vec::new());
                }
            } else if let Ok(index) = name.parse::<usize>() {
                array.set(index, value);
            }
            Ok(())
        }
        Value::Node(node) => set_node_member(node, name, value, span),
        // writes to primitives are silently dropped
        _ => Ok(()),
    }
}

pub(super) fn set_index(target: &Value, key: &Value, value: Value, span: Span) -> EvalResult<()> {
    match (target, array_index(key)) {
        (Value::Array(array), Some(index)) => {
            array.set(index, value);
            Ok(())
        }
        _ => set_member(target, &property_key(key), value, span),
    }
}

fn bound(name: &str, method: fn(&Value, &str, &[Value]) -> EvalResult<Value>, receiver: Value) -> Value {
    let name = name.to_string();
    Value::function(move |args| method(&receiver, &name, args))
}

fn array_member(array: &ReactiveArray, name: &str) -> Value {
    if name == "length" {
        return Value::from(array.len());
    }
    if let Ok(index) = name.parse::<usize>() {
        return array.get(index);
    }
    if ARRAY_METHODS.contains(&name) {
        return bound(name, array_method, Value::Array(array.clone()));
    }
    Value::Undefined
}

fn callback(args: &[Value], method: &str) -> EvalResult<Callable> {
    match arg(args, 0) {
        Value::Function(f) => Ok(f),
        other => Err(EvalError::native(format!(
            "{} is not a function (passed to {})",
            other.to_js_string(),
            method
        ))),
    }
}

fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_nan() && y.is_nan() => true,
        _ => a.strict_equals(b),
    }
}

fn array_method(receiver: &Value, name: &str, args: &[Value]) -> EvalResult<Value> {
    let Value::Array(array) = receiver else {
        return Ok(Value::Undefined);
    };
    match name {
        "push" => {
            let mut len = array.len();
            for value in args {
                len = array.push(value.clone());
            }
            Ok(Value::from(len))
        }
        "pop" => Ok(array.pop()),
        "shift" => Ok(array.shift()),
        "unshift" => Ok(Value::from(array.unshift(args.to_vec()))),
        "splice" => {
            let len = array.len();
            let start = relative_index(&arg(args, 0), len, 0);
            let delete = if args.len() < 2 {
                len - start
            } else {
                let n = arg(args, 1).to_number();
                if n.is_nan() || n < 0.0 {
                    0
                } else {
                    (n as usize).min(len - start)
                }
            };
            let removed = array.splice(start, delete, args.iter().skip(2).cloned().collect());
            Ok(Value::array(removed))
        }
        "slice" => {
            let items = array.to_vec();
            let len = items.len();
            let start = relative_index(&arg(args, 0), len, 0);
            let end = relative_index(&arg(args, 1), len, len).max(start);
            Ok(Value::array(items[start..end].to_vec()))
        }
        "indexOf" => {
            let needle = arg(args, 0);
            let position = array.to_vec().iter().position(|item| item.strict_equals(&needle));
            Ok(Value::Number(position.map_or(-1.0, |i| i as f64)))
        }
        "includes" => {
            let needle = arg(args, 0);
            Ok(Value::Bool(
                array.to_vec().iter().any(|item| same_value_zero(item, &needle)),
            ))
        }
        "join" => {
            let separator = match arg(args, 0) {
                Value::Undefined => ",".to_string(),
                other => other.to_js_string(),
            };
            let parts: Vec<String> = array
                .to_vec()
                .iter()
                .map(|item| {
                    if item.is_nullish() {
                        String::new()
                    } else {
                        item.to_js_string()
                    }
                })
                .collect();
            Ok(Value::String(parts.join(&separator)))
        }
        "reverse" => {
            array.reverse();
            Ok(receiver.clone())
        }
        "concat" => {
            let mut items = array.to_vec();
            for value in args {
                match value {
                    Value::Array(other) => items.extend(other.to_vec()),
                    other => items.push(other.clone()),
                }
            }
            Ok(Value::array(items))
        }
        "map" | "filter" | "find" | "findIndex" | "some" | "every" | "forEach" => {
            let f = callback(args, name)?;
            let items = array.to_vec();
            let mut mapped = Vec::new();
            for (index, item) in items.iter().enumerate() {
                let result =
                    call_function(&f, &[item.clone(), Value::from(index)], Span::default())?;
                match name {
                    "map" => mapped.push(result),
                    "filter" if result.is_truthy() => mapped.push(item.clone()),
                    "find" if result.is_truthy() => return Ok(item.clone()),
                    "findIndex" if result.is_truthy() => return Ok(Value::from(index)),
                    "some" if result.is_truthy() => return Ok(Value::Bool(true)),
                    "every" if !result.is_truthy() => return Ok(Value::Bool(false)),
                    _ => {}
                }
            }
            Ok(match name {
                "map" | "filter" => Value::array(mapped),
                "findIndex" => Value::Number(-1.0),
                "some" => Value::Bool(false),
                "every" => Value::Bool(true),
                _ => Value::Undefined,
            })
        }
        _ => Ok(Value::Undefined),
    }
}

fn string_member(s: &str, name: &str) -> Value {
    if name == "length" {
        return Value::from(s.chars().count());
    }
    if let Ok(index) = name.parse::<usize>() {
        return s
            .chars()
            .nth(index)
            .map(|c| Value::String(c.to_string()))
            .unwrap_or_default();
    }
    if STRING_METHODS.contains(&name) {
        return bound(name, string_method, Value::String(s.to_string()));
    }
    Value::Undefined
}

fn string_method(receiver: &Value, name: &str, args: &[Value]) -> EvalResult<Value> {
    let s = receiver.as_str().unwrap_or_default();
    let needle = || arg(args, 0).to_js_string();
    let chars: Vec<char> = s.chars().collect();
    Ok(match name {
        "toUpperCase" => Value::String(s.to_uppercase()),
        "toLowerCase" => Value::String(s.to_lowercase()),
        "trim" => Value::String(s.trim().to_string()),
        "includes" => Value::Bool(s.contains(&needle())),
        "startsWith" => Value::Bool(s.starts_with(&needle())),
        "endsWith" => Value::Bool(s.ends_with(&needle())),
        "indexOf" => Value::Number(
            s.find(&needle())
                .map_or(-1.0, |byte| s[..byte].chars().count() as f64),
        ),
        "replace" => Value::String(s.replacen(&needle(), &arg(args, 1).to_js_string(), 1)),
        "charAt" => {
            let index = relative_index(&arg(args, 0), chars.len(), 0);
            Value::String(chars.get(index).map(|c| c.to_string()).unwrap_or_default())
        }
        "split" => match arg(args, 0) {
            Value::Undefined => Value::array(vec![Value::from(s)]),
            separator => {
                let separator = separator.to_js_string();
                let parts: Vec<Value> = if separator.is_empty() {
                    chars.iter().map(|c| Value::String(c.to_string())).collect()
                } else {
                    s.split(separator.as_str()).map(Value::from).collect()
                };
                Value::array(parts)
            }
        },
        "slice" => {
            let start = relative_index(&arg(args, 0), chars.len(), 0);
            let end = relative_index(&arg(args, 1), chars.len(), chars.len()).max(start);
            Value::String(chars[start..end].iter().collect())
        }
        "toString" => Value::from(s),
        _ => Value::Undefined,
    })
}

fn number_member(n: f64, name: &str) -> Value {
    match name {
        "toFixed" | "toString" => bound(name, number_method, Value::Number(n)),
        _ => Value::Undefined,
    }
}

fn number_method(receiver: &Value, name: &str, args: &[Value]) -> EvalResult<Value> {
    let n = receiver.as_number().unwrap_or(f64::NAN);
    Ok(match name {
        "toFixed" => {
            let digits = arg(args, 0).to_number();
            let digits = if digits.is_nan() { 0 } else { digits.clamp(0.0, 100.0) as usize };
            Value::String(format!("{:.*}", digits, n))
        }
        _ => Value::String(format_number(n)),
    })
}

fn node_member(node: &NodeRef, name: &str) -> Value {
    let doc = &node.doc;
    let id = node.id;
    match name {
        "value" => Value::String(doc.value(id)),
        "checked" => Value::Bool(doc.checked(id)),
        "selected" => Value::Bool(doc.selected(id)),
        "tagName" | "nodeName" => Value::String(node.tag_name()),
        "textContent" => Value::String(doc.text_content(id)),
        "innerHTML" => Value::String(doc.inner_html(id)),
        "id" => Value::String(doc.get_attribute(id, "id").unwrap_or_default()),
        "className" => Value::String(doc.get_attribute(id, "class").unwrap_or_default()),
        "isConnected" => Value::Bool(doc.is_connected(id)),
        "parentElement" | "parentNode" => doc
            .parent(id)
            .filter(|parent| doc.is_element(*parent))
            .map(|parent| Value::Node(NodeRef::new(doc.clone(), parent)))
            .unwrap_or(Value::Null),
        "getAttribute" | "setAttribute" | "hasAttribute" | "removeAttribute" | "focus"
        | "blur" | "click" => bound(name, node_method, Value::Node(node.clone())),
        _ => doc.get_property(id, name),
    }
}

fn node_method(receiver: &Value, name: &str, args: &[Value]) -> EvalResult<Value> {
    let Value::Node(node) = receiver else {
        return Ok(Value::Undefined);
    };
    let (doc, id) = (&node.doc, node.id);
    let attribute = arg(args, 0).to_js_string();
    Ok(match name {
        "getAttribute" => doc
            .get_attribute(id, &attribute)
            .map(Value::String)
            .unwrap_or(Value::Null),
        "hasAttribute" => Value::Bool(doc.has_attribute(id, &attribute)),
        "setAttribute" => {
            doc.set_attribute(id, &attribute, &arg(args, 1).to_js_string());
            Value::Undefined
        }
        "removeAttribute" => {
            doc.remove_attribute(id, &attribute);
            Value::Undefined
        }
        "click" => {
            doc.dispatch_event(id, &Event::new("click"));
            Value::Undefined
        }
        // focus management has no observable effect in a headless document
        _ => Value::Undefined,
    })
}

fn set_node_member(node: &NodeRef, name: &str, value: Value, span: Span) -> EvalResult<()> {
    let (doc, id) = (&node.doc, node.id);
    match name {
        "value" => doc.set_value(id, &value.to_js_string()),
        "checked" => doc.set_checked(id, value.is_truthy()),
        "selected" => doc.set_selected(id, value.is_truthy()),
        "textContent" => doc.set_text_content(id, &value.to_display_string()),
        "innerHTML" => doc
            .set_inner_html(id, &value.to_display_string())
            .map_err(|err| EvalError::type_error(err.to_string(), span))?,
        "id" => doc.set_attribute(id, "id", &value.to_js_string()),
        "className" => doc.set_attribute(id, "class", &value.to_js_string()),
        _ => doc.set_property(id, name, value),
    }
    Ok(())
}

// ---- globals ----

fn native(f: impl Fn(&[Value]) -> EvalResult<Value> + 'static) -> Value {
    Value::function(f)
}

fn math_fold(args: &[Value], init: f64, pick: fn(f64, f64) -> f64) -> Value {
    let mut result = init;
    for value in args {
        let n = value.to_number();
        if n.is_nan() {
            return Value::Number(f64::NAN);
        }
        result = pick(result, n);
    }
    Value::Number(result)
}

fn unary_math(f: fn(f64) -> f64) -> Value {
    native(move |args| Ok(Value::Number(f(arg(args, 0).to_number()))))
}

/// Longest numeric prefix of `s`, the way `parseFloat` reads it
fn numeric_prefix(s: &str, integer_only: bool) -> f64 {
    let s = s.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = integer_only;
    for (i, c) in s.char_indices() {
        match c {
            '+' | '-' if i == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }
    if !seen_digit {
        return f64::NAN;
    }
    let prefix = s[..end].trim_end_matches('.');
    prefix.parse::<f64>().map_or(f64::NAN, |n| if integer_only { n.trunc() } else { n })
}

fn build_globals() -> ReactiveObject {
    let math = ReactiveObject::from_pairs([
        ("PI", Value::Number(std::f64::consts::PI)),
        ("abs", unary_math(f64::abs)),
        ("floor", unary_math(f64::floor)),
        ("ceil", unary_math(f64::ceil)),
        ("trunc", unary_math(f64::trunc)),
        ("sqrt", unary_math(f64::sqrt)),
        ("sign", unary_math(|n| if n == 0.0 || n.is_nan() { n } else { n.signum() })),
        ("round", unary_math(|n| (n + 0.5).floor())),
        (
            "max",
            native(|args| Ok(math_fold(args, f64::NEG_INFINITY, f64::max))),
        ),
        ("min", native(|args| Ok(math_fold(args, f64::INFINITY, f64::min)))),
        (
            "pow",
            native(|args| Ok(Value::Number(arg(args, 0).to_number().powf(arg(args, 1).to_number())))),
        ),
    ]);

    let json = ReactiveObject::from_pairs([
        (
            "stringify",
            native(|args| {
                let value = arg(args, 0);
                if matches!(value, Value::Undefined | Value::Function(_)) {
                    return Ok(Value::Undefined);
                }
                let json = value.to_json();
                let text = if arg(args, 2).is_truthy() {
                    serde_json::to_string_pretty(&json)
                } else {
                    serde_json::to_string(&json)
                };
                text.map(Value::String)
                    .map_err(|err| EvalError::native(err.to_string()))
            }),
        ),
        (
            "parse",
            native(|args| {
                serde_json::from_str::<serde_json::Value>(&arg(args, 0).to_js_string())
                    .map(|json| Value::from_json(&json))
                    .map_err(|err| EvalError::native(format!("JSON.parse: {}", err)))
            }),
        ),
    ]);

    let object = ReactiveObject::from_pairs([
        (
            "keys",
            native(|args| {
                Ok(match arg(args, 0) {
                    Value::Object(o) => Value::array(o.keys().into_iter().map(Value::from).collect()),
                    Value::Array(a) => Value::array((0..a.len()).map(|i| Value::from(i.to_string())).collect()),
                    _ => Value::array(Vec::new()),
                })
            }),
        ),
        (
            "values",
            native(|args| {
                Ok(match arg(args, 0) {
                    Value::Object(o) => Value::array(o.entries().into_iter().map(|(_, v)| v).collect()),
                    Value::Array(a) => Value::array(a.to_vec()),
                    _ => Value::array(Vec::new()),
                })
            }),
        ),
        (
            "entries",
            native(|args| {
                let entries = match arg(args, 0) {
                    Value::Object(o) => o
                        .entries()
                        .into_iter()
                        .map(|(k, v)| Value::array(vec![Value::from(k), v]))
                        .collect(),
                    _ => Vec::new(),
                };
                Ok(Value::array(entries))
            }),
        ),
        (
            "assign",
            native(|args| {
                let target = arg(args, 0);
                if let Value::Object(target) = &target {
                    for source in args.iter().skip(1) {
                        if let Value::Object(source) = source {
                            for (key, value) in source.entries() {
                                target.set(&key, value);
                            }
                        }
                    }
                }
                Ok(target)
            }),
        ),
    ]);

    let array = ReactiveObject::from_pairs([
        (
            "isArray",
            native(|args| Ok(Value::Bool(matches!(arg(args, 0), Value::Array(_))))),
        ),
        (
            "from",
            native(|args| {
                Ok(match arg(args, 0) {
                    Value::Array(a) => Value::array(a.to_vec()),
                    Value::String(s) => {
                        Value::array(s.chars().map(|c| Value::String(c.to_string())).collect())
                    }
                    _ => Value::array(Vec::new()),
                })
            }),
        ),
    ]);

    let console = ReactiveObject::from_pairs([
        (
            "log",
            native(|args| {
                let line: Vec<String> = args.iter().map(|a| format!("{:?}", a)).collect();
                info!(target: "petal::console", "{}", line.join(" "));
                Ok(Value::Undefined)
            }),
        ),
        (
            "warn",
            native(|args| {
                let line: Vec<String> = args.iter().map(|a| format!("{:?}", a)).collect();
                warn!(target: "petal::console", "{}", line.join(" "));
                Ok(Value::Undefined)
            }),
        ),
    ]);

    ReactiveObject::from_pairs([
        ("Math", Value::Object(math)),
        ("JSON", Value::Object(json)),
        ("Object", Value::Object(object)),
        ("Array", Value::Object(array)),
        ("console", Value::Object(console)),
        (
            "Number",
            native(|args| Ok(Value::Number(args.first().map_or(0.0, Value::to_number)))),
        ),
        (
            "String",
            native(|args| Ok(Value::String(args.first().map(Value::to_js_string).unwrap_or_default()))),
        ),
        (
            "Boolean",
            native(|args| Ok(Value::Bool(arg(args, 0).is_truthy()))),
        ),
        (
            "parseInt",
            native(|args| Ok(Value::Number(numeric_prefix(&arg(args, 0).to_js_string(), true)))),
        ),
        (
            "parseFloat",
            native(|args| Ok(Value::Number(numeric_prefix(&arg(args, 0).to_js_string(), false)))),
        ),
        (
            "isNaN",
            native(|args| Ok(Value::Bool(arg(args, 0).to_number().is_nan()))),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(target: &Value, name: &str, args: &[Value]) -> Value {
        let Value::Function(f) = get_member(target, name, Span::default()).unwrap() else {
            panic!("{} is not a method", name);
        };
        f.call(args).unwrap()
    }

    #[test]
    fn test_add_concatenates_when_either_side_is_text() {
        assert_eq!(
            binary_op(BinaryOp::Add, &Value::from(1), &Value::from(2)),
            Value::from(3)
        );
        assert_eq!(
            binary_op(BinaryOp::Add, &Value::array(vec![1.into(), 2.into()]), &Value::from(3)),
            Value::from("1,23")
        );
        assert_eq!(
            binary_op(BinaryOp::LessThan, &Value::from("a"), &Value::from("b")),
            Value::Bool(true)
        );
        assert_eq!(
            binary_op(BinaryOp::LessThan, &Value::Undefined, &Value::from(1)),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_splice_and_slice() {
        let list = Value::array((1..=5).map(Value::from).collect());
        let removed = call(&list, "splice", &[Value::from(1), Value::from(2)]);
        assert_eq!(removed.to_js_string(), "2,3");
        assert_eq!(list.to_js_string(), "1,4,5");
        assert_eq!(call(&list, "slice", &[Value::from(-2)]).to_js_string(), "4,5");
        call(&list, "splice", &[Value::from(-1), Value::from(0), Value::from(9)]);
        assert_eq!(list.to_js_string(), "1,4,9,5");
    }

    #[test]
    fn test_string_methods() {
        let s = Value::from("  Hello World ");
        assert_eq!(call(&s, "trim", &[]), Value::from("Hello World"));
        let words = call(&Value::from("a,b,c"), "split", &[Value::from(",")]);
        assert_eq!(words.as_array().unwrap().len(), 3);
        assert_eq!(
            call(&Value::from("héllo"), "slice", &[Value::from(1), Value::from(3)]),
            Value::from("él")
        );
        assert_eq!(get_member(&Value::from("héllo"), "length", Span::default()).unwrap(), Value::from(5));
    }

    #[test]
    fn test_number_parsing_globals() {
        let parse_int = global("parseInt").unwrap();
        let Value::Function(parse_int) = parse_int else {
            panic!("parseInt is a function");
        };
        assert_eq!(parse_int.call(&[Value::from("42px")]).unwrap(), Value::from(42));
        assert!(parse_int.call(&[Value::from("px")]).unwrap().to_number().is_nan());
        assert_eq!(numeric_prefix("3.5em", false), 3.5);
        assert_eq!(numeric_prefix("-2.", false), -2.0);
    }

    #[test]
    fn test_member_of_nullish_is_type_error() {
        assert!(matches!(
            get_member(&Value::Null, "x", Span::new(0, 1)),
            Err(EvalError::TypeError { .. })
        ));
        assert!(set_member(&Value::Undefined, "x", Value::Null, Span::default()).is_err());
    }
}
