use super::effect::Dep;
use crate::dom::NodeRef;
use crate::error::EvalResult;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A runtime value. Objects and arrays are shared, reactive containers:
/// cloning a `Value::Object` clones the handle, not the contents.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(ReactiveArray),
    Object(ReactiveObject),
    Function(Callable),
    Node(NodeRef),
}

impl Value {
    pub fn object() -> Self {
        Value::Object(ReactiveObject::new())
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(ReactiveArray::from_vec(items))
    }

    pub fn function(f: impl Fn(&[Value]) -> EvalResult<Value> + 'static) -> Self {
        Value::Function(Callable::new(f))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Node(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ReactiveObject> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ReactiveArray> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&NodeRef> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
            Value::Null | Value::Array(_) | Value::Object(_) | Value::Node(_) => "object",
        }
    }

    /// Numeric coercion (`+value`)
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().unwrap_or(f64::NAN)
                }
            }
            Value::Array(a) => {
                let items = a.to_vec();
                match items.as_slice() {
                    [] => 0.0,
                    [single] => single.to_number(),
                    _ => f64::NAN,
                }
            }
            Value::Object(_) | Value::Function(_) | Value::Node(_) => f64::NAN,
        }
    }

    /// String coercion (`String(value)`)
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Array(a) => a
                .to_vec()
                .iter()
                .map(|item| {
                    if item.is_nullish() {
                        String::new()
                    } else {
                        item.to_js_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(_) => "function () { [native code] }".to_string(),
            Value::Node(node) => format!("[object HTML{}Element]", node.tag_name()),
        }
    }

    /// Text shown for an interpolation: nullish renders empty, containers
    /// render as indented JSON
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Undefined | Value::Null => String::new(),
            Value::Array(_) | Value::Object(_) => {
                serde_json::to_string_pretty(&self.to_json()).unwrap_or_default()
            }
            other => other.to_js_string(),
        }
    }

    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => {
                let object = ReactiveObject::new();
                for (key, value) in map {
                    object.insert_untracked(key, Value::from_json(value));
                }
                Value::Object(object)
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null | Value::Function(_) | Value::Node(_) => {
                serde_json::Value::Null
            }
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(a) => serde_json::Value::Array(a.to_vec().iter().map(Value::to_json).collect()),
            Value::Object(o) => {
                let mut map = serde_json::Map::new();
                for (key, value) in o.entries() {
                    // `undefined` and functions are skipped like JSON.stringify does
                    if matches!(value, Value::Undefined | Value::Function(_)) {
                        continue;
                    }
                    map.insert(key, value.to_json());
                }
                serde_json::Value::Object(map)
            }
        }
    }

    /// `===`
    pub fn strict_equals(&self, other: &Value) -> bool {
        self == other
    }

    /// `==`
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::Number(_), Value::String(_))
            | (Value::String(_), Value::Number(_))
            | (Value::Bool(_), _)
            | (_, Value::Bool(_)) => self.to_number() == other.to_number(),
            (Value::Array(_) | Value::Object(_), Value::String(s))
            | (Value::String(s), Value::Array(_) | Value::Object(_)) => {
                let container = if matches!(self, Value::String(_)) { other } else { self };
                container.to_js_string() == *s
            }
            _ => self == other,
        }
    }

    /// Whether writing `next` over `self` counts as a change
    pub(crate) fn has_changed(&self, next: &Value) -> bool {
        match (self, next) {
            (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan() => false,
            _ => self != next,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Node(a), Value::Node(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Array(_) | Value::Object(_) => write!(f, "{}", self.to_json()),
            Value::Function(_) => write!(f, "[function]"),
            Value::Node(node) => write!(f, "<{}#{}>", node.tag_name(), node.id.index()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from_json(&json)
    }
}

/// Number formatting matching `String(n)` for the values templates produce
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

/// Native function value
#[derive(Clone)]
pub struct Callable(Rc<dyn Fn(&[Value]) -> EvalResult<Value>>);

impl Callable {
    pub fn new(f: impl Fn(&[Value]) -> EvalResult<Value> + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, args: &[Value]) -> EvalResult<Value> {
        (self.0)(args)
    }

    pub fn ptr_eq(&self, other: &Callable) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }

    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

struct ObjectInner {
    entries: RefCell<IndexMap<String, Value>>,
    deps: RefCell<HashMap<String, Dep>>,
    keys_dep: Dep,
}

/// Observable key/value map. Reading a key subscribes the running effect to
/// that key; enumerating subscribes it to the key set.
#[derive(Clone)]
pub struct ReactiveObject(Rc<ObjectInner>);

impl ReactiveObject {
    pub fn new() -> Self {
        Self(Rc::new(ObjectInner {
            entries: RefCell::new(IndexMap::new()),
            deps: RefCell::new(HashMap::new()),
            keys_dep: Dep::new(),
        }))
    }

    pub fn from_pairs<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Self {
        let object = Self::new();
        for (key, value) in pairs {
            object.insert_untracked(&key.into(), value);
        }
        object
    }

    fn dep(&self, key: &str) -> Dep {
        self.0
            .deps
            .borrow_mut()
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    pub fn get(&self, key: &str) -> Value {
        self.dep(key).track();
        self.get_untracked(key)
    }

    pub fn get_untracked(&self, key: &str) -> Value {
        self.0
            .entries
            .borrow()
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn has_own(&self, key: &str) -> bool {
        self.dep(key).track();
        self.0.entries.borrow().contains_key(key)
    }

    /// Own-key test that does not subscribe the running effect
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.entries.borrow().contains_key(key)
    }

    pub fn set(&self, key: &str, value: Value) {
        let (changed, added) = {
            let mut entries = self.0.entries.borrow_mut();
            match entries.get_mut(key) {
                Some(existing) => {
                    let changed = existing.has_changed(&value);
                    *existing = value;
                    (changed, false)
                }
                None => {
                    entries.insert(key.to_string(), value);
                    (true, true)
                }
            }
        };

        if changed {
            let dep = self.0.deps.borrow().get(key).cloned();
            if let Some(dep) = dep {
                dep.trigger();
            }
        }
        if added {
            self.0.keys_dep.trigger();
        }
    }

    pub(crate) fn insert_untracked(&self, key: &str, value: Value) {
        self.0.entries.borrow_mut().insert(key.to_string(), value);
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        let removed = self.0.entries.borrow_mut().shift_remove(key);
        if removed.is_some() {
            let dep = self.0.deps.borrow().get(key).cloned();
            if let Some(dep) = dep {
                dep.trigger();
            }
            self.0.keys_dep.trigger();
        }
        removed
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.keys_dep.track();
        self.0.entries.borrow().keys().cloned().collect()
    }

    pub fn entries(&self) -> Vec<(String, Value)> {
        let keys = self.keys();
        keys.into_iter()
            .map(|key| {
                let value = self.get(&key);
                (key, value)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.keys_dep.track();
        self.0.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ptr_eq(&self, other: &ReactiveObject) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Stable identity for the lifetime of the object
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl Default for ReactiveObject {
    fn default() -> Self {
        Self::new()
    }
}

struct ArrayInner {
    items: RefCell<Vec<Value>>,
    dep: Dep,
}

/// Observable list. Any read subscribes to the whole array; any mutation
/// notifies every subscriber.
#[derive(Clone)]
pub struct ReactiveArray(Rc<ArrayInner>);

impl ReactiveArray {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        Self(Rc::new(ArrayInner {
            items: RefCell::new(items),
            dep: Dep::new(),
        }))
    }

    pub fn len(&self) -> usize {
        self.0.dep.track();
        self.0.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Value {
        self.0.dep.track();
        self.0.items.borrow().get(index).cloned().unwrap_or_default()
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.0.dep.track();
        self.0.items.borrow().clone()
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut Vec<Value>) -> R) -> R {
        let result = f(&mut self.0.items.borrow_mut());
        self.0.dep.trigger();
        result
    }

    pub fn set(&self, index: usize, value: Value) {
        let changed = self
            .0
            .items
            .borrow()
            .get(index)
            .map_or(true, |existing| existing.has_changed(&value));
        if !changed {
            return;
        }
        self.mutate(|items| {
            if index >= items.len() {
                items.resize(index + 1, Value::Undefined);
            }
            items[index] = value;
        });
    }

    pub fn push(&self, value: Value) -> usize {
        self.mutate(|items| {
            items.push(value);
            items.len()
        })
    }

    pub fn pop(&self) -> Value {
        self.mutate(|items| items.pop().unwrap_or_default())
    }

    pub fn shift(&self) -> Value {
        self.mutate(|items| {
            if items.is_empty() {
                Value::Undefined
            } else {
                items.remove(0)
            }
        })
    }

    pub fn unshift(&self, values: Vec<Value>) -> usize {
        self.mutate(|items| {
            items.splice(0..0, values);
            items.len()
        })
    }

    /// Remove `delete_count` items at `start` and insert `insert` in their place
    pub fn splice(&self, start: usize, delete_count: usize, insert: Vec<Value>) -> Vec<Value> {
        self.mutate(|items| {
            let start = start.min(items.len());
            let end = start.saturating_add(delete_count).min(items.len());
            items.splice(start..end, insert).collect()
        })
    }

    pub fn reverse(&self) {
        self.mutate(|items| items.reverse());
    }

    pub fn replace(&self, values: Vec<Value>) {
        self.mutate(|items| *items = values);
    }

    pub fn ptr_eq(&self, other: &ReactiveArray) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl Default for ReactiveArray {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::effect;
    use std::cell::Cell;

    #[test]
    fn test_object_key_tracking() {
        let state = ReactiveObject::from_pairs([("count", Value::from(1)), ("other", Value::from(0))]);
        let runs = Rc::new(Cell::new(0));
        let (s, r) = (state.clone(), runs.clone());
        let _e = effect(move || {
            s.get("count");
            r.set(r.get() + 1);
        });

        state.set("other", Value::from(5));
        assert_eq!(runs.get(), 1);
        state.set("count", Value::from(2));
        assert_eq!(runs.get(), 2);
        // same value is not a change
        state.set("count", Value::from(2));
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_adding_a_key_notifies_enumeration() {
        let state = ReactiveObject::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let (s, out) = (state.clone(), seen.clone());
        let _e = effect(move || out.borrow_mut().push(s.keys().len()));
        state.set("a", Value::Null);
        state.set("b", Value::Null);
        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_array_mutations_notify() {
        let list = ReactiveArray::from_vec(vec![Value::from(1)]);
        let lengths = Rc::new(RefCell::new(Vec::new()));
        let (l, out) = (list.clone(), lengths.clone());
        let _e = effect(move || out.borrow_mut().push(l.len()));
        list.push(Value::from(2));
        list.splice(0, 1, vec![]);
        assert_eq!(*lengths.borrow(), vec![1, 2, 1]);
    }

    #[test]
    fn test_coercions() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(Value::from(" 42 ").to_number(), 42.0);
        assert!(Value::from("").to_number() == 0.0);
        assert!(!Value::from("").is_truthy());
        assert!(Value::object().is_truthy());
        assert_eq!(Value::array(vec![1.into(), Value::Null, "x".into()]).to_js_string(), "1,,x");
    }

    #[test]
    fn test_loose_equality() {
        assert!(Value::Null.loose_equals(&Value::Undefined));
        assert!(Value::from(1).loose_equals(&Value::from("1")));
        assert!(Value::from(true).loose_equals(&Value::from(1)));
        assert!(!Value::Null.loose_equals(&Value::from(0)));
        assert!(!Value::from(1).strict_equals(&Value::from("1")));
    }

    #[test]
    fn test_json_roundtrip_keeps_integers() {
        let json = serde_json::json!({"n": 3, "items": [1.5, "a", null], "nested": {"ok": true}});
        let value = Value::from_json(&json);
        assert_eq!(value.to_json(), json);
        assert_eq!(
            value.to_display_string(),
            serde_json::to_string_pretty(&json).unwrap()
        );
    }
}
