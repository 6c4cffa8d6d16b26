use crate::dom::NodeRef;
use crate::reactive::{ReactiveObject, Value};
use std::rc::Rc;

struct ScopeFrame {
    data: ReactiveObject,
    refs: ReactiveObject,
    parent: Option<Scope>,
}

/// A chain of reactive frames.
///
/// Reads fall through to the nearest frame that owns the name. Writes go to
/// the nearest frame that owns the name; when no frame does, the root frame
/// gains the key. Only [`Scope::define`] shadows an outer name.
#[derive(Clone)]
pub struct Scope(Rc<ScopeFrame>);

impl Scope {
    pub fn root(data: ReactiveObject) -> Self {
        Self(Rc::new(ScopeFrame {
            data,
            refs: ReactiveObject::new(),
            parent: None,
        }))
    }

    /// A new innermost frame whose own properties are `data`
    pub fn child(&self, data: ReactiveObject) -> Self {
        Self(Rc::new(ScopeFrame {
            data,
            refs: ReactiveObject::new(),
            parent: Some(self.clone()),
        }))
    }

    /// Own properties of the innermost frame
    pub fn data(&self) -> &ReactiveObject {
        &self.0.data
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.0.parent.as_ref()
    }

    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn frames(&self) -> impl Iterator<Item = &Scope> {
        std::iter::successors(Some(self), |scope| scope.parent())
    }

    /// Value of `name` from the nearest frame that owns it.
    /// Every frame consulted is tracked, so a later shadowing write re-runs
    /// the reader.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.frames()
            .find(|scope| scope.0.data.has_own(name))
            .map(|scope| scope.0.data.get(name))
    }

    pub fn get(&self, name: &str) -> Value {
        self.lookup(name).unwrap_or_default()
    }

    pub fn has(&self, name: &str) -> bool {
        self.frames().any(|scope| scope.0.data.contains_key(name))
    }

    pub fn set(&self, name: &str, value: Value) {
        let mut target = self;
        for scope in self.frames() {
            target = scope;
            if scope.0.data.contains_key(name) {
                break;
            }
        }
        target.0.data.set(name, value);
    }

    /// Declare `name` as an own property of the innermost frame
    pub fn define(&self, name: &str, value: Value) {
        self.0.data.set(name, value);
    }

    /// Assign several own properties of the innermost frame at once
    pub fn assign(&self, values: &ReactiveObject) {
        for (key, value) in values.entries() {
            self.0.data.set(&key, value);
        }
    }

    pub fn register_ref(&self, name: &str, node: NodeRef) {
        self.0.refs.set(name, Value::Node(node));
    }

    /// Remove a ref, but only while it still points at `node`
    pub fn unregister_ref(&self, name: &str, node: &NodeRef) {
        let current = self.0.refs.get_untracked(name);
        if current.as_node() == Some(node) {
            self.0.refs.remove(name);
        }
    }

    /// `$refs`: refs of every frame, inner frames overriding outer ones
    pub fn refs(&self) -> Value {
        let merged = ReactiveObject::new();
        let frames: Vec<&Scope> = self.frames().collect();
        for scope in frames.into_iter().rev() {
            for (name, node) in scope.0.refs.entries() {
                merged.insert_untracked(&name, node);
            }
        }
        Value::Object(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn root() -> Scope {
        Scope::root(ReactiveObject::from_pairs([
            ("x", Value::from(1)),
            ("shared", Value::from("root")),
        ]))
    }

    #[test]
    fn test_reads_fall_through() {
        let parent = root();
        let child = parent.child(ReactiveObject::from_pairs([("y", Value::from(2))]));
        assert_eq!(child.get("x"), Value::from(1));
        assert_eq!(child.get("y"), Value::from(2));
        assert_eq!(parent.get("y"), Value::Undefined);
        assert!(child.lookup("missing").is_none());
    }

    #[test]
    fn test_writes_go_to_the_owning_frame() {
        let parent = root();
        let child = parent.child(ReactiveObject::from_pairs([("y", Value::from(2))]));

        child.set("x", Value::from(5));
        assert_eq!(parent.get("x"), Value::from(5));
        assert!(!child.data().contains_key("x"));

        child.set("y", Value::from(3));
        assert_eq!(child.get("y"), Value::from(3));
        assert!(!parent.has("y"));
    }

    #[test]
    fn test_missing_keys_land_on_the_root() {
        let parent = root();
        let child = parent.child(ReactiveObject::new());
        let grandchild = child.child(ReactiveObject::new());
        grandchild.set("fresh", Value::Bool(true));
        assert!(parent.data().contains_key("fresh"));
        assert!(!child.data().contains_key("fresh"));
    }

    #[test]
    fn test_define_shadows() {
        let parent = root();
        let child = parent.child(ReactiveObject::new());
        child.define("shared", Value::from("child"));
        assert_eq!(child.get("shared"), Value::from("child"));
        assert_eq!(parent.get("shared"), Value::from("root"));
    }

    #[test]
    fn test_refs_merge_and_unregister() {
        let doc = Document::parse("<a></a><b></b>").unwrap();
        let a = NodeRef::new(doc.clone(), doc.first_child(doc.body()).unwrap());
        let b = NodeRef::new(doc.clone(), doc.next_sibling(a.id).unwrap());

        let parent = root();
        let child = parent.child(ReactiveObject::new());
        parent.register_ref("outer", a.clone());
        child.register_ref("inner", b.clone());

        let refs = child.refs();
        let refs = refs.as_object().unwrap();
        assert_eq!(refs.keys(), vec!["outer", "inner"]);

        // a stale unregister does not drop a newer registration
        child.unregister_ref("inner", &a);
        assert!(child.refs().as_object().unwrap().contains_key("inner"));
        child.unregister_ref("inner", &b);
        assert!(!child.refs().as_object().unwrap().contains_key("inner"));
    }
}
