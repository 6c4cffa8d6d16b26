//! In-memory document tree.
//!
//! Nodes live in an arena owned by [`Document`] and are addressed by
//! [`NodeId`]. Detached nodes stay in the arena, so a handle never dangles;
//! it simply stops being [connected](Document::is_connected).

mod events;
mod html;
mod selector;

pub use events::{Event, EventHandler, ListenerId};

use crate::error::{DomError, DomResult};
use crate::reactive::Value;
use events::Listener;
use petal_parser::{parse_markup, MarkupNode};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element(String),
    Text,
    Comment,
    Fragment,
}

#[derive(Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: Vec<(String, String)>,
    /// Character data of text and comment nodes
    data: String,
    /// Element properties that shadow attributes (`value`, `checked`, ...)
    properties: HashMap<String, Value>,
    /// Times the node went through `insert_before`
    inserts: usize,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            attributes: Vec::new(),
            data: String::new(),
            properties: HashMap::new(),
            inserts: 0,
        }
    }
}

pub struct Document {
    nodes: RefCell<Vec<NodeData>>,
    listeners: RefCell<HashMap<NodeId, Vec<Listener>>>,
    next_listener: Cell<u64>,
    root: NodeId,
    body: NodeId,
}

impl Document {
    /// An empty document with a `<body>` element
    pub fn new() -> Rc<Self> {
        let mut root = NodeData::new(NodeKind::Document);
        let mut body = NodeData::new(NodeKind::Element("body".to_string()));
        root.children.push(NodeId(1));
        body.parent = Some(NodeId(0));

        Rc::new(Self {
            nodes: RefCell::new(vec![root, body]),
            listeners: RefCell::new(HashMap::new()),
            next_listener: Cell::new(0),
            root: NodeId(0),
            body: NodeId(1),
        })
    }

    /// A document whose body holds the given markup
    pub fn parse(source: &str) -> DomResult<Rc<Self>> {
        let doc = Self::new();
        let markup = parse_markup(source)?;
        for node in &markup.nodes {
            let id = doc.build(node);
            doc.append_child(doc.body, id)?;
        }
        Ok(doc)
    }

    fn build(&self, node: &MarkupNode) -> NodeId {
        match node {
            MarkupNode::Element {
                tag,
                attributes,
                children,
                ..
            } => {
                let el = self.create_element(tag);
                {
                    let mut nodes = self.nodes.borrow_mut();
                    nodes[el.0].attributes = attributes
                        .iter()
                        .map(|attr| (attr.name.clone(), attr.value.clone()))
                        .collect();
                }
                for child in children {
                    let child = self.build(child);
                    self.attach(el, child, None);
                }
                el
            }
            MarkupNode::Text { content, .. } => self.create_text(content),
            MarkupNode::Comment { content, .. } => self.create_comment(content),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    fn create(&self, data: NodeData) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(data);
        NodeId(nodes.len() - 1)
    }

    pub fn create_element(&self, tag: &str) -> NodeId {
        self.create(NodeData::new(NodeKind::Element(tag.to_ascii_lowercase())))
    }

    pub fn create_text(&self, text: &str) -> NodeId {
        let mut data = NodeData::new(NodeKind::Text);
        data.data = text.to_string();
        self.create(data)
    }

    pub fn create_comment(&self, text: &str) -> NodeId {
        let mut data = NodeData::new(NodeKind::Comment);
        data.data = text.to_string();
        self.create(data)
    }

    pub fn create_fragment(&self) -> NodeId {
        self.create(NodeData::new(NodeKind::Fragment))
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes.borrow()[id.0].kind.clone()
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes.borrow()[id.0].kind, NodeKind::Element(_))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.nodes.borrow()[id.0].kind, NodeKind::Text)
    }

    /// Lower-case tag name of an element
    pub fn tag_name(&self, id: NodeId) -> Option<String> {
        match &self.nodes.borrow()[id.0].kind {
            NodeKind::Element(tag) => Some(tag.clone()),
            _ => None,
        }
    }

    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        matches!(&self.nodes.borrow()[id.0].kind, NodeKind::Element(t) if t == tag)
    }

    // ---- tree navigation ----

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.borrow()[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes.borrow()[id.0].children.clone()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.borrow()[id.0].children.first().copied()
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .into_iter()
            .filter(|child| self.is_element(*child))
            .collect()
    }

    fn position(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.nodes.borrow()[parent.0]
            .children
            .iter()
            .position(|c| *c == child)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.position(parent, id)?;
        self.nodes.borrow()[parent.0].children.get(index + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.position(parent, id)?;
        let nodes = self.nodes.borrow();
        index.checked_sub(1).map(|i| nodes[parent.0].children[i])
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut next = self.next_sibling(id);
        while let Some(node) = next {
            if self.is_element(node) {
                return Some(node);
            }
            next = self.next_sibling(node);
        }
        None
    }

    /// Whether the node is attached, through its ancestors, to the document root
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Inclusive ancestor test
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Pre-order descendants, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).into_iter().rev());
        }
        out
    }

    // ---- mutation ----

    fn detach(&self, node: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        if let Some(parent) = nodes[node.0].parent.take() {
            nodes[parent.0].children.retain(|c| *c != node);
        }
    }

    fn attach(&self, parent: NodeId, node: NodeId, index: Option<usize>) {
        let mut nodes = self.nodes.borrow_mut();
        nodes[node.0].parent = Some(parent);
        let children = &mut nodes[parent.0].children;
        match index {
            Some(i) if i <= children.len() => children.insert(i, node),
            _ => children.push(node),
        }
    }

    /// Insert `node` into `parent` before `anchor` (append when `None`).
    /// A fragment moves its children and is left empty.
    pub fn insert_before(
        &self,
        parent: NodeId,
        node: NodeId,
        anchor: Option<NodeId>,
    ) -> DomResult<()> {
        if let Some(anchor) = anchor {
            if self.parent(anchor) != Some(parent) {
                return Err(DomError::NotAChild {
                    parent: parent.0,
                    child: anchor.0,
                });
            }
            if anchor == node {
                return Ok(());
            }
        }
        if self.contains(node, parent) {
            return Err(DomError::HierarchyRequest {
                node: node.0,
                parent: parent.0,
                reason: "the new child is an ancestor of the parent",
            });
        }
        if matches!(self.kind(parent), NodeKind::Text | NodeKind::Comment) {
            return Err(DomError::HierarchyRequest {
                node: node.0,
                parent: parent.0,
                reason: "character data cannot have children",
            });
        }

        let moved = if self.kind(node) == NodeKind::Fragment {
            let children = self.children(node);
            for child in &children {
                self.detach(*child);
            }
            children
        } else {
            self.detach(node);
            vec![node]
        };

        for child in moved {
            let index = anchor.and_then(|a| self.position(parent, a));
            self.attach(parent, child, index);
            self.nodes.borrow_mut()[child.0].inserts += 1;
        }
        Ok(())
    }

    /// How many times `id` has been inserted or moved with `insert_before`
    pub fn insert_count(&self, id: NodeId) -> usize {
        self.nodes.borrow()[id.0].inserts
    }

    pub fn append_child(&self, parent: NodeId, node: NodeId) -> DomResult<()> {
        self.insert_before(parent, node, None)
    }

    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotAChild {
                parent: parent.0,
                child: child.0,
            });
        }
        self.detach(child);
        Ok(())
    }

    /// Detach the node from its parent, if it has one
    pub fn remove(&self, node: NodeId) {
        self.detach(node);
    }

    /// Swap `old` for `new` at the same position
    pub fn replace_with(&self, old: NodeId, new: NodeId) -> DomResult<()> {
        let parent = self.parent(old).ok_or(DomError::NotAChild {
            parent: usize::MAX,
            child: old.0,
        })?;
        self.insert_before(parent, new, Some(old))?;
        self.detach(old);
        Ok(())
    }

    /// Copy a node, its attributes and (when `deep`) its subtree. Properties
    /// and listeners are not copied.
    pub fn clone_node(&self, id: NodeId, deep: bool) -> NodeId {
        let copy = {
            let nodes = self.nodes.borrow();
            let source = &nodes[id.0];
            let mut copy = NodeData::new(source.kind.clone());
            copy.attributes = source.attributes.clone();
            copy.data = source.data.clone();
            copy
        };
        let clone = self.create(copy);
        if deep {
            for child in self.children(id) {
                let child_clone = self.clone_node(child, true);
                self.attach(clone, child_clone, None);
            }
        }
        clone
    }

    // ---- attributes ----

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<String> {
        self.nodes.borrow()[id.0]
            .attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.nodes.borrow()[id.0]
            .attributes
            .iter()
            .any(|(n, _)| n == name)
    }

    pub fn set_attribute(&self, id: NodeId, name: &str, value: &str) {
        let mut nodes = self.nodes.borrow_mut();
        let attributes = &mut nodes[id.0].attributes;
        match attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => attributes.push((name.to_string(), value.to_string())),
        }
    }

    pub fn remove_attribute(&self, id: NodeId, name: &str) {
        self.nodes.borrow_mut()[id.0]
            .attributes
            .retain(|(n, _)| n != name);
    }

    /// Attributes in source order
    pub fn attributes(&self, id: NodeId) -> Vec<(String, String)> {
        self.nodes.borrow()[id.0].attributes.clone()
    }

    // ---- properties ----

    pub fn get_property(&self, id: NodeId, name: &str) -> Value {
        self.nodes.borrow()[id.0]
            .properties
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn has_property(&self, id: NodeId, name: &str) -> bool {
        self.nodes.borrow()[id.0].properties.contains_key(name)
    }

    pub fn set_property(&self, id: NodeId, name: &str, value: Value) {
        self.nodes.borrow_mut()[id.0]
            .properties
            .insert(name.to_string(), value);
    }

    /// Properties an element exposes in addition to custom ones; used to
    /// decide between property and attribute binding
    pub fn is_known_property(&self, id: NodeId, name: &str) -> bool {
        if self.has_property(id, name) {
            return true;
        }
        let tag = self.tag_name(id).unwrap_or_default();
        match name {
            "textContent" | "innerHTML" | "id" | "className" | "hidden" => true,
            "value" => matches!(tag.as_str(), "input" | "textarea" | "select" | "option"),
            "checked" | "indeterminate" => tag == "input",
            "selected" => tag == "option",
            "disabled" => matches!(
                tag.as_str(),
                "input" | "textarea" | "select" | "option" | "button" | "fieldset"
            ),
            "multiple" => tag == "select",
            _ => false,
        }
    }

    // ---- character data ----

    pub fn text(&self, id: NodeId) -> String {
        self.nodes.borrow()[id.0].data.clone()
    }

    pub fn set_text(&self, id: NodeId, text: &str) {
        self.nodes.borrow_mut()[id.0].data = text.to_string();
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        match self.kind(id) {
            NodeKind::Text | NodeKind::Comment => self.text(id),
            _ => self
                .descendants(id)
                .into_iter()
                .filter(|n| self.is_text(*n))
                .map(|n| self.text(n))
                .collect(),
        }
    }

    pub fn set_text_content(&self, id: NodeId, text: &str) {
        match self.kind(id) {
            NodeKind::Text | NodeKind::Comment => self.set_text(id, text),
            _ => {
                self.clear_children(id);
                if !text.is_empty() {
                    let node = self.create_text(text);
                    self.attach(id, node, None);
                }
            }
        }
    }

    pub fn set_inner_html(&self, id: NodeId, source: &str) -> DomResult<()> {
        let markup = parse_markup(source)?;
        self.clear_children(id);
        for node in &markup.nodes {
            let child = self.build(node);
            self.attach(id, child, None);
        }
        Ok(())
    }

    fn clear_children(&self, id: NodeId) {
        for child in self.children(id) {
            self.detach(child);
        }
    }

    // ---- inline style ----

    fn style_declarations(&self, id: NodeId) -> Vec<(String, String)> {
        self.get_attribute(id, "style")
            .unwrap_or_default()
            .split(';')
            .filter_map(|decl| {
                let (prop, value) = decl.split_once(':')?;
                let prop = prop.trim();
                (!prop.is_empty()).then(|| (prop.to_string(), value.trim().to_string()))
            })
            .collect()
    }

    fn write_style(&self, id: NodeId, declarations: &[(String, String)]) {
        if declarations.is_empty() {
            self.remove_attribute(id, "style");
            return;
        }
        let style = declarations
            .iter()
            .map(|(prop, value)| format!("{}: {};", prop, value))
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(id, "style", &style);
    }

    pub fn get_style(&self, id: NodeId, prop: &str) -> Option<String> {
        self.style_declarations(id)
            .into_iter()
            .find(|(p, _)| p == prop)
            .map(|(_, v)| v)
    }

    pub fn set_style(&self, id: NodeId, prop: &str, value: &str) {
        if value.is_empty() {
            self.remove_style(id, prop);
            return;
        }
        let mut declarations = self.style_declarations(id);
        match declarations.iter_mut().find(|(p, _)| p == prop) {
            Some((_, existing)) => *existing = value.to_string(),
            None => declarations.push((prop.to_string(), value.to_string())),
        }
        self.write_style(id, &declarations);
    }

    pub fn remove_style(&self, id: NodeId, prop: &str) {
        let mut declarations = self.style_declarations(id);
        let before = declarations.len();
        declarations.retain(|(p, _)| p != prop);
        if declarations.len() != before {
            self.write_style(id, &declarations);
        }
    }

    // ---- form controls ----

    fn input_type(&self, id: NodeId) -> String {
        self.get_attribute(id, "type")
            .unwrap_or_default()
            .to_ascii_lowercase()
    }

    /// The `value` a form control reports
    pub fn value(&self, id: NodeId) -> String {
        if let Value::String(value) = self.get_property(id, "value") {
            return value;
        }
        let tag = self.tag_name(id).unwrap_or_default();
        match tag.as_str() {
            "select" => self
                .options(id)
                .into_iter()
                .find(|option| self.selected(*option))
                .map(|option| self.value(option))
                .unwrap_or_default(),
            "option" => self
                .get_attribute(id, "value")
                .unwrap_or_else(|| self.text_content(id)),
            "textarea" => self.text_content(id),
            "input" => match self.get_attribute(id, "value") {
                Some(value) => value,
                None if matches!(self.input_type(id).as_str(), "checkbox" | "radio") => {
                    "on".to_string()
                }
                None => String::new(),
            },
            _ => self.get_attribute(id, "value").unwrap_or_default(),
        }
    }

    pub fn set_value(&self, id: NodeId, value: &str) {
        if self.is_tag(id, "select") {
            for option in self.options(id) {
                let selected = self.value(option) == value;
                self.set_property(option, "selected", Value::Bool(selected));
            }
            return;
        }
        self.set_property(id, "value", Value::String(value.to_string()));
    }

    pub fn checked(&self, id: NodeId) -> bool {
        match self.get_property(id, "checked") {
            Value::Bool(checked) => checked,
            _ => self.has_attribute(id, "checked"),
        }
    }

    /// Checking a radio button unchecks the other radios of its group
    pub fn set_checked(&self, id: NodeId, checked: bool) {
        self.set_property(id, "checked", Value::Bool(checked));
        if !checked || self.input_type(id) != "radio" {
            return;
        }
        let Some(name) = self.get_attribute(id, "name") else {
            return;
        };
        for other in self.descendants(self.root) {
            if other != id
                && self.is_tag(other, "input")
                && self.input_type(other) == "radio"
                && self.get_attribute(other, "name").as_deref() == Some(name.as_str())
            {
                self.set_property(other, "checked", Value::Bool(false));
            }
        }
    }

    pub fn selected(&self, option: NodeId) -> bool {
        match self.get_property(option, "selected") {
            Value::Bool(selected) => selected,
            _ => self.has_attribute(option, "selected"),
        }
    }

    pub fn set_selected(&self, option: NodeId, selected: bool) {
        self.set_property(option, "selected", Value::Bool(selected));
    }

    /// `<option>` descendants of a `<select>`
    pub fn options(&self, select: NodeId) -> Vec<NodeId> {
        self.descendants(select)
            .into_iter()
            .filter(|n| self.is_tag(*n, "option"))
            .collect()
    }
}

/// A node handle that carries its document; the form nodes take when they
/// flow through expressions (`$el`, `$refs.x`, `$event.target`)
#[derive(Clone)]
pub struct NodeRef {
    pub doc: Rc<Document>,
    pub id: NodeId,
}

impl NodeRef {
    pub fn new(doc: Rc<Document>, id: NodeId) -> Self {
        Self { doc, id }
    }

    /// Upper-case tag name, or `#text` / `#comment` / `#fragment`
    pub fn tag_name(&self) -> String {
        match self.doc.kind(self.id) {
            NodeKind::Element(tag) => tag.to_ascii_uppercase(),
            NodeKind::Text => "#text".to_string(),
            NodeKind::Comment => "#comment".to_string(),
            NodeKind::Fragment => "#fragment".to_string(),
            NodeKind::Document => "#document".to_string(),
        }
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.doc, &other.doc) && self.id == other.id
    }
}

impl std::fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodeRef({:?})", self.id)
    }
}
