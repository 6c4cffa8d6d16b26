use crate::context::{create_context, Context, Lifecycle};
use crate::dom::NodeId;
use crate::reactive::Value;
use crate::walk::{walk, walk_children};
use std::cell::Cell;
use std::rc::{Rc, Weak};
use tracing::debug;

/// Identity of a repeated item across reconciliation passes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockKey {
    Undefined,
    Null,
    Bool(bool),
    /// `f64` bits with `-0` folded into `0`
    Number(u64),
    String(String),
    /// Identity of an object, array, function or node
    Ref(usize),
    /// Position in the source list, used when no key is given
    Index(usize),
}

impl BlockKey {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Undefined => BlockKey::Undefined,
            Value::Null => BlockKey::Null,
            Value::Bool(b) => BlockKey::Bool(*b),
            Value::Number(n) => {
                let n = if *n == 0.0 { 0.0 } else { *n };
                BlockKey::Number(n.to_bits())
            }
            Value::String(s) => BlockKey::String(s.clone()),
            Value::Object(o) => BlockKey::Ref(o.identity()),
            Value::Array(a) => BlockKey::Ref(a.identity()),
            Value::Function(f) => BlockKey::Ref(f.identity()),
            Value::Node(node) => BlockKey::Ref(node.id.index()),
        }
    }
}

/// One live region of the document: a single element, or the nodes between
/// two empty text markers when instantiated from a `<template>`.
pub struct Block {
    /// The element, or the fragment holding the content before first insert
    node: NodeId,
    pub ctx: Context,
    parent: Option<Weak<Lifecycle>>,
    key: Option<BlockKey>,
    is_fragment: bool,
    start: Cell<Option<NodeId>>,
    end: Cell<Option<NodeId>>,
}

impl Block {
    /// The root block adopts `template` and `ctx` as-is. Any other block
    /// clones `template`, gets a child context registered under `ctx`, and
    /// walks the clone.
    pub fn new(template: NodeId, ctx: &Context, is_root: bool) -> Rc<Self> {
        Self::with_key(template, ctx, is_root, None)
    }

    pub(crate) fn with_key(
        template: NodeId,
        ctx: &Context,
        is_root: bool,
        key: Option<BlockKey>,
    ) -> Rc<Self> {
        let doc = &ctx.document;

        if is_root {
            let block = Rc::new(Self {
                node: template,
                ctx: ctx.clone(),
                parent: None,
                key,
                is_fragment: false,
                start: Cell::new(None),
                end: Cell::new(None),
            });
            walk(template, &block.ctx);
            return block;
        }

        let is_fragment = doc.is_tag(template, "template");
        let node = if is_fragment {
            let fragment = doc.create_fragment();
            for child in doc.children(template) {
                let copy = doc.clone_node(child, true);
                // a fresh fragment always accepts children
                let _ = doc.append_child(fragment, copy);
            }
            fragment
        } else {
            doc.clone_node(template, true)
        };

        let block = Rc::new(Self {
            node,
            ctx: create_context(ctx),
            parent: Some(Rc::downgrade(&ctx.lifecycle)),
            key,
            is_fragment,
            start: Cell::new(None),
            end: Cell::new(None),
        });
        ctx.lifecycle.blocks.borrow_mut().push(block.clone());

        if is_fragment {
            walk_children(node, &block.ctx);
        } else {
            walk(node, &block.ctx);
        }
        block
    }

    pub fn key(&self) -> Option<&BlockKey> {
        self.key.as_ref()
    }

    pub fn is_fragment(&self) -> bool {
        self.is_fragment
    }

    /// First node of the region: the element, or the start marker
    pub fn el(&self) -> NodeId {
        self.start.get().unwrap_or(self.node)
    }

    /// Insert the region into `parent` before `anchor`. A fragment block
    /// materializes its markers on first insert and moves the whole marker
    /// range afterwards.
    pub fn insert(&self, parent: NodeId, anchor: Option<NodeId>) {
        let doc = &self.ctx.document;
        let result = if !self.is_fragment {
            doc.insert_before(parent, self.node, anchor)
        } else if let (Some(start), Some(end)) = (self.start.get(), self.end.get()) {
            let mut current = Some(start);
            let mut result = Ok(());
            while let Some(node) = current {
                let next = doc.next_sibling(node);
                result = doc.insert_before(parent, node, anchor);
                if node == end || result.is_err() {
                    break;
                }
                current = next;
            }
            result
        } else {
            let start = doc.create_text("");
            let end = doc.create_text("");
            self.start.set(Some(start));
            self.end.set(Some(end));
            doc.insert_before(parent, end, anchor)
                .and_then(|_| doc.insert_before(parent, start, Some(end)))
                .and_then(|_| doc.insert_before(parent, self.node, Some(end)))
        };

        if let Err(err) = result {
            debug!(error = %err, "Block insert failed");
        }
    }

    /// Unregister from the parent context, detach from the document, and
    /// tear down
    pub fn remove(&self) {
        if let Some(parent) = self.parent.as_ref().and_then(Weak::upgrade) {
            parent
                .blocks
                .borrow_mut()
                .retain(|block| !std::ptr::eq(Rc::as_ptr(block), self));
        }

        let doc = &self.ctx.document;
        match (self.start.get(), self.end.get()) {
            (Some(start), Some(end)) => {
                let mut current = Some(start);
                while let Some(node) = current {
                    let next = doc.next_sibling(node);
                    doc.remove(node);
                    if node == end {
                        break;
                    }
                    current = next;
                }
            }
            _ if doc.is_connected(self.node) => doc.remove(self.node),
            _ => debug!(node = self.node.index(), "Block already detached"),
        }

        self.teardown();
    }

    /// Release everything the block's context owns. Safe to call twice.
    pub fn teardown(&self) {
        self.ctx.lifecycle.teardown();
    }
}
