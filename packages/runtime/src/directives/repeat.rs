//! `v-for`: one block per item of an array, a count, or an object.
//!
//! Blocks are keyed. Each pass removes blocks whose key disappeared, then
//! walks the new list back to front so every block's successor is already
//! in place: reused blocks get the new item values merged into their scope
//! and move only when their successor changed, new blocks mount before the
//! successor or the anchor.

use crate::block::{Block, BlockKey};
use crate::context::{create_scoped_context, Context};
use crate::dom::NodeId;
use crate::reactive::{untracked, ReactiveObject, Value};
use petal_parser::{parse_for_header, BindingPattern, ForHeader};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, instrument, warn};

/// Where the key of each item comes from
enum KeySource {
    /// No key: the item's position
    Index,
    /// An expression evaluated in the item's scope (`:key`, or a literal
    /// `key` attribute turned into a string expression)
    Expression(String),
}

struct Item {
    data: ReactiveObject,
    ctx: Context,
    key: BlockKey,
}

#[derive(Default)]
struct ListState {
    mounted: bool,
    blocks: Vec<Rc<Block>>,
    key_to_index: HashMap<BlockKey, usize>,
}

/// Take over the `v-for` element `el` (attribute already removed). Returns
/// where the walk resumes.
#[instrument(level = "debug", skip(ctx), fields(node = el.index()))]
pub(crate) fn process(el: NodeId, exp: &str, ctx: &Context) -> Option<NodeId> {
    let doc = ctx.document.clone();
    let resume = doc.next_sibling(el);

    let header = match parse_for_header(exp) {
        Ok(header) => header,
        Err(err) => {
            warn!(expression = exp, error = %err, "Invalid v-for expression; nothing will render");
            doc.remove(el);
            return resume;
        }
    };

    let key_source = if let Some(literal) = doc.get_attribute(el, "key") {
        doc.remove_attribute(el, "key");
        KeySource::Expression(serde_json::to_string(&literal).unwrap_or_default())
    } else if let Some(exp) = doc
        .get_attribute(el, ":key")
        .map(|exp| (":key", exp))
        .or_else(|| doc.get_attribute(el, "v-bind:key").map(|exp| ("v-bind:key", exp)))
        .map(|(name, exp)| {
            doc.remove_attribute(el, name);
            exp
        })
    {
        KeySource::Expression(exp)
    } else {
        KeySource::Index
    };

    let Some(parent) = doc.parent(el) else {
        warn!(expression = exp, "v-for on a detached element");
        return resume;
    };
    let anchor = doc.create_text("");
    if let Err(err) = doc.insert_before(parent, anchor, Some(el)) {
        debug!(error = %err, "Could not place v-for anchor");
    }
    doc.remove(el);

    let state = Rc::new(RefCell::new(ListState::default()));
    let owner = ctx.clone();
    ctx.effect(move || {
        let source = owner.evaluator().evaluate(&owner.env(el), &header.source_text);
        let items = create_items(&owner, el, &header, &key_source, &source);
        let mut state = state.borrow_mut();
        let Some(parent) = owner.document.parent(anchor) else {
            debug!("v-for anchor is detached; skipping update");
            return;
        };

        if !state.mounted {
            let mut blocks = Vec::with_capacity(items.len());
            let mut key_to_index = HashMap::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                key_to_index.insert(item.key.clone(), i);
                let block = mount_block(el, item, parent, anchor);
                blocks.push(block);
            }
            state.blocks = blocks;
            state.key_to_index = key_to_index;
            state.mounted = true;
            return;
        }

        let next_map: HashMap<BlockKey, usize> = items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.key.clone(), i))
            .collect();

        for block in &state.blocks {
            if block.key().is_some_and(|key| !next_map.contains_key(key)) {
                block.remove();
            }
        }

        let count = items.len();
        let mut next_blocks: Vec<Option<Rc<Block>>> = vec![None; count];
        for (i, item) in items.into_iter().enumerate().rev() {
            let next_block = next_blocks.get(i + 1).cloned().flatten();
            let before = next_block.as_ref().map_or(anchor, |block| block.el());

            match state.key_to_index.get(&item.key).copied() {
                Some(old_index) => {
                    let block = state.blocks[old_index].clone();
                    untracked(|| block.ctx.scope.assign(&item.data));
                    if old_index != i {
                        let old_successor = state.blocks.get(old_index + 1);
                        let moved = match (old_successor, &next_block) {
                            (Some(old), Some(new)) => !Rc::ptr_eq(old, new),
                            (None, None) => false,
                            _ => true,
                        };
                        if moved {
                            block.insert(parent, Some(before));
                        }
                    }
                    next_blocks[i] = Some(block);
                }
                None => {
                    next_blocks[i] = Some(mount_block(el, item, parent, before));
                }
            }
        }

        state.blocks = next_blocks.into_iter().flatten().collect();
        state.key_to_index = next_map;
    });

    resume
}

fn mount_block(template: NodeId, item: Item, parent: NodeId, before: NodeId) -> Rc<Block> {
    let block = untracked(|| Block::with_key(template, &item.ctx, false, Some(item.key)));
    block.insert(parent, Some(before));
    block
}

fn create_items(
    ctx: &Context,
    el: NodeId,
    header: &ForHeader,
    key_source: &KeySource,
    source: &Value,
) -> Vec<Item> {
    let entries: Vec<(Value, Option<String>)> = match source {
        Value::Array(array) => array.to_vec().into_iter().map(|v| (v, None)).collect(),
        Value::Number(n) if n.is_finite() && *n >= 1.0 => {
            (1..=n.floor() as usize).map(|i| (Value::from(i), None)).collect()
        }
        Value::Object(object) => object
            .entries()
            .into_iter()
            .map(|(key, value)| (value, Some(key)))
            .collect(),
        Value::String(s) => s.chars().map(|c| (Value::String(c.to_string()), None)).collect(),
        Value::Undefined | Value::Null | Value::Number(_) => Vec::new(),
        other => {
            warn!(source = %header.source_text, value = ?other, "v-for source is not iterable");
            Vec::new()
        }
    };

    let mut seen: HashMap<BlockKey, usize> = HashMap::with_capacity(entries.len());
    let mut items = Vec::with_capacity(entries.len());
    for (index, (value, object_key)) in entries.into_iter().enumerate() {
        let data = ReactiveObject::new();
        untracked(|| destructure(&header.value, &value, &data));
        match object_key {
            Some(object_key) => {
                if let Some(name) = &header.index {
                    data.insert_untracked(name, Value::String(object_key));
                }
                if let Some(name) = &header.object_index {
                    data.insert_untracked(name, Value::from(index));
                }
            }
            None => {
                if let Some(name) = &header.index {
                    data.insert_untracked(name, Value::from(index));
                }
            }
        }

        let item_ctx = create_scoped_context(ctx, data.clone());
        let mut key = match key_source {
            KeySource::Index => BlockKey::Index(index),
            KeySource::Expression(exp) => {
                BlockKey::from_value(&ctx.evaluator().evaluate(&item_ctx.env(el), exp))
            }
        };
        if let Some(first) = seen.get(&key) {
            warn!(key = ?key, first = first, duplicate = index, "Duplicate v-for key; falling back to position");
            key = BlockKey::Index(index);
        }
        seen.insert(key.clone(), index);

        items.push(Item {
            data,
            ctx: item_ctx,
            key,
        });
    }
    items
}

/// Bind `value` to the names `pattern` introduces
fn destructure(pattern: &BindingPattern, value: &Value, data: &ReactiveObject) {
    match pattern {
        BindingPattern::Identifier { name } => data.insert_untracked(name, value.clone()),
        BindingPattern::Array { elements } => {
            let items = value.as_array().map(|a| a.to_vec()).unwrap_or_default();
            for (i, element) in elements.iter().enumerate() {
                if let Some(element) = element {
                    destructure(element, &items.get(i).cloned().unwrap_or_default(), data);
                }
            }
        }
        BindingPattern::Object { fields } => {
            for field in fields {
                let inner = match value {
                    Value::Object(object) => object.get_untracked(&field.key),
                    _ => Value::Undefined,
                };
                destructure(&field.binding, &inner, data);
            }
        }
    }
}
