//! Directive discovery.
//!
//! [`walk`] visits one node and returns the next sibling to visit. Structural
//! directives (`v-if`, `v-for`) take over their element and report where the
//! walk resumes; everything else is bound in place.

use crate::context::{create_scoped_context, Context};
use crate::directives::text::{interpolate, Segment};
use crate::directives::{apply, resolve, BuiltinDirective, Modifiers};
use crate::directives::{if_chain, repeat};
use crate::dom::{NodeId, NodeKind};
use crate::reactive::{ReactiveObject, Value};
use regex::Regex;
use tracing::{debug, instrument, warn};

fn is_directive(name: &str) -> bool {
    name.starts_with("v-") || name.starts_with(':') || name.starts_with('@')
}

/// Read and remove an attribute
fn take_attr(ctx: &Context, el: NodeId, name: &str) -> Option<String> {
    let value = ctx.document.get_attribute(el, name)?;
    ctx.document.remove_attribute(el, name);
    Some(value)
}

pub fn walk(node: NodeId, ctx: &Context) -> Option<NodeId> {
    let doc = &ctx.document;
    match doc.kind(node) {
        NodeKind::Element(_) => walk_element(node, ctx),
        NodeKind::Text => {
            let data = doc.text(node);
            if ctx.runtime.interpolation.is_match(&data) {
                let segments = split_interpolation(&data, &ctx.runtime.interpolation);
                interpolate(node, segments, ctx);
            }
            doc.next_sibling(node)
        }
        NodeKind::Fragment | NodeKind::Document => {
            walk_children(node, ctx);
            doc.next_sibling(node)
        }
        NodeKind::Comment => doc.next_sibling(node),
    }
}

pub fn walk_children(parent: NodeId, ctx: &Context) {
    let mut child = ctx.document.first_child(parent);
    while let Some(node) = child {
        child = walk(node, ctx);
    }
}

#[instrument(level = "trace", skip(ctx), fields(node = el.index()))]
fn walk_element(el: NodeId, ctx: &Context) -> Option<NodeId> {
    let doc = &ctx.document;

    if take_attr(ctx, el, "v-pre").is_some() {
        return doc.next_sibling(el);
    }

    if let Some(exp) = take_attr(ctx, el, "v-if") {
        return if_chain::process(el, &exp, ctx);
    }

    if let Some(exp) = take_attr(ctx, el, "v-for") {
        return repeat::process(el, &exp, ctx);
    }

    let mut scoped = None;
    if let Some(exp) = take_attr(ctx, el, "v-scope") {
        let data = if exp.trim().is_empty() {
            ReactiveObject::new()
        } else {
            match ctx.evaluator().evaluate(&ctx.env(el), &exp) {
                Value::Object(data) => data,
                Value::Undefined => ReactiveObject::new(),
                other => {
                    warn!(expression = %exp, value = ?other, "v-scope must evaluate to an object");
                    ReactiveObject::new()
                }
            }
        };
        debug!(keys = ?data.keys(), "Creating scope");
        scoped = Some(create_scoped_context(ctx, data));
    }
    let ctx = scoped.as_ref().unwrap_or(ctx);

    let once = take_attr(ctx, el, "v-once").is_some();
    let was_in_once = ctx.runtime.in_once.get();
    if once {
        ctx.runtime.in_once.set(true);
    }

    if let Some(name) = take_attr(ctx, el, "ref") {
        let literal = serde_json::to_string(&name).unwrap_or_default();
        apply(
            &BuiltinDirective::Ref,
            el,
            &literal,
            ctx,
            None,
            Modifiers::default(),
        );
    }

    // `<template>` content is only instantiated by structural directives
    if !doc.is_tag(el, "template") {
        walk_children(el, ctx);
    }

    let mut deferred = Vec::new();
    for (name, value) in doc.attributes(el) {
        if !is_directive(&name) || name == "v-cloak" {
            continue;
        }
        if name == "v-model" || name.starts_with("v-model.") {
            deferred.push((name, value));
        } else {
            process_directive(el, &name, &value, ctx);
        }
    }
    for (name, value) in deferred {
        process_directive(el, &name, &value, ctx);
    }

    if once {
        ctx.runtime.in_once.set(was_in_once);
    }
    doc.next_sibling(el)
}

/// Split `@keyup.enter.stop` into the directive part and its modifiers
fn split_modifiers(raw: &str) -> (&str, Modifiers) {
    match raw.split_once('.') {
        Some((name, rest)) => (name, Modifiers::from_iter(rest.split('.'))),
        None => (raw, Modifiers::default()),
    }
}

fn process_directive(el: NodeId, raw: &str, exp: &str, ctx: &Context) {
    let (name, modifiers) = split_modifiers(raw);

    let (dir_name, arg) = if let Some(arg) = name.strip_prefix(':') {
        ("bind", Some(arg))
    } else if let Some(arg) = name.strip_prefix('@') {
        ("on", Some(arg))
    } else {
        let body = &name[2..];
        match body.split_once(':') {
            Some((dir, arg)) => (dir, Some(arg)),
            None => (body, None),
        }
    };

    let dir_name = if dir_name == "bind" && arg == Some("ref") {
        "ref"
    } else {
        dir_name
    };

    let Some(directive) = resolve(ctx, dir_name) else {
        warn!(directive = raw, "Unknown custom directive");
        return;
    };

    apply(
        directive.as_ref(),
        el,
        exp,
        ctx,
        arg.filter(|a| !a.is_empty()).map(str::to_string),
        modifiers,
    );
    ctx.document.remove_attribute(el, raw);
}

/// Split `Hello {{ name }}!` into literal text and trimmed expressions
pub(crate) fn split_interpolation(text: &str, pattern: &Regex) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;
    for captures in pattern.captures_iter(text) {
        let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        if whole.start() > last {
            segments.push(Segment::Text(text[last..whole.start()].to_string()));
        }
        segments.push(Segment::Expression(inner.as_str().trim().to_string()));
        last = whole.end();
    }
    if last < text.len() {
        segments.push(Segment::Text(text[last..].to_string()));
    }
    segments
}
