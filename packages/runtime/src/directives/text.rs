use super::{BindingSite, Cleanup};
use crate::context::Context;
use crate::dom::NodeId;

/// One piece of an interpolated text node
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment {
    Text(String),
    Expression(String),
}

/// Keeps an interpolated text node in sync. Every expression is evaluated
/// on its own, so a failing one renders empty and the rest still show.
pub(crate) fn interpolate(node: NodeId, segments: Vec<Segment>, ctx: &Context) {
    let doc = ctx.document.clone();
    let runtime = ctx.runtime.clone();
    let env = ctx.env(node);
    ctx.effect(move || {
        let mut out = String::new();
        for segment in &segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Expression(exp) => {
                    out.push_str(&runtime.evaluator.evaluate(&env, exp).to_display_string())
                }
            }
        }
        doc.set_text(node, &out);
    });
}

/// Keeps a text node's data, or an element's text content, in sync with the
/// expression
pub(super) fn text(site: &BindingSite<'_>) -> Option<Cleanup> {
    let doc = site.document().clone();
    let el = site.el;
    let get = site.getter();
    site.effect(move || {
        let value = get().to_display_string();
        if doc.is_text(el) {
            doc.set_text(el, &value);
        } else {
            doc.set_text_content(el, &value);
        }
    });
    None
}
