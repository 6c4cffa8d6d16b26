//! `v-if` / `v-else-if` / `v-else`.
//!
//! The chain's elements are lifted out of the document and kept as
//! templates; a comment anchor holds the position. At most one branch is
//! mounted at a time and a branch is remounted fresh whenever the winning
//! index changes.

use crate::block::Block;
use crate::context::Context;
use crate::dom::NodeId;
use crate::reactive::untracked;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};

struct Branch {
    /// `None` for `v-else`
    condition: Option<String>,
    template: NodeId,
}

#[derive(Default)]
struct Active {
    index: Option<usize>,
    block: Option<Rc<Block>>,
}

/// Take over the `v-if` element `el` (attribute already removed) and its
/// trailing `v-else-if` / `v-else` siblings. Returns where the walk resumes.
pub(crate) fn process(el: NodeId, exp: &str, ctx: &Context) -> Option<NodeId> {
    let doc = ctx.document.clone();
    let Some(parent) = doc.parent(el) else {
        warn!(expression = exp, "v-if on a detached element");
        return None;
    };

    let mut branches = vec![Branch {
        condition: Some(exp.to_string()),
        template: el,
    }];
    let mut sibling = doc.next_element_sibling(el);
    while let Some(candidate) = sibling {
        let next = doc.next_element_sibling(candidate);
        if let Some(condition) = doc.get_attribute(candidate, "v-else-if") {
            doc.remove_attribute(candidate, "v-else-if");
            branches.push(Branch {
                condition: Some(condition),
                template: candidate,
            });
        } else if doc.has_attribute(candidate, "v-else") {
            doc.remove_attribute(candidate, "v-else");
            branches.push(Branch {
                condition: None,
                template: candidate,
            });
            break;
        } else {
            break;
        }
        sibling = next;
    }

    let last = branches.last().map_or(el, |branch| branch.template);
    let resume = doc.next_sibling(last);

    let anchor = doc.create_comment("v-if");
    if let Err(err) = doc.insert_before(parent, anchor, Some(el)) {
        debug!(error = %err, "Could not place v-if anchor");
    }
    for branch in &branches {
        doc.remove(branch.template);
    }

    for branch in &branches {
        if let Some(condition) = &branch.condition {
            if let Err(err) = ctx.evaluator().check(condition) {
                warn!(expression = %condition, error = %err, "Invalid v-if chain; nothing will render");
                return resume;
            }
        }
    }
    debug!(branches = branches.len(), "Conditional chain");

    let active = Rc::new(RefCell::new(Active::default()));
    let owner = ctx.clone();
    let env = ctx.env(el);
    ctx.effect(move || {
        let winner = branches.iter().position(|branch| match &branch.condition {
            Some(condition) => owner.evaluator().evaluate(&env, condition).is_truthy(),
            None => true,
        });

        let mut state = active.borrow_mut();
        if winner == state.index {
            return;
        }
        if let Some(block) = state.block.take() {
            block.remove();
        }
        state.index = winner;

        if let Some(index) = winner {
            let template = branches[index].template;
            // mounting reads state the new block will subscribe to on its own
            let block = untracked(|| Block::new(template, &owner, false));
            match owner.document.parent(anchor) {
                Some(parent) => block.insert(parent, Some(anchor)),
                None => debug!("v-if anchor is detached; branch not inserted"),
            }
            state.block = Some(block);
        }
    });

    resume
}

#[cfg(test)]
mod tests {
    use crate::directives::test_support::{html, mount};
    use crate::reactive::{ReactiveObject, Value};

    #[test]
    fn test_chain_switches_branches() {
        let data = ReactiveObject::from_pairs([("n", Value::from(1))]);
        let (ctx, body) = mount(
            r#"<p v-if="n === 1">one</p><p v-else-if="n === 2">two</p><p v-else>many</p><i>after</i>"#,
            data.clone(),
        );
        assert_eq!(html(&ctx, body), "<p>one</p><!--v-if--><i>after</i>");

        data.set("n", Value::from(2));
        ctx.scheduler().flush();
        assert_eq!(html(&ctx, body), "<p>two</p><!--v-if--><i>after</i>");

        data.set("n", Value::from(7));
        ctx.scheduler().flush();
        assert_eq!(html(&ctx, body), "<p>many</p><!--v-if--><i>after</i>");
        assert_eq!(ctx.child_block_count(), 1);
    }

    #[test]
    fn test_no_match_mounts_nothing() {
        let data = ReactiveObject::from_pairs([("ok", Value::Bool(false))]);
        let (ctx, body) = mount(r#"<p v-if="ok">{{ ok }}</p>"#, data.clone());
        assert_eq!(html(&ctx, body), "<!--v-if-->");
        assert_eq!(ctx.child_block_count(), 0);

        data.set("ok", Value::Bool(true));
        ctx.scheduler().flush();
        assert_eq!(html(&ctx, body), "<p>true</p><!--v-if-->");
    }

    #[test]
    fn test_malformed_condition_never_mounts() {
        let data = ReactiveObject::from_pairs([("ok", Value::Bool(true))]);
        let (ctx, body) = mount(
            r#"<p v-if="ok">a</p><p v-else-if="(">b</p><span>rest {{ ok }}</span>"#,
            data,
        );
        assert_eq!(html(&ctx, body), "<!--v-if--><span>rest true</span>");
        assert_eq!(ctx.child_block_count(), 0);
    }

    #[test]
    fn test_template_branch_mounts_fragment() {
        let data = ReactiveObject::from_pairs([("ok", Value::Bool(true))]);
        let (ctx, body) = mount(
            r#"<template v-if="ok"><b>a</b><i>b</i></template>"#,
            data.clone(),
        );
        assert_eq!(html(&ctx, body), "<b>a</b><i>b</i><!--v-if-->");
        data.set("ok", Value::Bool(false));
        ctx.scheduler().flush();
        assert_eq!(html(&ctx, body), "<!--v-if-->");
    }
}
