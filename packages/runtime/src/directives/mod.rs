//! Directive contract and the built-in leaf directives.
//!
//! A directive is invoked once per attribute with a [`BindingSite`] and may
//! hand back a [`Cleanup`] that the owning context runs on teardown.
//! Structural directives (`v-if`, `v-for`) are driven by the walker directly
//! and live in [`if_chain`] and [`repeat`].

mod bind;
mod effect;
mod html;
pub(crate) mod if_chain;
mod model;
mod on;
mod reference;
pub(crate) mod repeat;
mod show;
pub(crate) mod text;

use crate::context::Context;
use crate::dom::{Document, NodeId, NodeRef};
use crate::eval::Env;
use crate::reactive::{ReactiveEffect, Value};
use std::rc::Rc;
use tracing::trace;

pub type Cleanup = Box<dyn FnOnce()>;

pub trait Directive {
    fn bind(&self, site: &BindingSite<'_>) -> Option<Cleanup>;
}

impl<F> Directive for F
where
    F: Fn(&BindingSite<'_>) -> Option<Cleanup>,
{
    fn bind(&self, site: &BindingSite<'_>) -> Option<Cleanup> {
        self(site)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinDirective {
    Bind,
    On,
    Show,
    Text,
    Html,
    Model,
    Effect,
    Ref,
}

impl BuiltinDirective {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "bind" => Self::Bind,
            "on" => Self::On,
            "show" => Self::Show,
            "text" => Self::Text,
            "html" => Self::Html,
            "model" => Self::Model,
            "effect" => Self::Effect,
            "ref" => Self::Ref,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Bind => "bind",
            Self::On => "on",
            Self::Show => "show",
            Self::Text => "text",
            Self::Html => "html",
            Self::Model => "model",
            Self::Effect => "effect",
            Self::Ref => "ref",
        }
    }
}

impl Directive for BuiltinDirective {
    fn bind(&self, site: &BindingSite<'_>) -> Option<Cleanup> {
        match self {
            Self::Bind => bind::bind(site),
            Self::On => on::on(site),
            Self::Show => show::show(site),
            Self::Text => text::text(site),
            Self::Html => html::html(site),
            Self::Model => model::model(site),
            Self::Effect => effect::effect(site),
            Self::Ref => reference::reference(site),
        }
    }
}

/// Dot-separated suffixes of a directive attribute (`@click.stop.prevent`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modifiers(Vec<String>);

impl Modifiers {
    pub fn has(&self, name: &str) -> bool {
        self.0.iter().any(|m| m == name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Modifiers {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(Into::into)
                .filter(|m: &String| !m.is_empty())
                .collect(),
        )
    }
}

/// Everything one directive invocation sees
pub struct BindingSite<'a> {
    pub el: NodeId,
    pub ctx: &'a Context,
    pub exp: &'a str,
    pub arg: Option<String>,
    pub modifiers: Modifiers,
}

impl BindingSite<'_> {
    pub fn document(&self) -> &Rc<Document> {
        &self.ctx.document
    }

    pub fn node(&self) -> NodeRef {
        self.ctx.node_ref(self.el)
    }

    /// Environment the expression runs in (`$el` bound to the node)
    pub fn env(&self) -> Env {
        self.ctx.env(self.el)
    }

    /// Evaluate the expression now
    pub fn get(&self) -> Value {
        self.ctx.evaluator().evaluate(&self.env(), self.exp)
    }

    /// An owned accessor for use inside effects and listeners
    pub fn getter(&self) -> impl Fn() -> Value + 'static {
        let runtime = self.ctx.runtime.clone();
        let env = self.env();
        let exp = self.exp.to_string();
        move || runtime.evaluator.evaluate(&env, &exp)
    }

    pub fn effect(&self, f: impl Fn() + 'static) -> Option<ReactiveEffect> {
        self.ctx.effect(f)
    }
}

/// Look a directive up by name; registered directives win over built-ins
pub(crate) fn resolve(ctx: &Context, name: &str) -> Option<Rc<dyn Directive>> {
    if let Some(custom) = ctx.registry.borrow().get(name) {
        return Some(custom.clone());
    }
    BuiltinDirective::from_name(name).map(|builtin| Rc::new(builtin) as Rc<dyn Directive>)
}

/// Invoke `directive` on `el` and hand its cleanup to the context
pub(crate) fn apply(
    directive: &dyn Directive,
    el: NodeId,
    exp: &str,
    ctx: &Context,
    arg: Option<String>,
    modifiers: Modifiers,
) {
    trace!(node = el.index(), expression = exp, arg = ?arg, "Applying directive");
    let site = BindingSite {
        el,
        ctx,
        exp,
        arg,
        modifiers,
    };
    if let Some(cleanup) = directive.bind(&site) {
        ctx.on_cleanup(cleanup);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::AppConfig;
    use crate::context::{Context, Registry, Runtime};
    use crate::dom::{Document, NodeId};
    use crate::reactive::ReactiveObject;
    use crate::scope::Scope;
    use crate::walk::walk;
    use std::rc::Rc;

    /// Parse `markup`, walk its body with `data` as the root scope and
    /// return the context plus the body node
    pub(crate) fn mount(markup: &str, data: ReactiveObject) -> (Context, NodeId) {
        let doc = Document::parse(markup).unwrap();
        let runtime = Rc::new(Runtime::new(AppConfig::default()));
        let ctx = Context::root(doc.clone(), Scope::root(data), Registry::default(), runtime);
        let body = doc.body();
        walk(body, &ctx);
        (ctx, body)
    }

    pub(crate) fn html(ctx: &Context, node: NodeId) -> String {
        ctx.document.inner_html(node)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{html, mount};
    use super::*;
    use crate::reactive::ReactiveObject;
    use std::cell::Cell;

    #[test]
    fn test_modifiers() {
        let modifiers: Modifiers = ["stop", "", "prevent"].into_iter().collect();
        assert!(modifiers.has("stop"));
        assert!(modifiers.has("prevent"));
        assert_eq!(modifiers.iter().count(), 2);
    }

    #[test]
    fn test_builtin_names_round_trip() {
        for name in ["bind", "on", "show", "text", "html", "model", "effect", "ref"] {
            assert_eq!(BuiltinDirective::from_name(name).map(|d| d.name()), Some(name));
        }
        assert_eq!(BuiltinDirective::from_name("if"), None);
    }

    #[test]
    fn test_registry_overrides_builtin() {
        let (ctx, _) = mount("<p></p>", ReactiveObject::new());
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        let custom = move |site: &BindingSite<'_>| -> Option<Cleanup> {
            seen.set(seen.get() + 1);
            assert_eq!(site.exp, "x");
            None
        };
        ctx.registry
            .borrow_mut()
            .insert("text".to_string(), Rc::new(custom));

        let directive = resolve(&ctx, "text").unwrap();
        let body = ctx.document.body();
        apply(directive.as_ref(), body, "x", &ctx, None, Modifiers::default());
        assert_eq!(calls.get(), 1);
        assert!(resolve(&ctx, "nope").is_none());
    }

    #[test]
    fn test_cleanup_collected_by_context() {
        let (ctx, body) = mount("<p></p>", ReactiveObject::new());
        let cleaned = Rc::new(Cell::new(false));
        let flag = cleaned.clone();
        let directive = move |_: &BindingSite<'_>| -> Option<Cleanup> {
            let flag = flag.clone();
            Some(Box::new(move || flag.set(true)))
        };
        apply(&directive, body, "", &ctx, None, Modifiers::default());
        assert!(!cleaned.get());
        ctx.lifecycle.teardown();
        assert!(cleaned.get());
        assert_eq!(html(&ctx, body), "<p></p>");
    }
}
