use crate::block::Block;
use crate::config::AppConfig;
use crate::context::{Context, Registry, Runtime};
use crate::directives::Directive;
use crate::dom::{Document, NodeId};
use crate::reactive::{ReactiveObject, Value};
use crate::scope::Scope;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// An application: root data, custom directives, and the blocks it mounted.
///
/// ```
/// use petal_runtime::{App, Document};
///
/// let doc = Document::parse(r#"<p v-scope="{ n: 1 }">{{ n + 1 }}</p>"#).unwrap();
/// let app = App::from_json(&serde_json::json!({}));
/// app.mount(&doc, doc.body());
/// assert_eq!(doc.inner_html(doc.body()), "<p>2</p>");
/// ```
pub struct App {
    scope: Scope,
    registry: Registry,
    runtime: Rc<Runtime>,
    roots: RefCell<Vec<Rc<Block>>>,
}

impl App {
    pub fn new(data: ReactiveObject) -> Self {
        Self::with_config(data, AppConfig::default())
    }

    pub fn with_config(data: ReactiveObject, config: AppConfig) -> Self {
        Self {
            scope: Scope::root(data),
            registry: Registry::default(),
            runtime: Rc::new(Runtime::new(config)),
            roots: RefCell::new(Vec::new()),
        }
    }

    /// Root data from JSON. Anything but an object yields empty data.
    pub fn from_json(data: &serde_json::Value) -> Self {
        Self::new(root_data(data))
    }

    pub fn config(&self) -> &AppConfig {
        &self.runtime.config
    }

    /// Register a custom directive, used as `v-<name>`
    pub fn directive(&self, name: &str, directive: impl Directive + 'static) -> &Self {
        self.registry
            .borrow_mut()
            .insert(name.to_string(), Rc::new(directive));
        self
    }

    /// Set one root data property
    pub fn data(&self, key: &str, value: Value) -> &Self {
        self.scope.define(key, value);
        self
    }

    /// Bind `root` and everything below it. When `root` carries no `v-scope`
    /// but has `v-scope` descendants, each outermost one becomes its own
    /// root block; otherwise `root` itself is the only one.
    pub fn mount(&self, document: &Rc<Document>, root: NodeId) -> &Self {
        if !self.roots.borrow().is_empty() {
            warn!("App is already mounted; unmount it first");
            return self;
        }

        let roots = if document.has_attribute(root, "v-scope") {
            vec![root]
        } else {
            let scoped = outermost_scopes(document, root);
            if scoped.is_empty() {
                vec![root]
            } else {
                scoped
            }
        };
        info!(roots = roots.len(), "Mounting app");

        let ctx = Context::root(
            document.clone(),
            self.scope.clone(),
            self.registry.clone(),
            self.runtime.clone(),
        );
        let blocks: Vec<Rc<Block>> = roots
            .into_iter()
            .map(|el| Block::new(el, &ctx, true))
            .collect();
        *self.roots.borrow_mut() = blocks;

        for el in std::iter::once(root).chain(document.descendants(root)) {
            if document.has_attribute(el, "v-cloak") {
                document.remove_attribute(el, "v-cloak");
            }
        }
        self
    }

    /// Tear every root block down. The document keeps its current content.
    pub fn unmount(&self) {
        let roots = std::mem::take(&mut *self.roots.borrow_mut());
        debug!(roots = roots.len(), "Unmounting app");
        for block in roots {
            block.teardown();
        }
    }

    pub fn is_mounted(&self) -> bool {
        !self.roots.borrow().is_empty()
    }

    /// Run every pending update
    pub fn tick(&self) {
        self.runtime.scheduler.flush();
    }

    /// Run `callback` after the next flush
    pub fn next_tick(&self, callback: impl FnOnce() + 'static) {
        self.runtime.scheduler.next_tick(callback);
    }

    pub fn has_pending_updates(&self) -> bool {
        self.runtime.scheduler.is_flush_pending()
    }

    /// The root scope, for reading and writing application state from the
    /// host
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn clear_expression_cache(&self) {
        self.runtime.evaluator.clear();
    }

    pub fn cached_expressions(&self) -> usize {
        self.runtime.evaluator.len()
    }
}

fn root_data(data: &serde_json::Value) -> ReactiveObject {
    match Value::from_json(data) {
        Value::Object(object) => object,
        Value::Null | Value::Undefined => ReactiveObject::new(),
        other => {
            warn!(data = ?other, "Root data must be an object");
            ReactiveObject::new()
        }
    }
}

/// `v-scope` elements under `root` with no `v-scope` ancestor below `root`
fn outermost_scopes(doc: &Document, root: NodeId) -> Vec<NodeId> {
    doc.descendants(root)
        .into_iter()
        .filter(|el| doc.has_attribute(*el, "v-scope"))
        .filter(|el| {
            let mut current = doc.parent(*el);
            while let Some(node) = current {
                if node == root {
                    return true;
                }
                if doc.has_attribute(node, "v-scope") {
                    return false;
                }
                current = doc.parent(node);
            }
            true
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::{BindingSite, Cleanup};
    use std::cell::Cell;

    #[test]
    fn test_mount_whole_body() {
        let doc = Document::parse(r#"<p v-cloak>{{ greeting }}</p>"#).unwrap();
        let app = App::from_json(&serde_json::json!({ "greeting": "hi" }));
        app.mount(&doc, doc.body());
        assert_eq!(doc.inner_html(doc.body()), "<p>hi</p>");

        app.scope().set("greeting", Value::from("bye"));
        assert!(app.has_pending_updates());
        app.tick();
        assert_eq!(doc.inner_html(doc.body()), "<p>bye</p>");
    }

    #[test]
    fn test_outermost_scopes_become_roots() {
        let doc = Document::parse(
            r#"<div v-scope="{ a: 1 }">{{ a }}<i v-scope="{ b: 2 }">{{ a + b }}</i></div><span>{{ a }}</span>"#,
        )
        .unwrap();
        let app = App::new(ReactiveObject::new());
        app.mount(&doc, doc.body());
        assert_eq!(app.roots.borrow().len(), 1);
        assert_eq!(
            doc.inner_html(doc.body()),
            "<div>1<i>3</i></div><span>{{ a }}</span>"
        );
    }

    #[test]
    fn test_custom_directive_and_unmount() {
        let doc = Document::parse(r#"<p v-upper="word"></p>"#).unwrap();
        let app = App::from_json(&serde_json::json!({ "word": "loud" }));
        let cleaned = Rc::new(Cell::new(false));
        let flag = cleaned.clone();
        app.directive("upper", move |site: &BindingSite<'_>| -> Option<Cleanup> {
            let doc = site.document().clone();
            let (el, get) = (site.el, site.getter());
            site.effect(move || {
                doc.set_text_content(el, &get().to_js_string().to_uppercase());
            });
            let flag = flag.clone();
            Some(Box::new(move || flag.set(true)))
        });
        app.mount(&doc, doc.body());
        assert_eq!(doc.inner_html(doc.body()), "<p>LOUD</p>");

        app.unmount();
        assert!(cleaned.get());
        assert!(!app.is_mounted());
        app.scope().set("word", Value::from("quiet"));
        app.tick();
        assert_eq!(doc.inner_html(doc.body()), "<p>LOUD</p>");
    }

    #[test]
    fn test_non_object_root_data() {
        let app = App::from_json(&serde_json::json!([1, 2]));
        assert!(app.scope().data().is_empty());
    }
}
