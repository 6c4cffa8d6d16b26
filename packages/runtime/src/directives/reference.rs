use super::{BindingSite, Cleanup};
use std::cell::RefCell;
use std::rc::Rc;

/// Registers the element in `$refs`. The literal `ref="name"` form reaches
/// here with a quoted string expression; `:ref` re-registers whenever the
/// name changes.
pub(super) fn reference(site: &BindingSite<'_>) -> Option<Cleanup> {
    let scope = site.ctx.scope.clone();
    let node = site.node();
    let get = site.getter();
    let current: Rc<RefCell<Option<String>>> = Rc::new(RefCell::new(None));

    let slot = current.clone();
    let (effect_scope, effect_node) = (scope.clone(), node.clone());
    site.effect(move || {
        let name = get().to_js_string();
        effect_scope.register_ref(&name, effect_node.clone());
        let previous = slot.replace(Some(name.clone()));
        if let Some(previous) = previous.filter(|p| *p != name) {
            effect_scope.unregister_ref(&previous, &effect_node);
        }
    });

    Some(Box::new(move || {
        if let Some(name) = current.take() {
            scope.unregister_ref(&name, &node);
        }
    }))
}
