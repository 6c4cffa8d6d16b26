use super::{BindingSite, Cleanup};

/// Toggles `display: none`, restoring whatever display the element was
/// authored with
pub(super) fn show(site: &BindingSite<'_>) -> Option<Cleanup> {
    let doc = site.document().clone();
    let el = site.el;
    let get = site.getter();
    let initial = doc.get_style(el, "display");
    site.effect(move || {
        if get().is_truthy() {
            match &initial {
                Some(display) => doc.set_style(el, "display", display),
                None => doc.remove_style(el, "display"),
            }
        } else {
            doc.set_style(el, "display", "none");
        }
    });
    None
}
