use super::{BindingSite, Cleanup};
use tracing::warn;

pub(super) fn html(site: &BindingSite<'_>) -> Option<Cleanup> {
    let doc = site.document().clone();
    let el = site.el;
    let get = site.getter();
    site.effect(move || {
        let markup = get().to_display_string();
        if let Err(err) = doc.set_inner_html(el, &markup) {
            warn!(error = %err, "v-html received malformed markup");
        }
    });
    None
}

#[cfg(test)]
mod tests {
    use crate::directives::test_support::{html, mount};
    use crate::reactive::{ReactiveObject, Value};

    #[test]
    fn test_inner_html_is_not_compiled() {
        let data = ReactiveObject::from_pairs([("markup", Value::from("<em>{{ x }}</em>"))]);
        let (ctx, body) = mount(r#"<div v-html="markup"></div>"#, data.clone());
        assert_eq!(html(&ctx, body), "<div><em>{{ x }}</em></div>");

        data.set("markup", Value::from("plain"));
        ctx.scheduler().flush();
        assert_eq!(html(&ctx, body), "<div>plain</div>");
    }
}
