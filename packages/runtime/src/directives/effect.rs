use super::{BindingSite, Cleanup};

/// `v-effect="exp"`: runs the statements after mount and again whenever
/// anything they read changes
pub(super) fn effect(site: &BindingSite<'_>) -> Option<Cleanup> {
    let ctx = site.ctx.clone();
    let env = site.env();
    let exp = site.exp.to_string();
    site.ctx.scheduler().next_tick(move || {
        let runtime = ctx.runtime.clone();
        ctx.effect(move || {
            runtime.evaluator.execute(&env, &exp);
        });
    });
    None
}

#[cfg(test)]
mod tests {
    use crate::directives::test_support::{html, mount};
    use crate::reactive::{ReactiveObject, Value};

    #[test]
    fn test_effect_runs_after_mount_and_on_change() {
        let data = ReactiveObject::from_pairs([("n", Value::from(1))]);
        let (ctx, body) = mount(
            r#"<p v-effect="$el.textContent = n * 2"></p>"#,
            data.clone(),
        );
        assert_eq!(html(&ctx, body), "<p></p>");

        ctx.scheduler().flush();
        assert_eq!(html(&ctx, body), "<p>2</p>");

        data.set("n", Value::from(5));
        ctx.scheduler().flush();
        assert_eq!(html(&ctx, body), "<p>10</p>");
    }

    #[test]
    fn test_effect_skipped_after_teardown() {
        let data = ReactiveObject::from_pairs([("n", Value::from(1)), ("runs", Value::from(0))]);
        let (ctx, _) = mount(r#"<p v-effect="runs = n + 1"></p>"#, data.clone());
        ctx.lifecycle.teardown();
        ctx.scheduler().flush();
        assert_eq!(data.get("runs"), Value::from(0));
    }
}
