//! Update batching
//!
//! Validates:
//! - Several writes within one tick re-run a binding once
//! - Updates queued while flushing run in the same flush
//! - `next_tick` callbacks run after the DOM is up to date
//! - Mutually re-triggering effects are cut off by `maxJobRuns`

use petal_runtime::{App, AppConfig, BindingSite, Cleanup, Document, ReactiveObject, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// `v-runs="exp"` counts how often its effect evaluated `exp`
fn run_counter(app: &App) -> Rc<Cell<usize>> {
    let runs = Rc::new(Cell::new(0));
    let r = runs.clone();
    app.directive("runs", move |site: &BindingSite<'_>| -> Option<Cleanup> {
        let get = site.getter();
        let r = r.clone();
        site.effect(move || {
            get();
            r.set(r.get() + 1);
        });
        None
    });
    runs
}

#[test]
fn test_writes_are_batched() {
    let doc = Document::parse(r#"<p v-runs="a + b">{{ a + b }}</p>"#).unwrap();
    let app = App::from_json(&serde_json::json!({ "a": 1, "b": 2 }));
    let runs = run_counter(&app);
    app.mount(&doc, doc.body());
    assert_eq!(runs.get(), 1);

    for i in 0..5 {
        app.scope().set("a", Value::from(i));
        app.scope().set("b", Value::from(i * 10));
    }
    assert_eq!(runs.get(), 1);
    assert_eq!(doc.inner_html(doc.body()), "<p>3</p>");

    app.tick();
    assert_eq!(runs.get(), 2);
    assert_eq!(doc.inner_html(doc.body()), "<p>44</p>");

    app.tick();
    assert_eq!(runs.get(), 2);
}

#[test]
fn test_cascading_updates_settle_in_one_flush() {
    let doc = Document::parse(
        r#"<div v-effect="total = price * qty"></div><p>{{ total }}</p>"#,
    )
    .unwrap();
    let app = App::from_json(&serde_json::json!({ "price": 2, "qty": 3, "total": 0 }));
    app.mount(&doc, doc.body());
    app.tick();
    assert_eq!(doc.inner_html(doc.body()), "<div></div><p>6</p>");

    app.scope().set("qty", Value::from(5));
    app.tick();
    assert!(!app.has_pending_updates());
    assert_eq!(doc.inner_html(doc.body()), "<div></div><p>10</p>");
}

#[test]
fn test_next_tick_sees_flushed_dom() {
    let doc = Document::parse(r#"<p>{{ msg }}</p>"#).unwrap();
    let app = App::from_json(&serde_json::json!({ "msg": "old" }));
    app.mount(&doc, doc.body());

    let seen = Rc::new(RefCell::new(String::new()));
    app.scope().set("msg", Value::from("new"));
    let (d, s) = (doc.clone(), seen.clone());
    app.next_tick(move || *s.borrow_mut() = d.inner_html(d.body()));
    assert!(seen.borrow().is_empty());

    app.tick();
    assert_eq!(*seen.borrow(), "<p>new</p>");
}

#[test]
fn test_runaway_effects_are_cut_off() {
    let doc = Document::parse(
        r#"<i v-effect="a = b + 1"></i><i v-effect="b = a + 1"></i><p>{{ a }}</p>"#,
    )
    .unwrap();
    let config = AppConfig {
        max_job_runs: 10,
        ..AppConfig::default()
    };
    let data = ReactiveObject::from_pairs([("a", Value::from(0)), ("b", Value::from(0))]);
    let app = App::with_config(data, config);
    app.mount(&doc, doc.body());

    app.tick();
    assert!(!app.has_pending_updates());
    let a = app.scope().get("a").to_number();
    assert!(a > 2.0 && a < 100.0);
}
