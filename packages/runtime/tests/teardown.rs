//! Teardown completeness
//!
//! Validates:
//! - Unmounting stops every subscription in every nested block
//! - Every cleanup runs exactly once, also across repeated unmounts
//! - Listeners and refs are released

use petal_runtime::{App, BindingSite, Cleanup, Document, Event, Value};
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn test_unmount_stops_everything() {
    let doc = Document::parse(
        r#"<div v-scope="{ n: 1 }"><p>{{ n }}</p><ul><li v-for="x in list">{{ x + n }}</li></ul><b v-if="n > 0" :title="n">{{ n }}</b><button @click="n++">+</button></div>"#,
    )
    .unwrap();
    let app = App::from_json(&serde_json::json!({ "list": [10, 20] }));
    app.mount(&doc, doc.body());
    let button = doc.query_selector(doc.body(), "button").unwrap();
    doc.dispatch_event(button, &Event::new("click"));
    app.tick();
    let rendered = doc.inner_html(doc.body());
    assert_eq!(
        rendered,
        r#"<div><p>2</p><ul><li>12</li><li>22</li></ul><b title="2">2</b><!--v-if--><button>+</button></div>"#
    );

    app.unmount();
    app.scope().set("list", Value::array(vec![Value::from(1)]));
    app.tick();
    assert_eq!(doc.inner_html(doc.body()), rendered);

    assert_eq!(doc.listener_count(button), 0);
    doc.dispatch_event(button, &Event::new("click"));
    app.tick();
    assert_eq!(doc.inner_html(doc.body()), rendered);
}

#[test]
fn test_cleanups_run_exactly_once() {
    let doc = Document::parse(
        r#"<section v-bye><p v-for="x in items" v-bye><i v-if="x" v-bye></i></p></section>"#,
    )
    .unwrap();
    let app = App::from_json(&serde_json::json!({ "items": [true, false, true] }));
    let runs = Rc::new(Cell::new(0));
    let r = runs.clone();
    app.directive("bye", move |_: &BindingSite<'_>| -> Option<Cleanup> {
        let r = r.clone();
        Some(Box::new(move || r.set(r.get() + 1)))
    });
    app.mount(&doc, doc.body());

    app.unmount();
    // section + three items + two truthy conditionals
    assert_eq!(runs.get(), 6);

    app.unmount();
    assert_eq!(runs.get(), 6);
}

#[test]
fn test_refs_released_with_their_block() {
    let doc = Document::parse(
        r#"<input v-if="editing" ref="field"><button @click="editing = !editing">toggle</button>"#,
    )
    .unwrap();
    let app = App::from_json(&serde_json::json!({ "editing": true }));
    app.mount(&doc, doc.body());

    let refs = app.scope().refs();
    assert!(refs.as_object().unwrap().contains_key("field"));

    let button = doc.query_selector(doc.body(), "button").unwrap();
    doc.dispatch_event(button, &Event::new("click"));
    app.tick();
    assert!(!app.scope().refs().as_object().unwrap().contains_key("field"));

    doc.dispatch_event(button, &Event::new("click"));
    app.tick();
    let refs = app.scope().refs();
    let field = refs.as_object().unwrap().get("field");
    assert_eq!(
        field.as_node().map(|node| node.id),
        doc.query_selector(doc.body(), "input")
    );
}
