//! Directives working together
//!
//! Validates:
//! - A todo list driven by v-model, key-filtered v-on, keyed v-for, :class and v-show
//! - Item-level handlers mutate shared state through the scope chain
//! - Refs and the mounted hook are reachable from expressions

use petal_runtime::{App, Document, Event, NodeId};
use std::rc::Rc;

const TODOS: &str = concat!(
    r#"<div v-scope="{ draft: '', nextId: 1 }">"#,
    r#"<input id="new" v-model.trim="draft" @keyup.enter="todos.push({ id: nextId++, text: draft, done: false }); draft = ''">"#,
    r#"<ul><li v-for="todo in todos" :key="todo.id" :class="{ done: todo.done }">"#,
    r#"<input type="checkbox" v-model="todo.done"><span>{{ todo.text }}</span>"#,
    r#"<button @click="todos.splice(todos.indexOf(todo), 1)">x</button></li></ul>"#,
    r#"<p id="empty" v-show="todos.length === 0">Nothing to do</p>"#,
    r#"<b id="left">{{ todos.filter(t => !t.done).length }} left</b>"#,
    r#"</div>"#,
);

fn type_into(doc: &Document, input: NodeId, text: &str) {
    doc.set_value(input, text);
    doc.dispatch_event(input, &Event::new("input"));
    doc.dispatch_event(input, &Event::key("keyup", "Enter"));
}

fn texts(doc: &Document, selector: &str) -> Vec<String> {
    doc.query_selector_all(doc.body(), selector)
        .into_iter()
        .map(|node| doc.text_content(node))
        .collect()
}

fn setup() -> (App, Rc<Document>) {
    let doc = Document::parse(TODOS).unwrap();
    let app = App::from_json(&serde_json::json!({ "todos": [] }));
    app.mount(&doc, doc.body());
    (app, doc)
}

#[test]
fn test_todo_list_flow() {
    let (app, doc) = setup();
    let input = doc.query_selector(doc.body(), "#new").unwrap();
    let empty = doc.query_selector(doc.body(), "#empty").unwrap();
    assert_eq!(doc.get_style(empty, "display"), None);
    assert_eq!(texts(&doc, "#left"), vec!["0 left"]);

    type_into(&doc, input, "  milk ");
    type_into(&doc, input, "eggs");
    app.tick();
    assert_eq!(texts(&doc, "li span"), vec!["milk", "eggs"]);
    assert_eq!(doc.value(input), "");
    assert_eq!(doc.get_style(empty, "display").as_deref(), Some("none"));
    assert_eq!(texts(&doc, "#left"), vec!["2 left"]);

    let first_box = doc.query_selector(doc.body(), "li input").unwrap();
    doc.set_checked(first_box, true);
    doc.dispatch_event(first_box, &Event::new("change"));
    app.tick();
    let items = doc.query_selector_all(doc.body(), "li");
    assert_eq!(doc.get_attribute(items[0], "class").as_deref(), Some("done"));
    assert_eq!(doc.get_attribute(items[1], "class"), None);
    assert_eq!(texts(&doc, "#left"), vec!["1 left"]);

    let remove_first = doc.query_selector(items[0], "button").unwrap();
    doc.dispatch_event(remove_first, &Event::new("click"));
    app.tick();
    assert_eq!(texts(&doc, "li span"), vec!["eggs"]);
    assert_eq!(doc.query_selector_all(doc.body(), "li")[0], items[1]);
    assert_eq!(texts(&doc, "#left"), vec!["1 left"]);

    let remove_last = doc.query_selector(items[1], "button").unwrap();
    doc.dispatch_event(remove_last, &Event::new("click"));
    app.tick();
    assert!(texts(&doc, "li").is_empty());
    assert_eq!(doc.get_style(empty, "display"), None);
}

#[test]
fn test_enter_filter_ignores_other_keys() {
    let (app, doc) = setup();
    let input = doc.query_selector(doc.body(), "#new").unwrap();
    doc.set_value(input, "bread");
    doc.dispatch_event(input, &Event::new("input"));
    doc.dispatch_event(input, &Event::key("keyup", "a"));
    app.tick();
    assert!(texts(&doc, "li").is_empty());
    assert_eq!(doc.value(input), "bread");
}

#[test]
fn test_refs_and_mounted_hook() {
    let doc = Document::parse(
        r#"<div v-scope="{ tag: '' }" @vue:mounted="tag = $refs.title.tagName"><h1 ref="title">T</h1><p>{{ tag }}</p></div>"#,
    )
    .unwrap();
    let app = App::from_json(&serde_json::json!({}));
    app.mount(&doc, doc.body());
    assert_eq!(texts(&doc, "p"), vec![""]);

    app.tick();
    assert_eq!(texts(&doc, "p"), vec!["H1"]);
}
