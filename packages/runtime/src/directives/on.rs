use super::{BindingSite, Cleanup};
use crate::dom::{Document, Event, NodeId, NodeRef};
use crate::reactive::{ReactiveObject, Value};
use std::rc::Rc;
use tracing::warn;

/// Modifiers that shape dispatch rather than filter keys
const BEHAVIOR_MODIFIERS: &[&str] = &["stop", "prevent", "self", "once", "capture", "passive"];

pub(super) fn on(site: &BindingSite<'_>) -> Option<Cleanup> {
    let Some(event_type) = site.arg.clone() else {
        warn!(expression = site.exp, "v-on requires an event name");
        return None;
    };

    let runtime = site.ctx.runtime.clone();
    let env = site.env();
    let exp = site.exp.to_string();
    let simple = runtime.evaluator.is_simple_path(&exp);
    let handler = move |event: Value| {
        if simple {
            match runtime.evaluator.evaluate(&env, &exp) {
                Value::Function(f) => {
                    if let Err(err) = f.call(&[event]) {
                        warn!(handler = %exp, error = %err, "Event handler failed");
                    }
                }
                Value::Undefined | Value::Null => {}
                other => warn!(handler = %exp, value = ?other, "Event handler is not a function"),
            }
        } else {
            runtime.evaluator.execute(&env.clone().with_event(event), &exp);
        }
    };

    match event_type.as_str() {
        "vue:mounted" => {
            site.ctx.scheduler().next_tick(move || handler(Value::Undefined));
            return None;
        }
        "vue:unmounted" => return Some(Box::new(move || handler(Value::Undefined))),
        _ => {}
    }

    let doc = site.document().clone();
    let el = site.el;
    let modifiers = site.modifiers.clone();
    let key_filters: Vec<String> = modifiers
        .iter()
        .filter(|m| !BEHAVIOR_MODIFIERS.contains(m))
        .map(str::to_string)
        .collect();

    let once = modifiers.has("once");
    let listener_doc = doc.clone();
    let id = doc.add_event_listener(
        el,
        &event_type,
        Rc::new(move |event: &Rc<Event>| {
            if !key_filters.is_empty() {
                let Some(key) = event.key_name() else {
                    return;
                };
                if !key_filters.iter().any(|filter| key_matches(filter, key)) {
                    return;
                }
            }
            if modifiers.has("self") && event.target() != event.current_target() {
                return;
            }
            if modifiers.has("stop") {
                event.stop_propagation();
            }
            if modifiers.has("prevent") {
                event.prevent_default();
            }
            handler(event_value(&listener_doc, event));
        }),
        once,
    );

    Some(Box::new(move || doc.remove_event_listener(el, id)))
}

fn key_matches(filter: &str, key: &str) -> bool {
    match filter {
        "enter" => key == "Enter",
        "esc" => key == "Escape" || key == "Esc",
        "space" => key == " " || key == "Spacebar",
        "tab" => key == "Tab",
        "up" => key == "ArrowUp",
        "down" => key == "ArrowDown",
        "left" => key == "ArrowLeft",
        "right" => key == "ArrowRight",
        "delete" => key == "Delete" || key == "Backspace",
        other => hyphenate_key(key) == other,
    }
}

/// `PageDown` becomes `page-down`, `a` stays `a`
fn hyphenate_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 2);
    for (i, c) in key.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// The `$event` object handlers see
fn event_value(doc: &Rc<Document>, event: &Rc<Event>) -> Value {
    let node = |id: Option<NodeId>| {
        id.map(|id| Value::Node(NodeRef::new(doc.clone(), id)))
            .unwrap_or(Value::Null)
    };
    let prevent = event.clone();
    let stop = event.clone();
    let object = ReactiveObject::from_pairs([
        ("type", Value::from(event.event_type())),
        (
            "key",
            event.key_name().map(Value::from).unwrap_or_default(),
        ),
        ("target", node(event.target())),
        ("currentTarget", node(event.current_target())),
        (
            "preventDefault",
            Value::function(move |_| {
                prevent.prevent_default();
                Ok(Value::Undefined)
            }),
        ),
        (
            "stopPropagation",
            Value::function(move |_| {
                stop.stop_propagation();
                Ok(Value::Undefined)
            }),
        ),
        (
            "detail",
            event
                .detail()
                .map(|detail| Value::from_json(&detail))
                .unwrap_or(Value::Null),
        ),
    ]);
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::test_support::{html, mount};

    fn counter() -> ReactiveObject {
        ReactiveObject::from_pairs([("count", Value::from(0))])
    }

    #[test]
    fn test_statement_handler() {
        let data = counter();
        let (ctx, body) = mount(r#"<button @click="count++">+</button>"#, data.clone());
        let button = ctx.document.first_child(body).unwrap();
        ctx.document.dispatch_event(button, &Event::new("click"));
        ctx.document.dispatch_event(button, &Event::new("click"));
        assert_eq!(data.get("count"), Value::from(2));
        assert_eq!(html(&ctx, body), "<button>+</button>");
    }

    #[test]
    fn test_simple_path_receives_event() {
        let data = counter();
        let seen = data.clone();
        data.set(
            "record",
            Value::function(move |args| {
                let event = args.first().cloned().unwrap_or_default();
                let kind = event.as_object().map(|e| e.get("type")).unwrap_or_default();
                seen.set("last", kind);
                Ok(Value::Undefined)
            }),
        );
        let (ctx, body) = mount(r#"<input @input="record">"#, data.clone());
        let input = ctx.document.first_child(body).unwrap();
        ctx.document.dispatch_event(input, &Event::new("input"));
        assert_eq!(data.get("last"), Value::from("input"));
    }

    #[test]
    fn test_key_filter_and_once() {
        let data = counter();
        let (ctx, body) = mount(
            r#"<input @keyup.enter="count += 1" @keydown.once="count += 10">"#,
            data.clone(),
        );
        let input = ctx.document.first_child(body).unwrap();
        ctx.document.dispatch_event(input, &Event::key("keyup", "a"));
        ctx.document.dispatch_event(input, &Event::key("keyup", "Enter"));
        ctx.document.dispatch_event(input, &Event::key("keydown", "x"));
        ctx.document.dispatch_event(input, &Event::key("keydown", "x"));
        assert_eq!(data.get("count"), Value::from(11));
    }

    #[test]
    fn test_stop_and_self_modifiers() {
        let data = counter();
        let (ctx, body) = mount(
            r#"<div @click="count += 100"><p @click.self="count += 10"><b @click.stop="count++">x</b></p></div>"#,
            data.clone(),
        );
        let b = ctx.document.query_selector(body, "b").unwrap();
        let p = ctx.document.query_selector(body, "p").unwrap();
        ctx.document.dispatch_event(b, &Event::new("click"));
        assert_eq!(data.get("count"), Value::from(1));
        ctx.document.dispatch_event(p, &Event::new("click"));
        assert_eq!(data.get("count"), Value::from(111));
    }

    #[test]
    fn test_prevent_modifier_cancels() {
        let (ctx, body) = mount(r#"<form @submit.prevent="count++"></form>"#, counter());
        let form = ctx.document.first_child(body).unwrap();
        assert!(!ctx.document.dispatch_event(form, &Event::new("submit")));
    }

    #[test]
    fn test_listener_removed_on_teardown() {
        let (ctx, body) = mount(r#"<button @click="count++"></button>"#, counter());
        let button = ctx.document.first_child(body).unwrap();
        assert_eq!(ctx.document.listener_count(button), 1);
        ctx.lifecycle.teardown();
        assert_eq!(ctx.document.listener_count(button), 0);
    }

    #[test]
    fn test_mounted_hook_runs_on_tick() {
        let data = counter();
        let (ctx, _) = mount(r#"<div @vue:mounted="count = 5"></div>"#, data.clone());
        assert_eq!(data.get("count"), Value::from(0));
        ctx.scheduler().flush();
        assert_eq!(data.get("count"), Value::from(5));
    }

    #[test]
    fn test_key_matching() {
        assert!(key_matches("page-down", "PageDown"));
        assert!(key_matches("esc", "Escape"));
        assert!(!key_matches("enter", "a"));
    }
}
