use super::{BindingSite, Cleanup};
use crate::dom::{Document, NodeId};
use crate::reactive::{ReactiveObject, Value};
use std::cell::RefCell;
use tracing::warn;

/// `:name="exp"`, `v-bind:name="exp"` and the spreading `v-bind="object"`
pub(super) fn bind(site: &BindingSite<'_>) -> Option<Cleanup> {
    let doc = site.document().clone();
    let el = site.el;
    let get = site.getter();
    let statics = Statics {
        class: doc.get_attribute(el, "class"),
        style: doc.get_attribute(el, "style"),
    };

    match site.arg.clone() {
        Some(arg) => {
            let name = if site.modifiers.has("camel") {
                camelize(&arg)
            } else {
                arg
            };
            let previous = RefCell::new(Value::Undefined);
            site.effect(move || {
                let value = get();
                patch(&doc, el, &name, &value, &previous.borrow(), &statics);
                *previous.borrow_mut() = value;
            });
        }
        None => {
            let previous: RefCell<Vec<(String, Value)>> = RefCell::new(Vec::new());
            site.effect(move || {
                let entries = match get() {
                    Value::Object(object) => object.entries(),
                    Value::Undefined | Value::Null => Vec::new(),
                    other => {
                        warn!(value = ?other, "v-bind without an argument expects an object");
                        Vec::new()
                    }
                };
                let old = previous.replace(Vec::new());
                for (key, _) in old.iter().filter(|(k, _)| !entries.iter().any(|(n, _)| n == k)) {
                    patch(&doc, el, key, &Value::Undefined, &Value::Undefined, &statics);
                }
                for (key, value) in &entries {
                    let prev = old
                        .iter()
                        .find(|(k, _)| k == key)
                        .map(|(_, v)| v.clone())
                        .unwrap_or_default();
                    patch(&doc, el, key, value, &prev, &statics);
                }
                *previous.borrow_mut() = entries;
            });
        }
    }
    None
}

/// `class` and `style` as authored, merged with every bound value
struct Statics {
    class: Option<String>,
    style: Option<String>,
}

fn patch(doc: &Document, el: NodeId, key: &str, value: &Value, previous: &Value, statics: &Statics) {
    match key {
        "class" => {
            let class = join_non_empty(statics.class.as_deref(), &normalize_class(value));
            set_or_remove(doc, el, "class", &class);
        }
        "style" => patch_style(doc, el, value, previous, statics.style.as_deref()),
        // kept raw for v-model, which compares option and checkbox values loosely
        "true-value" | "false-value" => {
            let slot = if key == "true-value" { "_trueValue" } else { "_falseValue" };
            doc.set_property(el, slot, value.clone());
            set_attribute(doc, el, key, value);
        }
        _ if doc.is_known_property(el, key) => set_property(doc, el, key, value),
        _ => set_attribute(doc, el, key, value),
    }
}

fn set_attribute(doc: &Document, el: NodeId, key: &str, value: &Value) {
    match value {
        Value::Undefined | Value::Null | Value::Bool(false) => doc.remove_attribute(el, key),
        other => doc.set_attribute(el, key, &other.to_js_string()),
    }
}

fn set_property(doc: &Document, el: NodeId, key: &str, value: &Value) {
    match key {
        "value" => {
            doc.set_property(el, "_value", value.clone());
            doc.set_value(el, &value.to_display_string());
            if doc.is_tag(el, "option") || doc.is_tag(el, "input") {
                set_attribute(doc, el, "value", value);
            }
        }
        "checked" => doc.set_checked(el, value.is_truthy()),
        "selected" => doc.set_selected(el, value.is_truthy()),
        "textContent" => doc.set_text_content(el, &value.to_display_string()),
        "innerHTML" => {
            if let Err(err) = doc.set_inner_html(el, &value.to_display_string()) {
                warn!(error = %err, "innerHTML binding failed");
            }
        }
        "id" => set_attribute(doc, el, "id", value),
        "className" => set_or_remove(doc, el, "class", &value.to_display_string()),
        "hidden" | "disabled" | "multiple" | "indeterminate" => {
            doc.set_property(el, key, Value::Bool(value.is_truthy()));
            if value.is_truthy() {
                doc.set_attribute(el, key, "");
            } else {
                doc.remove_attribute(el, key);
            }
        }
        _ => doc.set_property(el, key, value.clone()),
    }
}

fn patch_style(doc: &Document, el: NodeId, value: &Value, previous: &Value, initial: Option<&str>) {
    match value {
        Value::Object(object) => {
            if let Value::Object(old) = previous {
                for key in old.keys() {
                    if object.get_untracked(&key).is_nullish() {
                        doc.remove_style(el, &hyphenate(&key));
                    }
                }
            } else {
                set_or_remove(doc, el, "style", initial.unwrap_or_default());
            }
            for (key, item) in object.entries() {
                if item.is_nullish() {
                    doc.remove_style(el, &hyphenate(&key));
                } else {
                    doc.set_style(el, &hyphenate(&key), &item.to_js_string());
                }
            }
        }
        Value::String(text) => {
            set_or_remove(doc, el, "style", &join_style(initial, text));
        }
        _ => set_or_remove(doc, el, "style", initial.unwrap_or_default()),
    }
}

/// Flatten a class binding value into a space-separated list
pub(crate) fn normalize_class(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .to_vec()
            .iter()
            .map(normalize_class)
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        Value::Object(object) => truthy_keys(object).join(" "),
        _ => String::new(),
    }
}

fn truthy_keys(object: &ReactiveObject) -> Vec<String> {
    object
        .entries()
        .into_iter()
        .filter(|(_, v)| v.is_truthy())
        .map(|(k, _)| k)
        .collect()
}

fn join_non_empty(first: Option<&str>, second: &str) -> String {
    match first.map(str::trim).filter(|s| !s.is_empty()) {
        Some(first) if !second.is_empty() => format!("{} {}", first, second),
        Some(first) => first.to_string(),
        None => second.to_string(),
    }
}

fn join_style(initial: Option<&str>, bound: &str) -> String {
    let bound = bound.trim();
    match initial.map(str::trim).filter(|s| !s.is_empty()) {
        Some(initial) if !bound.is_empty() => {
            let separator = if initial.ends_with(';') { " " } else { "; " };
            format!("{}{}{}", initial, separator, bound)
        }
        Some(initial) => initial.to_string(),
        None => bound.to_string(),
    }
}

fn set_or_remove(doc: &Document, el: NodeId, name: &str, value: &str) {
    if value.is_empty() {
        doc.remove_attribute(el, name);
    } else {
        doc.set_attribute(el, name, value);
    }
}

fn camelize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn hyphenate(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::test_support::{html, mount};
    use crate::reactive::ReactiveArray;

    #[test]
    fn test_camelize_and_hyphenate() {
        assert_eq!(camelize("view-box"), "viewBox");
        assert_eq!(hyphenate("fontSize"), "font-size");
    }

    #[test]
    fn test_normalize_class() {
        let value = Value::Array(ReactiveArray::from_vec(vec![
            Value::from("a"),
            Value::Object(ReactiveObject::from_pairs([
                ("b", Value::Bool(true)),
                ("c", Value::Bool(false)),
            ])),
            Value::from(" "),
        ]));
        assert_eq!(normalize_class(&value), "a b");
    }

    #[test]
    fn test_attribute_binding_updates_and_removes() {
        let data = ReactiveObject::from_pairs([("title", Value::from("hi"))]);
        let (ctx, body) = mount(r#"<p :title="title"></p>"#, data.clone());
        assert_eq!(html(&ctx, body), r#"<p title="hi"></p>"#);

        data.set("title", Value::Null);
        ctx.scheduler().flush();
        assert_eq!(html(&ctx, body), "<p></p>");

        data.set("title", Value::Bool(false));
        ctx.scheduler().flush();
        assert_eq!(html(&ctx, body), "<p></p>");
    }

    #[test]
    fn test_class_merges_with_static_class() {
        let data = ReactiveObject::from_pairs([("active", Value::Bool(true))]);
        let (ctx, body) = mount(
            r#"<p class="base" :class="{ on: active, off: !active }"></p>"#,
            data.clone(),
        );
        assert_eq!(html(&ctx, body), r#"<p class="base on"></p>"#);
        data.set("active", Value::Bool(false));
        ctx.scheduler().flush();
        assert_eq!(html(&ctx, body), r#"<p class="base off"></p>"#);
    }

    #[test]
    fn test_style_object() {
        let data = ReactiveObject::from_pairs([("size", Value::from(12))]);
        let (ctx, body) = mount(
            r#"<p :style="{ fontSize: size + 'px', color: size > 20 ? 'red' : null }"></p>"#,
            data.clone(),
        );
        assert_eq!(html(&ctx, body), r#"<p style="font-size: 12px;"></p>"#);
        data.set("size", Value::from(30));
        ctx.scheduler().flush();
        assert_eq!(
            html(&ctx, body),
            r#"<p style="font-size: 30px; color: red;"></p>"#
        );
    }

    #[test]
    fn test_spread_and_camel() {
        let data = ReactiveObject::from_pairs([(
            "attrs",
            Value::Object(ReactiveObject::from_pairs([
                ("id", Value::from("main")),
                ("data-x", Value::from(1)),
            ])),
        )]);
        let (ctx, body) = mount(
            r#"<div v-bind="attrs"></div><svg :view-box.camel="'0 0 1 1'"></svg>"#,
            data,
        );
        assert_eq!(
            html(&ctx, body),
            r#"<div id="main" data-x="1"></div><svg viewBox="0 0 1 1"></svg>"#
        );
    }

    #[test]
    fn test_disabled_property_reflects() {
        let data = ReactiveObject::from_pairs([("busy", Value::Bool(true))]);
        let (ctx, body) = mount(r#"<button :disabled="busy">Go</button>"#, data.clone());
        assert_eq!(html(&ctx, body), "<button disabled>Go</button>");
        data.set("busy", Value::Bool(false));
        ctx.scheduler().flush();
        assert_eq!(html(&ctx, body), "<button>Go</button>");
    }
}
