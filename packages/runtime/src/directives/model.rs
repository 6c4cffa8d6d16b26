use super::{BindingSite, Cleanup};
use crate::dom::{Document, Event, EventHandler, ListenerId, NodeId};
use crate::eval::Env;
use crate::reactive::{untracked, ReactiveArray, Value};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::warn;

/// Two-way binding for form controls
pub(super) fn model(site: &BindingSite<'_>) -> Option<Cleanup> {
    let doc = site.document().clone();
    let el = site.el;
    let tag = doc.tag_name(el).unwrap_or_default();
    let input_type = doc
        .get_attribute(el, "type")
        .unwrap_or_default()
        .to_ascii_lowercase();

    if !matches!(tag.as_str(), "input" | "textarea" | "select") {
        warn!(tag = %tag, expression = site.exp, "v-model on an element that is not a form control");
    }

    let model = Model {
        doc: doc.clone(),
        el,
        get: Rc::new(site.getter()),
        set: {
            let runtime = site.ctx.runtime.clone();
            let env: Env = site.env();
            let target = site.exp.to_string();
            Rc::new(move |value: Value| runtime.evaluator.assign(&env, &target, value))
        },
        number: site.modifiers.has("number") || matches!(input_type.as_str(), "number" | "range"),
        trim: site.modifiers.has("trim"),
        listeners: RefCell::new(Vec::new()),
    };
    let model = Rc::new(model);

    if tag == "select" {
        select(&model, site);
    } else if input_type == "checkbox" {
        checkbox(&model, site);
    } else if input_type == "radio" {
        radio(&model, site);
    } else {
        text_like(&model, site, site.modifiers.has("lazy"));
    }

    Some(Box::new(move || {
        for id in model.listeners.take() {
            model.doc.remove_event_listener(model.el, id);
        }
    }))
}

struct Model {
    doc: Rc<Document>,
    el: NodeId,
    get: Rc<dyn Fn() -> Value>,
    set: Rc<dyn Fn(Value)>,
    number: bool,
    trim: bool,
    listeners: RefCell<Vec<ListenerId>>,
}

impl Model {
    fn listen(&self, event_type: &str, handler: impl Fn(&Rc<Event>) + 'static) {
        let handler: EventHandler = Rc::new(handler);
        let id = self
            .doc
            .add_event_listener(self.el, event_type, handler, false);
        self.listeners.borrow_mut().push(id);
    }

    fn resolve_text(&self, raw: String) -> Value {
        if self.trim {
            Value::String(raw.trim().to_string())
        } else if self.number {
            to_number(raw)
        } else {
            Value::String(raw)
        }
    }
}

/// Numeric text becomes a number; anything else stays as typed
fn to_number(raw: String) -> Value {
    match raw.trim().parse::<f64>() {
        Ok(n) if !raw.trim().is_empty() => Value::Number(n),
        _ => Value::String(raw),
    }
}

/// The raw value bound through `:value`, falling back to the DOM value
fn control_value(doc: &Document, id: NodeId) -> Value {
    if doc.has_property(id, "_value") {
        doc.get_property(id, "_value")
    } else {
        Value::String(doc.value(id))
    }
}

/// What a checkbox contributes for a checked state, honoring
/// `:true-value` / `:false-value`
fn checkbox_value(doc: &Document, id: NodeId, checked: bool) -> Value {
    let slot = if checked { "_trueValue" } else { "_falseValue" };
    if doc.has_property(id, slot) {
        doc.get_property(id, slot)
    } else {
        Value::Bool(checked)
    }
}

fn loose_index_of(items: &[Value], value: &Value) -> Option<usize> {
    items.iter().position(|item| item.loose_equals(value))
}

fn text_like(model: &Rc<Model>, site: &BindingSite<'_>, lazy: bool) {
    let m = model.clone();
    model.listen("compositionstart", move |_| {
        m.doc.set_property(m.el, "composing", Value::Bool(true));
    });
    let m = model.clone();
    model.listen("compositionend", move |_| {
        if m.doc.get_property(m.el, "composing").is_truthy() {
            m.doc.set_property(m.el, "composing", Value::Bool(false));
            m.doc.dispatch_event(m.el, &Event::new("input"));
        }
    });

    let m = model.clone();
    model.listen(if lazy { "change" } else { "input" }, move |_| {
        if m.doc.get_property(m.el, "composing").is_truthy() {
            return;
        }
        (m.set)(m.resolve_text(m.doc.value(m.el)));
    });
    if model.trim {
        let m = model.clone();
        model.listen("change", move |_| {
            let trimmed = m.doc.value(m.el).trim().to_string();
            m.doc.set_value(m.el, &trimmed);
        });
    }

    let m = model.clone();
    site.effect(move || {
        if m.doc.get_property(m.el, "composing").is_truthy() {
            return;
        }
        let next = (m.get)().to_display_string();
        if m.doc.value(m.el) != next {
            m.doc.set_value(m.el, &next);
        }
    });
}

fn checkbox(model: &Rc<Model>, site: &BindingSite<'_>) {
    let m = model.clone();
    model.listen("change", move |_| {
        let checked = m.doc.checked(m.el);
        match untracked(|| (m.get)()) {
            Value::Array(list) => {
                let mut items = list.to_vec();
                let own = control_value(&m.doc, m.el);
                match (checked, loose_index_of(&items, &own)) {
                    (true, None) => items.push(own),
                    (false, Some(index)) => {
                        items.remove(index);
                    }
                    _ => return,
                }
                (m.set)(Value::Array(ReactiveArray::from_vec(items)));
            }
            _ => (m.set)(checkbox_value(&m.doc, m.el, checked)),
        }
    });

    let m = model.clone();
    let previous = RefCell::new(None::<Value>);
    site.effect(move || {
        let value = (m.get)();
        match &value {
            Value::Array(list) => {
                let own = control_value(&m.doc, m.el);
                let checked = loose_index_of(&list.to_vec(), &own).is_some();
                m.doc.set_checked(m.el, checked);
            }
            _ if previous.borrow().as_ref() != Some(&value) => {
                let checked = value.loose_equals(&checkbox_value(&m.doc, m.el, true));
                m.doc.set_checked(m.el, checked);
            }
            _ => {}
        }
        *previous.borrow_mut() = Some(value);
    });
}

fn radio(model: &Rc<Model>, site: &BindingSite<'_>) {
    let m = model.clone();
    model.listen("change", move |_| {
        (m.set)(control_value(&m.doc, m.el));
    });

    let m = model.clone();
    site.effect(move || {
        let value = (m.get)();
        let checked = value.loose_equals(&control_value(&m.doc, m.el));
        m.doc.set_checked(m.el, checked);
    });
}

fn select(model: &Rc<Model>, site: &BindingSite<'_>) {
    let is_multiple = {
        let doc = model.doc.clone();
        let el = model.el;
        move || doc.has_attribute(el, "multiple") || doc.get_property(el, "multiple").is_truthy()
    };

    let m = model.clone();
    let multiple = is_multiple.clone();
    model.listen("change", move |_| {
        let selected: Vec<Value> = m
            .doc
            .options(m.el)
            .into_iter()
            .filter(|option| m.doc.selected(*option))
            .map(|option| match control_value(&m.doc, option) {
                Value::String(raw) if m.number => to_number(raw),
                other => other,
            })
            .collect();
        let value = if multiple() {
            Value::Array(ReactiveArray::from_vec(selected))
        } else {
            selected.into_iter().next().unwrap_or_default()
        };
        (m.set)(value);
    });

    let m = model.clone();
    site.effect(move || {
        let value = (m.get)();
        let options = m.doc.options(m.el);
        if is_multiple() {
            let wanted = value.as_array().map(ReactiveArray::to_vec).unwrap_or_default();
            for option in options {
                let own = control_value(&m.doc, option);
                m.doc
                    .set_selected(option, loose_index_of(&wanted, &own).is_some());
            }
            return;
        }
        let mut matched = false;
        for option in options {
            let hit = !matched && control_value(&m.doc, option).loose_equals(&value);
            matched |= hit;
            m.doc.set_selected(option, hit);
        }
    });
}

#[cfg(test)]
mod tests {
    use crate::directives::test_support::{html, mount};
    use crate::dom::Event;
    use crate::reactive::{ReactiveArray, ReactiveObject, Value};

    #[test]
    fn test_text_input_two_way() {
        let data = ReactiveObject::from_pairs([("name", Value::from("Ada"))]);
        let (ctx, body) = mount(r#"<input v-model="name">"#, data.clone());
        let doc = &ctx.document;
        let input = doc.first_child(body).unwrap();
        assert_eq!(doc.value(input), "Ada");

        doc.set_value(input, "Grace");
        doc.dispatch_event(input, &Event::new("input"));
        assert_eq!(data.get("name"), Value::from("Grace"));

        data.set("name", Value::from("Linus"));
        ctx.scheduler().flush();
        assert_eq!(doc.value(input), "Linus");
        assert_eq!(html(&ctx, body), "<input>");
    }

    #[test]
    fn test_number_trim_and_lazy() {
        let data = ReactiveObject::from_pairs([("n", Value::from(0)), ("s", Value::from(""))]);
        let (ctx, body) = mount(
            r#"<input type="number" v-model="n"><input v-model.lazy.trim="s">"#,
            data.clone(),
        );
        let doc = &ctx.document;
        let number = doc.first_child(body).unwrap();
        let text = doc.next_sibling(number).unwrap();

        doc.set_value(number, "42");
        doc.dispatch_event(number, &Event::new("input"));
        assert_eq!(data.get("n"), Value::from(42));

        doc.set_value(text, "  hi  ");
        doc.dispatch_event(text, &Event::new("input"));
        assert_eq!(data.get("s"), Value::from(""));
        doc.dispatch_event(text, &Event::new("change"));
        assert_eq!(data.get("s"), Value::from("hi"));
        assert_eq!(doc.value(text), "hi");
    }

    #[test]
    fn test_composition_defers_input() {
        let data = ReactiveObject::from_pairs([("s", Value::from(""))]);
        let (ctx, body) = mount(r#"<input v-model="s">"#, data.clone());
        let doc = &ctx.document;
        let input = doc.first_child(body).unwrap();

        doc.dispatch_event(input, &Event::new("compositionstart"));
        doc.set_value(input, "ka");
        doc.dispatch_event(input, &Event::new("input"));
        assert_eq!(data.get("s"), Value::from(""));
        doc.dispatch_event(input, &Event::new("compositionend"));
        assert_eq!(data.get("s"), Value::from("ka"));
    }

    #[test]
    fn test_checkbox_boolean_and_array() {
        let data = ReactiveObject::from_pairs([
            ("done", Value::Bool(false)),
            ("tags", Value::array(vec![Value::from("a")])),
        ]);
        let (ctx, body) = mount(
            r#"<input type="checkbox" v-model="done"><input type="checkbox" value="a" v-model="tags"><input type="checkbox" value="b" v-model="tags">"#,
            data.clone(),
        );
        let doc = &ctx.document;
        let boxes = doc.children(body);
        assert!(!doc.checked(boxes[0]));
        assert!(doc.checked(boxes[1]));
        assert!(!doc.checked(boxes[2]));

        doc.set_checked(boxes[0], true);
        doc.dispatch_event(boxes[0], &Event::new("change"));
        assert_eq!(data.get("done"), Value::Bool(true));

        doc.set_checked(boxes[2], true);
        doc.dispatch_event(boxes[2], &Event::new("change"));
        let tags = data.get("tags");
        let tags: Vec<Value> = tags.as_array().map(ReactiveArray::to_vec).unwrap();
        assert_eq!(tags, vec![Value::from("a"), Value::from("b")]);
    }

    #[test]
    fn test_checkbox_true_false_values() {
        let data = ReactiveObject::from_pairs([("answer", Value::from("no"))]);
        let (ctx, body) = mount(
            r#"<input type="checkbox" :true-value="'yes'" :false-value="'no'" v-model="answer">"#,
            data.clone(),
        );
        let doc = &ctx.document;
        let input = doc.first_child(body).unwrap();
        assert!(!doc.checked(input));
        doc.set_checked(input, true);
        doc.dispatch_event(input, &Event::new("change"));
        assert_eq!(data.get("answer"), Value::from("yes"));
    }

    #[test]
    fn test_radio_group() {
        let data = ReactiveObject::from_pairs([("pick", Value::from("b"))]);
        let (ctx, body) = mount(
            r#"<input type="radio" name="g" value="a" v-model="pick"><input type="radio" name="g" value="b" v-model="pick">"#,
            data.clone(),
        );
        let doc = &ctx.document;
        let radios = doc.children(body);
        assert!(!doc.checked(radios[0]));
        assert!(doc.checked(radios[1]));

        doc.set_checked(radios[0], true);
        doc.dispatch_event(radios[0], &Event::new("change"));
        assert_eq!(data.get("pick"), Value::from("a"));
        ctx.scheduler().flush();
        assert!(!doc.checked(radios[1]));
    }

    #[test]
    fn test_select_single_and_multiple() {
        let data = ReactiveObject::from_pairs([
            ("one", Value::from("y")),
            ("many", Value::array(vec![Value::from("x"), Value::from("z")])),
        ]);
        let (ctx, body) = mount(
            r#"<select v-model="one"><option>x</option><option>y</option></select><select multiple v-model="many"><option>x</option><option>y</option><option>z</option></select>"#,
            data.clone(),
        );
        let doc = &ctx.document;
        let selects = doc.children(body);
        assert_eq!(doc.value(selects[0]), "y");
        let picked: Vec<bool> = doc
            .options(selects[1])
            .into_iter()
            .map(|o| doc.selected(o))
            .collect();
        assert_eq!(picked, vec![true, false, true]);

        doc.set_value(selects[0], "x");
        doc.dispatch_event(selects[0], &Event::new("change"));
        assert_eq!(data.get("one"), Value::from("x"));

        let options = doc.options(selects[1]);
        doc.set_selected(options[0], false);
        doc.dispatch_event(selects[1], &Event::new("change"));
        let many = data.get("many");
        assert_eq!(
            many.as_array().map(ReactiveArray::to_vec).unwrap(),
            vec![Value::from("z")]
        );
    }
}
