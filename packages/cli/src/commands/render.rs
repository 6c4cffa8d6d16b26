use crate::config::Config;
use anyhow::{anyhow, bail, Context as _, Result};
use clap::Args;
use colored::Colorize;
use petal_common::load_data;
use petal_runtime::{App, AppConfig, Document, Event, Scope, Value};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Template file to mount
    pub input: PathBuf,

    /// Initial root data as inline JSON
    #[arg(short, long, conflicts_with = "data_file")]
    pub data: Option<String>,

    /// Initial root data read from a JSON file
    #[arg(long)]
    pub data_file: Option<PathBuf>,

    /// JSON array of steps, each applied and followed by a tick
    #[arg(short, long)]
    pub steps: Option<String>,
}

/// One interaction replayed against the mounted page
#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum Step {
    /// Dotted paths into root data and the JSON values to write there
    Set(serde_json::Map<String, serde_json::Value>),
    Dispatch(Dispatch),
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dispatch {
    pub selector: String,
    pub event: String,

    /// `key` for keyboard events
    #[serde(default)]
    pub key: Option<String>,

    /// Written to the control's value before dispatching
    #[serde(default)]
    pub value: Option<String>,

    /// Written to the control's checked state before dispatching
    #[serde(default)]
    pub checked: Option<bool>,
}

pub fn render(args: RenderArgs, config: &Config, cwd: &str) -> Result<()> {
    let input = PathBuf::from(cwd).join(&args.input);
    let markup = std::fs::read_to_string(&input)
        .with_context(|| format!("Cannot read {}", input.display()))?;

    let data = match (&args.data, &args.data_file) {
        (Some(inline), _) => serde_json::from_str(inline).context("Invalid --data JSON")?,
        (None, Some(path)) => load_data(Some(&PathBuf::from(cwd).join(path)))?,
        (None, None) => load_data(None)?,
    };
    let steps: Vec<Step> = match &args.steps {
        Some(steps) => serde_json::from_str(steps).context("Invalid --steps JSON")?,
        None => Vec::new(),
    };

    info!(input = %input.display(), steps = steps.len(), "Rendering");
    let frames = render_frames(&markup, &data, &steps, &config.runtime)?;
    for (index, frame) in frames.iter().enumerate() {
        if index > 0 {
            println!("{}", format!("<!-- after step {} -->", index).dimmed());
        }
        println!("{}", frame);
    }

    Ok(())
}

/// Mount `markup`, then apply each step followed by a tick. Returns the body
/// HTML after mounting and after every step.
pub fn render_frames(
    markup: &str,
    data: &serde_json::Value,
    steps: &[Step],
    config: &AppConfig,
) -> Result<Vec<String>> {
    let doc = Document::parse(markup)?;
    let root = match Value::from_json(data) {
        Value::Object(object) => object,
        _ => bail!("Root data must be a JSON object"),
    };
    let app = App::with_config(root, config.clone());
    app.mount(&doc, doc.body());
    app.tick();

    let mut frames = vec![doc.inner_html(doc.body())];
    for step in steps {
        apply_step(&app, &doc, step)?;
        app.tick();
        frames.push(doc.inner_html(doc.body()));
    }
    app.unmount();
    Ok(frames)
}

fn apply_step(app: &App, doc: &Document, step: &Step) -> Result<()> {
    match step {
        Step::Set(values) => {
            for (path, value) in values {
                debug!(path = %path, "Set");
                assign_path(app.scope(), path, Value::from_json(value))?;
            }
        }
        Step::Dispatch(dispatch) => {
            let target = doc
                .query_selector(doc.body(), &dispatch.selector)
                .ok_or_else(|| anyhow!("No element matches `{}`", dispatch.selector))?;
            if let Some(value) = &dispatch.value {
                doc.set_value(target, value);
            }
            if let Some(checked) = dispatch.checked {
                doc.set_checked(target, checked);
            }
            let event = match &dispatch.key {
                Some(key) => Event::key(dispatch.event.as_str(), key.as_str()),
                None => Event::new(dispatch.event.as_str()),
            };
            debug!(selector = %dispatch.selector, event = %dispatch.event, "Dispatch");
            doc.dispatch_event(target, &event);
        }
    }
    Ok(())
}

/// Write `value` at a dotted path such as `todos.0.done`
fn assign_path(scope: &Scope, path: &str, value: Value) -> Result<()> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        bail!("Invalid path `{}`", path);
    }
    let Some((last, parents)) = segments.split_last() else {
        bail!("Invalid path `{}`", path);
    };
    let Some((first, middle)) = parents.split_first() else {
        scope.set(last, value);
        return Ok(());
    };

    let mut target = scope.get(first);
    for segment in middle {
        target = member(&target, segment)
            .ok_or_else(|| anyhow!("`{}` does not exist in `{}`", segment, path))?;
    }
    match &target {
        Value::Object(object) => object.set(last, value),
        Value::Array(array) => {
            let index: usize = last
                .parse()
                .with_context(|| format!("`{}` is not an array index", last))?;
            array.set(index, value);
        }
        _ => bail!("Cannot set `{}`: its parent is not an object or array", path),
    }
    Ok(())
}

fn member(value: &Value, segment: &str) -> Option<Value> {
    match value {
        Value::Object(object) if object.contains_key(segment) => Some(object.get(segment)),
        Value::Array(array) => segment
            .parse::<usize>()
            .ok()
            .filter(|index| *index < array.len())
            .map(|index| array.get(index)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn steps(json: serde_json::Value) -> Vec<Step> {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_parse_steps() {
        let parsed = steps(json!([
            { "set": { "user.name": "Ada" } },
            { "dispatch": { "selector": "#go", "event": "click" } }
        ]));
        assert!(matches!(&parsed[0], Step::Set(values) if values.contains_key("user.name")));
        assert_eq!(
            parsed[1],
            Step::Dispatch(Dispatch {
                selector: "#go".to_string(),
                event: "click".to_string(),
                key: None,
                value: None,
                checked: None,
            })
        );
    }

    #[test]
    fn test_frames_follow_steps() {
        let frames = render_frames(
            r#"<p>{{ count }}</p><button @click="count++">+</button>"#,
            &json!({ "count": 0 }),
            &steps(json!([
                { "dispatch": { "selector": "button", "event": "click" } },
                { "set": { "count": 10 } }
            ])),
            &AppConfig::default(),
        )
        .unwrap();
        assert_eq!(
            frames,
            vec![
                "<p>0</p><button>+</button>",
                "<p>1</p><button>+</button>",
                "<p>10</p><button>+</button>",
            ]
        );
    }

    #[test]
    fn test_nested_set_and_keyed_input() {
        let frames = render_frames(
            r#"<ul><li v-for="t in todos" :key="t.id">{{ t.text }}</li></ul><input v-model="draft" @keyup.enter="todos.push({ id: 9, text: draft })">"#,
            &json!({ "todos": [{ "id": 1, "text": "a" }], "draft": "" }),
            &steps(json!([
                { "set": { "todos.0.text": "b" } },
                { "dispatch": { "selector": "input", "event": "input", "value": "c" } },
                { "dispatch": { "selector": "input", "event": "keyup", "key": "Enter" } }
            ])),
            &AppConfig::default(),
        )
        .unwrap();
        assert!(frames[1].starts_with("<ul><li>b</li></ul>"));
        assert!(frames[3].starts_with("<ul><li>b</li><li>c</li></ul>"));
    }

    #[test]
    fn test_bad_steps_fail() {
        let markup = "<p></p>";
        let data = json!({});
        let missing = steps(json!([{ "dispatch": { "selector": "#nope", "event": "click" } }]));
        assert!(render_frames(markup, &data, &missing, &AppConfig::default()).is_err());

        let bad_path = steps(json!([{ "set": { "a.b": 1 } }]));
        assert!(render_frames(markup, &data, &bad_path, &AppConfig::default()).is_err());

        assert!(render_frames(markup, &json!([1]), &[], &AppConfig::default()).is_err());
    }
}
