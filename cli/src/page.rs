//! JSON page descriptions.
//!
//! A page is one node; every node has a `type`:
//!
//! ```json
//! {"type": "element", "tag": "ul", "attrs": {"class": "feed"}, "children": [
//!   {"type": "load", "id": "posts", "delay_ms": 40, "value": {"count": 3},
//!    "pending": [{"type": "text", "text": "loading"}],
//!    "ready":   [{"type": "text", "text": "{{value.count}} posts"}]}
//! ]}
//! ```
//!
//! A `load` node resolves with `value` after `delay_ms`, or fails with
//! `error` if that is set. `{{value}}` and `{{value.path}}` placeholders in
//! its `ready` text and attributes are filled from the resolved value. An
//! `error_boundary` shows `fallback` (with `{{error}}` filled in) once any
//! boundary below it fails.

use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use strand_engine::{BoundaryId, LoadState, Loader, View};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageNode {
    Element {
        tag: String,
        #[serde(default)]
        attrs: BTreeMap<String, String>,
        #[serde(default)]
        children: Vec<PageNode>,
    },
    Text {
        text: String,
    },
    Fragment {
        #[serde(default)]
        children: Vec<PageNode>,
    },
    Load {
        id: BoundaryId,
        #[serde(default)]
        delay_ms: u64,
        #[serde(default)]
        value: Value,
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        pending: Vec<PageNode>,
        #[serde(default)]
        ready: Vec<PageNode>,
        #[serde(default)]
        failed: Vec<PageNode>,
    },
    ErrorBoundary {
        fallback: String,
        #[serde(default)]
        children: Vec<PageNode>,
    },
}

pub fn parse(json: &str) -> Result<PageNode> {
    serde_json::from_str(json).context("invalid page description")
}

pub fn read(path: &Path) -> Result<PageNode> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read page {}", path.display()))?;
    parse(&json).with_context(|| format!("in {}", path.display()))
}

impl PageNode {
    /// Build the view, registering every `load` node with `loader`.
    ///
    /// Nested boundaries are built up front so each one exists exactly once,
    /// however often its parent's content is re-materialized.
    pub fn build(&self, loader: &Loader) -> View {
        match self {
            PageNode::Element {
                tag,
                attrs,
                children,
            } => View::Element {
                tag: tag.clone(),
                attrs: attrs
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect(),
                children: build_all(children, loader),
            },
            PageNode::Text { text } => View::text(text.clone()),
            PageNode::Fragment { children } => View::fragment(build_all(children, loader)),
            PageNode::Load {
                id,
                delay_ms,
                value,
                error,
                pending,
                ready,
                failed,
            } => {
                let delay = Duration::from_millis(*delay_ms);
                let outcome = match error {
                    Some(message) => Err(message.clone()),
                    None => Ok(value.clone()),
                };
                let pending = View::fragment(build_all(pending, loader));
                let ready = build_all(ready, loader);
                let failed = View::fragment(build_all(failed, loader));

                loader.load(
                    id.clone(),
                    move || async move {
                        tokio::time::sleep(delay).await;
                        outcome
                    },
                    move |state: &LoadState| match state {
                        LoadState::Pending => pending.clone(),
                        LoadState::Ready(value) => {
                            View::fragment(ready.iter().map(|view| fill_view(view, value)).collect())
                        }
                        LoadState::Failed(_) => failed.clone(),
                    },
                )
            }
            PageNode::ErrorBoundary { fallback, children } => {
                let fallback = fallback.clone();
                View::error_boundary(
                    move |err| View::text(fallback.replace("{{error}}", err.message())),
                    build_all(children, loader),
                )
            }
        }
    }
}

fn build_all(nodes: &[PageNode], loader: &Loader) -> Vec<View> {
    nodes.iter().map(|node| node.build(loader)).collect()
}

/// Fill placeholders in text and attributes. Boundaries are shared, not copied.
fn fill_view(view: &View, value: &Value) -> View {
    let fill_all = |children: &[View]| -> Vec<View> {
        children.iter().map(|child| fill_view(child, value)).collect()
    };
    match view {
        View::Element {
            tag,
            attrs,
            children,
        } => View::Element {
            tag: tag.clone(),
            attrs: attrs
                .iter()
                .map(|(name, raw)| (name.clone(), fill(raw, value)))
                .collect(),
            children: fill_all(children),
        },
        View::Text(text) => View::Text(fill(text, value)),
        View::Fragment(children) => View::Fragment(fill_all(children)),
        View::ErrorBoundary { fallback, children } => View::ErrorBoundary {
            fallback: Rc::clone(fallback),
            children: fill_all(children),
        },
        View::Load(_) | View::Deferred(_) => view.clone(),
    }
}

/// Replace `{{value}}` / `{{value.a.0.b}}`. Other `{{...}}` are left alone.
fn fill(template: &str, value: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        let end = start + 2 + len + 2;
        out.push_str(&rest[..start]);
        match lookup(rest[start + 2..end - 2].trim(), value) {
            Some(found) => out.push_str(&found),
            None => out.push_str(&rest[start..end]),
        }
        rest = &rest[end..];
    }

    out.push_str(rest);
    out
}

fn lookup(key: &str, value: &Value) -> Option<String> {
    let path = key.strip_prefix("value")?;
    let target = if path.is_empty() {
        Some(value)
    } else {
        path.strip_prefix('.')?
            .split('.')
            .try_fold(value, |current, segment| match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    };
    Some(match target {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    })
}
