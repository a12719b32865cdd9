//! Shared test utilities and fixtures
//!
//! Common infrastructure for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;

use strand_engine::{BoundaryId, Chunk, LoadState, Loader, PrefetchPayload, View};

pub fn id(raw: &str) -> BoundaryId {
    BoundaryId::new(raw).expect("valid boundary id")
}

/// A boundary that resolves with `value` after `ms` and then shows
/// `<span>name</span>` followed by `revealed`.
pub fn timed(loader: &Loader, name: &str, ms: u64, value: Value, revealed: Vec<View>) -> View {
    let label = name.to_owned();
    loader.load(
        id(name),
        move || async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok::<_, String>(value)
        },
        move |state: &LoadState| match state {
            LoadState::Pending => View::text("loading"),
            LoadState::Ready(_) => {
                let mut children = vec![View::element("span", vec![View::text(label.clone())])];
                children.extend(revealed.iter().cloned());
                View::fragment(children)
            }
            LoadState::Failed(err) => View::text(format!("error: {}", err.message())),
        },
    )
}

/// A boundary whose fetch fails after `ms`.
pub fn broken(loader: &Loader, name: &str, ms: u64) -> View {
    loader.load(
        id(name),
        move || async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Err::<Value, _>("connection reset")
        },
        |state: &LoadState| match state {
            LoadState::Failed(_) => View::text("unavailable"),
            _ => View::text("loading"),
        },
    )
}

/// A boundary that counts fetch invocations in `calls`.
pub fn counted(
    loader: &Loader,
    name: &str,
    ms: u64,
    value: Value,
    calls: std::rc::Rc<std::cell::Cell<usize>>,
) -> View {
    loader.load(
        id(name),
        move || {
            calls.set(calls.get() + 1);
            async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok::<_, String>(value)
            }
        },
        |state: &LoadState| match state.value() {
            Some(Value::String(text)) => View::text(text.clone()),
            Some(value) => View::text(value.to_string()),
            None => View::text("loading"),
        },
    )
}

/// Everything currently queued on a chunk channel.
pub fn drain(chunks: &mut mpsc::UnboundedReceiver<Chunk>) -> Vec<Chunk> {
    let mut out = Vec::new();
    while let Ok(chunk) = chunks.try_recv() {
        out.push(chunk);
    }
    out
}

pub fn ids(chunks: &[Chunk]) -> Vec<String> {
    chunks.iter().map(|chunk| chunk.id.to_string()).collect()
}

pub fn payload(chunks: Vec<Chunk>) -> PrefetchPayload {
    chunks.into_iter().collect()
}

/// Write `contents` to `name` inside `dir`.
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write fixture");
    path
}
