//! End-to-end runs of the `strand` binary.

use std::path::Path;
use std::process::{Command, Output};

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tempfile::tempdir;

use crate::common::write_file;

const PAGE: &str = r#"{
  "type": "element", "tag": "main",
  "children": [
    {"type": "load", "id": "slow", "delay_ms": 40, "value": "s",
     "pending": [{"type": "text", "text": "wait"}],
     "ready": [{"type": "text", "text": "slow={{value}}"}]},
    {"type": "load", "id": "fast", "delay_ms": 1, "value": {"n": 1},
     "pending": [{"type": "text", "text": "wait"}],
     "ready": [
       {"type": "text", "text": "fast={{value.n}}"},
       {"type": "load", "id": "nested", "delay_ms": 1, "value": [true],
        "ready": [{"type": "text", "text": "+"}]}
     ]},
    {"type": "error_boundary", "fallback": "down: {{error}}",
     "children": [{"type": "load", "id": "broken", "delay_ms": 1, "error": "timeout"}]}
  ]
}"#;

/// Run the binary with an isolated config file.
fn strand(dir: &Path, config: &str, args: &[&str]) -> Output {
    let config = write_file(dir, "config.toml", config);
    Command::new(env!("CARGO_BIN_EXE_strand"))
        .args(args)
        .env("STRAND_CONFIG", config)
        .env("RUST_LOG", "off")
        .output()
        .expect("run strand")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "strand failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).expect("utf-8 output")
}

#[test]
fn html_command_prints_resolved_page() {
    let dir = tempdir().unwrap();
    let page = write_file(dir.path(), "page.json", PAGE);
    let output = strand(dir.path(), "", &["html", page.to_str().unwrap()]);

    assert_eq!(
        stdout(&output).trim_end(),
        "<main>\
         <!--fragment-start-->slow=s<!--fragment-end-->\
         <!--fragment-start-->fast=1<!--fragment-start-->+<!--fragment-end--><!--fragment-end-->\
         down: timeout\
         </main>"
    );
}

#[test]
fn data_command_prints_prefetch_payload() {
    let dir = tempdir().unwrap();
    let page = write_file(dir.path(), "page.json", PAGE);
    let output = strand(dir.path(), "", &["data", page.to_str().unwrap()]);

    let data: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(
        data,
        json!({"slow": "s", "fast": {"n": 1}, "nested": [true]})
    );
}

#[test]
fn stream_command_uses_configured_chunk_function() {
    let dir = tempdir().unwrap();
    let page = write_file(dir.path(), "page.json", PAGE);
    let config = "[render]\nchunk_function = \"window.__push\"\n";
    let output = strand(dir.path(), config, &["stream", page.to_str().unwrap()]);

    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        "<main><!--fragment-start-->wait<!--fragment-end-->\
         <!--fragment-start-->wait<!--fragment-end-->\
         <!--fragment-start--><!--fragment-end--></main>"
    );
    assert_eq!(
        &lines[1..],
        &[
            r#"<script>window.__push("fast",{"n":1})</script>"#,
            r#"<script>window.__push("nested",[true])</script>"#,
            r#"<script>window.__push("slow","s")</script>"#,
        ]
    );
}

#[test]
fn seed_file_replaces_fetches() {
    let dir = tempdir().unwrap();
    let page = write_file(dir.path(), "page.json", PAGE);
    let seed = write_file(dir.path(), "seed.json", r#"{"broken": "recovered", "slow": "S"}"#);
    let output = strand(
        dir.path(),
        "",
        &["data", page.to_str().unwrap(), "--seed", seed.to_str().unwrap()],
    );

    let data: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(
        data,
        json!({"broken": "recovered", "slow": "S", "fast": {"n": 1}, "nested": [true]})
    );
}

#[test]
fn invalid_page_fails_with_message() {
    let dir = tempdir().unwrap();
    let page = write_file(dir.path(), "page.json", r#"{"type": "load", "id": ""}"#);
    let output = strand(dir.path(), "", &["html", page.to_str().unwrap()]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("page.json"), "{stderr}");
}
