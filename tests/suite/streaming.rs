//! Streaming render: chunk order, pipelining, and failure isolation.

use std::time::Duration;

use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::time::Instant;

use strand_engine::{ChunkEncoder, HtmlAdapter, Loader, View, render_to_stream};

use crate::common::{broken, drain, ids, timed};

#[tokio::test(start_paused = true)]
async fn siblings_stream_fastest_first() {
    let loader = Loader::new();
    let mut chunks = loader.chunk_channel();
    let view = View::element(
        "ul",
        vec![
            timed(&loader, "slow", 30, json!(3), vec![]),
            timed(&loader, "mid", 20, json!(2), vec![]),
            timed(&loader, "fast", 10, json!(1), vec![]),
        ],
    );

    let stream = render_to_stream(&view, &HtmlAdapter).unwrap();
    assert_eq!(stream.pending_count, 3);
    stream.done.await.unwrap();

    assert_eq!(ids(&drain(&mut chunks)), vec!["fast", "mid", "slow"]);
}

#[tokio::test(start_paused = true)]
async fn revealed_chain_does_not_wait_for_slow_sibling() {
    let loader = Loader::new();
    let mut chunks = loader.chunk_channel();
    let c = timed(&loader, "c", 10, json!("c"), vec![]);
    let b = timed(&loader, "b", 10, json!("b"), vec![c]);
    let view = View::fragment(vec![
        timed(&loader, "a", 10, json!("a"), vec![b]),
        timed(&loader, "sibling", 25, json!("s"), vec![]),
    ]);

    let started = Instant::now();
    let stream = render_to_stream(&view, &HtmlAdapter).unwrap();
    assert_eq!(stream.pending_count, 2);
    stream.done.await.unwrap();
    let elapsed = started.elapsed();

    // a(10) -> b(20) -> c(30) runs alongside the sibling finishing at 25.
    assert_eq!(ids(&drain(&mut chunks)), vec!["a", "b", "sibling", "c"]);
    assert!(elapsed >= Duration::from_millis(30), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(35), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn failed_boundary_never_streams_and_never_blocks() {
    let loader = Loader::new();
    let mut chunks = loader.chunk_channel();
    let view = View::fragment(vec![
        broken(&loader, "X", 5),
        timed(&loader, "ok", 15, json!({"fine": true}), vec![]),
    ]);

    let stream = render_to_stream(&view, &HtmlAdapter).unwrap();
    stream.done.await.unwrap();

    let streamed = drain(&mut chunks);
    assert_eq!(ids(&streamed), vec!["ok"]);
    assert_eq!(streamed[0].data, json!({"fine": true}));
}

#[tokio::test(start_paused = true)]
async fn html_body_interleaves_scripts_in_settlement_order() {
    let loader = Loader::new();
    let chunks = loader.chunk_channel();
    let inner = timed(&loader, "inner", 5, json!("</script>"), vec![]);
    let view = View::element(
        "body",
        vec![
            timed(&loader, "outer", 20, json!(1), vec![inner]),
            timed(&loader, "side", 10, json!(2), vec![]),
        ],
    );

    let body: Vec<String> = render_to_stream(&view, &HtmlAdapter)
        .unwrap()
        .into_html_stream(chunks, ChunkEncoder::new("app.push").unwrap())
        .map(|part| part.unwrap())
        .collect()
        .await;

    assert_eq!(
        body,
        vec![
            "<body><!--fragment-start-->loading<!--fragment-end-->\
             <!--fragment-start-->loading<!--fragment-end--></body>"
                .to_owned(),
            r#"<script>app.push("side",2)</script>"#.to_owned(),
            r#"<script>app.push("outer",1)</script>"#.to_owned(),
            r#"<script>app.push("inner","<\/script>")</script>"#.to_owned(),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn error_boundary_catches_only_its_own_subtree() {
    let loader = Loader::new();
    let mut chunks = loader.chunk_channel();
    let view = View::fragment(vec![
        View::error_boundary(
            |err| View::text(format!("fallback for {}", err.id())),
            vec![broken(&loader, "guarded", 5)],
        ),
        timed(&loader, "free", 10, json!(null), vec![]),
    ]);

    let stream = render_to_stream(&view, &HtmlAdapter).unwrap();
    stream.done.await.unwrap();
    assert_eq!(ids(&drain(&mut chunks)), vec!["free"]);
}
