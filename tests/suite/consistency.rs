//! The three render modes agree on what a tree resolves to.

use pretty_assertions::assert_eq;
use serde_json::json;

use strand_engine::{
    HtmlAdapter, Loader, ResolveOptions, View, render_to_data, render_to_html, render_to_stream,
};

use crate::common::{broken, drain, payload, timed};

/// Three levels of nesting, a failure, and a value shared by two ids.
fn page(loader: &Loader) -> View {
    let leaf = timed(loader, "leaf", 3, json!([1, 2, 3]), vec![]);
    let middle = timed(loader, "middle", 7, json!({"k": "v"}), vec![leaf]);
    View::element(
        "article",
        vec![
            timed(loader, "top", 12, json!("top"), vec![middle]),
            broken(loader, "flaky", 4),
            timed(loader, "same", 1, json!("top"), vec![]),
        ],
    )
}

#[tokio::test(start_paused = true)]
async fn data_render_equals_streamed_chunk_set() {
    let streaming = Loader::new();
    let mut chunks = streaming.chunk_channel();
    let stream = render_to_stream(&page(&streaming), &HtmlAdapter).unwrap();
    stream.done.await.unwrap();
    let streamed = payload(drain(&mut chunks));

    let data_loader = Loader::new();
    let data = render_to_data(&page(&data_loader), &HtmlAdapter, &data_loader)
        .await
        .unwrap();

    assert_eq!(data, streamed);
    assert_eq!(
        serde_json::to_value(&data).unwrap(),
        json!({
            "leaf": [1, 2, 3],
            "middle": {"k": "v"},
            "same": "top",
            "top": "top",
        })
    );
    assert_eq!(streaming.data(), data);
}

#[tokio::test(start_paused = true)]
async fn resolved_html_markers_wrap_final_content_only() {
    let loader = Loader::new();
    let html = render_to_html(&page(&loader), &HtmlAdapter, ResolveOptions::catching())
        .await
        .unwrap();

    assert_eq!(
        html,
        "<article>\
         <!--fragment-start--><span>top</span>\
         <!--fragment-start--><span>middle</span>\
         <!--fragment-start--><span>leaf</span><!--fragment-end-->\
         <!--fragment-end-->\
         <!--fragment-end-->\
         <!--fragment-start-->unavailable<!--fragment-end-->\
         <!--fragment-start--><span>same</span><!--fragment-end-->\
         </article>"
    );
    assert!(!html.contains("loading"));
    assert!(!html.contains("<!--fragment-start--><!--fragment-end-->"));
    assert_eq!(
        html.matches("<!--fragment-start-->").count(),
        html.matches("<!--fragment-end-->").count()
    );
}

#[tokio::test(start_paused = true)]
async fn uncaught_failures_leave_their_own_failed_content() {
    let loader = Loader::new();
    let view = View::error_boundary(
        |_| View::text("fallback"),
        vec![broken(&loader, "lonely", 1)],
    );

    let caught = render_to_html(&view, &HtmlAdapter, ResolveOptions::catching())
        .await
        .unwrap();
    assert_eq!(caught, "fallback");

    let loader = Loader::new();
    let view = View::error_boundary(
        |_| View::text("fallback"),
        vec![broken(&loader, "lonely", 1)],
    );
    let uncaught = render_to_html(&view, &HtmlAdapter, ResolveOptions::default())
        .await
        .unwrap();
    assert_eq!(
        uncaught,
        "<!--fragment-start-->unavailable<!--fragment-end-->"
    );
}
