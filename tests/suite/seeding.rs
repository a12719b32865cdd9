//! Pre-seeded data skips fetches, whenever it arrives.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;

use strand_engine::{
    HtmlAdapter, Loader, PrefetchPayload, ResolveOptions, View, render_to_html, render_to_stream,
};

use crate::common::{counted, drain, id, ids, timed};

fn seed(pairs: &[(&str, serde_json::Value)]) -> PrefetchPayload {
    pairs
        .iter()
        .map(|(raw, value)| strand_engine::Chunk::new(id(raw), value.clone()))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn initial_data_skips_every_fetch() {
    let calls = Rc::new(Cell::new(0));
    let loader = Loader::with_initial(seed(&[("a", json!("seeded-a")), ("b", json!(2))]));
    let view = View::fragment(vec![
        counted(&loader, "a", 50, json!("fetched"), Rc::clone(&calls)),
        counted(&loader, "b", 50, json!("fetched"), Rc::clone(&calls)),
    ]);

    let html = render_to_html(&view, &HtmlAdapter, ResolveOptions::catching())
        .await
        .unwrap();

    assert_eq!(calls.get(), 0);
    assert_eq!(
        html,
        "<!--fragment-start-->seeded-a<!--fragment-end-->\
         <!--fragment-start-->2<!--fragment-end-->"
    );
    assert_eq!(loader.data(), seed(&[("a", json!("seeded-a")), ("b", json!(2))]));
}

#[tokio::test(start_paused = true)]
async fn late_set_data_applies_to_registered_boundary() {
    let calls = Rc::new(Cell::new(0));
    let loader = Loader::new();
    let mut chunks = loader.chunk_channel();
    let view = counted(&loader, "late", 50, json!("fetched"), Rc::clone(&calls));

    // Registered already; the value arrives before rendering starts.
    loader.set_data(&id("late"), json!("pushed"));

    let stream = render_to_stream(&view, &HtmlAdapter).unwrap();
    assert_eq!(
        stream.initial_html,
        "<!--fragment-start-->pushed<!--fragment-end-->"
    );
    stream.done.await.unwrap();

    assert_eq!(calls.get(), 0);
    let streamed = drain(&mut chunks);
    assert_eq!(ids(&streamed), vec!["late"]);
    assert_eq!(streamed[0].data, json!("pushed"));
}

#[tokio::test(start_paused = true)]
async fn seed_for_nested_boundary_is_buffered_until_revealed() {
    let calls = Rc::new(Cell::new(0));
    let loader = Loader::new();
    loader.seed(seed(&[("inner", json!(7))]));

    let inner = counted(&loader, "inner", 100, json!(0), Rc::clone(&calls));
    let view = timed(&loader, "outer", 10, json!("o"), vec![inner]);

    let html = render_to_html(&view, &HtmlAdapter, ResolveOptions::catching())
        .await
        .unwrap();
    assert_eq!(calls.get(), 0);
    assert!(html.contains("<!--fragment-start-->7<!--fragment-end-->"), "{html}");
}

#[tokio::test(start_paused = true)]
async fn value_seeded_mid_flight_wins_over_fetch() {
    let calls = Rc::new(Cell::new(0));
    let loader = Loader::new();
    let mut chunks = loader.chunk_channel();
    let view = counted(&loader, "race", 30, json!("fetched"), Rc::clone(&calls));

    let started = tokio::time::Instant::now();
    let stream = render_to_stream(&view, &HtmlAdapter).unwrap();
    let pusher = {
        let loader = loader.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            loader.set_data(&id("race"), json!("pushed"));
        }
    };
    let (done, ()) = tokio::join!(stream.done, pusher);
    done.unwrap();

    // The fetch had already started; the render finishes as soon as the
    // value lands instead of waiting out the fetch.
    assert_eq!(started.elapsed(), Duration::from_millis(10));
    assert_eq!(calls.get(), 1);
    let streamed = drain(&mut chunks);
    assert_eq!(ids(&streamed), vec!["race"]);
    assert_eq!(streamed[0].data, json!("pushed"));
}
