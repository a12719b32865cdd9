//! Resolution and rendering engine for strand.
//!
//! This crate drives a mounted fragment tree to completion:
//!
//! - [`resolve_all`] is the pipelined resolver. It starts every visible
//!   boundary at once and rescans after each individual settlement, so
//!   boundaries revealed by others start without waiting for siblings.
//! - [`render_to_stream`], [`render_to_data`] and [`render_to_html`] are the
//!   three ways to render a view: pending HTML now plus chunks later, the
//!   resolved data only, or fully resolved HTML.
//! - [`Loader`] builds data boundaries and reports their resolutions.
//! - [`HtmlAdapter`] serializes the tree and places fragment markers.
//!
//! Everything here is single-threaded. Futures are `!Send` and must run on a
//! current-thread runtime or a `LocalSet`.

mod adapter;
mod errors;
mod loader;
mod render;
mod resolver;
mod stream;
mod wire;

pub use adapter::{HtmlAdapter, RenderAdapter};
pub use errors::{FailureRoute, RenderError, route_failure};
pub use loader::{LoadBoundary, Loader, ViewFn};
pub use render::{RenderStream, render_to_data, render_to_html, render_to_stream};
pub use resolver::{Processed, ResolveOptions, SharedTree, resolve_all};
pub use stream::HtmlStream;
pub use wire::{ChunkEncoder, ChunkRelay, DEFAULT_CHUNK_FUNCTION};

pub use strand_core::{self, View};
pub use strand_types::{self, BoundaryId, Chunk, LoadError, LoadState, PrefetchPayload};
