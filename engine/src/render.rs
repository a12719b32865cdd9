//! Render entry points: streaming, data-only, and fully resolved HTML.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use futures_util::FutureExt;
use futures_util::future::{self, LocalBoxFuture};
use tokio::sync::mpsc;

use strand_core::{NodeId, Tree, View, collect_async_fragments};
use strand_types::{Chunk, PrefetchPayload};

use crate::adapter::RenderAdapter;
use crate::errors::RenderError;
use crate::loader::Loader;
use crate::resolver::{ResolveOptions, SharedTree, resolve_all};
use crate::stream::HtmlStream;
use crate::wire::ChunkEncoder;

/// A streaming render in progress.
///
/// `initial_html` is complete and can be flushed immediately. `done` drives
/// resolution and must be polled for any chunk to be produced; it settles
/// only after every chunk has been handed to the loader's listeners.
pub struct RenderStream {
    pub initial_html: String,
    pub done: LocalBoxFuture<'static, Result<(), RenderError>>,
    /// Boundaries visible in the initial mount.
    pub pending_count: usize,
}

impl RenderStream {
    /// Combine the initial HTML, the chunks from `chunks`, and resolution into
    /// one body stream. `chunks` should come from the same loader the view
    /// was built with (see [`Loader::chunk_channel`]).
    #[must_use]
    pub fn into_html_stream(
        self,
        chunks: mpsc::UnboundedReceiver<Chunk>,
        encoder: ChunkEncoder,
    ) -> HtmlStream {
        HtmlStream::new(self.initial_html, chunks, self.done, encoder)
    }
}

impl fmt::Debug for RenderStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderStream")
            .field("initial_html", &self.initial_html)
            .field("pending_count", &self.pending_count)
            .finish_non_exhaustive()
    }
}

fn mount<A: RenderAdapter + ?Sized>(
    adapter: &A,
    view: &View,
) -> Result<(Tree, NodeId), RenderError> {
    let mut tree = Tree::new();
    let root = adapter.mount(&mut tree, view)?;
    Ok((tree, root))
}

/// Render the pending state now and resolve the rest in `done`.
///
/// Markers are placed around every initially visible boundary before
/// serialization so later content lands between them. Failures are always
/// caught here: a failing boundary never rejects `done`.
pub fn render_to_stream<A: RenderAdapter + ?Sized>(
    view: &View,
    adapter: &A,
) -> Result<RenderStream, RenderError> {
    let (mut tree, root) = mount(adapter, view)?;

    let fragments = collect_async_fragments(&tree, root);
    for fragment in &fragments {
        adapter.insert_fragment_markers(&mut tree, *fragment)?;
    }
    let initial_html = adapter.serialize(&tree, root)?;
    let pending_count = fragments.len();
    tracing::info!(pending = pending_count, "Rendered initial HTML");

    let done = if fragments.is_empty() {
        future::ready(Ok(())).boxed_local()
    } else {
        let tree: SharedTree = Rc::new(RefCell::new(tree));
        async move {
            let processed = resolve_all(&tree, root, ResolveOptions::catching()).await?;
            tracing::info!(resolved = processed.len(), "Stream render finished");
            Ok(())
        }
        .boxed_local()
    };

    Ok(RenderStream {
        initial_html,
        done,
        pending_count,
    })
}

/// Resolve everything reachable from `view` and return only the data.
///
/// `loader` must be the one the view's boundaries were built with. The
/// result matches the set of chunks a streaming render of the same view
/// would emit.
pub async fn render_to_data<A: RenderAdapter + ?Sized>(
    view: &View,
    adapter: &A,
    loader: &Loader,
) -> Result<PrefetchPayload, RenderError> {
    let (tree, root) = mount(adapter, view)?;
    let tree: SharedTree = Rc::new(RefCell::new(tree));
    resolve_all(&tree, root, ResolveOptions::catching()).await?;

    let data = loader.data();
    tracing::info!(boundaries = data.len(), "Data render finished");
    Ok(data)
}

/// Resolve everything, then serialize once with markers around final content.
pub async fn render_to_html<A: RenderAdapter + ?Sized>(
    view: &View,
    adapter: &A,
    options: ResolveOptions,
) -> Result<String, RenderError> {
    let (tree, root) = mount(adapter, view)?;
    let tree: SharedTree = Rc::new(RefCell::new(tree));
    let processed = resolve_all(&tree, root, options).await?;

    let mut tree = tree.borrow_mut();
    // Boundaries replaced by an error fallback are gone from the output.
    for fragment in processed {
        if tree.is_attached(fragment) {
            adapter.insert_fragment_markers(&mut tree, fragment)?;
        }
    }
    let html = adapter.serialize(&tree, root)?;
    tracing::info!(bytes = html.len(), "HTML render finished");
    Ok(html)
}
