//! Pipelined resolution of every async boundary reachable from a root.
//!
//! The resolver keeps one pool of in-flight resolutions. Whenever *any* of
//! them settles, the boundary's fragment is refreshed, the failure (if any) is
//! routed, and the whole tree is rescanned from the same root; boundaries not
//! seen before start immediately, alongside whatever is still in flight. There
//! are no waves: a fast boundary's children begin resolving while a slow
//! sibling is still waiting on its own fetch, and a chain of boundaries that
//! reveal each other proceeds as a pipeline.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use futures_util::future::LocalBoxFuture;
use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt, StreamExt};
use serde_json::Value;

use strand_core::{
    NodeId, Tree, TreeError, collect_async_fragments, collect_fragments_with_boundaries,
};
use strand_types::LoadError;

use crate::errors::{FailureRoute, route_failure};

/// The tree a render owns, shared between the renderer and in-flight work.
///
/// Borrows never span an `.await`.
pub type SharedTree = Rc<RefCell<Tree>>;

/// Every boundary fragment the resolver started, by identity.
pub type Processed = BTreeSet<NodeId>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Route failures to the nearest error boundary. When off, every failure
    /// is absorbed.
    pub catch_errors: bool,
}

impl ResolveOptions {
    #[must_use]
    pub const fn catching() -> Self {
        Self { catch_errors: true }
    }
}

type Settlement = (NodeId, Result<Value, LoadError>);

/// Resolve every boundary reachable from `root`, including ones revealed by
/// other boundaries resolving.
///
/// Boundary failures never make this fail; only structural tree errors do.
pub async fn resolve_all(
    tree: &SharedTree,
    root: NodeId,
    options: ResolveOptions,
) -> Result<Processed, TreeError> {
    let mut pipeline = Pipeline::new(options);
    pipeline.discover(tree, root);

    while let Some((fragment, outcome)) = pipeline.in_flight.next().await {
        pipeline.settle(tree, fragment, outcome)?;
        pipeline.discover(tree, root);
    }

    tracing::debug!(
        processed = pipeline.processed.len(),
        "Resolved all reachable boundaries"
    );
    Ok(pipeline.processed)
}

struct Pipeline {
    options: ResolveOptions,
    processed: Processed,
    /// Boundary fragment -> owning error boundary. First mapping wins.
    routes: HashMap<NodeId, NodeId>,
    in_flight: FuturesUnordered<LocalBoxFuture<'static, Settlement>>,
}

impl Pipeline {
    fn new(options: ResolveOptions) -> Self {
        Self {
            options,
            processed: Processed::new(),
            routes: HashMap::new(),
            in_flight: FuturesUnordered::new(),
        }
    }

    /// Rescan the current tree and start every boundary not seen before.
    fn discover(&mut self, tree: &SharedTree, root: NodeId) {
        let tree = tree.borrow();
        let fragments = if self.options.catch_errors {
            let collected = collect_fragments_with_boundaries(&tree, root);
            for (fragment, guard) in collected.error_boundaries {
                self.routes.entry(fragment).or_insert(guard);
            }
            collected.fragments
        } else {
            collect_async_fragments(&tree, root)
        };

        for fragment in fragments {
            if !self.processed.insert(fragment) {
                continue;
            }
            let Some(boundary) = tree.boundary(fragment) else {
                continue;
            };
            tracing::debug!(id = %boundary.id(), fragment = %fragment, "Starting boundary");
            let pending = boundary.resolve();
            self.in_flight
                .push(pending.map(move |outcome| (fragment, outcome)).boxed_local());
        }
    }

    fn settle(
        &mut self,
        tree: &SharedTree,
        fragment: NodeId,
        outcome: Result<Value, LoadError>,
    ) -> Result<(), TreeError> {
        let mut tree = tree.borrow_mut();
        tree.refresh_boundary(fragment)?;

        let Err(err) = outcome else {
            return Ok(());
        };
        match route_failure(fragment, &self.routes, self.options.catch_errors) {
            FailureRoute::Boundary(guard) => {
                tracing::debug!(id = %err.id(), guard = %guard, "Routing failure to error boundary");
                tree.apply_error(guard, err)?;
            }
            FailureRoute::Absorbed => {
                tracing::debug!(id = %err.id(), "Absorbed boundary failure");
            }
        }
        Ok(())
    }
}
