//! Fragment tree model for strand.
//!
//! A render owns one [`Tree`]: a flat arena of nodes linked by
//! `parent`/`prev`/`next`/`first_child`/`last_child` handles. Fragments are
//! transparent containers; a fragment can additionally be an async boundary or
//! an error boundary, recorded in side-tables keyed by [`NodeId`] rather than
//! on the node itself.
//!
//! ```text
//! View (inert) --materialize--> Tree (live) --collect--> boundary fragments
//!                                   ^                          |
//!                                   +---- refresh_boundary ----+
//! ```
//!
//! Resolving a boundary swaps its fragment's children for freshly
//! materialized content, which may reveal new boundaries. That is why the
//! traversal only descends into a boundary fragment once it has settled, and
//! why the resolver rescans after every settlement.

mod boundary;
mod traverse;
mod tree;
mod view;

pub use boundary::{AsyncBoundary, ErrorBoundary, ResolveFuture};
pub use traverse::{Collected, collect_async_fragments, collect_fragments_with_boundaries};
pub use tree::{Children, NodeKind, Tree, TreeError};
pub use view::{ErrorFallback, View};

pub use strand_types::{BoundaryId, LoadError, LoadState, MarkerKind, NodeId};
