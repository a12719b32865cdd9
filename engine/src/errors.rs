//! Render errors and the boundary failure routing policy.
//!
//! Two classes of failure exist and they never mix:
//!
//! - A boundary's fetch failing is recoverable. It is routed to the nearest
//!   error boundary above the failing fragment, or absorbed when there is none.
//!   It never fails a render.
//! - Everything structural (mounting, tree surgery, serialization, marker
//!   placement) is a [`RenderError`] and fails the whole render.

use std::collections::HashMap;

use thiserror::Error;

use strand_core::{NodeId, TreeError};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("tree operation failed: {0}")]
    Tree(#[from] TreeError),
    #[error("cannot serialize <{tag}>: invalid {what} name")]
    InvalidName { tag: String, what: &'static str },
    #[error("invalid chunk function name '{0}'")]
    InvalidChunkFunction(String),
    #[error("chunk JSON error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Where a failed boundary's error goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureRoute {
    /// Deliver to this error boundary fragment.
    Boundary(NodeId),
    /// No error boundary owns the failure: it is caught and dropped here.
    Absorbed,
}

/// Decide who owns a boundary failure.
///
/// With error catching off, nothing is routed and every failure is absorbed.
/// With it on, the nearest error boundary recorded for `fragment` owns it. A
/// failure with no owner is deliberately absorbed: the fragment keeps showing
/// its own failed-state content, no chunk is ever produced for it, and the
/// rest of the render carries on.
#[must_use]
pub fn route_failure(
    fragment: NodeId,
    routes: &HashMap<NodeId, NodeId>,
    catch_errors: bool,
) -> FailureRoute {
    if !catch_errors {
        return FailureRoute::Absorbed;
    }
    routes
        .get(&fragment)
        .copied()
        .map_or(FailureRoute::Absorbed, FailureRoute::Boundary)
}
