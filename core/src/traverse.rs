//! Discovery of async boundary fragments.
//!
//! Both collectors walk the *current* tree depth-first, pre-order. A boundary
//! fragment is always yielded, but an unsettled one is not descended into:
//! whatever it holds right now is pending-state content, and the boundaries it
//! will eventually contain only exist once it has settled and its content has
//! been swapped. Callers rerun the collection after every settlement to pick
//! those up.

use std::collections::HashMap;

use strand_types::NodeId;

use crate::tree::Tree;

/// Result of [`collect_fragments_with_boundaries`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collected {
    /// Boundary fragments in document order.
    pub fragments: Vec<NodeId>,
    /// Boundary fragment -> nearest enclosing error boundary fragment.
    ///
    /// Fragments with no error boundary above them have no entry.
    pub error_boundaries: HashMap<NodeId, NodeId>,
}

#[must_use]
pub fn collect_async_fragments(tree: &Tree, root: NodeId) -> Vec<NodeId> {
    walk(tree, root, false).fragments
}

/// Like [`collect_async_fragments`], also mapping each fragment to the nearest
/// error boundary above it.
#[must_use]
pub fn collect_fragments_with_boundaries(tree: &Tree, root: NodeId) -> Collected {
    walk(tree, root, true)
}

fn walk(tree: &Tree, root: NodeId, track_errors: bool) -> Collected {
    let mut collected = Collected::default();
    if tree.kind(root).is_none() {
        return collected;
    }

    // Error boundaries above the starting point still count.
    let enclosing = if track_errors {
        tree.nearest_error_boundary(root)
    } else {
        None
    };
    let mut stack = vec![(root, enclosing)];

    while let Some((node, nearest)) = stack.pop() {
        if let Some(boundary) = tree.boundary(node) {
            collected.fragments.push(node);
            if let Some(guard) = nearest {
                collected.error_boundaries.insert(node, guard);
            }
            if !boundary.is_settled() {
                continue;
            }
        }

        let nearest = if track_errors && tree.is_error_boundary(node) {
            Some(node)
        } else {
            nearest
        };

        let children: Vec<NodeId> = tree.children(node).collect();
        stack.extend(children.into_iter().rev().map(|child| (child, nearest)));
    }

    collected
}
