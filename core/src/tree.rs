//! Arena-backed fragment tree.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use strand_types::{LoadError, MarkerKind, NodeId};

use crate::boundary::{AsyncBoundary, ErrorBoundary};
use crate::view::View;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
    /// Transparent container; serializes as its children.
    Fragment,
    Marker(MarkerKind),
}

impl NodeKind {
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Element { .. } | Self::Fragment)
    }

    #[must_use]
    pub fn marker(&self) -> Option<MarkerKind> {
        match self {
            Self::Marker(kind) => Some(*kind),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("node {0} does not exist in this tree")]
    UnknownNode(NodeId),
    #[error("node {0} cannot hold children")]
    NotAContainer(NodeId),
    #[error("node {0} is not an async boundary")]
    NotABoundary(NodeId),
    #[error("node {0} is not an error boundary")]
    NotAnErrorBoundary(NodeId),
    #[error("node {0} is not attached to a parent")]
    Detached(NodeId),
    #[error("node {node} is already attached to {parent}")]
    AlreadyAttached { node: NodeId, parent: NodeId },
    #[error("attaching {node} at {target} would make it its own ancestor")]
    Cycle { node: NodeId, target: NodeId },
}

#[derive(Debug)]
struct Slot {
    kind: NodeKind,
    parent: Option<NodeId>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
}

impl Slot {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            prev: None,
            next: None,
            first_child: None,
            last_child: None,
        }
    }
}

/// One render's live node tree.
///
/// Nodes are never freed while the tree lives: replacing a fragment's content
/// unlinks the old nodes, but their handles stay valid (and detached) so a
/// boundary that settles after its subtree was swapped out can still be looked
/// up safely.
#[derive(Default)]
pub struct Tree {
    slots: Vec<Slot>,
    root: Option<NodeId>,
    boundaries: HashMap<NodeId, Rc<dyn AsyncBoundary>>,
    error_boundaries: HashMap<NodeId, Rc<ErrorBoundary>>,
}

impl Tree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Materialize `view` under a fresh root fragment and make it this tree's root.
    ///
    /// The root is always a plain fragment so every mounted node, boundaries
    /// included, has a parent to splice markers into.
    pub fn mount(&mut self, view: &View) -> NodeId {
        let root = self.alloc(NodeKind::Fragment);
        self.materialize_into(root, view);
        self.root = Some(root);
        tracing::debug!(
            root = %root,
            nodes = self.slots.len(),
            boundaries = self.boundaries.len(),
            "Mounted view"
        );
        root
    }

    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Total number of node slots ever allocated, attached or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Turn an inert view into detached live nodes and return the top node.
    pub fn materialize(&mut self, view: &View) -> NodeId {
        match view {
            View::Element {
                tag,
                attrs,
                children,
            } => {
                let id = self.alloc(NodeKind::Element {
                    tag: tag.clone(),
                    attrs: attrs.clone(),
                });
                for child in children {
                    let child_id = self.materialize(child);
                    self.link_last(id, child_id);
                }
                id
            }
            View::Text(text) => self.alloc(NodeKind::Text(text.clone())),
            View::Fragment(children) => {
                let id = self.alloc(NodeKind::Fragment);
                for child in children {
                    let child_id = self.materialize(child);
                    self.link_last(id, child_id);
                }
                id
            }
            View::Load(boundary) => {
                let id = self.alloc(NodeKind::Fragment);
                self.boundaries.insert(id, Rc::clone(boundary));
                let content = boundary.view();
                self.materialize_into(id, &content);
                id
            }
            View::ErrorBoundary { fallback, children } => {
                let id = self.alloc(NodeKind::Fragment);
                let meta = Rc::new(ErrorBoundary::new(
                    View::Fragment(children.clone()),
                    Rc::clone(fallback),
                ));
                let content = meta.view();
                self.error_boundaries.insert(id, meta);
                self.materialize_into(id, &content);
                id
            }
            View::Deferred(build) => {
                let built = build();
                self.materialize(&built)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.slot(id).map(|slot| &slot.kind)
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).and_then(|slot| slot.parent)
    }

    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).and_then(|slot| slot.next)
    }

    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).and_then(|slot| slot.prev)
    }

    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).and_then(|slot| slot.first_child)
    }

    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).and_then(|slot| slot.last_child)
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.first_child(id),
        }
    }

    /// Whether `id` is reachable from the mounted root.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        let Some(root) = self.root else {
            return false;
        };
        let mut current = Some(id);
        while let Some(node) = current {
            if node == root {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Concatenated text of every text node under `id`, markers excluded.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.push_text(id, &mut out);
        out
    }

    fn push_text(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => out.push_str(text),
            Some(NodeKind::Element { .. } | NodeKind::Fragment) => {
                for child in self.children(id) {
                    self.push_text(child, out);
                }
            }
            Some(NodeKind::Marker(_)) | None => {}
        }
    }

    // ------------------------------------------------------------------------
    // Boundary side-tables
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn boundary(&self, id: NodeId) -> Option<Rc<dyn AsyncBoundary>> {
        self.boundaries.get(&id).cloned()
    }

    #[must_use]
    pub fn is_boundary(&self, id: NodeId) -> bool {
        self.boundaries.contains_key(&id)
    }

    #[must_use]
    pub fn error_boundary(&self, id: NodeId) -> Option<Rc<ErrorBoundary>> {
        self.error_boundaries.get(&id).cloned()
    }

    #[must_use]
    pub fn is_error_boundary(&self, id: NodeId) -> bool {
        self.error_boundaries.contains_key(&id)
    }

    /// Nearest error boundary strictly above `id`, found by walking `parent` links.
    #[must_use]
    pub fn nearest_error_boundary(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if self.is_error_boundary(node) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// Swap a boundary fragment's children for the content of its current state.
    pub fn refresh_boundary(&mut self, fragment: NodeId) -> Result<(), TreeError> {
        let boundary = self
            .boundary(fragment)
            .ok_or(TreeError::NotABoundary(fragment))?;
        let content = boundary.view();
        self.replace_content(fragment, &content)?;
        tracing::debug!(id = %boundary.id(), fragment = %fragment, "Refreshed boundary content");
        Ok(())
    }

    /// Deliver `err` to an error boundary and show its fallback.
    ///
    /// Returns `false` (and leaves the content alone) when the boundary
    /// already holds an earlier error.
    pub fn apply_error(&mut self, fragment: NodeId, err: LoadError) -> Result<bool, TreeError> {
        let meta = self
            .error_boundary(fragment)
            .ok_or(TreeError::NotAnErrorBoundary(fragment))?;
        if !meta.set_error(err) {
            return Ok(false);
        }
        let content = meta.view();
        self.replace_content(fragment, &content)?;
        Ok(true)
    }

    // ------------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------------

    /// Allocate a detached node.
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        self.alloc(kind)
    }

    /// Replace every child of `parent` with freshly materialized `view`.
    ///
    /// `parent` keeps its own position, so the new content lands exactly where
    /// the old content was relative to stable siblings.
    pub fn replace_content(&mut self, parent: NodeId, view: &View) -> Result<(), TreeError> {
        self.ensure_container(parent)?;
        self.clear_children(parent);
        self.materialize_into(parent, view);
        Ok(())
    }

    #[cfg(test)]
    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.ensure_container(parent)?;
        self.ensure_attachable(child, parent)?;
        self.link_last(parent, child);
        Ok(())
    }

    /// Insert detached `node` immediately before `reference`.
    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) -> Result<(), TreeError> {
        let parent = self.attached_parent(reference)?;
        self.ensure_attachable(node, parent)?;
        let prev = self.slots[reference.index()].prev;
        {
            let slot = &mut self.slots[node.index()];
            slot.parent = Some(parent);
            slot.prev = prev;
            slot.next = Some(reference);
        }
        self.slots[reference.index()].prev = Some(node);
        match prev {
            Some(prev) => self.slots[prev.index()].next = Some(node),
            None => self.slots[parent.index()].first_child = Some(node),
        }
        Ok(())
    }

    /// Insert detached `node` immediately after `reference`.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) -> Result<(), TreeError> {
        let parent = self.attached_parent(reference)?;
        self.ensure_attachable(node, parent)?;
        let next = self.slots[reference.index()].next;
        {
            let slot = &mut self.slots[node.index()];
            slot.parent = Some(parent);
            slot.prev = Some(reference);
            slot.next = next;
        }
        self.slots[reference.index()].next = Some(node);
        match next {
            Some(next) => self.slots[next.index()].prev = Some(node),
            None => self.slots[parent.index()].last_child = Some(node),
        }
        Ok(())
    }

    /// Unlink `id` from its parent. Detaching a detached node is a no-op.
    #[cfg(test)]
    fn detach(&mut self, id: NodeId) -> Result<(), TreeError> {
        let slot = self.slot(id).ok_or(TreeError::UnknownNode(id))?;
        let (Some(parent), prev, next) = (slot.parent, slot.prev, slot.next) else {
            return Ok(());
        };
        match prev {
            Some(prev) => self.slots[prev.index()].next = next,
            None => self.slots[parent.index()].first_child = next,
        }
        match next {
            Some(next) => self.slots[next.index()].prev = prev,
            None => self.slots[parent.index()].last_child = prev,
        }
        let slot = &mut self.slots[id.index()];
        slot.parent = None;
        slot.prev = None;
        slot.next = None;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn slot(&self, id: NodeId) -> Option<&Slot> {
        self.slots.get(id.index())
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId::new(self.slots.len());
        self.slots.push(Slot::new(kind));
        id
    }

    /// Materialize `view` as children of `parent`, flattening a top-level fragment.
    fn materialize_into(&mut self, parent: NodeId, view: &View) {
        match view {
            View::Fragment(children) => {
                for child in children {
                    let child_id = self.materialize(child);
                    self.link_last(parent, child_id);
                }
            }
            View::Deferred(build) => {
                let built = build();
                self.materialize_into(parent, &built);
            }
            other => {
                let child_id = self.materialize(other);
                self.link_last(parent, child_id);
            }
        }
    }

    /// Append a known-detached node. Callers guarantee both handles are valid.
    fn link_last(&mut self, parent: NodeId, child: NodeId) {
        let last = self.slots[parent.index()].last_child;
        {
            let slot = &mut self.slots[child.index()];
            slot.parent = Some(parent);
            slot.prev = last;
            slot.next = None;
        }
        match last {
            Some(last) => self.slots[last.index()].next = Some(child),
            None => self.slots[parent.index()].first_child = Some(child),
        }
        self.slots[parent.index()].last_child = Some(child);
    }

    fn clear_children(&mut self, parent: NodeId) {
        let mut current = self.slots[parent.index()].first_child;
        while let Some(child) = current {
            let slot = &mut self.slots[child.index()];
            current = slot.next;
            slot.parent = None;
            slot.prev = None;
            slot.next = None;
        }
        let slot = &mut self.slots[parent.index()];
        slot.first_child = None;
        slot.last_child = None;
    }

    fn ensure_container(&self, id: NodeId) -> Result<(), TreeError> {
        let slot = self.slot(id).ok_or(TreeError::UnknownNode(id))?;
        if slot.kind.is_container() {
            Ok(())
        } else {
            Err(TreeError::NotAContainer(id))
        }
    }

    fn attached_parent(&self, id: NodeId) -> Result<NodeId, TreeError> {
        self.slot(id)
            .ok_or(TreeError::UnknownNode(id))?
            .parent
            .ok_or(TreeError::Detached(id))
    }

    /// `node` must exist, be detached, and not be `target` or one of its ancestors.
    fn ensure_attachable(&self, node: NodeId, target: NodeId) -> Result<(), TreeError> {
        let slot = self.slot(node).ok_or(TreeError::UnknownNode(node))?;
        if let Some(parent) = slot.parent {
            return Err(TreeError::AlreadyAttached { node, parent });
        }
        let mut current = Some(target);
        while let Some(ancestor) = current {
            if ancestor == node {
                return Err(TreeError::Cycle { node, target });
            }
            current = self.parent(ancestor);
        }
        Ok(())
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("nodes", &self.slots.len())
            .field("root", &self.root)
            .field("boundaries", &self.boundaries.len())
            .field("error_boundaries", &self.error_boundaries.len())
            .finish()
    }
}

/// Iterator over the direct children of a node.
pub struct Children<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.next_sibling(current);
        Some(current)
    }
}
