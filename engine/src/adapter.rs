//! Rendering adapter: turns the live tree into HTML and places fragment markers.

use strand_core::{MarkerKind, NodeId, NodeKind, Tree, TreeError, View};

use crate::errors::RenderError;

/// The three operations a renderer needs from its output format.
pub trait RenderAdapter {
    /// Materialize `view` into `tree` and return the root to render from.
    fn mount(&self, tree: &mut Tree, view: &View) -> Result<NodeId, RenderError> {
        Ok(tree.mount(view))
    }

    fn serialize(&self, tree: &Tree, root: NodeId) -> Result<String, RenderError>;

    /// Bracket `fragment`'s current content with a start/end marker pair.
    ///
    /// Must be idempotent: invoking it again on an already wrapped fragment
    /// leaves the tree unchanged.
    fn insert_fragment_markers(&self, tree: &mut Tree, fragment: NodeId)
    -> Result<(), RenderError>;
}

/// Elements that never have content or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Default HTML adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlAdapter;

impl RenderAdapter for HtmlAdapter {
    fn serialize(&self, tree: &Tree, root: NodeId) -> Result<String, RenderError> {
        let mut out = String::new();
        write_node(tree, root, &mut out)?;
        Ok(out)
    }

    fn insert_fragment_markers(
        &self,
        tree: &mut Tree,
        fragment: NodeId,
    ) -> Result<(), RenderError> {
        // Markers are siblings of the fragment, so whatever the fragment
        // holds now or later sits between them.
        if tree.kind(fragment).is_none() {
            return Err(TreeError::UnknownNode(fragment).into());
        }
        if tree.parent(fragment).is_none() {
            return Err(TreeError::Detached(fragment).into());
        }

        let marker_at = |sibling: Option<NodeId>| {
            sibling
                .and_then(|id| tree.kind(id))
                .and_then(NodeKind::marker)
        };
        let before = marker_at(tree.prev_sibling(fragment));
        let after = marker_at(tree.next_sibling(fragment));
        if before == Some(MarkerKind::Start) && after == Some(MarkerKind::End) {
            return Ok(());
        }

        let start = tree.create(NodeKind::Marker(MarkerKind::Start));
        tree.insert_before(fragment, start)?;
        let end = tree.create(NodeKind::Marker(MarkerKind::End));
        tree.insert_after(fragment, end)?;
        Ok(())
    }
}

fn write_node(tree: &Tree, id: NodeId, out: &mut String) -> Result<(), RenderError> {
    let kind = tree.kind(id).ok_or(TreeError::UnknownNode(id))?;
    match kind {
        NodeKind::Element { tag, attrs } => {
            if !is_valid_name(tag) {
                return Err(RenderError::InvalidName {
                    tag: tag.clone(),
                    what: "tag",
                });
            }
            out.push('<');
            out.push_str(tag);
            for (name, value) in attrs {
                if !is_valid_name(name) {
                    return Err(RenderError::InvalidName {
                        tag: tag.clone(),
                        what: "attribute",
                    });
                }
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                push_escaped(out, value);
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str()) {
                return Ok(());
            }
            for child in tree.children(id) {
                write_node(tree, child, out)?;
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        NodeKind::Text(text) => push_escaped(out, text),
        NodeKind::Fragment => {
            for child in tree.children(id) {
                write_node(tree, child, out)?;
            }
        }
        NodeKind::Marker(marker) => {
            out.push_str("<!--");
            out.push_str(marker.label());
            out.push_str("-->");
        }
    }
    Ok(())
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}

fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}
