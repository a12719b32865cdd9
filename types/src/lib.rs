//! Core domain types for strand.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer: the fragment tree, the resolver, the
//! renderers, and the wire codec all speak in these types.

#![allow(clippy::missing_errors_doc)]

mod chunk;
mod ids;
mod load;

pub use chunk::{Chunk, PrefetchPayload};
pub use ids::{BoundaryId, BoundaryIdError, NodeId};
pub use load::{LoadError, LoadState};

// ============================================================================
// Marker wire format
// ============================================================================

/// Comment text opening the content of one fragment.
pub const FRAGMENT_START: &str = "fragment-start";

/// Comment text closing the content of one fragment.
pub const FRAGMENT_END: &str = "fragment-end";

/// Which side of a fragment a marker node sits on.
///
/// Markers are always paired and carry no payload; data travels out-of-band
/// as [`Chunk`]s or a [`PrefetchPayload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    Start,
    End,
}

impl MarkerKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Start => FRAGMENT_START,
            Self::End => FRAGMENT_END,
        }
    }
}
