//! Boundary metadata attached to fragments through the tree's side-tables.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use futures_util::future::LocalBoxFuture;
use serde_json::Value;

use strand_types::{BoundaryId, LoadError};

use crate::view::{ErrorFallback, View};

/// Future returned by [`AsyncBoundary::resolve`].
pub type ResolveFuture = LocalBoxFuture<'static, Result<Value, LoadError>>;

/// Async data boundary contract consumed by the tree and the resolver.
///
/// Implementations own their reactive state. Settling `resolve()` must leave
/// the boundary in a state where [`AsyncBoundary::view`] reflects the outcome,
/// so the tree can swap the fragment's content right after the await.
pub trait AsyncBoundary {
    fn id(&self) -> &BoundaryId;

    /// Start the fetch, or join the one already started.
    ///
    /// The first call fetches (or uses data that is already present); every
    /// later call observes the same outcome without fetching again.
    fn resolve(self: Rc<Self>) -> ResolveFuture;

    fn data(&self) -> Option<Value>;

    fn set_data(&self, value: Value);

    /// Whether data is available without fetching.
    fn is_resolved(&self) -> bool;

    /// Whether the boundary has left its pending state, successfully or not.
    ///
    /// Traversal only descends into settled boundaries.
    fn is_settled(&self) -> bool {
        self.is_resolved()
    }

    /// Content for the boundary's current state.
    fn view(&self) -> View;
}

/// Error boundary metadata.
///
/// Holds the content it wraps and the fallback shown once a descendant
/// boundary fails. Only the first error is kept.
pub struct ErrorBoundary {
    content: View,
    fallback: ErrorFallback,
    error: RefCell<Option<LoadError>>,
}

impl ErrorBoundary {
    #[must_use]
    pub fn new(content: View, fallback: ErrorFallback) -> Self {
        Self {
            content,
            fallback,
            error: RefCell::new(None),
        }
    }

    /// Record a failure. Returns `false` when an earlier error already owns
    /// this boundary.
    pub fn set_error(&self, err: LoadError) -> bool {
        let mut slot = self.error.borrow_mut();
        if slot.is_some() {
            return false;
        }
        *slot = Some(err);
        true
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error.borrow().is_some()
    }

    #[must_use]
    pub fn error(&self) -> Option<LoadError> {
        self.error.borrow().clone()
    }

    /// Content for the current state: the wrapped children, or the fallback.
    #[must_use]
    pub fn view(&self) -> View {
        match self.error.borrow().as_ref() {
            Some(err) => (self.fallback)(err),
            None => self.content.clone(),
        }
    }
}

impl fmt::Debug for ErrorBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorBoundary")
            .field("error", &self.error.borrow())
            .finish_non_exhaustive()
    }
}
