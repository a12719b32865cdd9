//! Inert view descriptions.
//!
//! A [`View`] is not part of any tree until [`crate::Tree::materialize`] turns
//! it into live nodes. Cloning a view is cheap: boundaries and closures are
//! reference counted, so materializing the same `View::Load` twice attaches
//! the same boundary instance (and therefore never fetches twice).

use std::fmt;
use std::rc::Rc;

use strand_types::LoadError;

use crate::boundary::AsyncBoundary;

/// Builds the content an error boundary shows after a descendant failed.
pub type ErrorFallback = Rc<dyn Fn(&LoadError) -> View>;

#[derive(Clone)]
pub enum View {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<View>,
    },
    Text(String),
    Fragment(Vec<View>),
    /// Async boundary. Materializes to a fragment holding the boundary's
    /// content for its current state.
    Load(Rc<dyn AsyncBoundary>),
    /// Error boundary around `children`.
    ErrorBoundary {
        fallback: ErrorFallback,
        children: Vec<View>,
    },
    /// Produced lazily at materialization time.
    Deferred(Rc<dyn Fn() -> View>),
}

impl View {
    #[must_use]
    pub fn element(tag: impl Into<String>, children: Vec<View>) -> Self {
        Self::Element {
            tag: tag.into(),
            attrs: Vec::new(),
            children,
        }
    }

    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    #[must_use]
    pub fn fragment(children: Vec<View>) -> Self {
        Self::Fragment(children)
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::Fragment(Vec::new())
    }

    #[must_use]
    pub fn load(boundary: Rc<dyn AsyncBoundary>) -> Self {
        Self::Load(boundary)
    }

    #[must_use]
    pub fn error_boundary(
        fallback: impl Fn(&LoadError) -> View + 'static,
        children: Vec<View>,
    ) -> Self {
        Self::ErrorBoundary {
            fallback: Rc::new(fallback),
            children,
        }
    }

    #[must_use]
    pub fn deferred(build: impl Fn() -> View + 'static) -> Self {
        Self::Deferred(Rc::new(build))
    }

    /// Add an attribute. Only elements carry attributes; other views are
    /// returned unchanged.
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Self::Element { attrs, .. } = &mut self {
            attrs.push((name.into(), value.into()));
        }
        self
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element {
                tag,
                attrs,
                children,
            } => f
                .debug_struct("Element")
                .field("tag", tag)
                .field("attrs", attrs)
                .field("children", children)
                .finish(),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Fragment(children) => f.debug_tuple("Fragment").field(children).finish(),
            Self::Load(boundary) => f.debug_tuple("Load").field(boundary.id()).finish(),
            Self::ErrorBoundary { children, .. } => f
                .debug_struct("ErrorBoundary")
                .field("children", children)
                .finish_non_exhaustive(),
            Self::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

impl From<&str> for View {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for View {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}
