use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::BoundaryId;

/// Failure of one boundary's fetch.
///
/// Clonable so a single settled fetch can be observed by every caller that
/// shares it, and so the error state can be handed to view functions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("boundary '{id}' failed: {message}")]
pub struct LoadError {
    id: BoundaryId,
    message: String,
}

impl LoadError {
    #[must_use]
    pub fn new(id: BoundaryId, cause: impl fmt::Display) -> Self {
        Self {
            id,
            message: cause.to_string(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &BoundaryId {
        &self.id
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Observable state of an async boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LoadState {
    #[default]
    Pending,
    Ready(Value),
    Failed(LoadError),
}

impl LoadState {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Pending | Self::Failed(_) => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&LoadError> {
        match self {
            Self::Failed(err) => Some(err),
            Self::Pending | Self::Ready(_) => None,
        }
    }
}
