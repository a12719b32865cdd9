use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Handle to a node slot in a fragment tree arena.
///
/// Handles are only meaningful for the tree that issued them. Fragment identity
/// (for the resolver's processed set and the boundary side-tables) is the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("boundary id must not be empty")]
pub struct BoundaryIdError;

/// Stable identifier of an async boundary, shared by server and client.
///
/// Uniqueness within a render is the caller's responsibility.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BoundaryId(String);

impl BoundaryId {
    pub fn new(value: impl Into<String>) -> Result<Self, BoundaryIdError> {
        let value = value.into();
        if value.trim().is_empty() {
            Err(BoundaryIdError)
        } else {
            Ok(Self(value))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for BoundaryId {
    type Error = BoundaryIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for BoundaryId {
    type Error = BoundaryIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BoundaryId> for String {
    fn from(value: BoundaryId) -> Self {
        value.0
    }
}

impl AsRef<str> for BoundaryId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BoundaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
