use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::BoundaryId;

/// One streamed unit: the resolved payload of a single boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: BoundaryId,
    pub data: Value,
}

impl Chunk {
    #[must_use]
    pub fn new(id: BoundaryId, data: Value) -> Self {
        Self { id, data }
    }
}

/// Flat mapping from boundary id to resolved value.
///
/// This is both the prefetch endpoint's response body and the shape of
/// pre-seeded data. Keys are ordered so the serialized form is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrefetchPayload(BTreeMap<String, Value>);

impl PrefetchPayload {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: &BoundaryId, value: Value) -> Option<Value> {
        self.0.insert(id.as_str().to_owned(), value)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Value> {
        self.0.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    #[must_use]
    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

impl From<BTreeMap<String, Value>> for PrefetchPayload {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<Chunk> for PrefetchPayload {
    fn from_iter<I: IntoIterator<Item = Chunk>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|chunk| (chunk.id.into_inner(), chunk.data))
                .collect(),
        )
    }
}

impl IntoIterator for PrefetchPayload {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
