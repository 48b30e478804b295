//! Item identity and ordered feed snapshots.

use crate::error::FeedError;
use crate::result::FeedResult;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Opaque, globally unique identifier of a feed item (a video event id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Immutable snapshot of the feed's ordering as reported by an item source.
///
/// Cloning is cheap: snapshots share their backing storage. Ids are unique
/// within one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    items: Arc<[ItemId]>,
}

impl Sequence {
    /// Build a snapshot, rejecting duplicate ids.
    pub fn new(items: Vec<ItemId>) -> FeedResult<Self> {
        let mut seen = HashSet::with_capacity(items.len());
        for id in &items {
            if !seen.insert(id) {
                return Err(FeedError::DuplicateItem(id.clone()));
            }
        }
        Ok(Self {
            items: items.into(),
        })
    }

    /// Convenience constructor from anything string-like.
    pub fn from_ids<I, S>(ids: I) -> FeedResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<ItemId>,
    {
        Self::new(ids.into_iter().map(Into::into).collect())
    }

    pub fn empty() -> Self {
        Self {
            items: Arc::from(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ItemId> {
        self.items.get(index)
    }

    /// Index of `id` in this snapshot (linear scan).
    pub fn position(&self, id: &ItemId) -> Option<usize> {
        self.items.iter().position(|item| item == id)
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.position(id).is_some()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.items.len().checked_sub(1)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ItemId> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[ItemId] {
        &self.items
    }

    pub fn to_vec(&self) -> Vec<ItemId> {
        self.items.to_vec()
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::empty()
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a ItemId;
    type IntoIter = std::slice::Iter<'a, ItemId>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
