//! Entity metadata
//!
//! Keys are unique and the last write wins. Iteration yields the most
//! recently written key first.

use crate::any_value::AnyValue;
use serde::{Deserialize, Serialize};

/// A single metadata key and its value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub key: String,
    pub value: AnyValue,
}

/// A collection of metadata entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    entries: Vec<MetadataEntry>,
}

impl Metadata {
    /// Create an empty metadata collection
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Create with a single entry
    pub fn with<K: Into<String>>(key: K, value: AnyValue) -> Self {
        let mut metadata = Self::new();
        metadata.upsert(key, value);
        metadata
    }

    /// Insert or replace a value, moving the key to the front
    pub fn upsert<K: Into<String>>(&mut self, key: K, value: AnyValue) -> Option<AnyValue> {
        let key = key.into();
        let previous = self
            .entries
            .iter()
            .position(|entry| entry.key == key)
            .map(|idx| self.entries.remove(idx).value);
        self.entries.insert(0, MetadataEntry { key, value });
        previous
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<&AnyValue> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.value)
    }

    /// Remove a key
    pub fn remove(&mut self, key: &str) -> Option<AnyValue> {
        let idx = self.entries.iter().position(|entry| entry.key == key)?;
        Some(self.entries.remove(idx).value)
    }

    /// Check if a key exists
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries, most recently written first
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnyValue)> {
        self.entries
            .iter()
            .map(|entry| (entry.key.as_str(), &entry.value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.key.as_str())
    }

    /// Upsert every entry of `other`, applied in its iteration order reversed
    /// so that the front of `other` ends up at the front of `self`
    pub fn merge(&mut self, other: Metadata) {
        for entry in other.entries.into_iter().rev() {
            self.upsert(entry.key, entry.value);
        }
    }
}

impl FromIterator<(String, AnyValue)> for Metadata {
    /// Later pairs win; the resulting order keeps the input order
    fn from_iter<I: IntoIterator<Item = (String, AnyValue)>>(iter: I) -> Self {
        let mut metadata = Self::new();
        for (key, value) in iter {
            if let Some(existing) = metadata.entries.iter_mut().find(|e| e.key == key) {
                existing.value = value;
            } else {
                metadata.entries.push(MetadataEntry { key, value });
            }
        }
        metadata
    }
}

impl IntoIterator for Metadata {
    type Item = MetadataEntry;
    type IntoIter = std::vec::IntoIter<MetadataEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
