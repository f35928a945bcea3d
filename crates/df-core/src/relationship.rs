//! Directed, time-ranged relationships held by an entity
//!
//! Each entity owns an adjacency list of edges keyed by relationship id.
//! Edges reference their target by [`EntityId`], never by pointer, so the
//! list serializes as plain data.

use crate::error::{Error, Result};
use crate::id::{EntityId, check_key_component};
use crate::temporal::TimeRange;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A directed, named edge from the owning entity to `related_entity_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub name: String,
    pub related_entity_id: EntityId,
    pub range: TimeRange,
}

impl Relationship {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        related_entity_id: impl Into<EntityId>,
        range: TimeRange,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            related_entity_id: related_entity_id.into(),
            range,
        }
    }

    /// Check if the relationship is active at an instant
    pub fn is_active_at(&self, instant: DateTime<Utc>) -> bool {
        self.range.contains(instant)
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::ValidationError(
                "relationship id must not be empty".to_string(),
            ));
        }
        check_key_component("relationship id", &self.id)?;
        check_key_component("related entity id", self.related_entity_id.as_str())?;
        if self.related_entity_id.is_empty() {
            return Err(Error::ValidationError(format!(
                "relationship {} has no related entity",
                self.id
            )));
        }
        self.range.validate()
    }
}

/// Filter for relationship enumeration
///
/// Only fields that are set constrain the result; set fields are ANDed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipFilter {
    pub related_entity_id: Option<EntityId>,
    /// Inclusive lower bound on the relationship's start
    pub start_time: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the relationship's end; open-ended
    /// relationships never satisfy it
    pub end_time: Option<DateTime<Utc>>,
    pub id: Option<String>,
    pub name: Option<String>,
}

impl RelationshipFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_related_entity(mut self, id: impl Into<EntityId>) -> Self {
        self.related_entity_id = Some(id.into());
        self
    }

    pub fn starting_from(mut self, start: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self
    }

    pub fn ending_by(mut self, end: DateTime<Utc>) -> Self {
        self.end_time = Some(end);
        self
    }

    /// Returns true if no field constrains the result
    pub fn is_empty(&self) -> bool {
        self.related_entity_id.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.id.is_none()
            && self.name.is_none()
    }

    pub fn matches(&self, rel: &Relationship) -> bool {
        if let Some(ref related) = self.related_entity_id {
            if &rel.related_entity_id != related {
                return false;
            }
        }
        if let Some(ref id) = self.id {
            if &rel.id != id {
                return false;
            }
        }
        if let Some(ref name) = self.name {
            if &rel.name != name {
                return false;
            }
        }
        if let Some(start) = self.start_time {
            if rel.range.start() < start {
                return false;
            }
        }
        if let Some(end) = self.end_time {
            match rel.range.end() {
                Some(rel_end) if rel_end <= end => {}
                _ => return false,
            }
        }
        true
    }
}

/// Ordered adjacency list of an entity's outgoing relationships
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipIndex {
    edges: Vec<Relationship>,
}

impl RelationshipIndex {
    pub fn new() -> Self {
        Self { edges: Vec::new() }
    }

    /// Insert a relationship, replacing one with the same id in place
    pub fn upsert(&mut self, rel: Relationship) -> Option<Relationship> {
        match self.edges.iter_mut().find(|existing| existing.id == rel.id) {
            Some(existing) => Some(std::mem::replace(existing, rel)),
            None => {
                self.edges.push(rel);
                None
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.edges.iter().find(|rel| rel.id == id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Relationship> {
        let idx = self.edges.iter().position(|rel| rel.id == id)?;
        Some(self.edges.remove(idx))
    }

    /// All relationships in insertion order
    pub fn all(&self) -> &[Relationship] {
        &self.edges
    }

    /// Relationships matching the filter, in insertion order
    pub fn filter(&self, filter: &RelationshipFilter) -> Vec<&Relationship> {
        self.edges.iter().filter(|rel| filter.matches(rel)).collect()
    }

    /// Relationships active at an instant, optionally restricted to a name
    pub fn active_at(&self, name: Option<&str>, instant: DateTime<Utc>) -> Vec<&Relationship> {
        self.edges
            .iter()
            .filter(|rel| name.map_or(true, |n| rel.name == n))
            .filter(|rel| rel.is_active_at(instant))
            .collect()
    }

    /// Distinct targets of all relationships
    pub fn related_entity_ids(&self) -> Vec<&EntityId> {
        let mut ids: Vec<&EntityId> = Vec::new();
        for rel in &self.edges {
            if !ids.contains(&&rel.related_entity_id) {
                ids.push(&rel.related_entity_id);
            }
        }
        ids
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.edges.iter()
    }
}

impl FromIterator<Relationship> for RelationshipIndex {
    fn from_iter<I: IntoIterator<Item = Relationship>>(iter: I) -> Self {
        let mut index = Self::new();
        for rel in iter {
            index.upsert(rel);
        }
        index
    }
}
