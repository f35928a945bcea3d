//! Query engine
//!
//! Read-side operations over the entity store. Every lookup loads the
//! entity once and answers from that snapshot, so a concurrent update is
//! observed either entirely or not at all.

use crate::criteria::SearchCriteria;
use chrono::{DateTime, Utc};
use df_core::{Entity, EntityId, Error, Relationship, RelationshipFilter, Result, TimeRange, ValueType};
use df_graph::EntityStore;
use df_storage::IncomingEdge;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Decoded attribute value active at some instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub key: String,
    pub value: String,
    pub value_type: ValueType,
    pub range: TimeRange,
}

/// Read-only façade over an [`EntityStore`]
#[derive(Clone)]
pub struct QueryEngine {
    store: EntityStore,
}

impl QueryEngine {
    pub fn new(store: EntityStore) -> Self {
        Self { store }
    }

    /// Decoded metadata of an entity
    pub fn metadata(&self, id: &str) -> Result<BTreeMap<String, String>> {
        let entity = self.store.read(id)?;
        entity
            .metadata
            .iter()
            .map(|(key, value)| Ok((key.to_string(), value.decode_string()?)))
            .collect()
    }

    /// Decoded value of an attribute active now
    pub fn attribute(&self, id: &str, key: &str) -> Result<String> {
        self.attribute_at(id, key, Utc::now())
    }

    /// Decoded value of an attribute active at `instant`
    ///
    /// An attribute whose versions have all elapsed is reported exactly like
    /// one that was never set.
    pub fn attribute_at(&self, id: &str, key: &str, instant: DateTime<Utc>) -> Result<String> {
        self.attribute_value(id, key, instant).map(|attr| attr.value)
    }

    /// Active attribute version at `instant` with its inferred type
    pub fn attribute_value(
        &self,
        id: &str,
        key: &str,
        instant: DateTime<Utc>,
    ) -> Result<AttributeValue> {
        let entity = self.store.read(id)?;
        let version = entity
            .attribute(key)
            .and_then(|timeline| timeline.version_at(instant))
            .ok_or_else(|| Error::AttributeNotFound(format!("{}/{}", id, key)))?;

        let value = version.value.decode_string()?;
        Ok(AttributeValue {
            key: key.to_string(),
            value_type: ValueType::infer(&value),
            value,
            range: version.range,
        })
    }

    /// Decoded name of an entity at `instant`
    pub fn name_at(&self, id: &str, instant: DateTime<Utc>) -> Result<String> {
        let entity = self.store.read(id)?;
        entity
            .name
            .at(instant)
            .ok_or_else(|| Error::AttributeNotFound(format!("{}/name", id)))?
            .decode_string()
    }

    /// Relationships matching `filter`, in insertion order
    pub fn relations(&self, id: &str, filter: &RelationshipFilter) -> Result<Vec<Relationship>> {
        let entity = self.store.read(id)?;
        Ok(entity
            .relationships
            .filter(filter)
            .into_iter()
            .cloned()
            .collect())
    }

    /// A single relationship held by an entity
    pub fn relationship(&self, id: &str, rel_id: &str) -> Result<Relationship> {
        let entity = self.store.read(id)?;
        entity
            .relationships
            .get(rel_id)
            .cloned()
            .ok_or_else(|| Error::RelationshipNotFound(format!("{}/{}", id, rel_id)))
    }

    /// Every relationship held by an entity, in insertion order
    pub fn all_relations(&self, id: &str) -> Result<Vec<Relationship>> {
        let entity = self.store.read(id)?;
        Ok(entity.relationships.all().to_vec())
    }

    /// Relationships held by other entities that point at `id`
    pub fn incoming_relations(&self, id: &str) -> Result<Vec<IncomingEdge>> {
        if !self.store.exists(id)? {
            return Err(Error::EntityNotFound(id.to_string()));
        }
        self.store.incoming(id)
    }

    /// Targets of relationships named `name` that are active at `instant`
    pub fn related_entity_ids(
        &self,
        id: &str,
        name: &str,
        instant: DateTime<Utc>,
    ) -> Result<Vec<EntityId>> {
        let entity = self.store.read(id)?;
        let mut ids: Vec<EntityId> = Vec::new();
        for rel in entity.relationships.active_at(Some(name), instant) {
            if !ids.contains(&rel.related_entity_id) {
                ids.push(rel.related_entity_id.clone());
            }
        }
        Ok(ids)
    }

    /// Entities matching every criterion, ordered by id
    pub fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Entity>> {
        let now = Utc::now();

        let candidates = if let Some(ref id) = criteria.id {
            match self.store.read(id) {
                Ok(entity) => vec![entity],
                Err(e) if e.is_not_found() => Vec::new(),
                Err(e) => return Err(e),
            }
        } else if let Some(ref major) = criteria.kind_major {
            self.store.by_kind(major)?
        } else {
            self.store.scan()?
        };

        let scanned = candidates.len();
        let results: Vec<_> = candidates
            .into_iter()
            .filter(|entity| criteria.matches(entity, now))
            .collect();

        debug!("Search matched {} of {} candidates", results.len(), scanned);
        Ok(results)
    }
}
