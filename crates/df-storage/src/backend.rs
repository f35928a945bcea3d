//! Storage backend abstraction
//!
//! The entity store only needs whole entities retrievable by id, plus two
//! secondary lookups: entities by major kind, and edges pointing at an
//! entity. Each backend writes an entity and its index entries atomically.

use df_core::{Entity, EntityId, Relationship, Result};
use serde::{Deserialize, Serialize};

/// A relationship seen from its target: `source` holds `relationship`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingEdge {
    pub source: EntityId,
    pub relationship: Relationship,
}

/// Durable or in-memory home of entities
pub trait EntityBackend: Send + Sync {
    /// Store an entity, replacing `previous` and its index entries
    fn put_entity(&self, entity: &Entity, previous: Option<&Entity>) -> Result<()>;

    fn get_entity(&self, id: &str) -> Result<Option<Entity>>;

    /// Remove an entity together with the index entries it owns
    fn delete_entity(&self, entity: &Entity) -> Result<()>;

    /// Every stored entity, ordered by id
    fn scan_entities(&self) -> Result<Vec<Entity>>;

    /// Entities whose kind has the given major, ordered by id
    fn entities_by_kind(&self, major: &str) -> Result<Vec<Entity>>;

    /// Edges held by other entities that point at `target`
    fn incoming_relationships(&self, target: &str) -> Result<Vec<IncomingEdge>>;

    fn flush(&self) -> Result<()>;

    /// Short name used in logs and health reports
    fn name(&self) -> &'static str;
}
