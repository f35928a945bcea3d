//! In-memory entity storage
//!
//! Entities live in a sharded concurrent map, so writers to different ids
//! never contend on a shared lock. Secondary lookups are answered by
//! scanning, which keeps them consistent with the entity records for free.

use crate::backend::{EntityBackend, IncomingEdge};
use dashmap::DashMap;
use df_core::{Entity, Result};
use std::sync::Arc;
use tracing::debug;

/// Ephemeral backend for tests and throwaway deployments
#[derive(Clone, Default)]
pub struct MemoryStorage {
    entities: Arc<DashMap<String, Entity>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn collect_sorted<F>(&self, keep: F) -> Vec<Entity>
    where
        F: Fn(&Entity) -> bool,
    {
        let mut entities: Vec<Entity> = self
            .entities
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        entities.sort_by(|a, b| a.id.cmp(&b.id));
        entities
    }
}

impl EntityBackend for MemoryStorage {
    fn put_entity(&self, entity: &Entity, _previous: Option<&Entity>) -> Result<()> {
        self.entities
            .insert(entity.id.as_str().to_string(), entity.clone());
        debug!("Stored entity {} in memory", entity.id);
        Ok(())
    }

    fn get_entity(&self, id: &str) -> Result<Option<Entity>> {
        Ok(self.entities.get(id).map(|entry| entry.value().clone()))
    }

    fn delete_entity(&self, entity: &Entity) -> Result<()> {
        self.entities.remove(entity.id.as_str());
        debug!("Deleted entity {} from memory", entity.id);
        Ok(())
    }

    fn scan_entities(&self) -> Result<Vec<Entity>> {
        Ok(self.collect_sorted(|_| true))
    }

    fn entities_by_kind(&self, major: &str) -> Result<Vec<Entity>> {
        Ok(self.collect_sorted(|entity| entity.kind.major == major))
    }

    fn incoming_relationships(&self, target: &str) -> Result<Vec<IncomingEdge>> {
        let mut edges: Vec<IncomingEdge> = Vec::new();
        for entry in self.entities.iter() {
            let source = entry.value();
            for rel in source.relationships.iter() {
                if rel.related_entity_id.as_str() == target {
                    edges.push(IncomingEdge {
                        source: source.id.clone(),
                        relationship: rel.clone(),
                    });
                }
            }
        }
        edges.sort_by(|a, b| {
            a.source
                .cmp(&b.source)
                .then_with(|| a.relationship.id.cmp(&b.relationship.id))
        });
        Ok(edges)
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
