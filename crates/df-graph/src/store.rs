//! Entity store
//!
//! Create, read, merge-update and delete of entities over an
//! [`EntityBackend`]. Every mutation of an id runs under that id's lock, so
//! read-modify-write cycles on one entity never interleave while different
//! entities proceed in parallel.

use dashmap::DashMap;
use df_core::{Entity, EntityPatch, Error, Relationship, Result};
use df_storage::{EntityBackend, IncomingEdge};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What `create` does when the id is already taken
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Replace the stored entity wholesale
    #[default]
    Upsert,
    /// Fail with `AlreadyExists`
    Reject,
}

impl FromStr for DuplicatePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upsert" => Ok(DuplicatePolicy::Upsert),
            "reject" => Ok(DuplicatePolicy::Reject),
            other => Err(Error::Configuration(format!(
                "unknown duplicate policy: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicatePolicy::Upsert => write!(f, "upsert"),
            DuplicatePolicy::Reject => write!(f, "reject"),
        }
    }
}

/// Configuration for the entity store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    pub duplicate_policy: DuplicatePolicy,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }
}

/// Result of a successful `create`
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created(Entity),
    Replaced(Entity),
}

impl CreateOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, CreateOutcome::Created(_))
    }

    pub fn entity(&self) -> &Entity {
        match self {
            CreateOutcome::Created(e) | CreateOutcome::Replaced(e) => e,
        }
    }

    pub fn into_entity(self) -> Entity {
        match self {
            CreateOutcome::Created(e) | CreateOutcome::Replaced(e) => e,
        }
    }
}

/// The entity store
pub struct EntityStore {
    backend: Arc<dyn EntityBackend>,

    /// Per-id mutation locks, dropped once no operation holds them
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,

    config: StoreConfig,
}

impl EntityStore {
    pub fn new(backend: Arc<dyn EntityBackend>, config: StoreConfig) -> Self {
        Self {
            backend,
            locks: Arc::new(DashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    // ========== Write Operations ==========

    /// Store a new entity
    ///
    /// An id that already exists is replaced or rejected according to the
    /// configured [`DuplicatePolicy`].
    pub fn create(&self, entity: Entity) -> Result<CreateOutcome> {
        entity.validate()?;

        let id = entity.id.clone();
        self.with_lock(id.as_str(), || {
            let previous = self.backend.get_entity(entity.id.as_str())?;
            if previous.is_some() && self.config.duplicate_policy == DuplicatePolicy::Reject {
                return Err(Error::AlreadyExists(entity.id.to_string()));
            }

            self.warn_dangling(&entity, entity.relationships.iter());
            self.backend.put_entity(&entity, previous.as_ref())?;

            if previous.is_some() {
                info!("Replaced entity {}", entity.id);
                Ok(CreateOutcome::Replaced(entity))
            } else {
                info!("Created entity {}", entity.id);
                Ok(CreateOutcome::Created(entity))
            }
        })
    }

    /// Merge a patch into a stored entity and return the result
    pub fn update(&self, id: &str, patch: EntityPatch) -> Result<Entity> {
        self.with_lock(id, || {
            let previous = self.load(id)?;
            let mut entity = previous.clone();

            self.warn_dangling(&entity, patch.relationships.iter());
            entity.apply(patch)?;
            self.backend.put_entity(&entity, Some(&previous))?;

            debug!("Updated entity {}", id);
            Ok(entity)
        })
    }

    /// Delete an entity and the relationships it owns
    ///
    /// Relationships held by other entities that point at `id` are kept.
    pub fn delete(&self, id: &str) -> Result<()> {
        self.with_lock(id, || {
            let entity = self.load(id)?;
            self.backend.delete_entity(&entity)?;
            info!("Deleted entity {}", id);
            Ok(())
        })
    }

    /// Remove one relationship from an entity and return it
    ///
    /// The target's incoming edge goes with it; the target entity itself is
    /// untouched.
    pub fn delete_relationship(&self, id: &str, rel_id: &str) -> Result<Relationship> {
        self.with_lock(id, || {
            let previous = self.load(id)?;
            let mut entity = previous.clone();

            let removed = entity
                .relationships
                .remove(rel_id)
                .ok_or_else(|| Error::RelationshipNotFound(format!("{}/{}", id, rel_id)))?;
            self.backend.put_entity(&entity, Some(&previous))?;

            info!("Deleted relationship {} of entity {}", rel_id, id);
            Ok(removed)
        })
    }

    // ========== Read Operations ==========

    pub fn read(&self, id: &str) -> Result<Entity> {
        self.load(id)
    }

    pub fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.backend.get_entity(id)?.is_some())
    }

    /// Every entity, ordered by id
    pub fn scan(&self) -> Result<Vec<Entity>> {
        self.backend.scan_entities()
    }

    /// Entities of a major kind, ordered by id
    pub fn by_kind(&self, major: &str) -> Result<Vec<Entity>> {
        self.backend.entities_by_kind(major)
    }

    /// Edges held by other entities that point at `id`
    pub fn incoming(&self, id: &str) -> Result<Vec<IncomingEdge>> {
        self.backend.incoming_relationships(id)
    }

    pub fn flush(&self) -> Result<()> {
        self.backend.flush()
    }

    // ========== Private Methods ==========

    fn load(&self, id: &str) -> Result<Entity> {
        self.backend
            .get_entity(id)?
            .ok_or_else(|| Error::EntityNotFound(id.to_string()))
    }

    fn with_lock<T, F>(&self, id: &str, op: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let lock = Arc::clone(self.locks.entry(id.to_string()).or_default().value());
        let result = {
            let _guard = lock.lock();
            op()
        };
        drop(lock);

        // Only the table itself still references the lock: nobody is waiting
        self.locks
            .remove_if(id, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    fn warn_dangling<'a, I>(&self, owner: &Entity, rels: I)
    where
        I: Iterator<Item = &'a Relationship>,
    {
        for rel in rels {
            let target = rel.related_entity_id.as_str();
            if target == owner.id.as_str() {
                continue;
            }
            match self.backend.get_entity(target) {
                Ok(Some(_)) => {}
                Ok(None) => warn!(
                    "Relationship {} of entity {} points at missing entity {}",
                    rel.id, owner.id, target
                ),
                Err(e) => warn!("Could not check relationship target {}: {}", target, e),
            }
        }
    }
}

impl Clone for EntityStore {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            locks: Arc::clone(&self.locks),
            config: self.config.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use df_core::{AnyValue, Kind, TimeRange};
    use df_storage::MemoryStorage;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn s(value: &str) -> AnyValue {
        AnyValue::string(value).unwrap()
    }

    fn create_test_store(policy: DuplicatePolicy) -> EntityStore {
        EntityStore::new(
            Arc::new(MemoryStorage::new()),
            StoreConfig::new().duplicate_policy(policy),
        )
    }

    fn sample(id: &str) -> Entity {
        Entity::new(id, Kind::new("Person", "Citizen"), ts(2024, 1, 1))
            .with_name(TimeRange::starting(ts(2024, 1, 1)), s("entity-name"))
            .with_metadata("owner", s("team-a"))
            .with_metadata("version", s("1.0"))
    }

    #[test]
    fn test_create_then_read_round_trip() {
        let store = create_test_store(DuplicatePolicy::Upsert);
        let outcome = store.create(sample("e1")).unwrap();
        assert!(outcome.is_created());

        let read = store.read("e1").unwrap();
        assert_eq!(read.id.as_str(), "e1");
        assert_eq!(read.kind, Kind::new("Person", "Citizen"));
        assert_eq!(read.created, ts(2024, 1, 1));
    }

    #[test]
    fn test_duplicate_create_upserts_by_default() {
        let store = create_test_store(DuplicatePolicy::default());
        store.create(sample("e1")).unwrap();

        let replacement = sample("e1").with_metadata("version", s("2.0"));
        let outcome = store.create(replacement).unwrap();
        assert!(!outcome.is_created());
        assert_eq!(
            store.read("e1").unwrap().metadata.get("version"),
            Some(&s("2.0"))
        );
    }

    #[test]
    fn test_duplicate_create_rejected_when_configured() {
        let store = create_test_store(DuplicatePolicy::Reject);
        store.create(sample("e1")).unwrap();
        let err = store.create(sample("e1")).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[test]
    fn test_update_merges_metadata() {
        let store = create_test_store(DuplicatePolicy::Upsert);
        store.create(sample("e1")).unwrap();

        let updated = store
            .update("e1", EntityPatch::new().metadata("version", s("5.0")))
            .unwrap();
        assert_eq!(updated.metadata.get("version").unwrap().decode_string().unwrap(), "5.0");

        let read = store.read("e1").unwrap();
        assert_eq!(read.metadata.get("owner"), Some(&s("team-a")));
        assert_eq!(read.metadata.get("version"), Some(&s("5.0")));
    }

    #[test]
    fn test_update_missing_entity() {
        let store = create_test_store(DuplicatePolicy::Upsert);
        let err = store.update("ghost", EntityPatch::new()).unwrap_err();
        assert!(matches!(err, Error::EntityNotFound(_)));
    }

    #[test]
    fn test_rejected_patch_is_not_persisted() {
        let store = create_test_store(DuplicatePolicy::Upsert);
        store.create(sample("e1")).unwrap();

        let patch = EntityPatch::new()
            .metadata("version", s("9.9"))
            .terminated(Some(ts(2020, 1, 1)));
        assert!(store.update("e1", patch).is_err());
        assert_eq!(store.read("e1").unwrap().metadata.get("version"), Some(&s("1.0")));
    }

    #[test]
    fn test_delete_then_read_is_not_found() {
        let store = create_test_store(DuplicatePolicy::Upsert);
        store.create(sample("e1")).unwrap();
        store.delete("e1").unwrap();

        let err = store.read("e1").unwrap_err();
        assert!(err.is_not_found());
        assert!(!err.is_fault());

        let err = store.delete("e1").unwrap_err();
        assert!(matches!(err, Error::EntityNotFound(_)));
    }

    #[test]
    fn test_delete_keeps_edges_held_by_others() {
        let store = create_test_store(DuplicatePolicy::Upsert);
        store.create(sample("target")).unwrap();
        store
            .create(sample("source").with_relationship(Relationship::new(
                "r1",
                "linked",
                "target",
                TimeRange::starting(ts(2024, 1, 1)),
            )))
            .unwrap();

        store.delete("target").unwrap();
        assert_eq!(store.read("source").unwrap().relationships.len(), 1);
    }

    #[test]
    fn test_delete_relationship_drops_incoming_edge() {
        let store = create_test_store(DuplicatePolicy::Upsert);
        store.create(sample("target")).unwrap();
        store
            .create(
                sample("source")
                    .with_relationship(Relationship::new(
                        "r1",
                        "linked",
                        "target",
                        TimeRange::starting(ts(2024, 1, 1)),
                    ))
                    .with_relationship(Relationship::new(
                        "r2",
                        "linked",
                        "target",
                        TimeRange::starting(ts(2024, 2, 1)),
                    )),
            )
            .unwrap();

        let removed = store.delete_relationship("source", "r1").unwrap();
        assert_eq!(removed.id, "r1");

        let source = store.read("source").unwrap();
        assert!(source.relationships.get("r1").is_none());
        assert!(source.relationships.get("r2").is_some());
        let incoming: Vec<_> = store
            .incoming("target")
            .unwrap()
            .into_iter()
            .map(|edge| edge.relationship.id)
            .collect();
        assert_eq!(incoming, vec!["r2"]);
        assert!(store.exists("target").unwrap());
        assert!(store.locks.is_empty());
    }

    #[test]
    fn test_delete_missing_relationship() {
        let store = create_test_store(DuplicatePolicy::Upsert);
        store.create(sample("e1")).unwrap();

        let err = store.delete_relationship("e1", "nope").unwrap_err();
        assert!(matches!(err, Error::RelationshipNotFound(_)));
        assert!(err.is_not_found());

        let err = store.delete_relationship("ghost", "nope").unwrap_err();
        assert!(matches!(err, Error::EntityNotFound(_)));
    }

    #[test]
    fn test_dangling_relationship_is_accepted() {
        let store = create_test_store(DuplicatePolicy::Upsert);
        let entity = sample("e1").with_relationship(Relationship::new(
            "r1",
            "linked",
            "missing",
            TimeRange::starting(ts(2024, 1, 1)),
        ));
        store.create(entity).unwrap();
        assert_eq!(store.incoming("missing").unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_entity_rejected() {
        let store = create_test_store(DuplicatePolicy::Upsert);
        let mut entity = sample("e1");
        entity.terminated = Some(ts(2000, 1, 1));
        assert!(matches!(store.create(entity), Err(Error::ValidationError(_))));
        assert!(!store.exists("e1").unwrap());
    }

    #[test]
    fn test_oversized_id_never_reaches_backend() {
        let store = create_test_store(DuplicatePolicy::Upsert);
        let id = "x".repeat(70_000);

        let err = store.create(sample(&id)).unwrap_err();
        assert!(matches!(err, Error::ValidationError(_)));
        assert!(store.by_kind("Person").unwrap().is_empty());

        store.create(sample("e1")).unwrap();
        let patch = EntityPatch::new().relationship(Relationship::new(
            "r1",
            "linked",
            id.as_str(),
            TimeRange::starting(ts(2024, 1, 1)),
        ));
        assert!(matches!(store.update("e1", patch), Err(Error::ValidationError(_))));
        assert!(store.incoming(&id).unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_updates_do_not_lose_writes() {
        let store = create_test_store(DuplicatePolicy::Upsert);
        store.create(sample("e1")).unwrap();

        std::thread::scope(|scope| {
            for i in 0..8 {
                let store = store.clone();
                scope.spawn(move || {
                    for j in 0..10 {
                        let key = format!("k-{}-{}", i, j);
                        store
                            .update("e1", EntityPatch::new().metadata(key, s("v")))
                            .unwrap();
                    }
                });
            }
        });

        let entity = store.read("e1").unwrap();
        // 80 new keys plus owner and version
        assert_eq!(entity.metadata.len(), 82);
        assert!(store.locks.is_empty());
    }

    #[test]
    fn test_duplicate_policy_parse() {
        assert_eq!("Reject".parse::<DuplicatePolicy>().unwrap(), DuplicatePolicy::Reject);
        assert_eq!("upsert".parse::<DuplicatePolicy>().unwrap(), DuplicatePolicy::Upsert);
        assert!("maybe".parse::<DuplicatePolicy>().is_err());
    }
}
