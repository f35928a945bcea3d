//! Field-level partial updates
//!
//! An [`EntityPatch`] distinguishes "leave untouched" from "set" for every
//! scalar field, including clearing an entity's termination. Collection
//! fields are merged: an empty collection changes nothing.

use crate::any_value::AnyValue;
use crate::error::{Error, Result};
use crate::id::check_key_component;
use crate::metadata::Metadata;
use crate::relationship::Relationship;
use crate::temporal::{TimeRange, VersionedValue};
use crate::types::{Entity, Kind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Update instruction for a single field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum FieldUpdate<T> {
    #[default]
    Keep,
    Set(T),
}

impl<T> FieldUpdate<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, FieldUpdate::Keep)
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            FieldUpdate::Keep => None,
            FieldUpdate::Set(value) => Some(value),
        }
    }

    /// Overwrite `target` if this is a `Set`
    pub fn apply_to(self, target: &mut T) {
        if let FieldUpdate::Set(value) = self {
            *target = value;
        }
    }
}

impl<T> From<Option<T>> for FieldUpdate<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => FieldUpdate::Set(value),
            None => FieldUpdate::Keep,
        }
    }
}

/// A partial update of an entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityPatch {
    pub kind: FieldUpdate<Kind>,
    pub created: FieldUpdate<DateTime<Utc>>,
    /// `Set(None)` clears the termination
    pub terminated: FieldUpdate<Option<DateTime<Utc>>>,
    /// Appended to the name timeline
    pub name: FieldUpdate<VersionedValue<AnyValue>>,
    /// Upserted key by key
    pub metadata: Metadata,
    /// Appended to the per-key attribute timelines
    pub attributes: Vec<(String, VersionedValue<AnyValue>)>,
    /// Upserted by relationship id
    pub relationships: Vec<Relationship>,
}

impl EntityPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: Kind) -> Self {
        self.kind = FieldUpdate::Set(kind);
        self
    }

    pub fn created(mut self, created: DateTime<Utc>) -> Self {
        self.created = FieldUpdate::Set(created);
        self
    }

    pub fn terminated(mut self, terminated: Option<DateTime<Utc>>) -> Self {
        self.terminated = FieldUpdate::Set(terminated);
        self
    }

    pub fn name(mut self, range: TimeRange, name: AnyValue) -> Self {
        self.name = FieldUpdate::Set(VersionedValue::new(range, name));
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: AnyValue) -> Self {
        self.metadata.upsert(key, value);
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, range: TimeRange, value: AnyValue) -> Self {
        self.attributes
            .push((key.into(), VersionedValue::new(range, value)));
        self
    }

    pub fn relationship(mut self, rel: Relationship) -> Self {
        self.relationships.push(rel);
        self
    }

    /// Returns true if applying the patch would change nothing
    pub fn is_empty(&self) -> bool {
        self.kind.is_keep()
            && self.created.is_keep()
            && self.terminated.is_keep()
            && self.name.is_keep()
            && self.metadata.is_empty()
            && self.attributes.is_empty()
            && self.relationships.is_empty()
    }

    /// Check the patch against the entity it will be applied to
    pub fn validate_against(&self, entity: &Entity) -> Result<()> {
        if let Some(kind) = self.kind.as_set() {
            check_key_component("kind", &kind.major)?;
        }
        if let Some(name) = self.name.as_set() {
            name.range.validate()?;
        }
        for (key, version) in &self.attributes {
            if key.is_empty() {
                return Err(Error::ValidationError(
                    "attribute key must not be empty".to_string(),
                ));
            }
            version.range.validate()?;
        }
        for rel in &self.relationships {
            rel.validate()?;
        }

        let created = self.created.as_set().copied().unwrap_or(entity.created);
        let terminated = match &self.terminated {
            FieldUpdate::Set(terminated) => *terminated,
            FieldUpdate::Keep => entity.terminated,
        };
        if let Some(terminated) = terminated {
            if terminated < created {
                return Err(Error::ValidationError(format!(
                    "entity {} would be terminated before it was created",
                    entity.id
                )));
            }
        }
        Ok(())
    }
}

impl Entity {
    /// Merge a patch into this entity
    ///
    /// The patch is validated in full before any field changes, so a
    /// rejected patch leaves the entity untouched.
    pub fn apply(&mut self, patch: EntityPatch) -> Result<()> {
        patch.validate_against(self)?;

        patch.kind.apply_to(&mut self.kind);
        patch.created.apply_to(&mut self.created);
        patch.terminated.apply_to(&mut self.terminated);

        if let FieldUpdate::Set(name) = patch.name {
            self.name.append(name.range, name.value);
        }

        self.metadata.merge(patch.metadata);

        for (key, version) in patch.attributes {
            self.append_attribute(key, version.range, version.value);
        }

        for rel in patch.relationships {
            self.relationships.upsert(rel);
        }

        Ok(())
    }
}
