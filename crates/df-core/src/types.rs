//! Core data types for DataFoundation
//!
//! An [`Entity`] is the addressable aggregate: identity, kind, lifecycle,
//! a versioned name, metadata, time-ranged attributes and outgoing
//! relationships.

use crate::any_value::AnyValue;
use crate::error::{Error, Result};
use crate::id::{EntityId, check_key_component};
use crate::metadata::Metadata;
use crate::relationship::RelationshipIndex;
use crate::temporal::{TimeRange, Timeline};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Two-level classification of an entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Kind {
    pub major: String,
    pub minor: String,
}

impl Kind {
    pub fn new(major: impl Into<String>, minor: impl Into<String>) -> Self {
        Self {
            major: major.into(),
            minor: minor.into(),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.minor.is_empty() {
            write!(f, "{}", self.major)
        } else {
            write!(f, "{}/{}", self.major, self.minor)
        }
    }
}

/// A temporal entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: Kind,
    pub created: DateTime<Utc>,
    /// `None` while the entity is alive
    pub terminated: Option<DateTime<Utc>>,
    pub name: Timeline<AnyValue>,
    pub metadata: Metadata,
    pub attributes: BTreeMap<String, Timeline<AnyValue>>,
    pub relationships: RelationshipIndex,
}

impl Entity {
    /// Create an entity with empty name, metadata, attributes and relationships
    pub fn new(id: impl Into<EntityId>, kind: Kind, created: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            kind,
            created,
            terminated: None,
            name: Timeline::new(),
            metadata: Metadata::new(),
            attributes: BTreeMap::new(),
            relationships: RelationshipIndex::new(),
        }
    }

    /// Builder: append a name version
    pub fn with_name(mut self, range: TimeRange, name: AnyValue) -> Self {
        self.name.append(range, name);
        self
    }

    /// Builder: set a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: AnyValue) -> Self {
        self.metadata.upsert(key, value);
        self
    }

    /// Builder: append an attribute version
    pub fn with_attribute(mut self, key: impl Into<String>, range: TimeRange, value: AnyValue) -> Self {
        self.append_attribute(key, range, value);
        self
    }

    /// Builder: add a relationship
    pub fn with_relationship(mut self, rel: crate::relationship::Relationship) -> Self {
        self.relationships.upsert(rel);
        self
    }

    /// Append a version to an attribute timeline, creating it if missing
    pub fn append_attribute(&mut self, key: impl Into<String>, range: TimeRange, value: AnyValue) {
        self.attributes
            .entry(key.into())
            .or_default()
            .append(range, value);
    }

    pub fn attribute(&self, key: &str) -> Option<&Timeline<AnyValue>> {
        self.attributes.get(key)
    }

    /// Returns true if the entity has not been terminated
    pub fn is_alive(&self) -> bool {
        self.terminated.is_none()
    }

    /// Check the entity's structural invariants
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::ValidationError("entity id must not be empty".to_string()));
        }
        check_key_component("entity id", self.id.as_str())?;
        check_key_component("kind", &self.kind.major)?;
        if let Some(terminated) = self.terminated {
            if terminated < self.created {
                return Err(Error::ValidationError(format!(
                    "entity {} terminated before it was created",
                    self.id
                )));
            }
        }
        for version in self.name.iter() {
            version.range.validate()?;
        }
        for timeline in self.attributes.values() {
            for version in timeline.iter() {
                version.range.validate()?;
            }
        }
        for rel in self.relationships.iter() {
            rel.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relationship::Relationship;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_entity_builder() {
        let entity = Entity::new("e1", Kind::new("Organisation", "Department"), ts(2024, 1, 1))
            .with_name(TimeRange::starting(ts(2024, 1, 1)), AnyValue::string("Finance").unwrap())
            .with_metadata("owner", AnyValue::string("team-a").unwrap())
            .with_attribute(
                "budget",
                TimeRange::starting(ts(2024, 1, 1)),
                AnyValue::string("100").unwrap(),
            )
            .with_relationship(Relationship::new(
                "r1",
                "parent",
                "e0",
                TimeRange::starting(ts(2024, 1, 1)),
            ));

        assert!(entity.is_alive());
        assert_eq!(entity.name.len(), 1);
        assert_eq!(entity.metadata.len(), 1);
        assert!(entity.attribute("budget").is_some());
        assert_eq!(entity.relationships.len(), 1);
        assert!(entity.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_termination_before_creation() {
        let mut entity = Entity::new("e1", Kind::default(), ts(2024, 2, 1));
        entity.terminated = Some(ts(2024, 1, 1));
        assert!(matches!(entity.validate(), Err(Error::ValidationError(_))));
    }

    #[test]
    fn test_validate_rejects_empty_id() {
        let entity = Entity::new("", Kind::default(), ts(2024, 1, 1));
        assert!(entity.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_key_components() {
        let long = "x".repeat(70_000);

        let entity = Entity::new(long.as_str(), Kind::new("Person", ""), ts(2024, 1, 1));
        assert!(matches!(entity.validate(), Err(Error::ValidationError(_))));

        let entity = Entity::new("e1", Kind::new(long.as_str(), ""), ts(2024, 1, 1));
        assert!(matches!(entity.validate(), Err(Error::ValidationError(_))));

        let entity = Entity::new("e1", Kind::default(), ts(2024, 1, 1)).with_relationship(
            Relationship::new("r1", "linked", long.as_str(), TimeRange::starting(ts(2024, 1, 1))),
        );
        assert!(matches!(entity.validate(), Err(Error::ValidationError(_))));

        // The longest id that fits is still accepted
        let max = "x".repeat(crate::id::MAX_KEY_COMPONENT_LEN);
        assert!(Entity::new(max.as_str(), Kind::default(), ts(2024, 1, 1)).validate().is_ok());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(Kind::new("Person", "Citizen").to_string(), "Person/Citizen");
        assert_eq!(Kind::new("Person", "").to_string(), "Person");
    }
}
