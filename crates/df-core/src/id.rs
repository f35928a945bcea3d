//! Identifier types for DataFoundation
//!
//! Entity ids are client-supplied strings; relationship ids are either
//! client-supplied or generated.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use uuid::Uuid;

/// Identifier for an entity, immutable once the entity is created
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Create from any string-like value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the id is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume and return the inner string
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Longest id, kind or relationship id that fits a storage key component
pub const MAX_KEY_COMPONENT_LEN: usize = u16::MAX as usize;

/// Reject a string too long to be stored as a key component
pub fn check_key_component(what: &str, value: &str) -> Result<()> {
    if value.len() > MAX_KEY_COMPONENT_LEN {
        return Err(Error::ValidationError(format!(
            "{} of {} bytes exceeds the {} byte limit",
            what,
            value.len(),
            MAX_KEY_COMPONENT_LEN
        )));
    }
    Ok(())
}

/// Generate a fresh relationship id for edges submitted without one
pub fn generate_relationship_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_display() {
        let id = EntityId::from("entity-1");
        assert_eq!(id.to_string(), "entity-1");
        assert_eq!(format!("{:?}", id), "EntityId(entity-1)");
        assert_eq!(id.as_str(), "entity-1");
    }

    #[test]
    fn test_entity_id_ordering() {
        let mut ids = vec![EntityId::from("b"), EntityId::from("a"), EntityId::from("c")];
        ids.sort();
        assert_eq!(ids, vec![EntityId::from("a"), EntityId::from("b"), EntityId::from("c")]);
    }

    #[test]
    fn test_key_component_limit() {
        assert!(check_key_component("entity id", &"x".repeat(MAX_KEY_COMPONENT_LEN)).is_ok());
        let err = check_key_component("entity id", &"x".repeat(70_000)).unwrap_err();
        assert!(matches!(err, Error::ValidationError(_)));
        // Bytes are counted, not chars
        assert!(check_key_component("kind", &"é".repeat(40_000)).is_err());
    }

    #[test]
    fn test_generated_relationship_ids_are_unique() {
        let a = generate_relationship_id();
        let b = generate_relationship_id();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }
}
