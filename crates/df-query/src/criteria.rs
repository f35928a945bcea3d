//! Search criteria

use chrono::{DateTime, Utc};
use df_core::Entity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inclusive bounds on an instant; a missing side is unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBounds {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeBounds {
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| from <= instant) && self.to.map_or(true, |to| instant <= to)
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

/// Filter for entity search; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub id: Option<String>,
    pub kind_major: Option<String>,
    pub kind_minor: Option<String>,
    pub created: Option<TimeBounds>,
    /// Only terminated entities can match
    pub terminated: Option<TimeBounds>,
    /// Attribute key to the decoded value that must be active
    pub attribute_equals: BTreeMap<String, String>,
}

impl SearchCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn kind_major(mut self, major: impl Into<String>) -> Self {
        self.kind_major = Some(major.into());
        self
    }

    pub fn kind_minor(mut self, minor: impl Into<String>) -> Self {
        self.kind_minor = Some(minor.into());
        self
    }

    pub fn created(mut self, bounds: TimeBounds) -> Self {
        self.created = Some(bounds);
        self
    }

    pub fn terminated(mut self, bounds: TimeBounds) -> Self {
        self.terminated = Some(bounds);
        self
    }

    pub fn attribute_equals(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attribute_equals.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Check an entity against every criterion, reading attributes at `now`
    pub fn matches(&self, entity: &Entity, now: DateTime<Utc>) -> bool {
        if let Some(ref id) = self.id {
            if entity.id.as_str() != id {
                return false;
            }
        }
        if let Some(ref major) = self.kind_major {
            if &entity.kind.major != major {
                return false;
            }
        }
        if let Some(ref minor) = self.kind_minor {
            if &entity.kind.minor != minor {
                return false;
            }
        }
        if let Some(bounds) = self.created {
            if !bounds.contains(entity.created) {
                return false;
            }
        }
        if let Some(bounds) = self.terminated {
            match entity.terminated {
                Some(terminated) if bounds.contains(terminated) => {}
                _ => return false,
            }
        }

        self.attribute_equals.iter().all(|(key, expected)| {
            entity
                .attribute(key)
                .and_then(|timeline| timeline.at(now))
                .and_then(|value| value.decode_string().ok())
                .is_some_and(|actual| &actual == expected)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use df_core::{AnyValue, Kind, TimeRange};

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn person() -> Entity {
        Entity::new("p1", Kind::new("Person", "Citizen"), ts(2024, 3, 1)).with_attribute(
            "city",
            TimeRange::starting(ts(2024, 3, 1)),
            AnyValue::string("Colombo").unwrap(),
        )
    }

    #[test]
    fn test_empty_criteria_match_everything() {
        let criteria = SearchCriteria::new();
        assert!(criteria.is_empty());
        assert!(criteria.matches(&person(), ts(2024, 6, 1)));
    }

    #[test]
    fn test_kind_is_exact() {
        let now = ts(2024, 6, 1);
        assert!(SearchCriteria::new().kind_major("Person").matches(&person(), now));
        assert!(!SearchCriteria::new().kind_major("Pers").matches(&person(), now));
        assert!(!SearchCriteria::new().kind_minor("Resident").matches(&person(), now));
    }

    #[test]
    fn test_created_bounds_are_inclusive() {
        let now = ts(2024, 6, 1);
        let exact = TimeBounds::new(Some(ts(2024, 3, 1)), Some(ts(2024, 3, 1)));
        assert!(SearchCriteria::new().created(exact).matches(&person(), now));

        let later = TimeBounds::new(Some(ts(2024, 4, 1)), None);
        assert!(!SearchCriteria::new().created(later).matches(&person(), now));
    }

    #[test]
    fn test_terminated_bounds_skip_alive_entities() {
        let now = ts(2024, 6, 1);
        let any = TimeBounds::default();
        assert!(any.is_unbounded());
        assert!(!SearchCriteria::new().terminated(any).matches(&person(), now));

        let mut ended = person();
        ended.terminated = Some(ts(2024, 5, 1));
        assert!(SearchCriteria::new().terminated(any).matches(&ended, now));
    }

    #[test]
    fn test_attribute_equals_uses_active_value() {
        let criteria = SearchCriteria::new().attribute_equals("city", "Colombo");
        assert!(criteria.matches(&person(), ts(2024, 6, 1)));
        assert!(!criteria.matches(&person(), ts(2024, 1, 1)));
        assert!(!SearchCriteria::new()
            .attribute_equals("country", "LK")
            .matches(&person(), ts(2024, 6, 1)));
    }
}
