//! Query service request and response bodies

use crate::entity::{EntityView, KindDto, format_range};
use df_core::{Relationship, RelationshipFilter, Result, parse_timestamp};
use df_query::{AttributeValue, SearchCriteria, TimeBounds};
use df_storage::IncomingEdge;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Relationship filter as posted to `/relations`; empty fields are unset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelationshipFilterDto {
    pub related_entity_id: String,
    pub start_time: String,
    pub end_time: String,
    pub id: String,
    pub name: String,
}

impl RelationshipFilterDto {
    pub fn into_filter(self) -> Result<RelationshipFilter> {
        let mut filter = RelationshipFilter::new();
        if !self.related_entity_id.is_empty() {
            filter = filter.with_related_entity(self.related_entity_id);
        }
        if !self.id.is_empty() {
            filter = filter.with_id(self.id);
        }
        if !self.name.is_empty() {
            filter = filter.with_name(self.name);
        }
        if let Some(start) = parse_timestamp(&self.start_time)? {
            filter = filter.starting_from(start);
        }
        if let Some(end) = parse_timestamp(&self.end_time)? {
            filter = filter.ending_by(end);
        }
        Ok(filter)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipDto {
    pub id: String,
    pub name: String,
    pub related_entity_id: String,
    pub start_time: String,
    /// Empty while the relationship is open
    pub end_time: String,
}

impl From<&Relationship> for RelationshipDto {
    fn from(rel: &Relationship) -> Self {
        let (start_time, end_time) = format_range(&rel.range);
        Self {
            id: rel.id.clone(),
            name: rel.name.clone(),
            related_entity_id: rel.related_entity_id.to_string(),
            start_time,
            end_time,
        }
    }
}

/// A relationship held by another entity that points at the queried one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingRelationshipDto {
    pub source_entity_id: String,
    #[serde(flatten)]
    pub relationship: RelationshipDto,
}

impl From<&IncomingEdge> for IncomingRelationshipDto {
    fn from(edge: &IncomingEdge) -> Self {
        Self {
            source_entity_id: edge.source.to_string(),
            relationship: RelationshipDto::from(&edge.relationship),
        }
    }
}

/// Attribute value active now, with its inferred primitive type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeResponse {
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub value_type: String,
    pub start_time: String,
    pub end_time: String,
}

impl From<AttributeValue> for AttributeResponse {
    fn from(attr: AttributeValue) -> Self {
        let (start_time, end_time) = format_range(&attr.range);
        Self {
            key: attr.key,
            value: attr.value,
            value_type: attr.value_type.to_string(),
            start_time,
            end_time,
        }
    }
}

/// Body of `/search`
///
/// `created` and `terminated` are inclusive lower bounds, the `...Until`
/// fields inclusive upper bounds. Empty strings mean no constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchRequest {
    pub id: String,
    pub kind: Option<KindDto>,
    pub created: String,
    pub created_until: String,
    pub terminated: String,
    pub terminated_until: String,
    /// Attribute key to the decoded value active now
    pub attributes: BTreeMap<String, String>,
}

impl SearchRequest {
    pub fn into_criteria(self) -> Result<SearchCriteria> {
        let mut criteria = SearchCriteria::new();

        if !self.id.is_empty() {
            criteria = criteria.id(self.id);
        }
        if let Some(kind) = self.kind {
            if !kind.major.is_empty() {
                criteria = criteria.kind_major(kind.major);
            }
            if !kind.minor.is_empty() {
                criteria = criteria.kind_minor(kind.minor);
            }
        }
        if let Some(bounds) = parse_bounds(&self.created, &self.created_until)? {
            criteria = criteria.created(bounds);
        }
        if let Some(bounds) = parse_bounds(&self.terminated, &self.terminated_until)? {
            criteria = criteria.terminated(bounds);
        }
        for (key, value) in self.attributes {
            criteria = criteria.attribute_equals(key, value);
        }

        Ok(criteria)
    }
}

fn parse_bounds(from: &str, to: &str) -> Result<Option<TimeBounds>> {
    let bounds = TimeBounds::new(parse_timestamp(from)?, parse_timestamp(to)?);
    Ok((!bounds.is_unbounded()).then_some(bounds))
}

/// Search results, wrapped in a `body` envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub body: Vec<EntityView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use df_core::{TimeRange, ValueType};
    use serde_json::json;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_filter_from_json() {
        let body = json!({
            "relatedEntityId": "child",
            "startTime": "2024-01-01T00:00:00Z",
            "endTime": "2024-12-31T23:59:59Z",
            "id": "rel-001",
            "name": "linked"
        });
        let filter = serde_json::from_value::<RelationshipFilterDto>(body)
            .unwrap()
            .into_filter()
            .unwrap();

        let rel = Relationship::new(
            "rel-001",
            "linked",
            "child",
            TimeRange::new(
                ts(2024, 1, 1),
                Some(Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap()),
            )
            .unwrap(),
        );
        assert!(filter.matches(&rel));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = serde_json::from_value::<RelationshipFilterDto>(json!({"name": ""}))
            .unwrap()
            .into_filter()
            .unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_filter_rejects_bad_timestamp() {
        let dto = RelationshipFilterDto {
            start_time: "not-a-date".to_string(),
            ..Default::default()
        };
        assert!(dto.into_filter().is_err());
    }

    #[test]
    fn test_relationship_dto_shape() {
        let rel = Relationship::new("r1", "linked", "e2", TimeRange::starting(ts(2024, 2, 1)));
        let json = serde_json::to_value(RelationshipDto::from(&rel)).unwrap();
        assert_eq!(json["relatedEntityId"], "e2");
        assert_eq!(json["startTime"], "2024-02-01T00:00:00Z");
        assert_eq!(json["endTime"], "");

        let edge = IncomingEdge {
            source: "e1".into(),
            relationship: rel,
        };
        let json = serde_json::to_value(IncomingRelationshipDto::from(&edge)).unwrap();
        assert_eq!(json["sourceEntityId"], "e1");
        assert_eq!(json["id"], "r1");
    }

    #[test]
    fn test_search_request_with_empty_times() {
        let body = json!({"id": "12345", "created": "", "terminated": ""});
        let criteria = serde_json::from_value::<SearchRequest>(body)
            .unwrap()
            .into_criteria()
            .unwrap();
        assert_eq!(criteria.id.as_deref(), Some("12345"));
        assert!(criteria.created.is_none());
        assert!(criteria.terminated.is_none());
    }

    #[test]
    fn test_search_request_bounds_and_kind() {
        let body = json!({
            "kind": {"major": "Person", "minor": ""},
            "created": "2024-01-01",
            "createdUntil": "2024-06-30",
            "attributes": {"city": "Colombo"}
        });
        let criteria = serde_json::from_value::<SearchRequest>(body)
            .unwrap()
            .into_criteria()
            .unwrap();

        assert_eq!(criteria.kind_major.as_deref(), Some("Person"));
        assert!(criteria.kind_minor.is_none());
        let created = criteria.created.unwrap();
        assert!(created.contains(ts(2024, 1, 1)));
        assert!(created.contains(ts(2024, 6, 30)));
        assert!(!created.contains(ts(2024, 7, 1)));
        assert_eq!(criteria.attribute_equals["city"], "Colombo");
    }

    #[test]
    fn test_attribute_response_shape() {
        let attr = AttributeValue {
            key: "age".to_string(),
            value: "42".to_string(),
            value_type: ValueType::Int,
            range: TimeRange::starting(ts(2024, 1, 1)),
        };
        let json = serde_json::to_value(AttributeResponse::from(attr)).unwrap();
        assert_eq!(json["type"], "int");
        assert_eq!(json["value"], "42");
        assert_eq!(json["startTime"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_search_response_envelope() {
        let json = serde_json::to_value(SearchResponse::default()).unwrap();
        assert_eq!(json, json!({"body": []}));
    }
}
