//! Entity payloads and views
//!
//! Inbound payloads carry string content and loosely formatted timestamps;
//! empty strings mean "absent". Outbound views carry the encoded payload as
//! hex so that clients can decode it themselves. A typed inbound value that
//! is already hex or base64 of a well-formed payload is taken as encoded, so
//! a view can be sent back unchanged.

use chrono::{DateTime, Utc};
use df_core::{
    AnyValue, Entity, EntityPatch, Error, Kind, Relationship, Result, TimeRange, VersionedValue,
    format_timestamp, generate_relationship_id, parse_timestamp,
};
use serde::{Deserialize, Serialize};

/// A value as sent by clients: bare text, or text with an explicit type URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnyValueInput {
    Plain(String),
    Typed {
        #[serde(rename = "typeUrl")]
        type_url: String,
        value: String,
    },
}

impl AnyValueInput {
    /// Encode the content into an [`AnyValue`]
    ///
    /// Typed text that decodes as an encoded payload is kept as is; anything
    /// else is treated as string content.
    pub fn into_any_value(self) -> Result<AnyValue> {
        match self {
            AnyValueInput::Plain(text) => AnyValue::string(text),
            AnyValueInput::Typed { type_url, value } => {
                AnyValue::from_text(type_url.clone(), &value)
                    .or_else(|_| AnyValue::encode_string(type_url, &value))
            }
        }
    }
}

impl From<&str> for AnyValueInput {
    fn from(text: &str) -> Self {
        AnyValueInput::Plain(text.to_string())
    }
}

/// A value as returned to clients, payload hex-encoded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnyValueDto {
    pub type_url: String,
    pub value: String,
}

impl From<&AnyValue> for AnyValueDto {
    fn from(value: &AnyValue) -> Self {
        Self {
            type_url: value.type_url().to_string(),
            value: value.to_hex(),
        }
    }
}

impl AnyValueDto {
    /// Rebuild the stored value from its hex form
    pub fn to_any_value(&self) -> Result<AnyValue> {
        AnyValue::from_text(self.type_url.clone(), &self.value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindDto {
    #[serde(default)]
    pub major: String,
    #[serde(default)]
    pub minor: String,
}

impl KindDto {
    pub fn is_empty(&self) -> bool {
        self.major.is_empty() && self.minor.is_empty()
    }
}

impl From<KindDto> for Kind {
    fn from(kind: KindDto) -> Self {
        Kind::new(kind.major, kind.minor)
    }
}

impl From<&Kind> for KindDto {
    fn from(kind: &Kind) -> Self {
        Self {
            major: kind.major.clone(),
            minor: kind.minor.clone(),
        }
    }
}

/// A time-ranged value in a payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBasedValueInput {
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    pub value: AnyValueInput,
}

impl TimeBasedValueInput {
    /// Convert, starting at `default_start` when no start time was given
    pub fn into_versioned(self, default_start: DateTime<Utc>) -> Result<VersionedValue<AnyValue>> {
        let range = parse_range(&self.start_time, &self.end_time, default_start)?;
        Ok(VersionedValue::new(range, self.value.into_any_value()?))
    }
}

/// A time-ranged value in a view; `endTime` is empty while open
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBasedValueDto {
    pub start_time: String,
    pub end_time: String,
    pub value: AnyValueDto,
}

impl From<&VersionedValue<AnyValue>> for TimeBasedValueDto {
    fn from(version: &VersionedValue<AnyValue>) -> Self {
        let (start_time, end_time) = format_range(&version.range);
        Self {
            start_time,
            end_time,
            value: AnyValueDto::from(&version.value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntryInput {
    pub key: String,
    pub value: AnyValueInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntryDto {
    pub key: String,
    pub value: AnyValueDto,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeValuesInput {
    #[serde(default)]
    pub values: Vec<TimeBasedValueInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeEntryInput {
    pub key: String,
    #[serde(default)]
    pub value: AttributeValuesInput,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeValuesDto {
    pub values: Vec<TimeBasedValueDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeEntryDto {
    pub key: String,
    pub value: AttributeValuesDto,
}

/// A relationship in a payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelationshipInput {
    pub related_entity_id: String,
    pub start_time: String,
    pub end_time: String,
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipEntryInput {
    #[serde(default)]
    pub key: String,
    pub value: RelationshipInput,
}

impl RelationshipEntryInput {
    /// Resolve the relationship id from the value, then the key, then a fresh UUID
    pub fn into_relationship(self, default_start: DateTime<Utc>) -> Result<Relationship> {
        let rel = self.value;
        let id = if !rel.id.is_empty() {
            rel.id
        } else if !self.key.is_empty() {
            self.key
        } else {
            generate_relationship_id()
        };
        let range = parse_range(&rel.start_time, &rel.end_time, default_start)?;
        Ok(Relationship::new(id, rel.name, rel.related_entity_id, range))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipEntryDto {
    pub key: String,
    pub value: crate::query::RelationshipDto,
}

/// Body of create and update requests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntityPayload {
    pub id: String,
    pub kind: Option<KindDto>,
    pub created: String,
    pub terminated: String,
    pub name: Option<TimeBasedValueInput>,
    pub metadata: Vec<MetadataEntryInput>,
    pub attributes: Vec<AttributeEntryInput>,
    pub relationships: Vec<RelationshipEntryInput>,
}

impl EntityPayload {
    /// Build a new entity; `created` is required
    pub fn into_entity(self) -> Result<Entity> {
        let created = parse_timestamp(&self.created)?.ok_or_else(|| {
            Error::ValidationError(format!("entity {} has no created timestamp", self.id))
        })?;

        let mut entity = Entity::new(self.id, self.kind.unwrap_or_default().into(), created);
        entity.terminated = parse_timestamp(&self.terminated)?;

        if let Some(name) = self.name {
            let name = name.into_versioned(created)?;
            entity.name.append(name.range, name.value);
        }
        for entry in self.metadata {
            entity.metadata.upsert(entry.key, entry.value.into_any_value()?);
        }
        for entry in self.attributes {
            for value in entry.value.values {
                let version = value.into_versioned(created)?;
                entity.append_attribute(entry.key.clone(), version.range, version.value);
            }
        }
        for entry in self.relationships {
            entity.relationships.upsert(entry.into_relationship(created)?);
        }

        Ok(entity)
    }

    /// Build a partial update; values without a start time begin at `now`
    ///
    /// Empty `kind`, `created` and `terminated` leave the stored values as
    /// they are.
    pub fn into_patch(self, now: DateTime<Utc>) -> Result<EntityPatch> {
        let mut patch = EntityPatch::new();

        if let Some(kind) = self.kind.filter(|kind| !kind.is_empty()) {
            patch = patch.kind(kind.into());
        }
        if let Some(created) = parse_timestamp(&self.created)? {
            patch = patch.created(created);
        }
        if let Some(terminated) = parse_timestamp(&self.terminated)? {
            patch = patch.terminated(Some(terminated));
        }
        if let Some(name) = self.name {
            let name = name.into_versioned(now)?;
            patch = patch.name(name.range, name.value);
        }
        for entry in self.metadata {
            patch = patch.metadata(entry.key, entry.value.into_any_value()?);
        }
        for entry in self.attributes {
            for value in entry.value.values {
                let version = value.into_versioned(now)?;
                patch = patch.attribute(entry.key.clone(), version.range, version.value);
            }
        }
        for entry in self.relationships {
            patch = patch.relationship(entry.into_relationship(now)?);
        }

        Ok(patch)
    }

    /// Reject a body whose id disagrees with the addressed entity
    pub fn check_id(&self, id: &str) -> Result<()> {
        if !self.id.is_empty() && self.id != id {
            return Err(Error::ValidationError(format!(
                "payload id {} does not match entity {}",
                self.id, id
            )));
        }
        Ok(())
    }
}

/// An entity as returned by the services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityView {
    pub id: String,
    pub kind: KindDto,
    pub created: String,
    pub terminated: String,
    /// The name active at render time, else the latest version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<TimeBasedValueDto>,
    /// Most recently written key first
    pub metadata: Vec<MetadataEntryDto>,
    pub attributes: Vec<AttributeEntryDto>,
    pub relationships: Vec<RelationshipEntryDto>,
}

impl EntityView {
    /// Render an entity, choosing the name version active at `now`
    pub fn at(entity: &Entity, now: DateTime<Utc>) -> Self {
        let name = entity
            .name
            .version_at(now)
            .or_else(|| entity.name.latest())
            .map(TimeBasedValueDto::from);

        Self {
            id: entity.id.to_string(),
            kind: KindDto::from(&entity.kind),
            created: format_timestamp(entity.created),
            terminated: entity.terminated.map(format_timestamp).unwrap_or_default(),
            name,
            metadata: entity
                .metadata
                .iter()
                .map(|(key, value)| MetadataEntryDto {
                    key: key.to_string(),
                    value: AnyValueDto::from(value),
                })
                .collect(),
            attributes: entity
                .attributes
                .iter()
                .map(|(key, timeline)| AttributeEntryDto {
                    key: key.clone(),
                    value: AttributeValuesDto {
                        values: timeline.iter().map(TimeBasedValueDto::from).collect(),
                    },
                })
                .collect(),
            relationships: entity
                .relationships
                .iter()
                .map(|rel| RelationshipEntryDto {
                    key: rel.id.clone(),
                    value: rel.into(),
                })
                .collect(),
        }
    }
}

impl From<&Entity> for EntityView {
    fn from(entity: &Entity) -> Self {
        Self::at(entity, Utc::now())
    }
}

fn parse_range(start: &str, end: &str, default_start: DateTime<Utc>) -> Result<TimeRange> {
    let start = parse_timestamp(start)?.unwrap_or(default_start);
    TimeRange::new(start, parse_timestamp(end)?)
}

pub(crate) fn format_range(range: &TimeRange) -> (String, String) {
    (
        format_timestamp(range.start()),
        range.end().map(format_timestamp).unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use df_core::STRING_VALUE_TYPE_URL;
    use serde_json::json;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn create_body() -> serde_json::Value {
        json!({
            "id": "12345",
            "kind": {"major": "example", "minor": "test"},
            "created": "2024-03-17T10:00:00Z",
            "terminated": "",
            "name": {
                "startTime": "2024-03-17T10:00:00Z",
                "endTime": "",
                "value": {
                    "typeUrl": "type.googleapis.com/google.protobuf.StringValue",
                    "value": "entity-name"
                }
            },
            "metadata": [
                {"key": "owner", "value": "test-user"},
                {"key": "version", "value": "1.0"}
            ],
            "attributes": [
                {"key": "city", "value": {"values": [
                    {"startTime": "2024-01-01", "endTime": "", "value": "Colombo"}
                ]}}
            ],
            "relationships": [
                {"key": "rel-001", "value": {
                    "relatedEntityId": "child",
                    "startTime": "2024-01-01T00:00:00Z",
                    "endTime": "",
                    "id": "",
                    "name": "linked"
                }}
            ]
        })
    }

    #[test]
    fn test_create_payload_into_entity() {
        let payload: EntityPayload = serde_json::from_value(create_body()).unwrap();
        let entity = payload.into_entity().unwrap();

        assert_eq!(entity.id.as_str(), "12345");
        assert_eq!(entity.kind, Kind::new("example", "test"));
        assert!(entity.terminated.is_none());
        assert_eq!(
            entity.name.latest().unwrap().value.decode_string().unwrap(),
            "entity-name"
        );
        assert_eq!(
            entity.metadata.get("owner").unwrap().decode_string().unwrap(),
            "test-user"
        );
        let city = entity.attribute("city").unwrap().at(ts(2024, 6, 1)).unwrap();
        assert_eq!(city.decode_string().unwrap(), "Colombo");

        let rel = entity.relationships.get("rel-001").unwrap();
        assert_eq!(rel.related_entity_id.as_str(), "child");
        assert_eq!(rel.name, "linked");
        assert!(rel.range.is_open());
    }

    #[test]
    fn test_create_requires_created() {
        let payload = EntityPayload {
            id: "e1".to_string(),
            ..Default::default()
        };
        let err = payload.into_entity().unwrap_err();
        assert!(matches!(err, Error::ValidationError(_)));
    }

    #[test]
    fn test_missing_start_time_defaults() {
        let body = json!({
            "id": "e1",
            "created": "2024-03-17",
            "relationships": [{"key": "", "value": {"relatedEntityId": "e2", "name": "peer"}}]
        });
        let entity = serde_json::from_value::<EntityPayload>(body)
            .unwrap()
            .into_entity()
            .unwrap();

        let rel = entity.relationships.iter().next().unwrap();
        assert_eq!(rel.range.start(), ts(2024, 3, 17));
        // Neither id nor key given: a UUID is generated
        assert_eq!(rel.id.len(), 36);
    }

    #[test]
    fn test_update_payload_into_patch() {
        let body = json!({
            "id": "12345",
            "kind": {"major": "example", "minor": "test"},
            "created": "2024-03-18T00:00:00Z",
            "name": {"startTime": "2024-03-18T00:00:00Z", "value": "entity-name"},
            "metadata": [{"key": "version", "value": "5.0"}]
        });
        let payload: EntityPayload = serde_json::from_value(body).unwrap();
        payload.check_id("12345").unwrap();

        let patch = payload.into_patch(ts(2024, 6, 1)).unwrap();
        assert_eq!(patch.created.as_set(), Some(&ts(2024, 3, 18)));
        assert!(patch.terminated.is_keep());
        assert_eq!(
            patch.metadata.get("version").unwrap().decode_string().unwrap(),
            "5.0"
        );
    }

    #[test]
    fn test_empty_fields_are_kept_on_update() {
        let body = json!({"kind": {"major": "", "minor": ""}, "created": "", "terminated": ""});
        let patch = serde_json::from_value::<EntityPayload>(body)
            .unwrap()
            .into_patch(ts(2024, 6, 1))
            .unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn test_check_id_mismatch() {
        let payload = EntityPayload {
            id: "a".to_string(),
            ..Default::default()
        };
        assert!(payload.check_id("a").is_ok());
        assert!(payload.check_id("b").is_err());
        assert!(EntityPayload::default().check_id("b").is_ok());
    }

    #[test]
    fn test_bad_timestamp_is_rejected() {
        let body = json!({"id": "e1", "created": "yesterday"});
        let err = serde_json::from_value::<EntityPayload>(body)
            .unwrap()
            .into_entity()
            .unwrap_err();
        assert!(matches!(err, Error::ValidationError(_)));
    }

    #[test]
    fn test_unsupported_type_url_is_rejected() {
        let input = AnyValueInput::Typed {
            type_url: "type.googleapis.com/google.protobuf.Int32Value".to_string(),
            value: "7".to_string(),
        };
        assert!(input.into_any_value().is_err());
    }

    #[test]
    fn test_typed_input_accepts_encoded_payloads() {
        let encoded = AnyValue::string("entity-name").unwrap();
        let typed = |value: String| AnyValueInput::Typed {
            type_url: STRING_VALUE_TYPE_URL.to_string(),
            value,
        };

        let from_hex = typed(encoded.to_hex()).into_any_value().unwrap();
        assert_eq!(from_hex, encoded);
        let from_base64 = typed(encoded.to_base64()).into_any_value().unwrap();
        assert_eq!(from_base64, encoded);

        // Text that is not a valid payload is content
        let plain = typed("entity-name".to_string()).into_any_value().unwrap();
        assert_eq!(plain.decode_string().unwrap(), "entity-name");
        let short_hex = typed("cafe".to_string()).into_any_value().unwrap();
        assert_eq!(short_hex.decode_string().unwrap(), "cafe");
    }

    #[test]
    fn test_view_values_can_be_sent_back() {
        let entity = serde_json::from_value::<EntityPayload>(create_body())
            .unwrap()
            .into_entity()
            .unwrap();
        let view = EntityView::at(&entity, ts(2024, 6, 1));

        let echoed: EntityPayload =
            serde_json::from_value(serde_json::to_value(&view).unwrap()).unwrap();
        let rebuilt = echoed.into_entity().unwrap();

        assert_eq!(
            rebuilt.name.latest().unwrap().value.decode_string().unwrap(),
            "entity-name"
        );
        assert_eq!(rebuilt.metadata.get("owner"), entity.metadata.get("owner"));
        assert_eq!(rebuilt.attribute("city"), entity.attribute("city"));
        assert_eq!(rebuilt.relationships.get("rel-001"), entity.relationships.get("rel-001"));
    }

    #[test]
    fn test_view_renders_hex_and_most_recent_metadata_first() {
        let mut entity = serde_json::from_value::<EntityPayload>(create_body())
            .unwrap()
            .into_entity()
            .unwrap();
        entity
            .apply(EntityPatch::new().metadata("version", AnyValue::string("5.0").unwrap()))
            .unwrap();

        let view = EntityView::at(&entity, ts(2024, 6, 1));
        assert_eq!(view.created, "2024-03-17T10:00:00Z");
        assert_eq!(view.terminated, "");
        assert_eq!(view.metadata[0].key, "version");
        assert_eq!(view.metadata[0].value.value, "0a03352e30");
        assert_eq!(
            view.metadata[0].value.to_any_value().unwrap().decode_string().unwrap(),
            "5.0"
        );
        assert_eq!(view.relationships[0].key, "rel-001");

        let name = view.name.unwrap();
        assert_eq!(name.start_time, "2024-03-17T10:00:00Z");
        assert_eq!(name.end_time, "");
    }

    #[test]
    fn test_view_falls_back_to_latest_name() {
        let entity = Entity::new("e1", Kind::new("a", "b"), ts(2024, 1, 1)).with_name(
            TimeRange::new(ts(2024, 1, 1), Some(ts(2024, 2, 1))).unwrap(),
            AnyValue::string("old").unwrap(),
        );
        let view = EntityView::at(&entity, ts(2025, 1, 1));
        assert_eq!(view.name.unwrap().end_time, "2024-02-01T00:00:00Z");
    }

    #[test]
    fn test_view_serializes_camel_case() {
        let entity = Entity::new("e1", Kind::new("a", "b"), ts(2024, 1, 1));
        let json = serde_json::to_value(EntityView::at(&entity, ts(2024, 1, 2))).unwrap();
        assert_eq!(json["id"], "e1");
        assert_eq!(json["kind"]["major"], "a");
        assert!(json.get("name").is_none());
        assert!(json["metadata"].as_array().unwrap().is_empty());
    }
}
