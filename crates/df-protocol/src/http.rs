//! HTTP endpoint paths and common response bodies

use serde::{Deserialize, Serialize};

/// HTTP API endpoint paths
pub mod endpoints {
    pub const HEALTH: &str = "/health";

    // Update service
    pub const ENTITIES: &str = "/entities";
    pub const ENTITY: &str = "/entities/:id";
    pub const ENTITY_RELATIONSHIP: &str = "/entities/:id/relationships/:rel_id";

    // Query service
    pub const METADATA: &str = "/v1/entities/:id/metadata";
    pub const ATTRIBUTE: &str = "/v1/entities/:id/attributes/:key";
    pub const RELATIONS: &str = "/v1/entities/:id/relations";
    /// Static segment, so it wins over [`RELATIONSHIP`] for the id `incoming`
    pub const INCOMING_RELATIONS: &str = "/v1/entities/:id/relations/incoming";
    pub const RELATIONSHIP: &str = "/v1/entities/:id/relations/:rel_id";
    pub const SEARCH: &str = "/v1/entities/search";
}

/// Error body returned with every non-2xx response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message
    pub error: String,

    /// Stable machine-readable code
    pub error_code: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            error_code: code.into(),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Which service answered ("update" or "query")
    pub service: String,

    /// Version information
    pub version: String,

    /// Uptime in seconds
    pub uptime_seconds: u64,

    /// Storage backend name
    pub backend: String,

    /// Advertised base URL of the query service, if configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_paths_are_versioned() {
        for path in [
            endpoints::METADATA,
            endpoints::ATTRIBUTE,
            endpoints::RELATIONS,
            endpoints::INCOMING_RELATIONS,
            endpoints::RELATIONSHIP,
            endpoints::SEARCH,
        ] {
            assert!(path.starts_with("/v1/entities/"), "{}", path);
        }
        assert!(endpoints::ENTITY_RELATIONSHIP.starts_with(endpoints::ENTITY));
    }

    #[test]
    fn test_error_response_shape() {
        let body = ErrorResponse::new("ENTITY_NOT_FOUND", "Entity not found: e1");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], "Entity not found: e1");
        assert_eq!(json["error_code"], "ENTITY_NOT_FOUND");
    }

    #[test]
    fn test_health_response_omits_missing_base_url() {
        let health = HealthResponse {
            status: "ok".to_string(),
            service: "query".to_string(),
            version: "0.1.0".to_string(),
            uptime_seconds: 3,
            backend: "memory".to_string(),
            base_url: None,
        };

        let json = serde_json::to_string(&health).unwrap();
        assert!(!json.contains("base_url"));
        assert!(json.contains("\"backend\":\"memory\""));
    }
}
