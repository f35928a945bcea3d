//! DataFoundation Protocol Types
//!
//! JSON shapes exchanged with the update and query services, and their
//! conversions to and from the core data model.
//!
//! # Modules
//!
//! - **entity**: entity payloads for create/update and the entity view
//! - **query**: relationship filters, search requests and query responses
//! - **http**: endpoint paths, health and error bodies

pub mod entity;
pub mod http;
pub mod query;

pub use entity::{
    AnyValueDto, AnyValueInput, EntityPayload, EntityView, KindDto, TimeBasedValueDto,
    TimeBasedValueInput,
};
pub use http::{ErrorResponse, HealthResponse};
pub use query::{
    AttributeResponse, IncomingRelationshipDto, RelationshipDto, RelationshipFilterDto,
    SearchRequest, SearchResponse,
};
