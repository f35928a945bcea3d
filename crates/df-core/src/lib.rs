//! DataFoundation Core Library
//!
//! This crate provides the temporal data model shared by the storage,
//! graph, query and server crates.
//!
//! # Modules
//!
//! - `any_value` - Typed-value envelope and its codec
//! - `temporal` - Time ranges and timelines of versioned values
//! - `types` - The `Entity` aggregate and its `Kind`
//! - `metadata` - Last-write-wins metadata map
//! - `relationship` - Directed, time-ranged edges and their filters
//! - `patch` - Field-level partial updates
//! - `inference` - Primitive type inference for decoded values
//! - `error` - Error types and result aliases

pub mod any_value;
pub mod error;
pub mod id;
pub mod inference;
pub mod metadata;
pub mod patch;
pub mod relationship;
pub mod temporal;
pub mod types;

pub use any_value::{AnyValue, PayloadKind, STRING_VALUE_TYPE_URL, TypedValue};
pub use error::{Error, Result};
pub use id::{EntityId, MAX_KEY_COMPONENT_LEN, check_key_component, generate_relationship_id};
pub use inference::ValueType;
pub use metadata::{Metadata, MetadataEntry};
pub use patch::{EntityPatch, FieldUpdate};
pub use relationship::{Relationship, RelationshipFilter, RelationshipIndex};
pub use temporal::{TimeRange, Timeline, VersionedValue, format_timestamp, parse_timestamp};
pub use types::{Entity, Kind};
