//! DataFoundation - temporal entity and relationship store
//!
//! This is the main library crate that re-exports all DataFoundation components.

pub use df_core as core;
pub use df_graph as graph;
pub use df_protocol as protocol;
pub use df_query as query;
pub use df_server as server;
pub use df_storage as storage;

// Re-export commonly used types
pub use df_core::{
    AnyValue, Entity, EntityPatch, Error, FieldUpdate, Kind, Metadata, Relationship,
    RelationshipFilter, RelationshipIndex, Result, TimeRange, Timeline, VersionedValue,
};

pub use df_graph::{CreateOutcome, Database, DuplicatePolicy, EntityStore, StoreConfig};
pub use df_query::{QueryEngine, SearchCriteria};
pub use df_storage::{MemoryStorage, StorageEngine, StorageOptions};
