//! DataFoundation Storage
//!
//! Persists entities behind the [`EntityBackend`] trait.
//!
//! # Backends
//!
//! - [`StorageEngine`] - RocksDB, durable
//! - [`MemoryStorage`] - concurrent in-memory map, for tests and ephemeral runs
//!
//! # Column Families
//!
//! - `entities` - One serialized record per entity
//! - `kind_index` - Major kind to entity id mapping
//! - `incoming` - Reverse adjacency: edges keyed by their target
//! - `meta` - Store metadata such as the format version

pub mod backend;
pub mod engine;
pub mod keys;
pub mod memory;
pub mod options;

pub use backend::{EntityBackend, IncomingEdge};
pub use engine::StorageEngine;
pub use memory::MemoryStorage;
pub use options::StorageOptions;
