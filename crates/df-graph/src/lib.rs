//! DataFoundation Entity Store
//!
//! Provides the write side of the data model on top of a storage backend.
//!
//! # Overview
//!
//! - `Database` opens a RocksDB or in-memory backend
//! - `EntityStore` implements create, read, merge-update and delete with
//!   per-entity serialization of writes

pub mod database;
pub mod store;

pub use database::Database;
pub use store::{CreateOutcome, DuplicatePolicy, EntityStore, StoreConfig};
