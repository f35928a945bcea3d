//! DataFoundation Server
//!
//! Hosts the update service (entity create, read, update and delete) and
//! the query service (metadata, attributes, relationships and search) over
//! one shared entity store.

pub mod config;
pub mod error;
pub mod http_server;
pub mod server;

pub use config::{ServerConfig, StorageBackendKind};
pub use error::ApiError;
pub use http_server::{AppState, query_router, update_router};
pub use server::Server;
