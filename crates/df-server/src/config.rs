//! Server configuration

use df_core::{Error, Result};
use df_graph::{Database, DuplicatePolicy, StoreConfig};
use df_storage::StorageOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Where entities are kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    #[default]
    RocksDb,
    Memory,
}

impl FromStr for StorageBackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rocksdb" => Ok(StorageBackendKind::RocksDb),
            "memory" => Ok(StorageBackendKind::Memory),
            other => Err(Error::Configuration(format!(
                "unknown storage backend: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for StorageBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackendKind::RocksDb => write!(f, "rocksdb"),
            StorageBackendKind::Memory => write!(f, "memory"),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Data directory, unused by the memory backend
    pub data_dir: PathBuf,

    /// Interface both services bind to
    pub host: String,

    /// Update service port
    pub update_port: u16,

    /// Query service port
    pub query_port: u16,

    /// Storage backend
    pub storage: StorageBackendKind,

    /// Behaviour of create on an existing id
    pub duplicate_policy: DuplicatePolicy,

    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,

    /// Advertised base URL of the query service
    pub query_base_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            host: "0.0.0.0".to_string(),
            update_port: 8080,
            query_port: 8081,
            storage: StorageBackendKind::RocksDb,
            duplicate_policy: DuplicatePolicy::Upsert,
            log_level: "info".to_string(),
            query_base_url: None,
        }
    }
}

impl ServerConfig {
    /// Create a new configuration
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Create configuration for development
    pub fn for_development<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
            log_level: "debug".to_string(),
            ..Default::default()
        }
    }

    /// In-memory storage on loopback with OS-assigned ports
    pub fn for_testing() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            update_port: 0,
            query_port: 0,
            storage: StorageBackendKind::Memory,
            log_level: "debug".to_string(),
            ..Default::default()
        }
    }

    /// Read `DF_*` environment variables over the defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source
    ///
    /// Unset or empty variables keep their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(dir) = get("DF_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(host) = get("DF_HOST") {
            config.host = host;
        }
        if let Some(port) = get("DF_UPDATE_PORT") {
            config.update_port = parse_port("DF_UPDATE_PORT", &port)?;
        }
        if let Some(port) = get("DF_QUERY_PORT") {
            config.query_port = parse_port("DF_QUERY_PORT", &port)?;
        }
        if let Some(storage) = get("DF_STORAGE") {
            config.storage = storage.parse()?;
        }
        if let Some(policy) = get("DF_DUPLICATE_POLICY") {
            config.duplicate_policy = policy.parse()?;
        }
        if let Some(level) = get("DF_LOG_LEVEL") {
            config.log_level = level;
        }
        config.query_base_url = get("DF_QUERY_BASE_URL");

        Ok(config)
    }

    /// Builder: set bind host
    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    /// Builder: set update service port
    pub fn update_port(mut self, port: u16) -> Self {
        self.update_port = port;
        self
    }

    /// Builder: set query service port
    pub fn query_port(mut self, port: u16) -> Self {
        self.query_port = port;
        self
    }

    /// Builder: set storage backend
    pub fn storage(mut self, storage: StorageBackendKind) -> Self {
        self.storage = storage;
        self
    }

    /// Builder: set duplicate policy
    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Builder: set log level
    pub fn log_level(mut self, level: &str) -> Self {
        self.log_level = level.to_string();
        self
    }

    /// Builder: set advertised query service URL
    pub fn query_base_url(mut self, url: &str) -> Self {
        self.query_base_url = Some(url.to_string());
        self
    }

    pub fn update_addr(&self) -> String {
        format!("{}:{}", self.host, self.update_port)
    }

    pub fn query_addr(&self) -> String {
        format!("{}:{}", self.host, self.query_port)
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new().duplicate_policy(self.duplicate_policy)
    }

    /// Open the configured backend
    pub fn open_database(&self) -> Result<Database> {
        match self.storage {
            StorageBackendKind::RocksDb => Database::open_with_config(
                StorageOptions::new(&self.data_dir),
                self.store_config(),
            ),
            StorageBackendKind::Memory => Ok(Database::in_memory(self.store_config())),
        }
    }
}

fn parse_port(key: &str, value: &str) -> Result<u16> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Configuration(format!("{} is not a valid port: {}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.update_port, 8080);
        assert_eq!(config.query_port, 8081);
        assert_eq!(config.storage, StorageBackendKind::RocksDb);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Upsert);
        assert!(config.query_base_url.is_none());
    }

    #[test]
    fn test_builder() {
        let config = ServerConfig::new("/data")
            .host("127.0.0.1")
            .update_port(9080)
            .query_port(9081)
            .storage(StorageBackendKind::Memory)
            .duplicate_policy(DuplicatePolicy::Reject)
            .query_base_url("http://query:9081")
            .log_level("debug");

        assert_eq!(config.update_addr(), "127.0.0.1:9080");
        assert_eq!(config.query_addr(), "127.0.0.1:9081");
        assert_eq!(config.storage, StorageBackendKind::Memory);
        assert_eq!(config.store_config().duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(config.query_base_url.as_deref(), Some("http://query:9081"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_from_lookup() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("DF_DATA_DIR", "/var/lib/df"),
            ("DF_UPDATE_PORT", "18080"),
            ("DF_STORAGE", "memory"),
            ("DF_DUPLICATE_POLICY", "reject"),
            ("DF_QUERY_BASE_URL", "http://localhost:18081/v1/entities"),
            ("DF_HOST", ""),
        ]))
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/var/lib/df"));
        assert_eq!(config.update_port, 18080);
        assert_eq!(config.query_port, 8081);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.storage, StorageBackendKind::Memory);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(
            config.query_base_url.as_deref(),
            Some("http://localhost:18081/v1/entities")
        );
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let err = ServerConfig::from_lookup(lookup(&[("DF_QUERY_PORT", "http")])).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let err = ServerConfig::from_lookup(lookup(&[("DF_STORAGE", "sqlite")])).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_open_database() {
        let memory = ServerConfig::for_testing().open_database().unwrap();
        assert_eq!(memory.backend_name(), "memory");

        let temp_dir = TempDir::new().unwrap();
        let durable = ServerConfig::new(temp_dir.path()).open_database().unwrap();
        assert_eq!(durable.backend_name(), "rocksdb");
    }
}
