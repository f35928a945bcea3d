//! Database management for DataFoundation

use crate::store::{EntityStore, StoreConfig};
use df_core::Result;
use df_storage::{EntityBackend, MemoryStorage, StorageEngine, StorageOptions};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// The main database instance
///
/// Owns the storage backend and hands out [`EntityStore`] handles that
/// share it, along with the per-id lock table.
pub struct Database {
    /// Present when the backend is RocksDB
    engine: Option<StorageEngine>,

    store: EntityStore,
}

impl Database {
    /// Open or create a durable database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(StorageOptions::new(path.as_ref()), StoreConfig::default())
    }

    /// Open or create a durable database with custom configuration
    pub fn open_with_config(options: StorageOptions, config: StoreConfig) -> Result<Self> {
        let path = options.path.clone();
        let engine = StorageEngine::open(options)?;
        info!("Opened database at {:?}", path);

        let backend: Arc<dyn EntityBackend> = Arc::new(engine.clone());
        Ok(Self {
            engine: Some(engine),
            store: EntityStore::new(backend, config),
        })
    }

    /// Open a database with testing configuration
    pub fn open_for_testing<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(
            StorageOptions::for_testing(path.as_ref()),
            StoreConfig::default(),
        )
    }

    /// Create a database that lives only in memory
    pub fn in_memory(config: StoreConfig) -> Self {
        info!("Opened in-memory database");
        Self {
            engine: None,
            store: EntityStore::new(Arc::new(MemoryStorage::new()), config),
        }
    }

    /// Get a handle to the entity store
    pub fn store(&self) -> EntityStore {
        self.store.clone()
    }

    /// Name of the active backend
    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Flush all data to disk
    pub fn flush(&self) -> Result<()> {
        self.store.flush()
    }

    /// Compact the database; a no-op in memory
    pub fn compact(&self) -> Result<()> {
        match &self.engine {
            Some(engine) => engine.compact(),
            None => Ok(()),
        }
    }

    /// Get storage statistics
    pub fn stats(&self) -> String {
        match &self.engine {
            Some(engine) => engine.stats(),
            None => String::new(),
        }
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            store: self.store.clone(),
        }
    }
}
