//! Storage configuration options
//!
//! The store writes one bincode record per entity plus a handful of
//! empty-valued index keys, and reads records back by id. The tuning knobs
//! follow that split: the entity column family gets the cache, the bloom
//! filter and compression; the index column families stay small and plain.

use std::path::PathBuf;

const MB: usize = 1024 * 1024;

/// Options for configuring the RocksDB storage engine
#[derive(Debug, Clone)]
pub struct StorageOptions {
    /// Path to the database directory
    pub path: PathBuf,

    /// Whether to create the database if it doesn't exist
    pub create_if_missing: bool,

    /// Memtable memory shared by all column families
    pub memtable_budget: usize,

    /// Memtable size of the entity column family
    pub entity_write_buffer_size: usize,

    /// Number of background flush and compaction jobs
    pub max_background_jobs: i32,

    /// LRU block cache for entity records and index blocks
    pub entity_cache_size: usize,

    /// Bloom filter bits per entity id; zero disables the filter
    pub entity_bloom_bits: i32,

    /// LZ4-compress entity records; index keys are never compressed
    pub compress_entities: bool,

    /// Sync the WAL before a write is acknowledged
    pub sync_writes: bool,
}

impl StorageOptions {
    /// Create options for a database at the given path
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Tiny memtables so tests open quickly and flush often
    pub fn for_testing<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            create_if_missing: true,
            memtable_budget: 4 * MB,
            entity_write_buffer_size: MB,
            max_background_jobs: 2,
            entity_cache_size: 4 * MB,
            entity_bloom_bits: 10,
            compress_entities: false,
            sync_writes: false,
        }
    }

    /// Durable writes and a cache large enough to keep hot entities resident
    pub fn for_production<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            create_if_missing: true,
            memtable_budget: 128 * MB,
            entity_write_buffer_size: 64 * MB,
            max_background_jobs: 4,
            entity_cache_size: 512 * MB,
            entity_bloom_bits: 10,
            compress_entities: true,
            sync_writes: true,
        }
    }

    pub fn memtable_budget(mut self, size: usize) -> Self {
        self.memtable_budget = size;
        self
    }

    pub fn entity_cache_size(mut self, size: usize) -> Self {
        self.entity_cache_size = size;
        self
    }

    pub fn sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    pub fn compress_entities(mut self, enabled: bool) -> Self {
        self.compress_entities = enabled;
        self
    }
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data"),
            create_if_missing: true,
            memtable_budget: 32 * MB,
            entity_write_buffer_size: 16 * MB,
            max_background_jobs: 2,
            entity_cache_size: 32 * MB,
            entity_bloom_bits: 10,
            compress_entities: true,
            sync_writes: false,
        }
    }
}
