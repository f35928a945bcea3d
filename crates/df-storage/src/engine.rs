//! Storage engine implementation using RocksDB

use crate::backend::{EntityBackend, IncomingEdge};
use crate::keys::{KeyBuilder, KeyDecoder};
use crate::options::StorageOptions;
use df_core::{Entity, Error, Result};
use rocksdb::{
    BlockBasedOptions, Cache, ColumnFamily, ColumnFamilyDescriptor, DB, DBCompressionType,
    Options, WriteBatch, WriteOptions,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Column family names
pub mod cf {
    pub const ENTITIES: &str = "entities";
    pub const KIND_INDEX: &str = "kind_index";
    pub const INCOMING: &str = "incoming";
    pub const META: &str = "meta";
}

/// All column families used by DataFoundation
pub const COLUMN_FAMILIES: &[&str] = &[cf::ENTITIES, cf::KIND_INDEX, cf::INCOMING, cf::META];

const FORMAT_VERSION_KEY: &str = "format_version";
const FORMAT_VERSION: &[u8] = b"1";

/// RocksDB-backed entity storage
pub struct StorageEngine {
    db: Arc<DB>,
    options: StorageOptions,
}

impl StorageEngine {
    /// Open or create a storage engine
    pub fn open(options: StorageOptions) -> Result<Self> {
        info!("Opening storage engine at {:?}", options.path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(options.create_if_missing);
        db_opts.create_missing_column_families(true);
        db_opts.set_db_write_buffer_size(options.memtable_budget);
        db_opts.set_max_background_jobs(options.max_background_jobs);

        let cache = Cache::new_lru_cache(options.entity_cache_size);
        let cf_descriptors: Vec<ColumnFamilyDescriptor> = COLUMN_FAMILIES
            .iter()
            .map(|name| {
                ColumnFamilyDescriptor::new(*name, column_family_options(name, &options, &cache))
            })
            .collect();

        let db = DB::open_cf_descriptors(&db_opts, &options.path, cf_descriptors)
            .map_err(|e| Error::Storage(e.to_string()))?;

        let engine = Self {
            db: Arc::new(db),
            options,
        };
        engine.check_format_version()?;

        info!("Storage engine opened successfully");
        Ok(engine)
    }

    /// Get the options the engine was opened with
    pub fn options(&self) -> &StorageOptions {
        &self.options
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Internal(format!("Column family not found: {}", name)))
    }

    fn check_format_version(&self) -> Result<()> {
        match self.get_meta(FORMAT_VERSION_KEY)? {
            None => self.put_meta(FORMAT_VERSION_KEY, FORMAT_VERSION),
            Some(version) if version == FORMAT_VERSION => Ok(()),
            Some(version) => Err(Error::DataCorruption(format!(
                "unsupported storage format version {}",
                String::from_utf8_lossy(&version)
            ))),
        }
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.options.sync_writes);
        self.db
            .write_opt(batch, &write_opts)
            .map_err(|e| Error::Storage(e.to_string()))
    }

    // ========== Index Maintenance ==========

    fn stage_index_removal(&self, batch: &mut WriteBatch, entity: &Entity) -> Result<()> {
        let kind_cf = self.cf(cf::KIND_INDEX)?;
        batch.delete_cf(kind_cf, KeyBuilder::kind_index(&entity.kind.major, entity.id.as_str()));

        let incoming_cf = self.cf(cf::INCOMING)?;
        for rel in entity.relationships.iter() {
            let key = KeyBuilder::incoming(rel.related_entity_id.as_str(), entity.id.as_str(), &rel.id);
            batch.delete_cf(incoming_cf, key);
        }
        Ok(())
    }

    fn stage_index_insertion(&self, batch: &mut WriteBatch, entity: &Entity) -> Result<()> {
        let kind_cf = self.cf(cf::KIND_INDEX)?;
        batch.put_cf(
            kind_cf,
            KeyBuilder::kind_index(&entity.kind.major, entity.id.as_str()),
            b"",
        );

        let incoming_cf = self.cf(cf::INCOMING)?;
        for rel in entity.relationships.iter() {
            let key = KeyBuilder::incoming(rel.related_entity_id.as_str(), entity.id.as_str(), &rel.id);
            let edge = IncomingEdge {
                source: entity.id.clone(),
                relationship: rel.clone(),
            };
            let value = bincode::serialize(&edge).map_err(|e| Error::Serialization(e.to_string()))?;
            batch.put_cf(incoming_cf, key, value);
        }
        Ok(())
    }

    // ========== Metadata Operations ==========

    /// Store metadata
    pub fn put_meta(&self, key: &str, value: &[u8]) -> Result<()> {
        let cf = self.cf(cf::META)?;
        self.db
            .put_cf(cf, KeyBuilder::meta(key), value)
            .map_err(|e| Error::Storage(e.to_string()))
    }

    /// Get metadata
    pub fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let cf = self.cf(cf::META)?;
        self.db
            .get_cf(cf, KeyBuilder::meta(key))
            .map_err(|e| Error::Storage(e.to_string()))
    }

    // ========== Utility Operations ==========

    /// Get database statistics
    pub fn stats(&self) -> String {
        self.db
            .property_value("rocksdb.stats")
            .unwrap_or_default()
            .unwrap_or_default()
    }

    /// Compact every column family
    pub fn compact(&self) -> Result<()> {
        for cf_name in COLUMN_FAMILIES {
            let cf = self.cf(cf_name)?;
            self.db.compact_range_cf(cf, None::<&[u8]>, None::<&[u8]>);
        }
        info!("Storage engine compacted");
        Ok(())
    }

    fn decode_entity(value: &[u8]) -> Result<Entity> {
        bincode::deserialize(value).map_err(|e| Error::Deserialization(e.to_string()))
    }
}

impl EntityBackend for StorageEngine {
    fn put_entity(&self, entity: &Entity, previous: Option<&Entity>) -> Result<()> {
        let value = bincode::serialize(entity).map_err(|e| Error::Serialization(e.to_string()))?;

        let mut batch = WriteBatch::default();
        if let Some(previous) = previous {
            self.stage_index_removal(&mut batch, previous)?;
        }
        batch.put_cf(self.cf(cf::ENTITIES)?, KeyBuilder::entity(entity.id.as_str()), value);
        self.stage_index_insertion(&mut batch, entity)?;
        self.write(batch)?;

        debug!("Stored entity {}", entity.id);
        Ok(())
    }

    fn get_entity(&self, id: &str) -> Result<Option<Entity>> {
        let cf = self.cf(cf::ENTITIES)?;
        match self.db.get_cf(cf, KeyBuilder::entity(id)) {
            Ok(Some(value)) => Self::decode_entity(&value).map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(Error::Storage(e.to_string())),
        }
    }

    fn delete_entity(&self, entity: &Entity) -> Result<()> {
        let mut batch = WriteBatch::default();
        batch.delete_cf(self.cf(cf::ENTITIES)?, KeyBuilder::entity(entity.id.as_str()));
        self.stage_index_removal(&mut batch, entity)?;
        self.write(batch)?;

        debug!("Deleted entity {}", entity.id);
        Ok(())
    }

    fn scan_entities(&self) -> Result<Vec<Entity>> {
        let prefix = KeyBuilder::entity_prefix();
        let cf = self.cf(cf::ENTITIES)?;

        let mut entities = Vec::new();
        for item in self.db.prefix_iterator_cf(cf, &prefix) {
            let (key, value) = item.map_err(|e| Error::Storage(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            entities.push(Self::decode_entity(&value)?);
        }

        // Keys are length-prefixed, so byte order is not id order
        entities.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(entities)
    }

    fn entities_by_kind(&self, major: &str) -> Result<Vec<Entity>> {
        let prefix = KeyBuilder::kind_index_prefix(major);
        let cf = self.cf(cf::KIND_INDEX)?;

        let mut entities = Vec::new();
        for item in self.db.prefix_iterator_cf(cf, &prefix) {
            let (key, _) = item.map_err(|e| Error::Storage(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }

            let mut decoder = KeyDecoder::new(&key[prefix.len()..]);
            let Some(id) = decoder.read_string() else {
                return Err(Error::DataCorruption(format!(
                    "malformed kind index key under {}",
                    major
                )));
            };

            match self.get_entity(id)? {
                Some(entity) => entities.push(entity),
                None => warn!("Kind index references missing entity {}", id),
            }
        }

        entities.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(entities)
    }

    fn incoming_relationships(&self, target: &str) -> Result<Vec<IncomingEdge>> {
        let prefix = KeyBuilder::incoming_prefix(target);
        let cf = self.cf(cf::INCOMING)?;

        let mut edges = Vec::new();
        for item in self.db.prefix_iterator_cf(cf, &prefix) {
            let (key, value) = item.map_err(|e| Error::Storage(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            let edge: IncomingEdge =
                bincode::deserialize(&value).map_err(|e| Error::Deserialization(e.to_string()))?;
            edges.push(edge);
        }

        edges.sort_by(|a, b| {
            a.source
                .cmp(&b.source)
                .then_with(|| a.relationship.id.cmp(&b.relationship.id))
        });
        Ok(edges)
    }

    fn flush(&self) -> Result<()> {
        self.db.flush().map_err(|e| Error::Storage(e.to_string()))?;
        info!("Storage engine flushed");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "rocksdb"
    }
}

impl Clone for StorageEngine {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            options: self.options.clone(),
        }
    }
}

/// Entity records are point reads by id; the index column families are
/// prefix scans over empty values, where a whole-key bloom filter never helps.
fn column_family_options(name: &str, options: &StorageOptions, cache: &Cache) -> Options {
    let mut block_opts = BlockBasedOptions::default();
    block_opts.set_block_cache(cache);

    let mut cf_opts = Options::default();
    if name == cf::ENTITIES {
        if options.entity_bloom_bits > 0 {
            block_opts.set_bloom_filter(options.entity_bloom_bits as f64, false);
        }
        cf_opts.set_write_buffer_size(options.entity_write_buffer_size);
    }

    let compression = if name == cf::ENTITIES && options.compress_entities {
        DBCompressionType::Lz4
    } else {
        DBCompressionType::None
    };
    cf_opts.set_compression_type(compression);
    cf_opts.set_block_based_table_factory(&block_opts);
    cf_opts
}
