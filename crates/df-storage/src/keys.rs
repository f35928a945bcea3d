//! Key encoding for storage operations
//!
//! Every key starts with a one-byte prefix followed by length-prefixed
//! strings, so a prefix built from the leading components only matches keys
//! with exactly those components.

use df_core::MAX_KEY_COMPONENT_LEN;

/// Prefix bytes for different key types
pub mod prefix {
    pub const ENTITY: u8 = 0x01;
    pub const KIND_INDEX: u8 = 0x02;
    pub const INCOMING: u8 = 0x03;
    pub const META: u8 = 0x08;
}

/// Key builder for storage operations
#[derive(Debug)]
pub struct KeyBuilder {
    buffer: Vec<u8>,
}

impl KeyBuilder {
    fn new(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Entity record key
    pub fn entity(id: &str) -> Vec<u8> {
        let mut builder = Self::new(3 + id.len());
        builder.push_u8(prefix::ENTITY);
        builder.push_string(id);
        builder.finish()
    }

    /// Prefix covering every entity record
    pub fn entity_prefix() -> Vec<u8> {
        vec![prefix::ENTITY]
    }

    /// Kind index key (major kind -> entity id)
    pub fn kind_index(major: &str, id: &str) -> Vec<u8> {
        let mut builder = Self::new(5 + major.len() + id.len());
        builder.push_u8(prefix::KIND_INDEX);
        builder.push_string(major);
        builder.push_string(id);
        builder.finish()
    }

    /// Prefix for scanning all entities of a major kind
    pub fn kind_index_prefix(major: &str) -> Vec<u8> {
        let mut builder = Self::new(3 + major.len());
        builder.push_u8(prefix::KIND_INDEX);
        builder.push_string(major);
        builder.finish()
    }

    /// Reverse adjacency key (target <- source via relationship)
    pub fn incoming(target: &str, source: &str, rel_id: &str) -> Vec<u8> {
        let mut builder = Self::new(7 + target.len() + source.len() + rel_id.len());
        builder.push_u8(prefix::INCOMING);
        builder.push_string(target);
        builder.push_string(source);
        builder.push_string(rel_id);
        builder.finish()
    }

    /// Prefix for scanning all edges pointing at a target
    pub fn incoming_prefix(target: &str) -> Vec<u8> {
        let mut builder = Self::new(3 + target.len());
        builder.push_u8(prefix::INCOMING);
        builder.push_string(target);
        builder.finish()
    }

    /// Store-level metadata key
    pub fn meta(key: &str) -> Vec<u8> {
        let mut builder = Self::new(3 + key.len());
        builder.push_u8(prefix::META);
        builder.push_string(key);
        builder.finish()
    }

    fn push_u8(&mut self, val: u8) {
        self.buffer.push(val);
    }

    /// Entities are validated before they reach a backend, so every
    /// component fits the two-byte length prefix.
    fn push_string(&mut self, s: &str) {
        let bytes = s.as_bytes();
        debug_assert!(bytes.len() <= MAX_KEY_COMPONENT_LEN, "key component too long");
        self.buffer
            .extend_from_slice(&(bytes.len() as u16).to_be_bytes());
        self.buffer.extend_from_slice(bytes);
    }

    fn finish(self) -> Vec<u8> {
        self.buffer
    }
}

/// Key decoder for parsing stored keys
pub struct KeyDecoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> KeyDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        let val = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(val)
    }

    /// Read a length-prefixed string
    pub fn read_string(&mut self) -> Option<&'a str> {
        let len_bytes: [u8; 2] = self.data.get(self.pos..self.pos + 2)?.try_into().ok()?;
        let len = u16::from_be_bytes(len_bytes) as usize;
        self.pos += 2;

        let s = std::str::from_utf8(self.data.get(self.pos..self.pos + len)?).ok()?;
        self.pos += len;
        Some(s)
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.data.len()
    }
}
