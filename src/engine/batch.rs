//! Write batches
//!
//! An ordered set of puts applied by the engine as one atomic unit. Sessions
//! also use a batch as their transaction buffer, so lookups return the most
//! recent write for a key.

use std::collections::HashMap;

use bytes::Bytes;

/// Ordered, last-write-wins collection of puts
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    /// Writes in arrival order
    ops: Vec<(Bytes, Bytes)>,

    /// Key -> index of its latest write in `ops`
    latest: HashMap<Bytes, usize>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: Bytes, value: Bytes) {
        self.latest.insert(key.clone(), self.ops.len());
        self.ops.push((key, value));
    }

    /// Latest buffered value for `key`
    pub fn get(&self, key: &[u8]) -> Option<&Bytes> {
        self.latest.get(key).map(|&i| &self.ops[i].1)
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.latest.contains_key(key)
    }

    /// Writes in arrival order (duplicates included)
    pub fn iter(&self) -> impl Iterator<Item = &(Bytes, Bytes)> {
        self.ops.iter()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn clear(&mut self) {
        self.ops.clear();
        self.latest.clear();
    }
}
