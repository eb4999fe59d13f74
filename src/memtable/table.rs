//! MemTable implementation
//!
//! Partitioned BTreeMap memtable with RwLock for concurrency.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use parking_lot::RwLock;

use crate::engine::WriteBatch;

type Partition = BTreeMap<Bytes, Bytes>;

/// In-memory table of live key/value pairs
pub struct MemTable {
    /// Key space split by `crc32(key) % partitions.len()`
    partitions: Vec<RwLock<Partition>>,

    /// Approximate size in bytes (keys + values of live entries)
    size: AtomicUsize,
}

impl MemTable {
    /// Create a new empty MemTable with the given partition count (at least 1)
    pub fn new(partitions: usize) -> Self {
        let count = partitions.max(1);
        Self {
            partitions: (0..count).map(|_| RwLock::new(BTreeMap::new())).collect(),
            size: AtomicUsize::new(0),
        }
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    fn partition_of(&self, key: &[u8]) -> usize {
        crc32fast::hash(key) as usize % self.partitions.len()
    }

    /// Get a value by key (read lock on one partition)
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.partitions[self.partition_of(key)].read().get(key).cloned()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.partitions[self.partition_of(key)]
            .read()
            .contains_key(key)
    }

    /// Put a key-value pair (write lock on one partition)
    pub fn put(&self, key: Bytes, value: Bytes) {
        let mut partition = self.partitions[self.partition_of(&key)].write();
        self.insert(&mut partition, key, value);
    }

    /// Apply every write of a batch with all partitions locked
    ///
    /// Readers either see none of the batch or all of it.
    pub fn apply(&self, batch: &WriteBatch) {
        let mut guards: Vec<_> = self.partitions.iter().map(|p| p.write()).collect();
        for (key, value) in batch.iter() {
            let index = self.partition_of(key);
            self.insert(&mut guards[index], key.clone(), value.clone());
        }
    }

    fn insert(&self, partition: &mut Partition, key: Bytes, value: Bytes) {
        let key_len = key.len();
        let added = key_len + value.len();
        match partition.insert(key, value) {
            Some(old) => {
                self.size.fetch_sub(key_len + old.len(), Ordering::Relaxed);
                self.size.fetch_add(added, Ordering::Relaxed);
            }
            None => {
                self.size.fetch_add(added, Ordering::Relaxed);
            }
        }
    }

    /// Get approximate size in bytes
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    /// Get entry count across all partitions
    pub fn entry_count(&self) -> usize {
        self.partitions.iter().map(|p| p.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count() == 0
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new(1)
    }
}
