//! Engine Module
//!
//! The embedded storage engine backing one database instance.
//!
//! ## Responsibilities
//! - Point lookups and writes
//! - Atomic batch writes (all-or-nothing, on disk and in memory)
//! - Crash recovery on startup
//!
//! The server only depends on the [`StorageEngine`] contract; [`Engine`] is
//! the WAL + partitioned memtable implementation shipped with the crate.

mod batch;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::config::WalSyncStrategy;
use crate::error::{KvdbError, Result};
use crate::memtable::MemTable;
use crate::wal::{Operation, WalRecovery, WalWriter};

pub use batch::WriteBatch;

/// Contract the server requires from a storage engine
pub trait StorageEngine: Send + Sync {
    /// Point lookup
    fn get(&self, key: &[u8]) -> Result<Option<Bytes>>;

    fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Apply every write in `batch` atomically
    fn write_batch(&self, batch: &WriteBatch) -> Result<()>;

    /// Flush and release resources; later calls fail
    fn close(&self) -> Result<()>;
}

/// Shared handle to an open database
pub type DatabaseInstance = Arc<dyn StorageEngine>;

/// Options for opening an [`Engine`]
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Directory holding this database's files
    pub dir: PathBuf,

    /// Number of memtable partitions
    pub partitions: usize,

    pub wal_sync_strategy: WalSyncStrategy,
}

/// WAL-backed in-memory engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader
///
/// - **Writes** (put/write_batch): serialized by `write_lock`, logged to the
///   WAL, then applied to the memtable
/// - **Reads** (get): lock only the memtable partition owning the key
pub struct Engine {
    dir: PathBuf,

    /// Write-ahead log for durability (exclusive access needed)
    wal: Mutex<WalWriter>,

    /// Live key space (internal RwLocks)
    memtable: MemTable,

    /// Serializes write operations
    write_lock: Mutex<()>,

    closed: AtomicBool,
}

impl Engine {
    const WAL_FILENAME: &'static str = "wal.log";

    /// Open or create an engine
    ///
    /// On startup:
    /// 1. Create the database directory
    /// 2. Replay the WAL into the memtable, truncating a torn tail
    /// 3. Reopen the WAL for appends
    pub fn open(options: EngineOptions) -> Result<Self> {
        fs::create_dir_all(&options.dir)?;
        let wal_path = options.dir.join(Self::WAL_FILENAME);
        let memtable = MemTable::new(options.partitions);

        let mut next_lsn = 1;
        if wal_path.exists() {
            let (entries, recovery) = WalRecovery::recover(&wal_path)?;
            if recovery.entries_recovered > 0 || recovery.was_truncated {
                tracing::info!(
                    "WAL recovery for {}: {} entries, last_lsn={}, truncated={}",
                    options.dir.display(),
                    recovery.entries_recovered,
                    recovery.last_lsn,
                    recovery.was_truncated
                );
            }

            for entry in entries {
                match entry.operation {
                    Operation::Put { key, value } => memtable.put(key.into(), value.into()),
                    Operation::Batch { pairs } => {
                        let mut batch = WriteBatch::new();
                        for (key, value) in pairs {
                            batch.put(key.into(), value.into());
                        }
                        memtable.apply(&batch);
                    }
                }
            }
            next_lsn = recovery.last_lsn + 1;
        }

        let wal = WalWriter::open(&wal_path, options.wal_sync_strategy, next_lsn)?;

        Ok(Self {
            dir: options.dir,
            wal: Mutex::new(wal),
            memtable,
            write_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(KvdbError::Storage(format!(
                "database at {} is closed",
                self.dir.display()
            )));
        }
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entry_count(&self) -> usize {
        self.memtable.entry_count()
    }

    pub fn partition_count(&self) -> usize {
        self.memtable.partition_count()
    }
}

impl StorageEngine for Engine {
    fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        self.ensure_open()?;
        Ok(self.memtable.get(key))
    }

    fn exists(&self, key: &[u8]) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.memtable.contains(key))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        self.ensure_open()?;

        self.wal.lock().append(Operation::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        })?;
        self.memtable
            .put(Bytes::copy_from_slice(key), Bytes::copy_from_slice(value));
        Ok(())
    }

    fn write_batch(&self, batch: &WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let _write_guard = self.write_lock.lock();
        self.ensure_open()?;

        let pairs = batch
            .iter()
            .map(|(k, v)| (k.to_vec(), v.to_vec()))
            .collect();
        self.wal.lock().append(Operation::Batch { pairs })?;
        self.memtable.apply(batch);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.wal.lock().sync()
    }
}
