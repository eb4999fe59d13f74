//! Session
//!
//! Server-side state of one client connection: its identity key, the
//! selected database, the batch-transaction state machine and the channel
//! its responses are published on.
//!
//! ## Batch State Machine
//! ```text
//!              batch_begin
//!  AUTOCOMMIT ─────────────▶ BATCHING
//!      ▲                        │
//!      └────────────────────────┘
//!        batch_commit / batch_abort
//! ```
//! While `BATCHING`, writes are buffered in the session and reads from this
//! session see them. Nothing reaches the storage engine before commit, which
//! applies the whole buffer as one atomic batch.
//!
//! Out-of-state transitions (begin while batching, commit or abort while
//! autocommitting) fail and leave the state untouched.

use bytes::Bytes;
use crossbeam::channel::Sender;
use parking_lot::Mutex;

use crate::engine::{StorageEngine, WriteBatch};
use crate::error::{KvdbError, Result};
use crate::protocol::Message;

/// Transaction mode of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    AutoCommit,
    Batching,
}

struct SessionState {
    mode: TransactionMode,

    /// Writes buffered while batching
    batch: WriteBatch,

    /// Database selected with USE
    database: Option<String>,

    closed: bool,
}

/// Per-connection server state
pub struct Session {
    key: String,
    state: Mutex<SessionState>,
    publisher: Sender<Message>,
}

impl Session {
    pub fn new(key: impl Into<String>, publisher: Sender<Message>) -> Self {
        Self {
            key: key.into(),
            state: Mutex::new(SessionState {
                mode: TransactionMode::AutoCommit,
                batch: WriteBatch::new(),
                database: None,
                closed: false,
            }),
            publisher,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn mode(&self) -> TransactionMode {
        self.state.lock().mode
    }

    /// Number of writes waiting for commit
    pub fn pending_writes(&self) -> usize {
        self.state.lock().batch.len()
    }

    pub fn database(&self) -> Option<String> {
        self.state.lock().database.clone()
    }

    /// Select the database later commands run against
    ///
    /// Rejected while batching: the buffer belongs to the current database.
    pub fn set_database(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.mode == TransactionMode::Batching {
            return Err(KvdbError::InvalidArgument(
                "cannot switch database inside a batch".to_string(),
            ));
        }
        state.database = Some(name.to_string());
        Ok(())
    }

    // =========================================================================
    // Batch Transitions
    // =========================================================================

    pub fn batch_begin(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.mode == TransactionMode::Batching {
            return Err(KvdbError::InvalidArgument("batch already started".to_string()));
        }
        state.mode = TransactionMode::Batching;
        Ok(())
    }

    /// Drop buffered writes without touching the storage engine
    pub fn batch_abort(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.mode != TransactionMode::Batching {
            return Err(KvdbError::InvalidArgument("no batch in progress".to_string()));
        }
        state.batch.clear();
        state.mode = TransactionMode::AutoCommit;
        Ok(())
    }

    /// Apply buffered writes to `db` as one atomic batch
    ///
    /// The session is back in autocommit mode afterwards whether or not the
    /// engine accepted the batch. Returns the number of writes applied.
    pub fn batch_commit(&self, db: &dyn StorageEngine) -> Result<usize> {
        let batch = {
            let mut state = self.state.lock();
            if state.mode != TransactionMode::Batching {
                return Err(KvdbError::InvalidArgument("no batch in progress".to_string()));
            }
            state.mode = TransactionMode::AutoCommit;
            std::mem::take(&mut state.batch)
        };
        db.write_batch(&batch)?;
        Ok(batch.len())
    }

    // =========================================================================
    // Data Access
    // =========================================================================

    /// Read a key, preferring this session's uncommitted writes
    pub fn get(&self, db: &dyn StorageEngine, key: &[u8]) -> Result<Option<Bytes>> {
        if let Some(value) = self.buffered(key) {
            return Ok(Some(value));
        }
        db.get(key)
    }

    pub fn exists(&self, db: &dyn StorageEngine, key: &[u8]) -> Result<bool> {
        if self.buffered(key).is_some() {
            return Ok(true);
        }
        db.exists(key)
    }

    fn buffered(&self, key: &[u8]) -> Option<Bytes> {
        let state = self.state.lock();
        if state.mode != TransactionMode::Batching {
            return None;
        }
        state.batch.get(key).cloned()
    }

    /// Write key/value pairs: buffered while batching, applied otherwise
    ///
    /// In autocommit mode a multi-pair put is applied as one batch.
    pub fn put(&self, db: &dyn StorageEngine, pairs: Vec<(Bytes, Bytes)>) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.mode == TransactionMode::Batching {
                for (key, value) in pairs {
                    state.batch.put(key, value);
                }
                return Ok(());
            }
        }

        match pairs.len() {
            0 => Ok(()),
            1 => db.put(&pairs[0].0, &pairs[0].1),
            _ => {
                let mut batch = WriteBatch::new();
                for (key, value) in pairs {
                    batch.put(key, value);
                }
                db.write_batch(&batch)
            }
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Queue a message for the connection's writer
    pub fn publish(&self, message: Message) -> Result<()> {
        self.publisher
            .send(message)
            .map_err(|_| KvdbError::Network(format!("connection {} is gone", self.key)))
    }

    /// Discard uncommitted writes and mark the session closed
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.mode == TransactionMode::Batching {
            tracing::debug!(
                "Session {} closed with {} uncommitted writes",
                self.key,
                state.batch.len()
            );
        }
        state.batch.clear();
        state.mode = TransactionMode::AutoCommit;
        state.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}
