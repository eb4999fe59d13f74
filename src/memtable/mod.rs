//! MemTable Module
//!
//! In-memory data structure holding the live key space of one database.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Many concurrent readers, writers serialized by the engine
//! - Keys spread over a fixed number of partitions (CRC32 of the key)
//! - Batches become visible all at once
//!
//! ## Data Structure Choice
//! One BTreeMap per partition, each behind its own RwLock. Point operations
//! only lock the partition owning the key; a batch locks every partition in
//! index order before applying anything.

mod table;

pub use table::MemTable;
