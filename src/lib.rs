//! # kvdb
//!
//! A networked key-value store serving several named databases:
//! - Typed commands (EXISTS / GET / PUT) over persistent TCP connections
//! - Per-connection sessions with batch transactions (read-your-writes,
//!   atomic commit, abort)
//! - Request/response correlation with per-request timeouts on the client
//! - Cluster routing metadata mapping databases to shard groups
//! - WAL-backed embedded storage engine with crash recovery
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────┐          ┌──────────────────────────────────────┐
//! │ KvdbSingle (typed)   │          │ Server (accept loop)                 │
//! │        │             │  frames  │        │                             │
//! │ Transport ───────────┼─────────▶│ Connection (reader + writer thread)  │
//! │ (pending slots,      │◀─────────┼────────┤                             │
//! │  timeouts)           │          │ ServerContext::dispatch              │
//! └──────────────────────┘          │   ├─ Session (batch state)           │
//!                                   │   ├─ ExecutorTable (+ fallback)      │
//!                                   │   ├─ ClusterRouting                  │
//!                                   │   └─ databases ──▶ Engine            │
//!                                   │                    (WAL + MemTable)  │
//!                                   └──────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod client;
pub mod engine;
pub mod memtable;
pub mod network;
pub mod protocol;
pub mod server;
pub mod wal;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use client::{KvdbOperator, KvdbSingle};
pub use config::{ClientConfig, ServerConfig};
pub use engine::{Engine, StorageEngine};
pub use error::{KvdbError, Result};
pub use server::ServerContext;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of kvdb
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
