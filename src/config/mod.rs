//! Configuration for kvdb
//!
//! Centralized server and client configuration with sensible defaults, plus
//! the file-backed collaborators that describe databases and clusters.

mod cluster;
mod dblist;
mod properties;

use std::path::PathBuf;

pub use cluster::ClusterConfig;
pub use dblist::{DbInfo, DbList, FileDbList, MemoryDbList, MAX_PARTITIONS};
pub use properties::parse_properties;

/// Main configuration for a kvdb server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Default root directory for databases that do not name their own.
    /// Each database lives in `{root_dir}/{name}/`.
    pub dbs_root_dir: PathBuf,

    /// Default partition count for new databases
    pub dbs_partitions: usize,

    /// Sync strategy: how often to fsync each database's WAL
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // Collaborator Files
    // -------------------------------------------------------------------------
    /// Database list (`db.<name>.enable=...`)
    pub dblist_path: PathBuf,

    /// Cluster definitions (`cluster.<name>.<index>=kvdb://...`)
    pub cluster_path: PathBuf,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 disables)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 disables)
    pub write_timeout_ms: u64,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            dbs_root_dir: PathBuf::from("./kvdb_data"),
            dbs_partitions: 4,
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            dblist_path: PathBuf::from("./config/dblist"),
            cluster_path: PathBuf::from("./config/cluster"),
            listen_addr: "127.0.0.1:7060".to_string(),
            max_connections: 1024,
            read_timeout_ms: 0,
            write_timeout_ms: 5000,
        }
    }
}

impl ServerConfig {
    /// Create a new config builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

/// Builder for ServerConfig
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Set the default databases root directory
    pub fn dbs_root_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.dbs_root_dir = path.into();
        self
    }

    /// Set the default partition count
    pub fn dbs_partitions(mut self, partitions: usize) -> Self {
        self.config.dbs_partitions = partitions;
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    pub fn dblist_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.dblist_path = path.into();
        self
    }

    pub fn cluster_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cluster_path = path.into();
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}

/// Client connection settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address (host:port)
    pub addr: String,

    /// Per-request response deadline (milliseconds)
    pub timeout_ms: u64,

    /// Database selected right after connecting
    pub database: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:7060".to_string(),
            timeout_ms: 60_000,
            database: None,
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for ClientConfig
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn addr(mut self, addr: impl Into<String>) -> Self {
        self.config.addr = addr.into();
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    pub fn database(mut self, name: impl Into<String>) -> Self {
        self.config.database = Some(name.into());
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
