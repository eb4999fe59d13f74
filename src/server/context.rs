//! Server context
//!
//! Shared state of a running server: sessions, executors, open databases and
//! cluster routing tables.
//!
//! ## Concurrency
//! - `sessions`: concurrent map; `open_session` is insert-if-absent
//! - `executors`, `routing`: built in `new`, read-only afterwards
//! - `databases`: RwLock; written only by `create_database`, which is itself
//!   serialized by `create_lock`
//! - command dispatch takes no context-wide lock

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crossbeam::channel::Sender;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};

use crate::config::{ClusterConfig, DbInfo, DbList, FileDbList, ServerConfig};
use crate::engine::{DatabaseInstance, Engine, EngineOptions};
use crate::error::{KvdbError, Result};
use crate::protocol::{ClusterInfo, ClusterItem, Message, MessageContent, Response};

use super::executor::{Executor, ExecutorTable, Request};
use super::routing::{ClusterRouting, DatabaseInfo};
use super::session::Session;

/// Shared server state
pub struct ServerContext {
    config: ServerConfig,

    /// Connection key -> session
    sessions: DashMap<String, Arc<Session>>,

    executors: ExecutorTable,

    /// Database name -> open instance
    databases: RwLock<HashMap<String, DatabaseInstance>>,

    routing: ClusterRouting,

    dblist: Arc<dyn DbList>,

    /// Serializes `create_database`
    create_lock: Mutex<()>,
}

impl ServerContext {
    /// Open every enabled database of `dblist` and build the routing tables
    pub fn new(
        config: ServerConfig,
        dblist: Arc<dyn DbList>,
        clusters: Vec<ClusterItem>,
    ) -> Result<Self> {
        Self::with_executors(config, dblist, clusters, ExecutorTable::standard())
    }

    /// Like [`ServerContext::new`], dispatching through `executors`
    pub fn with_executors(
        config: ServerConfig,
        dblist: Arc<dyn DbList>,
        clusters: Vec<ClusterItem>,
        executors: ExecutorTable,
    ) -> Result<Self> {
        let routing = ClusterRouting::new(clusters)?;

        let mut databases = HashMap::new();
        for info in dblist.load()? {
            if databases.contains_key(&info.name) {
                return Err(KvdbError::Config(format!("duplicate database name: {}", info.name)));
            }
            let instance = open_instance(&config, &info)?;
            tracing::info!("Opened database {} at {}", info.name, info.path().display());
            databases.insert(info.name, instance);
        }

        Ok(Self {
            config,
            sessions: DashMap::new(),
            executors,
            databases: RwLock::new(databases),
            routing,
            dblist,
            create_lock: Mutex::new(()),
        })
    }

    /// Context backed by the database list and cluster files named in `config`
    pub fn open(config: ServerConfig) -> Result<Self> {
        let dblist = Arc::new(FileDbList::new(
            config.dblist_path.clone(),
            config.dbs_root_dir.clone(),
            config.dbs_partitions,
        ));
        let clusters = ClusterConfig::load(&config.cluster_path)?;
        Self::new(config, dblist, clusters)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Session for `key`, created with `publisher` if absent
    ///
    /// Racing callers for the same key all receive the same instance; the
    /// losers' publishers are dropped.
    pub fn open_session(&self, key: &str, publisher: Sender<Message>) -> Arc<Session> {
        self.sessions
            .entry(key.to_string())
            .or_insert_with(|| {
                tracing::debug!("Session opened: {}", key);
                Arc::new(Session::new(key, publisher))
            })
            .clone()
    }

    pub fn session(&self, key: &str) -> Option<Arc<Session>> {
        self.sessions.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Close and evict a session; uncommitted writes are discarded
    pub fn remove_session(&self, key: &str) {
        if let Some((_, session)) = self.sessions.remove(key) {
            session.close();
            tracing::debug!("Session removed: {}", key);
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    pub fn resolve_executor(&self, name: &str) -> &dyn Executor {
        self.executors.resolve(name)
    }

    /// Execute one inbound message for an existing session and publish the
    /// reply on that session's connection
    pub fn dispatch(&self, session_key: &str, message: Message) -> Result<()> {
        let session = self
            .session(session_key)
            .ok_or_else(|| KvdbError::SessionNotFound(session_key.to_string()))?;

        let content = match message.as_command() {
            Some(command) => {
                tracing::trace!("Dispatching {} from {}", command.name, session_key);
                let request = Request {
                    context: self,
                    session: &session,
                    command,
                };
                let executor = self.resolve_executor(&command.name);
                match panic::catch_unwind(AssertUnwindSafe(|| executor.execute(&request))) {
                    Ok(Ok(content)) => content,
                    Ok(Err(e)) => MessageContent::Response(Response::error(&e.to_string())),
                    Err(_) => {
                        tracing::error!("Executor for {} panicked ({})", command.name, session_key);
                        MessageContent::Response(Response::error(&format!(
                            "internal error executing {}",
                            command.name
                        )))
                    }
                }
            }
            None => MessageContent::Response(Response::error("expected a command message")),
        };

        session.publish(Message {
            id: message.id,
            content,
        })
    }

    // =========================================================================
    // Databases
    // =========================================================================

    pub fn database(&self, name: &str) -> Option<DatabaseInstance> {
        self.databases.read().get(name).cloned()
    }

    /// Names of open databases, sorted
    pub fn database_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.databases.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Open, persist and register a new database
    ///
    /// Runs one at a time. A duplicate name changes nothing. If persisting
    /// fails the freshly opened engine is closed and nothing is registered.
    pub fn create_database(&self, info: DbInfo) -> Result<DatabaseInstance> {
        let _guard = self.create_lock.lock();

        if self.databases.read().contains_key(&info.name) {
            return Err(KvdbError::DuplicateDatabase(info.name));
        }

        let instance = open_instance(&self.config, &info)?;
        if let Err(e) = self.dblist.create_database(&info) {
            let _ = instance.close();
            return Err(e);
        }
        self.databases
            .write()
            .insert(info.name.clone(), Arc::clone(&instance));

        tracing::info!(
            "Created database {} ({} partitions) at {}",
            info.name,
            info.partitions,
            info.path().display()
        );
        Ok(instance)
    }

    pub fn database_info(&self, name: &str) -> DatabaseInfo {
        self.routing.database_info(name)
    }

    pub fn cluster_info(&self) -> ClusterInfo {
        self.routing.cluster_info()
    }

    pub fn routing(&self) -> &ClusterRouting {
        &self.routing
    }

    /// Drop all sessions and close every database
    pub fn stop(&self) {
        for entry in self.sessions.iter() {
            entry.value().close();
        }
        self.sessions.clear();

        for (name, db) in self.databases.read().iter() {
            if let Err(e) = db.close() {
                tracing::warn!("Failed to close database {}: {}", name, e);
            }
        }
    }
}

fn open_instance(config: &ServerConfig, info: &DbInfo) -> Result<DatabaseInstance> {
    DbInfo::validate_partitions(info.partitions)?;
    let engine = Engine::open(EngineOptions {
        dir: info.path(),
        partitions: info.partitions,
        wal_sync_strategy: config.wal_sync_strategy,
    })?;
    Ok(Arc::new(engine))
}
