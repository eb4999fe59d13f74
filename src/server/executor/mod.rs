//! Command executors
//!
//! One stateless executor per command verb. The [`ExecutorTable`] maps
//! lowercased command names to executors and always falls back to
//! [`UnknownExecutor`], so every name resolves to exactly one handler.

mod admin;
mod batch;
mod kv;

use std::collections::HashMap;

use crate::engine::DatabaseInstance;
use crate::error::{KvdbError, Result};
use crate::protocol::{Command, CommandType, MessageContent, Response};

use super::{ServerContext, Session};

pub use admin::{ClusterInfoExecutor, CreateDatabaseExecutor, ShowDatabasesExecutor, UseExecutor};
pub use batch::{BatchAbortExecutor, BatchBeginExecutor, BatchCommitExecutor};
pub use kv::{ExistsExecutor, GetExecutor, PutExecutor};

/// Everything an executor may touch for one command
pub struct Request<'a> {
    pub context: &'a ServerContext,
    pub session: &'a Session,
    pub command: &'a Command,
}

impl Request<'_> {
    /// The session's selected database
    pub fn database(&self) -> Result<DatabaseInstance> {
        let name = self
            .session
            .database()
            .ok_or_else(|| KvdbError::InvalidArgument("no database selected".to_string()))?;
        self.context
            .database(&name)
            .ok_or(KvdbError::DatabaseNotFound(name))
    }

    /// Parameter `index` as UTF-8 text
    pub fn text_parameter(&self, index: usize) -> Result<String> {
        let raw = self.command.parameters.get(index).ok_or_else(|| {
            KvdbError::InvalidArgument(format!("{}: missing parameter {}", self.command.name, index))
        })?;
        String::from_utf8(raw.to_vec()).map_err(|_| {
            KvdbError::InvalidArgument(format!("{}: parameter {} is not UTF-8", self.command.name, index))
        })
    }
}

/// Handler for one command verb
///
/// Errors returned here are turned into ERROR responses by the dispatcher.
pub trait Executor: Send + Sync {
    fn execute(&self, request: &Request<'_>) -> Result<MessageContent>;
}

/// Fallback for unrecognized command names
pub struct UnknownExecutor;

impl Executor for UnknownExecutor {
    fn execute(&self, request: &Request<'_>) -> Result<MessageContent> {
        Ok(MessageContent::Response(Response::error(&format!(
            "unknown command: {}",
            request.command.name
        ))))
    }
}

/// Command name -> executor, read-only once built
pub struct ExecutorTable {
    executors: HashMap<String, Box<dyn Executor>>,
    fallback: Box<dyn Executor>,
}

impl ExecutorTable {
    /// Empty table resolving every name to `fallback`
    pub fn new(fallback: impl Executor + 'static) -> Self {
        Self {
            executors: HashMap::new(),
            fallback: Box::new(fallback),
        }
    }

    /// Table with every built-in command registered
    pub fn standard() -> Self {
        let mut table = Self::new(UnknownExecutor);
        table.register(CommandType::Exists.name(), ExistsExecutor);
        table.register(CommandType::Get.name(), GetExecutor);
        table.register(CommandType::Put.name(), PutExecutor);
        table.register(CommandType::BatchBegin.name(), BatchBeginExecutor);
        table.register(CommandType::BatchAbort.name(), BatchAbortExecutor);
        table.register(CommandType::BatchCommit.name(), BatchCommitExecutor);
        table.register(CommandType::Use.name(), UseExecutor);
        table.register(CommandType::CreateDatabase.name(), CreateDatabaseExecutor);
        table.register(CommandType::ShowDatabases.name(), ShowDatabasesExecutor);
        table.register(CommandType::ClusterInfo.name(), ClusterInfoExecutor);
        table.register(CommandType::Unknown.name(), UnknownExecutor);
        table
    }

    pub fn register(&mut self, name: &str, executor: impl Executor + 'static) {
        self.executors
            .insert(name.to_ascii_lowercase(), Box::new(executor));
    }

    /// Case-insensitive lookup; misses resolve to the fallback
    pub fn resolve(&self, name: &str) -> &dyn Executor {
        self.executors
            .get(&name.to_ascii_lowercase())
            .map(Box::as_ref)
            .unwrap_or(self.fallback.as_ref())
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}

fn ok(response: Response) -> Result<MessageContent> {
    Ok(MessageContent::Response(response))
}
