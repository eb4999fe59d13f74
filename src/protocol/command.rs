//! Command definitions
//!
//! Represents commands from clients. A command is a name plus an ordered
//! list of binary parameters; the name is matched case-insensitively.

use bytes::Bytes;

/// Command kinds understood by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType {
    Exists,
    Get,
    Put,
    BatchBegin,
    BatchAbort,
    BatchCommit,
    Use,
    CreateDatabase,
    ShowDatabases,
    ClusterInfo,
    /// Fallback target for every unrecognized name
    Unknown,
}

impl CommandType {
    /// Every command kind, fallback included
    pub const ALL: [CommandType; 11] = [
        CommandType::Exists,
        CommandType::Get,
        CommandType::Put,
        CommandType::BatchBegin,
        CommandType::BatchAbort,
        CommandType::BatchCommit,
        CommandType::Use,
        CommandType::CreateDatabase,
        CommandType::ShowDatabases,
        CommandType::ClusterInfo,
        CommandType::Unknown,
    ];

    /// Canonical wire name
    pub fn name(self) -> &'static str {
        match self {
            CommandType::Exists => "EXISTS",
            CommandType::Get => "GET",
            CommandType::Put => "PUT",
            CommandType::BatchBegin => "BATCH-BEGIN",
            CommandType::BatchAbort => "BATCH-ABORT",
            CommandType::BatchCommit => "BATCH-COMMIT",
            CommandType::Use => "USE",
            CommandType::CreateDatabase => "CREATE-DATABASE",
            CommandType::ShowDatabases => "SHOW-DATABASES",
            CommandType::ClusterInfo => "CLUSTER-INFO",
            CommandType::Unknown => "UNKNOWN",
        }
    }

    /// Case-insensitive lookup; unrecognized names map to `Unknown`
    pub fn from_name(name: &str) -> CommandType {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
            .unwrap_or(CommandType::Unknown)
    }
}

/// A client command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command name (case-insensitive)
    pub name: String,

    /// Positional parameters (keys, values, names)
    pub parameters: Vec<Bytes>,
}

impl Command {
    pub fn new(name: impl Into<String>, parameters: Vec<Bytes>) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }

    fn of(kind: CommandType, parameters: Vec<Bytes>) -> Self {
        Self::new(kind.name(), parameters)
    }

    /// Resolve the command kind from its name
    pub fn command_type(&self) -> CommandType {
        CommandType::from_name(&self.name)
    }

    pub fn exists(keys: &[Bytes]) -> Self {
        Self::of(CommandType::Exists, keys.to_vec())
    }

    pub fn get(keys: &[Bytes]) -> Self {
        Self::of(CommandType::Get, keys.to_vec())
    }

    /// Interleaved key, value sequence
    pub fn put(kvs: &[Bytes]) -> Self {
        Self::of(CommandType::Put, kvs.to_vec())
    }

    pub fn batch_begin() -> Self {
        Self::of(CommandType::BatchBegin, Vec::new())
    }

    pub fn batch_abort() -> Self {
        Self::of(CommandType::BatchAbort, Vec::new())
    }

    pub fn batch_commit() -> Self {
        Self::of(CommandType::BatchCommit, Vec::new())
    }

    pub fn use_database(name: &str) -> Self {
        Self::of(CommandType::Use, vec![Bytes::copy_from_slice(name.as_bytes())])
    }

    /// Create a database; partitions travel as decimal text
    pub fn create_database(name: &str, partitions: Option<u32>) -> Self {
        let mut parameters = vec![Bytes::copy_from_slice(name.as_bytes())];
        if let Some(partitions) = partitions {
            parameters.push(Bytes::from(partitions.to_string()));
        }
        Self::of(CommandType::CreateDatabase, parameters)
    }

    pub fn show_databases() -> Self {
        Self::of(CommandType::ShowDatabases, Vec::new())
    }

    pub fn cluster_info() -> Self {
        Self::of(CommandType::ClusterInfo, Vec::new())
    }
}
