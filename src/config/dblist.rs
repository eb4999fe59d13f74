//! Database list
//!
//! The persisted set of databases a server opens at startup. The file form is
//! a properties file:
//!
//! ```text
//! db.orders.enable=true
//! db.orders.rootdir=/var/lib/kvdb
//! db.orders.partitions=8
//! ```
//!
//! Disabled databases are skipped; a missing `rootdir` or `partitions` falls
//! back to the server defaults. When a key repeats, the later line wins, so
//! appending a new block re-defines a database.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::parse_properties;
use crate::error::{KvdbError, Result};

const PREFIX: &str = "db";
const ENABLE: &str = "enable";
const ROOTDIR: &str = "rootdir";
const PARTITIONS: &str = "partitions";

/// Upper bound on memtable partitions per database
pub const MAX_PARTITIONS: usize = 1024;

/// Persisted description of one database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbInfo {
    pub name: String,
    pub root_dir: PathBuf,
    pub partitions: usize,
    pub enabled: bool,
}

impl DbInfo {
    pub fn new(name: impl Into<String>, root_dir: impl Into<PathBuf>, partitions: usize) -> Self {
        Self {
            name: name.into(),
            root_dir: root_dir.into(),
            partitions,
            enabled: true,
        }
    }

    /// Directory holding this database's files
    pub fn path(&self) -> PathBuf {
        self.root_dir.join(&self.name)
    }

    /// Names become directory names and property key segments
    pub fn validate_name(name: &str) -> Result<()> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(())
        } else {
            Err(KvdbError::InvalidArgument(format!(
                "invalid database name {:?}: use letters, digits, '_' or '-'",
                name
            )))
        }
    }

    /// Partition counts must lie in `1..=MAX_PARTITIONS`
    pub fn validate_partitions(partitions: usize) -> Result<()> {
        if (1..=MAX_PARTITIONS).contains(&partitions) {
            Ok(())
        } else {
            Err(KvdbError::InvalidArgument(format!(
                "partitions must be between 1 and {}, got {}",
                MAX_PARTITIONS, partitions
            )))
        }
    }
}

/// Configuration collaborator for database definitions
pub trait DbList: Send + Sync {
    /// All enabled databases
    fn load(&self) -> Result<Vec<DbInfo>>;

    /// Durably record a new database before it is registered
    fn create_database(&self, info: &DbInfo) -> Result<()>;
}

/// Properties-file backed database list
pub struct FileDbList {
    path: PathBuf,
    default_root_dir: PathBuf,
    default_partitions: usize,

    /// Serializes appends
    write_lock: Mutex<()>,
}

impl FileDbList {
    pub fn new(
        path: impl Into<PathBuf>,
        default_root_dir: impl Into<PathBuf>,
        default_partitions: usize,
    ) -> Self {
        Self {
            path: path.into(),
            default_root_dir: default_root_dir.into(),
            default_partitions,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(&self, text: &str) -> Result<Vec<DbInfo>> {
        let mut enable: BTreeMap<String, bool> = BTreeMap::new();
        let mut rootdir: BTreeMap<String, String> = BTreeMap::new();
        let mut partitions: BTreeMap<String, String> = BTreeMap::new();

        for (key, value) in parse_properties(text)? {
            let parts: Vec<&str> = key.split('.').collect();
            if parts.first() != Some(&PREFIX) {
                continue;
            }
            if parts.len() != 3 {
                return Err(KvdbError::Config(format!("malformed database key: {}", key)));
            }
            let (name, field) = (parts[1].to_string(), parts[2]);
            match field {
                ENABLE => {
                    let flag = value.parse::<bool>().map_err(|_| {
                        KvdbError::Config(format!("{}: expected true or false, got {:?}", key, value))
                    })?;
                    enable.insert(name, flag);
                }
                ROOTDIR => {
                    rootdir.insert(name, value);
                }
                PARTITIONS => {
                    partitions.insert(name, value);
                }
                _ => {
                    return Err(KvdbError::Config(format!("unknown database property: {}", key)));
                }
            }
        }

        let mut dbs = Vec::new();
        for (name, enabled) in enable {
            if !enabled {
                continue;
            }
            DbInfo::validate_name(&name).map_err(|e| KvdbError::Config(e.to_string()))?;
            let root_dir = rootdir
                .get(&name)
                .map(PathBuf::from)
                .unwrap_or_else(|| self.default_root_dir.clone());
            let partitions = match partitions.get(&name) {
                Some(raw) => raw.parse::<usize>().map_err(|_| {
                    KvdbError::Config(format!("db.{}.partitions: not a number: {:?}", name, raw))
                })?,
                None => self.default_partitions,
            };
            DbInfo::validate_partitions(partitions)
                .map_err(|e| KvdbError::Config(format!("db.{}.partitions: {}", name, e)))?;
            dbs.push(DbInfo {
                name,
                root_dir,
                partitions,
                enabled,
            });
        }
        Ok(dbs)
    }
}

impl DbList for FileDbList {
    fn load(&self) -> Result<Vec<DbInfo>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => self.parse(&text),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn create_database(&self, info: &DbInfo) -> Result<()> {
        let _guard = self.write_lock.lock();
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let record = format!(
            "\n{p}.{n}.{e}=true\n{p}.{n}.{r}={root}\n{p}.{n}.{pa}={parts}\n",
            p = PREFIX,
            n = info.name,
            e = ENABLE,
            r = ROOTDIR,
            root = info.root_dir.display(),
            pa = PARTITIONS,
            parts = info.partitions,
        );
        file.write_all(record.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }
}

/// In-memory database list, for embedding and tests
#[derive(Default)]
pub struct MemoryDbList {
    dbs: Mutex<Vec<DbInfo>>,
}

impl MemoryDbList {
    pub fn new(dbs: Vec<DbInfo>) -> Self {
        Self {
            dbs: Mutex::new(dbs),
        }
    }

    /// Snapshot of everything recorded so far
    pub fn databases(&self) -> Vec<DbInfo> {
        self.dbs.lock().clone()
    }
}

impl DbList for MemoryDbList {
    fn load(&self) -> Result<Vec<DbInfo>> {
        Ok(self.dbs.lock().iter().filter(|db| db.enabled).cloned().collect())
    }

    fn create_database(&self, info: &DbInfo) -> Result<()> {
        let mut dbs = self.dbs.lock();
        dbs.retain(|db| db.name != info.name);
        dbs.push(info.clone());
        Ok(())
    }
}
