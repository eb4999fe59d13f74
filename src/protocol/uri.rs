//! KVDB URI
//!
//! Cluster members are addressed as `kvdb://host:port/database`.

use std::fmt;
use std::str::FromStr;

use crate::error::{KvdbError, Result};

pub const SCHEME: &str = "kvdb";

/// A parsed `kvdb://host:port/database` address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KvdbUri {
    pub host: String,
    pub port: u16,
    pub database: String,
}

impl KvdbUri {
    pub fn parse(uri: &str) -> Result<Self> {
        let invalid = |reason: &str| KvdbError::Config(format!("invalid kvdb uri {:?}: {}", uri, reason));

        let rest = uri
            .strip_prefix(SCHEME)
            .and_then(|r| r.strip_prefix("://"))
            .ok_or_else(|| invalid("expected kvdb:// scheme"))?;

        let (authority, database) = rest
            .split_once('/')
            .ok_or_else(|| invalid("missing database path"))?;
        let database = database.trim_end_matches('/');
        if database.is_empty() || database.contains('/') {
            return Err(invalid("database path must be a single segment"));
        }

        let (host, port) = authority
            .rsplit_once(':')
            .ok_or_else(|| invalid("missing port"))?;
        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        let port = port.parse::<u16>().map_err(|_| invalid("bad port"))?;

        Ok(Self {
            host: host.to_string(),
            port,
            database: database.to_string(),
        })
    }

    /// `host:port` suitable for `TcpStream::connect`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl FromStr for KvdbUri {
    type Err = KvdbError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for KvdbUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}/{}", SCHEME, self.host, self.port, self.database)
    }
}
