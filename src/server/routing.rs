//! Cluster routing metadata
//!
//! Built once at startup from the configured clusters: every member url is
//! parsed as a KVDB URI and the database it names is mapped back to its
//! cluster. A database without an entry runs standalone.

use std::collections::HashMap;

use crate::error::{KvdbError, Result};
use crate::protocol::{ClusterInfo, ClusterItem, KvdbUri};

/// Cluster membership of one database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseInfo {
    pub cluster_mode: bool,
    pub cluster_item: Option<ClusterItem>,
}

impl DatabaseInfo {
    pub fn standalone() -> Self {
        Self {
            cluster_mode: false,
            cluster_item: None,
        }
    }

    pub fn clustered(item: ClusterItem) -> Self {
        Self {
            cluster_mode: true,
            cluster_item: Some(item),
        }
    }
}

/// Read-only routing tables
#[derive(Debug, Default)]
pub struct ClusterRouting {
    /// Cluster name -> definition
    clusters: HashMap<String, ClusterItem>,

    /// Database name -> cluster name
    db_clusters: HashMap<String, String>,
}

impl ClusterRouting {
    /// Build the routing index
    ///
    /// Fails on a malformed url, a repeated cluster name, or a database that
    /// belongs to more than one cluster.
    pub fn new(items: Vec<ClusterItem>) -> Result<Self> {
        let mut clusters = HashMap::with_capacity(items.len());
        let mut db_clusters: HashMap<String, String> = HashMap::new();

        for item in items {
            for url in &item.urls {
                let uri = KvdbUri::parse(url)?;
                match db_clusters.get(&uri.database) {
                    Some(owner) if owner != &item.name => {
                        return Err(KvdbError::Config(format!(
                            "database {} is claimed by clusters {} and {}",
                            uri.database, owner, item.name
                        )));
                    }
                    Some(_) => {}
                    None => {
                        db_clusters.insert(uri.database, item.name.clone());
                    }
                }
            }
            let name = item.name.clone();
            if clusters.insert(name.clone(), item).is_some() {
                return Err(KvdbError::Config(format!("duplicate cluster name: {}", name)));
            }
        }

        Ok(Self {
            clusters,
            db_clusters,
        })
    }

    /// Cluster owning `database`, if any
    pub fn cluster_of(&self, database: &str) -> Option<&str> {
        self.db_clusters.get(database).map(String::as_str)
    }

    pub fn cluster(&self, name: &str) -> Option<&ClusterItem> {
        self.clusters.get(name)
    }

    pub fn database_info(&self, database: &str) -> DatabaseInfo {
        self.cluster_of(database)
            .and_then(|cluster| self.clusters.get(cluster))
            .map(|item| DatabaseInfo::clustered(item.clone()))
            .unwrap_or_else(DatabaseInfo::standalone)
    }

    /// Whole topology, clusters sorted by name
    pub fn cluster_info(&self) -> ClusterInfo {
        let mut clusters: Vec<ClusterItem> = self.clusters.values().cloned().collect();
        clusters.sort_by(|a, b| a.name.cmp(&b.name));
        ClusterInfo { clusters }
    }
}
