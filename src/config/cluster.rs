//! Cluster configuration
//!
//! ```text
//! cluster.orders.0=kvdb://10.0.0.1:7060/orders
//! cluster.orders.1=kvdb://10.0.0.2:7060/orders
//! ```
//!
//! Urls of a cluster are ordered by their numeric index.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use super::parse_properties;
use crate::error::{KvdbError, Result};
use crate::protocol::ClusterItem;

const PREFIX: &str = "cluster";

/// Loader for cluster definitions
pub struct ClusterConfig;

impl ClusterConfig {
    /// Load every cluster from `path`; a missing file means no clusters
    pub fn load(path: &Path) -> Result<Vec<ClusterItem>> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Parse cluster definitions, sorted by cluster name
    pub fn parse(text: &str) -> Result<Vec<ClusterItem>> {
        let mut clusters: BTreeMap<String, BTreeMap<u32, String>> = BTreeMap::new();

        for (key, value) in parse_properties(text)? {
            let parts: Vec<&str> = key.split('.').collect();
            if parts.first() != Some(&PREFIX) {
                continue;
            }
            if parts.len() != 3 {
                return Err(KvdbError::Config(format!("malformed cluster key: {}", key)));
            }
            let index = parts[2]
                .parse::<u32>()
                .map_err(|_| KvdbError::Config(format!("{}: index must be a number", key)))?;
            let urls = clusters.entry(parts[1].to_string()).or_default();
            if urls.insert(index, value).is_some() {
                return Err(KvdbError::Config(format!("duplicate cluster entry: {}", key)));
            }
        }

        Ok(clusters
            .into_iter()
            .map(|(name, urls)| ClusterItem::new(name, urls.into_values().collect()))
            .collect())
    }
}
