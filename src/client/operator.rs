//! Client operator
//!
//! Typed key-value API over a [`MessageTransport`].
//!
//! Error mapping for every call:
//! - no reply before the deadline -> [`KvdbError::Timeout`]
//! - ERROR reply -> [`KvdbError::Operation`] with the server's message
//! - malformed SUCCESS reply -> [`KvdbError::Protocol`]

use std::time::Duration;

use bytes::Bytes;

use super::transport::{MessageTransport, Transport};
use crate::config::ClientConfig;
use crate::error::{KvdbError, Result};
use crate::protocol::{decode_flag, ClusterInfo, Command, MessageContent, Response};

/// Key-value operations available to clients
pub trait KvdbOperator {
    fn exists(&self, key: &[u8]) -> Result<bool>;

    /// One flag per key, in key order
    fn exists_many(&self, keys: &[Bytes]) -> Result<Vec<bool>>;

    fn get(&self, key: &[u8]) -> Result<Option<Bytes>>;

    /// One value per key, in key order; missing keys are `None`
    fn get_many(&self, keys: &[Bytes]) -> Result<Vec<Option<Bytes>>>;

    /// Store interleaved `key, value, key, value, ...`
    fn put(&self, kvs: &[Bytes]) -> Result<()>;

    fn batch_begin(&self) -> Result<()>;

    fn batch_abort(&self) -> Result<()>;

    fn batch_commit(&self) -> Result<()>;
}

/// Operator bound to a single server connection
pub struct KvdbSingle<T: MessageTransport = Transport> {
    transport: T,
}

impl KvdbSingle<Transport> {
    /// Connect using `config`, selecting its database if one is named
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let transport = Transport::connect(&config.addr, Duration::from_millis(config.timeout_ms))?;
        let client = Self::new(transport);
        if let Some(database) = &config.database {
            client.use_database(database)?;
        }
        Ok(client)
    }

    pub fn close(&self) {
        self.transport.close();
    }
}

impl<T: MessageTransport> KvdbSingle<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send a command and unwrap a SUCCESS response
    fn call(&self, command: Command) -> Result<Response> {
        let reply = self.transport.send(command)?;
        match reply.content {
            MessageContent::Response(response) if response.is_success() => Ok(response),
            MessageContent::Response(response) => Err(KvdbError::Operation(
                response.error_message().unwrap_or_default(),
            )),
            other => Err(KvdbError::Protocol(format!(
                "expected a response, got {:?}",
                other
            ))),
        }
    }

    fn expect_len(response: &Response, expected: usize) -> Result<()> {
        if response.result.len() != expected {
            return Err(KvdbError::Protocol(format!(
                "expected {} results, got {}",
                expected,
                response.result.len()
            )));
        }
        Ok(())
    }

    /// Select the database subsequent commands run against
    ///
    /// Returns the owning cluster's name for a clustered database.
    pub fn use_database(&self, name: &str) -> Result<Option<String>> {
        let response = self.call(Command::use_database(name))?;
        match response.result.into_iter().next().flatten() {
            Some(cluster) => String::from_utf8(cluster.to_vec())
                .map(Some)
                .map_err(|_| KvdbError::Protocol("cluster name is not UTF-8".to_string())),
            None => Ok(None),
        }
    }

    pub fn create_database(&self, name: &str, partitions: Option<u32>) -> Result<()> {
        self.call(Command::create_database(name, partitions))?;
        Ok(())
    }

    pub fn show_databases(&self) -> Result<Vec<String>> {
        let response = self.call(Command::show_databases())?;
        response
            .result
            .into_iter()
            .map(|name| {
                name.and_then(|n| String::from_utf8(n.to_vec()).ok())
                    .ok_or_else(|| KvdbError::Protocol("bad database name".to_string()))
            })
            .collect()
    }

    /// Topology for routing-aware clients
    pub fn cluster_info(&self) -> Result<ClusterInfo> {
        let reply = self.transport.send(Command::cluster_info())?;
        match reply.content {
            MessageContent::ClusterInfo(info) => Ok(info),
            MessageContent::Response(response) if !response.is_success() => Err(
                KvdbError::Operation(response.error_message().unwrap_or_default()),
            ),
            other => Err(KvdbError::Protocol(format!(
                "expected cluster info, got {:?}",
                other
            ))),
        }
    }
}

impl<T: MessageTransport> KvdbOperator for KvdbSingle<T> {
    fn exists(&self, key: &[u8]) -> Result<bool> {
        let flags = self.exists_many(&[Bytes::copy_from_slice(key)])?;
        Ok(flags[0])
    }

    fn exists_many(&self, keys: &[Bytes]) -> Result<Vec<bool>> {
        let response = self.call(Command::exists(keys))?;
        Self::expect_len(&response, keys.len())?;
        response
            .result
            .iter()
            .map(|flag| {
                flag.as_deref()
                    .and_then(decode_flag)
                    .ok_or_else(|| KvdbError::Protocol("malformed existence flag".to_string()))
            })
            .collect()
    }

    fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        let mut values = self.get_many(&[Bytes::copy_from_slice(key)])?;
        Ok(values.swap_remove(0))
    }

    fn get_many(&self, keys: &[Bytes]) -> Result<Vec<Option<Bytes>>> {
        let response = self.call(Command::get(keys))?;
        Self::expect_len(&response, keys.len())?;
        Ok(response.result)
    }

    fn put(&self, kvs: &[Bytes]) -> Result<()> {
        if kvs.is_empty() || kvs.len() % 2 != 0 {
            return Err(KvdbError::InvalidArgument(
                "keys and values must be in pairs".to_string(),
            ));
        }
        self.call(Command::put(kvs))?;
        Ok(())
    }

    fn batch_begin(&self) -> Result<()> {
        self.call(Command::batch_begin())?;
        Ok(())
    }

    fn batch_abort(&self) -> Result<()> {
        self.call(Command::batch_abort())?;
        Ok(())
    }

    fn batch_commit(&self) -> Result<()> {
        self.call(Command::batch_commit())?;
        Ok(())
    }
}
