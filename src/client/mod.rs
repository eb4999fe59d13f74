//! Client Module
//!
//! Blocking client for kvdb servers.
//!
//! ```ignore
//! use kvdb::client::{KvdbOperator, KvdbSingle};
//! use kvdb::config::ClientConfig;
//!
//! let config = ClientConfig::builder().addr("127.0.0.1:7060").database("orders").build();
//! let client = KvdbSingle::connect(&config)?;
//! client.put(&["k1".into(), "v1".into()])?;
//! assert_eq!(client.get(b"k1")?, Some("v1".into()));
//! ```

mod operator;
mod transport;

pub use operator::{KvdbOperator, KvdbSingle};
pub use transport::{MessageTransport, Transport};
