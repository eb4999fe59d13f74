//! Network Module
//!
//! TCP server and client connection handling.
//!
//! ## Architecture
//! - Single acceptor thread (non-blocking accept polled against a shutdown flag)
//! - One reader thread and one writer thread per connection
//! - Commands routed through the [`ServerContext`](crate::server::ServerContext)

mod connection;
mod server;

pub use connection::Connection;
pub use server::{ConnectionRegistry, ConnectionSlot, Server};
