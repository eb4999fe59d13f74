//! Server Module
//!
//! Session lifecycle and command dispatch.
//!
//! ## Architecture
//! - [`ServerContext`]: owns sessions, executors, databases and routing
//! - [`Session`]: per-connection state and batch-transaction machine
//! - [`executor`]: one stateless handler per command verb
//! - [`routing`]: database -> cluster index built at startup

pub mod executor;
pub mod routing;

mod context;
mod session;

pub use context::ServerContext;
pub use executor::{Executor, ExecutorTable, Request};
pub use routing::{ClusterRouting, DatabaseInfo};
pub use session::{Session, TransactionMode};
