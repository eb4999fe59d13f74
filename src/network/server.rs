//! TCP Server
//!
//! Accepts connections and hands each one to its own worker thread.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::server::ServerContext;

use super::Connection;

/// How long the accept loop sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// TCP server for kvdb
pub struct Server {
    config: ServerConfig,
    context: Arc<ServerContext>,
    listener: TcpListener,
    shutdown: AtomicBool,

    registry: Arc<ConnectionRegistry>,
}

/// Live connections of a server
///
/// Keeps a clone of every registered socket so shutdown can unblock the
/// worker reading from it.
#[derive(Default)]
pub struct ConnectionRegistry {
    active: AtomicUsize,
    streams: Mutex<HashMap<u64, TcpStream>>,
    next_conn_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `stream` until the returned slot is dropped
    pub fn register(self: &Arc<Self>, stream: &TcpStream) -> Result<ConnectionSlot> {
        let clone = stream.try_clone()?;
        let id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        self.streams.lock().insert(id, clone);
        self.active.fetch_add(1, Ordering::AcqRel);
        Ok(ConnectionSlot {
            id,
            registry: Arc::clone(self),
        })
    }

    /// Connections currently registered
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Shut down every registered socket
    pub fn shutdown_all(&self) {
        for (_, stream) in self.streams.lock().drain() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

/// Registration of one connection; dropping it unregisters
pub struct ConnectionSlot {
    id: u64,
    registry: Arc<ConnectionRegistry>,
}

impl ConnectionSlot {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.registry.streams.lock().remove(&self.id);
        self.registry.active.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: ServerConfig, context: Arc<ServerContext>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr)?;
        listener.set_nonblocking(true)?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            config,
            context,
            listener,
            shutdown: AtomicBool::new(false),
            registry: Arc::new(ConnectionRegistry::new()),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.context
    }

    pub fn active_connections(&self) -> usize {
        self.registry.active()
    }

    /// Accept connections until [`Server::shutdown`] is called (blocking)
    pub fn run(&self) -> Result<()> {
        let mut workers: Vec<JoinHandle<()>> = Vec::new();

        while !self.shutdown.load(Ordering::Acquire) {
            match self.listener.accept() {
                Ok((stream, addr)) => match self.spawn_connection(stream, addr) {
                    Ok(Some(handle)) => workers.push(handle),
                    Ok(None) => {}
                    Err(e) => tracing::warn!("Dropping connection from {}: {}", addr, e),
                },
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => tracing::warn!("Accept failed: {}", e),
            }
            workers.retain(|handle| !handle.is_finished());
        }

        self.registry.shutdown_all();
        for handle in workers {
            let _ = handle.join();
        }
        tracing::info!("Server stopped accepting connections");
        Ok(())
    }

    fn spawn_connection(
        &self,
        stream: TcpStream,
        addr: SocketAddr,
    ) -> Result<Option<JoinHandle<()>>> {
        if self.registry.active() >= self.config.max_connections {
            tracing::warn!(
                "Refusing connection from {}: {} connections already open",
                addr,
                self.config.max_connections
            );
            let _ = stream.shutdown(Shutdown::Both);
            return Ok(None);
        }

        stream.set_nonblocking(false)?;
        let slot = self.registry.register(&stream)?;

        let context = Arc::clone(&self.context);
        let (read_ms, write_ms) = (self.config.read_timeout_ms, self.config.write_timeout_ms);

        // a failed spawn drops the closure, and with it the slot
        let handle = thread::Builder::new()
            .name(format!("kvdb-conn-{}", addr))
            .spawn(move || {
                let served = Connection::new(stream, context).and_then(|mut conn| {
                    conn.set_timeouts(read_ms, write_ms)?;
                    conn.handle()
                });
                if let Err(e) = served {
                    tracing::warn!("Connection {} closed with error: {}", addr, e);
                }
                drop(slot);
            })?;
        Ok(Some(handle))
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }
}
