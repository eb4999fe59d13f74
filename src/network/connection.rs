//! Connection Handler
//!
//! Handles individual client connections.
//!
//! Each connection gets a reader loop (this handler) and a writer thread.
//! The reader decodes frames and dispatches them; executors publish replies
//! on the session's channel and the writer drains it onto the socket.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver};

use crate::error::{KvdbError, Result};
use crate::protocol::{read_message, write_message, Message};
use crate::server::ServerContext;

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// Raw handle used for the writer thread and shutdown
    stream: TcpStream,

    context: Arc<ServerContext>,

    /// Peer address; doubles as the session key
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream, context: Arc<ServerContext>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            stream,
            context,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 leaves a direction unbounded)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.stream
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Opens the session, reads frames until the client goes away or sends
    /// something undecodable, then removes the session.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        let (publisher, outbox) = channel::unbounded();
        let session = self.context.open_session(&self.peer_addr, publisher);

        let write_stream = self.stream.try_clone()?;
        let peer = self.peer_addr.clone();
        let writer = thread::Builder::new()
            .name(format!("kvdb-writer-{}", self.peer_addr))
            .spawn(move || write_loop(write_stream, outbox, peer))?;

        let result = self.read_loop();

        // Dropping the last session handle closes the outbox and stops the writer
        self.context.remove_session(&self.peer_addr);
        drop(session);
        let _ = self.stream.shutdown(Shutdown::Both);
        if writer.join().is_err() {
            tracing::warn!("Writer thread for {} panicked", self.peer_addr);
        }

        result
    }

    fn read_loop(&mut self) -> Result<()> {
        loop {
            let message = match read_message(&mut self.reader) {
                Ok(message) => message,
                Err(KvdbError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(KvdbError::Io(ref e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    tracing::debug!("Read timeout for client {}", self.peer_addr);
                    return Ok(());
                }
                Err(KvdbError::Decode(reason)) => {
                    // cannot be tied to a request; the stream is out of sync
                    tracing::warn!("Malformed frame from {}: {}", self.peer_addr, reason);
                    return Err(KvdbError::Decode(reason));
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            };

            tracing::trace!("Received message {} from {}", message.id, self.peer_addr);

            if let Err(e) = self.context.dispatch(&self.peer_addr, message) {
                tracing::debug!("Dispatch for {} stopped: {}", self.peer_addr, e);
                return Ok(());
            }
        }
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
    )
}

/// Drain published replies onto the socket until the session goes away
fn write_loop(stream: TcpStream, outbox: Receiver<Message>, peer: String) {
    let mut writer = BufWriter::new(stream);
    for message in outbox.iter() {
        if let Err(e) = write_message(&mut writer, &message) {
            match e {
                KvdbError::Io(ref io) if is_disconnect(io.kind()) => {
                    tracing::debug!("Client {} disconnected before response could be sent", peer);
                }
                _ => tracing::warn!("Error writing to {}: {}", peer, e),
            }
            let _ = writer.get_ref().shutdown(Shutdown::Both);
            return;
        }
    }
}
