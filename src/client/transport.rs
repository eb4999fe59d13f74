//! Client transport
//!
//! Owns one TCP connection and correlates replies with requests.
//!
//! Every request gets a fresh id and a single-slot channel registered in the
//! pending map. A background reader thread routes each reply to the slot with
//! the matching id. The caller waits on its slot up to the configured
//! timeout:
//!
//! - reply first: the reader removes the slot and fills it
//! - deadline first: the caller removes the slot and reports `Timeout`; a
//!   reply arriving later finds no slot and is dropped
//!
//! A frame that cannot be decoded cannot be attributed to any request, so it
//! breaks the transport: the connection is shut down and every waiter fails.

use std::collections::HashMap;
use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::error::{KvdbError, Result};
use crate::protocol::{read_message, write_message, Command, Message};

/// Anything that can carry a command to a server and bring back its reply
pub trait MessageTransport: Send + Sync {
    fn send(&self, command: Command) -> Result<Message>;
}

type Pending = Arc<Mutex<HashMap<u64, Sender<Message>>>>;

/// TCP transport with per-request timeout
pub struct Transport {
    stream: TcpStream,
    writer: Mutex<BufWriter<TcpStream>>,
    pending: Pending,

    /// Why the connection stopped being usable, once it has
    failure: Arc<Mutex<Option<String>>>,

    next_id: AtomicU64,
    timeout: Duration,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl Transport {
    /// Connect to `addr` and start the reply reader
    pub fn connect(addr: &str, timeout: Duration) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let failure = Arc::new(Mutex::new(None));

        let read_stream = stream.try_clone()?;
        let reader = {
            let pending = Arc::clone(&pending);
            let failure = Arc::clone(&failure);
            thread::Builder::new()
                .name(format!("kvdb-client-{}", addr))
                .spawn(move || read_loop(read_stream, pending, failure))?
        };

        tracing::debug!("Connected to {}", addr);

        Ok(Self {
            writer: Mutex::new(BufWriter::new(stream.try_clone()?)),
            stream,
            pending,
            failure,
            next_id: AtomicU64::new(1),
            timeout,
            reader: Mutex::new(Some(reader)),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Requests still waiting for a reply
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    fn broken(&self) -> Option<KvdbError> {
        self.failure
            .lock()
            .as_ref()
            .map(|reason| KvdbError::Network(reason.clone()))
    }

    /// Shut the connection down; waiting requests fail
    pub fn close(&self) {
        let _ = self.stream.shutdown(Shutdown::Both);
        if let Some(handle) = self.reader.lock().take() {
            let _ = handle.join();
        }
    }
}

impl MessageTransport for Transport {
    fn send(&self, command: Command) -> Result<Message> {
        if let Some(e) = self.broken() {
            return Err(e);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (slot, reply) = channel::bounded(1);
        self.pending.lock().insert(id, slot);
        // the reader records its failure before clearing the map
        if let Some(e) = self.broken() {
            self.pending.lock().remove(&id);
            return Err(e);
        }

        let written = {
            let mut writer = self.writer.lock();
            write_message(&mut *writer, &Message::command(id, command))
        };
        if let Err(e) = written {
            self.pending.lock().remove(&id);
            return Err(e);
        }

        match reply.recv_timeout(self.timeout) {
            Ok(message) => Ok(message),
            Err(RecvTimeoutError::Timeout) => {
                // a reply racing this removal stays in `reply` and is dropped with it
                self.pending.lock().remove(&id);
                tracing::debug!("Request {} timed out after {:?}", id, self.timeout);
                Err(KvdbError::Timeout)
            }
            Err(RecvTimeoutError::Disconnected) => Err(self
                .broken()
                .unwrap_or_else(|| KvdbError::Network("connection closed".to_string()))),
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.close();
    }
}

fn read_loop(stream: TcpStream, pending: Pending, failure: Arc<Mutex<Option<String>>>) {
    let mut reader = BufReader::new(stream);
    let reason = loop {
        match read_message(&mut reader) {
            Ok(message) => {
                let slot = pending.lock().remove(&message.id);
                match slot {
                    Some(slot) => {
                        let _ = slot.send(message);
                    }
                    None => tracing::debug!("Dropping late reply for request {}", message.id),
                }
            }
            Err(KvdbError::Decode(reason)) => {
                tracing::warn!("Malformed frame from server: {}", reason);
                let _ = reader.get_ref().shutdown(Shutdown::Both);
                break format!("malformed frame from server: {}", reason);
            }
            Err(e) => break format!("connection lost: {}", e),
        }
    };

    *failure.lock() = Some(reason);
    // dropping the senders wakes every waiter with `Disconnected`
    pending.lock().clear();
}
