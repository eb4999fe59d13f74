//! Error types for kvdb
//!
//! Provides a unified error type for client, server and storage operations.

use thiserror::Error;

/// Result type alias using KvdbError
pub type Result<T> = std::result::Result<T, KvdbError>;

/// Unified error type for kvdb operations
#[derive(Debug, Error)]
pub enum KvdbError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Client Errors
    // -------------------------------------------------------------------------
    /// No response arrived before the deadline. The server may or may not
    /// have applied the command.
    #[error("Request timed out")]
    Timeout,

    /// The server answered with an ERROR response
    #[error("Operation failed: {0}")]
    Operation(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    /// Malformed frame; fatal to the connection it was read from
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Server Errors
    // -------------------------------------------------------------------------
    #[error("Database already exists: {0}")]
    DuplicateDatabase(String),

    #[error("Database not found: {0}")]
    DatabaseNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for KvdbError {
    fn from(e: bincode::Error) -> Self {
        KvdbError::Serialization(e.to_string())
    }
}
