//! Error types for the Kestrel client
//!
//! Provides a unified error type for all operations.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using KestrelError
pub type Result<T> = std::result::Result<T, KestrelError>;

/// Unified error type for client operations
#[derive(Debug, Error)]
pub enum KestrelError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Connection Errors
    // -------------------------------------------------------------------------
    #[error("Could not connect to {addr} within {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    #[error("Could not connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not read from {addr} within {timeout:?}")]
    ReadTimeout { addr: String, timeout: Duration },

    #[error("Could not write to {addr} within {timeout:?}")]
    WriteTimeout { addr: String, timeout: Duration },

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Client error reported by server: {0}")]
    ClientFault(String),

    #[error("Server error: {0}")]
    ServerFault(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl KestrelError {
    /// True for the connect/read/write deadline variants
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            KestrelError::ConnectTimeout { .. }
                | KestrelError::ReadTimeout { .. }
                | KestrelError::WriteTimeout { .. }
        )
    }
}
