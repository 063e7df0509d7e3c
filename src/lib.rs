//! # Kestrel Client
//!
//! A synchronous client for Kestrel-style work queues speaking the
//! memcache-derived text protocol:
//! - Lazy, fork-safe TCP connections with keepalive tuning
//! - Independent connect/read/write deadlines
//! - Keyword-dispatched responses with multi-line continuations
//! - Reliable reads (open/close/abort), peek, blocking fetch
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Client                                │
//! │        (set / get / reserve / stats / flush / ...)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Request::encode        ▲ Response
//!                       ▼                        │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Protocol                               │
//! │   registry ─► StatusLine ─► continuation (VALUE/STAT/queue)  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ write / read_line / read_bytes
//!                       ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Connection                              │
//! │        (FIFO line buffer, shared read deadline)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   SocketTransport                            │
//! │   (multi-address dial, keepalive, bounded-wait I/O, pid)     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod network;
pub mod protocol;
pub mod stats_cache;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KestrelError, Result};
pub use config::{Config, KeepaliveConfig};
pub use client::Client;
pub use protocol::{GetOptions, ServerStats, StatValue};
pub use stats_cache::StatsCache;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the client
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
