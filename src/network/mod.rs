//! Network Module
//!
//! Client-side socket handling.
//!
//! ## Layers
//! - `Transport`: one OS socket, deadline-bounded reads/writes, keepalive
//! - `Connection`: line buffer over a transport, lazy and fork-safe dialing

mod transport;
mod connection;

pub use transport::{Deadline, SocketTransport, Transport};
pub use connection::{Connection, EOF_LINE};
