//! Connection
//!
//! Wraps a [`Transport`] with a FIFO accumulation buffer and exposes the
//! line/byte reads the protocol layer needs.
//!
//! ## Deadlines
//! - A write gets its own deadline of `write_timeout`.
//! - The first read after a write (or after a reconnect) fixes a read deadline
//!   of `read_timeout` plus any scoped allowance; every `read_line` /
//!   `read_bytes` until the next write shares it, so one response is bounded
//!   as a whole no matter how many partial reads it takes.

use std::time::Duration;

use bytes::{Bytes, BytesMut};

use crate::config::Config;
use crate::error::{KestrelError, Result};
use crate::protocol::CRLF;

use super::transport::{Deadline, SocketTransport, Transport};

/// Bytes pulled from the transport per read attempt
const READ_CHUNK: usize = 10 * 1024;

/// Sentinel line returned when the peer closes the stream
pub const EOF_LINE: &[u8] = b"EOF";

/// Buffered client connection to one server
pub struct Connection<T: Transport = SocketTransport> {
    transport: T,

    /// Bytes read past the last consumed line/block; appended at the tail,
    /// consumed from the head
    buffer: BytesMut,

    read_timeout: Duration,
    write_timeout: Duration,

    /// Largest block `read_value` will buffer
    max_item_size: usize,

    /// Shared by all reads of the current response
    read_deadline: Option<Deadline>,
}

impl Connection<SocketTransport> {
    /// Create a lazily-dialed TCP connection from config
    pub fn open(config: &Config) -> Self {
        Self::with_transport(SocketTransport::new(config), config)
    }
}

impl<T: Transport> Connection<T> {
    pub fn with_transport(transport: T, config: &Config) -> Self {
        Self {
            transport,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
            max_item_size: config.max_item_size,
            read_deadline: None,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }

    pub fn max_item_size(&self) -> usize {
        self.max_item_size
    }

    /// Bytes received but not yet consumed
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Drop the socket and any buffered bytes
    pub fn close(&mut self) {
        self.transport.close();
        self.buffer.clear();
        self.read_deadline = None;
    }

    /// Run `body` with the read timeout widened by `extra`.
    ///
    /// The previous timeout is restored whether or not `body` succeeds.
    pub fn with_additional_read_timeout<R>(
        &mut self,
        extra: Duration,
        body: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<R> {
        let previous = self.read_timeout;
        self.read_timeout = previous.saturating_add(extra);
        let result = body(self);
        self.read_timeout = previous;
        result
    }

    /// Send a complete request.
    ///
    /// Starts a new logical operation: the next read computes a fresh deadline.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.connect()?;
        self.read_deadline = None;

        tracing::trace!("--> {}", String::from_utf8_lossy(head_line(data)).trim_end());

        let deadline = Deadline::after(self.write_timeout);
        if let Err(e) = self.transport.write_all(data, deadline) {
            self.close();
            return Err(e);
        }
        Ok(())
    }

    /// Read one CRLF-terminated line (delimiter included)
    pub fn read_line(&mut self) -> Result<Bytes> {
        self.read_line_with(CRLF)
    }

    /// Read one line ending in `delimiter`, delimiter included.
    ///
    /// Lines that are blank once trimmed are skipped. End of stream yields
    /// [`EOF_LINE`] and closes the connection.
    pub fn read_line_with(&mut self, delimiter: &[u8]) -> Result<Bytes> {
        if delimiter.is_empty() {
            return Err(KestrelError::Protocol("empty line delimiter".to_string()));
        }

        loop {
            let mut scanned = 0;
            let end = loop {
                // A redial inside fill() empties the buffer
                scanned = scanned.min(self.buffer.len());
                if let Some(idx) = find(&self.buffer[scanned..], delimiter) {
                    break scanned + idx + delimiter.len();
                }
                // A delimiter may straddle two chunks
                scanned = self.buffer.len().saturating_sub(delimiter.len() - 1);
                if !self.fill()? {
                    self.close();
                    return Ok(Bytes::from_static(EOF_LINE));
                }
            };

            let line = self.buffer.split_to(end).freeze();
            if line.trim_ascii().is_empty() {
                continue;
            }

            tracing::trace!("<-- {}", String::from_utf8_lossy(&line).trim_end());
            return Ok(line);
        }
    }

    /// Read exactly `n` bytes, serving buffered bytes first
    pub fn read_bytes(&mut self, n: usize) -> Result<Bytes> {
        while self.buffer.len() < n {
            if !self.fill()? {
                let have = self.buffer.len();
                self.close();
                return Err(KestrelError::Protocol(format!(
                    "connection closed after {} of {} bytes",
                    have, n
                )));
            }
        }

        let block = self.buffer.split_to(n).freeze();
        tracing::trace!("<-- [{} bytes]", block.len());
        Ok(block)
    }

    /// Pull one chunk from the transport into the buffer.
    ///
    /// Returns `false` on end of stream. Any error closes the connection.
    fn fill(&mut self) -> Result<bool> {
        self.connect()?;

        let read_timeout = self.read_timeout;
        let deadline = *self
            .read_deadline
            .get_or_insert_with(|| Deadline::after(read_timeout));

        let mut chunk = [0u8; READ_CHUNK];
        match self.transport.read(&mut chunk, deadline) {
            Ok(0) => Ok(false),
            Ok(n) => {
                self.buffer.extend_from_slice(&chunk[..n]);
                Ok(true)
            }
            Err(e) => {
                self.close();
                Err(e)
            }
        }
    }

    /// Dial lazily; a fresh socket invalidates anything buffered from the old one
    fn connect(&mut self) -> Result<()> {
        if self.transport.ensure_connected()? {
            self.buffer.clear();
            self.read_deadline = None;
        }
        Ok(())
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// The request line without any trailing payload block
fn head_line(data: &[u8]) -> &[u8] {
    match find(data, CRLF) {
        Some(idx) => &data[..idx],
        None => data,
    }
}
