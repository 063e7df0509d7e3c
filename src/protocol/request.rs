//! Request definitions
//!
//! Requests built by the client, and their wire encoding:
//!
//! ```text
//! KEYWORD SP arg1 SP arg2 ... CRLF
//! [payload CRLF]                      (SET only)
//! ```

use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};

use super::registry::{RequestKind, ResponseKind};
use super::response::Response;
use super::CRLF;

/// Modifiers for a GET, rendered as `/`-separated suffixes on the queue name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Block server-side up to this long for an item (`t=<ms>`)
    pub wait_for: Option<Duration>,

    /// Start a reliable read (`open`)
    pub open: bool,

    /// Confirm the previous reliable read (`close`)
    pub close: bool,

    /// Return the open item to the queue (`abort`)
    pub abort: bool,

    /// Return the head item without removing it (`peek`)
    pub peek: bool,
}

impl GetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wait_for(mut self, wait: Duration) -> Self {
        self.wait_for = Some(wait);
        self
    }

    pub fn open(mut self) -> Self {
        self.open = true;
        self
    }

    pub fn close(mut self) -> Self {
        self.close = true;
        self
    }

    pub fn abort(mut self) -> Self {
        self.abort = true;
        self
    }

    pub fn peek(mut self) -> Self {
        self.peek = true;
        self
    }

    /// `queue[/t=<ms>][/open][/close][/abort][/peek]`
    ///
    /// Conflicting flags are sent as-is; the server rejects them.
    fn path(&self, queue: &str) -> String {
        let mut path = queue.to_string();
        if let Some(wait) = self.wait_for {
            path.push_str(&format!("/t={}", wait.as_millis()));
        }
        let flags = [
            (self.open, "open"),
            (self.close, "close"),
            (self.abort, "abort"),
            (self.peek, "peek"),
        ];
        for (set, name) in flags {
            if set {
                path.push('/');
                path.push_str(name);
            }
        }
        path
    }
}

/// A request to send to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Ask for the server version
    Version,

    /// Enqueue an item; `expiration` is in seconds, 0 for never
    Set {
        queue: String,
        data: Bytes,
        expiration: u32,
    },

    /// Dequeue, peek, or drive a reliable read
    Get { queue: String, options: GetOptions },

    /// Remove a queue entirely
    Delete { queue: String },

    /// Drop every item of one queue
    Flush { queue: String },

    /// Drop every item of every queue
    FlushAll,

    Stats,

    DumpStats,

    Shutdown,

    /// Reload the server configuration
    Reload,

    /// Ask the server to close the connection
    Quit,

    /// Query or change the server status
    Status { update_to: Option<String> },
}

impl Request {
    pub fn set(queue: impl Into<String>, data: impl Into<Bytes>, expiration: u32) -> Self {
        Request::Set {
            queue: queue.into(),
            data: data.into(),
            expiration,
        }
    }

    pub fn get(queue: impl Into<String>, options: GetOptions) -> Self {
        Request::Get {
            queue: queue.into(),
            options,
        }
    }

    pub fn delete(queue: impl Into<String>) -> Self {
        Request::Delete {
            queue: queue.into(),
        }
    }

    pub fn flush(queue: impl Into<String>) -> Self {
        Request::Flush {
            queue: queue.into(),
        }
    }

    pub fn kind(&self) -> RequestKind {
        match self {
            Request::Version => RequestKind::Version,
            Request::Set { .. } => RequestKind::Set,
            Request::Get { .. } => RequestKind::Get,
            Request::Delete { .. } => RequestKind::Delete,
            Request::Flush { .. } => RequestKind::Flush,
            Request::FlushAll => RequestKind::FlushAll,
            Request::Stats => RequestKind::Stats,
            Request::DumpStats => RequestKind::DumpStats,
            Request::Shutdown => RequestKind::Shutdown,
            Request::Reload => RequestKind::Reload,
            Request::Quit => RequestKind::Quit,
            Request::Status { .. } => RequestKind::Status,
        }
    }

    pub fn keyword(&self) -> &'static str {
        self.kind().keyword()
    }

    /// Positional arguments, in wire order
    pub fn args(&self) -> Vec<String> {
        match self {
            Request::Set {
                queue,
                data,
                expiration,
            } => vec![
                queue.clone(),
                "0".to_string(),
                expiration.to_string(),
                data.len().to_string(),
            ],
            Request::Get { queue, options } => vec![options.path(queue)],
            Request::Delete { queue } | Request::Flush { queue } => vec![queue.clone()],
            Request::Status {
                update_to: Some(status),
            } => vec![status.clone()],
            _ => Vec::new(),
        }
    }

    pub fn valid_responses(&self) -> &'static [ResponseKind] {
        self.kind().valid_responses()
    }

    /// Whether `response` is one this request may legitimately receive
    pub fn accepts(&self, response: &Response) -> bool {
        self.valid_responses().contains(&response.kind())
    }

    /// Append the wire form to `out`
    pub fn encode(&self, out: &mut BytesMut) {
        let args = self.args();
        debug_assert!(args.len() <= self.kind().arity());

        out.put_slice(self.keyword().as_bytes());
        for arg in args {
            out.put_u8(b' ');
            out.put_slice(arg.as_bytes());
        }
        out.put_slice(CRLF);

        if let Request::Set { data, .. } = self {
            out.put_slice(data);
            out.put_slice(CRLF);
        }
    }

    /// The wire form as a standalone buffer
    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.encoded_len_hint());
        self.encode(&mut out);
        out.freeze()
    }

    fn encoded_len_hint(&self) -> usize {
        match self {
            Request::Set { queue, data, .. } => queue.len() + data.len() + 32,
            _ => 64,
        }
    }
}
