//! Keyword registry
//!
//! Static keyword tables for both sides of the protocol. Each table is built
//! once on first use and never modified afterwards.
//!
//! Responses are dispatched through [`lookup_response`]; an unrecognized
//! keyword maps to [`ResponseKind::Unknown`] so that server additions never
//! break the client.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Request types the client can send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Version,
    Set,
    Get,
    Delete,
    Flush,
    FlushAll,
    Stats,
    DumpStats,
    Shutdown,
    Reload,
    Quit,
    Status,
}

impl RequestKind {
    pub const ALL: [RequestKind; 12] = [
        RequestKind::Version,
        RequestKind::Set,
        RequestKind::Get,
        RequestKind::Delete,
        RequestKind::Flush,
        RequestKind::FlushAll,
        RequestKind::Stats,
        RequestKind::DumpStats,
        RequestKind::Shutdown,
        RequestKind::Reload,
        RequestKind::Quit,
        RequestKind::Status,
    ];

    /// Wire keyword stamped at the start of the request line
    pub fn keyword(self) -> &'static str {
        match self {
            RequestKind::Version => "VERSION",
            RequestKind::Set => "SET",
            RequestKind::Get => "GET",
            RequestKind::Delete => "DELETE",
            RequestKind::Flush => "FLUSH",
            RequestKind::FlushAll => "FLUSH_ALL",
            RequestKind::Stats => "STATS",
            RequestKind::DumpStats => "DUMP_STATS",
            RequestKind::Shutdown => "SHUTDOWN",
            RequestKind::Reload => "RELOAD",
            RequestKind::Quit => "QUIT",
            RequestKind::Status => "STATUS",
        }
    }

    /// Most positional arguments a request of this kind carries
    pub fn arity(self) -> usize {
        match self {
            RequestKind::Set => 4,
            RequestKind::Get | RequestKind::Delete | RequestKind::Flush | RequestKind::Status => 1,
            _ => 0,
        }
    }

    /// Responses this request may legitimately receive (errors aside)
    pub fn valid_responses(self) -> &'static [ResponseKind] {
        use ResponseKind as R;
        match self {
            RequestKind::Version => &[R::Version],
            RequestKind::Set => &[R::Stored, R::NotStored],
            RequestKind::Get => &[R::Value, R::End],
            RequestKind::Delete => &[R::Deleted, R::NotFound],
            RequestKind::Flush | RequestKind::FlushAll => &[R::End],
            RequestKind::Stats => &[R::Stats],
            RequestKind::DumpStats => &[R::DumpedStats, R::End],
            RequestKind::Shutdown => &[R::Eof, R::End, R::Unknown],
            RequestKind::Reload => &[R::End, R::Unknown],
            RequestKind::Quit => &[R::Eof],
            RequestKind::Status => &[R::Up, R::Down, R::ReadOnly, R::Quiescent, R::End],
        }
    }
}

/// Response types, one per status-line keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    Stored,
    NotStored,
    Deleted,
    NotFound,
    Value,
    Stats,
    DumpedStats,
    End,
    Eof,
    Error,
    ClientError,
    ServerError,
    Version,
    Up,
    Down,
    ReadOnly,
    Quiescent,
    Unknown,
}

impl ResponseKind {
    pub const ALL: [ResponseKind; 18] = [
        ResponseKind::Stored,
        ResponseKind::NotStored,
        ResponseKind::Deleted,
        ResponseKind::NotFound,
        ResponseKind::Value,
        ResponseKind::Stats,
        ResponseKind::DumpedStats,
        ResponseKind::End,
        ResponseKind::Eof,
        ResponseKind::Error,
        ResponseKind::ClientError,
        ResponseKind::ServerError,
        ResponseKind::Version,
        ResponseKind::Up,
        ResponseKind::Down,
        ResponseKind::ReadOnly,
        ResponseKind::Quiescent,
        ResponseKind::Unknown,
    ];

    /// Keyword the server starts the status line with. `Unknown` has none.
    pub fn keyword(self) -> Option<&'static str> {
        let keyword = match self {
            ResponseKind::Stored => "STORED",
            ResponseKind::NotStored => "NOT_STORED",
            ResponseKind::Deleted => "DELETED",
            ResponseKind::NotFound => "NOT_FOUND",
            ResponseKind::Value => "VALUE",
            ResponseKind::Stats => "STAT",
            ResponseKind::DumpedStats => "queue",
            ResponseKind::End => "END",
            ResponseKind::Eof => "EOF",
            ResponseKind::Error => "ERROR",
            ResponseKind::ClientError => "CLIENT_ERROR",
            ResponseKind::ServerError => "SERVER_ERROR",
            ResponseKind::Version => "VERSION",
            ResponseKind::Up => "UP",
            ResponseKind::Down => "DOWN",
            ResponseKind::ReadOnly => "READONLY",
            ResponseKind::Quiescent => "QUIESCENT",
            ResponseKind::Unknown => return None,
        };
        Some(keyword)
    }

    /// Minimum number of arguments the status line must carry
    pub fn arity(self) -> usize {
        match self {
            ResponseKind::Value => 3,
            ResponseKind::Stats | ResponseKind::DumpedStats => 2,
            ResponseKind::Version => 1,
            _ => 0,
        }
    }

    /// True when the status line alone does not complete the response
    pub fn needs_continuation(self) -> bool {
        matches!(
            self,
            ResponseKind::Value | ResponseKind::Stats | ResponseKind::DumpedStats
        )
    }
}

static RESPONSE_REGISTRY: LazyLock<HashMap<&'static str, ResponseKind>> = LazyLock::new(|| {
    ResponseKind::ALL
        .iter()
        .filter_map(|kind| kind.keyword().map(|keyword| (keyword, *kind)))
        .collect()
});

static REQUEST_REGISTRY: LazyLock<HashMap<&'static str, RequestKind>> = LazyLock::new(|| {
    RequestKind::ALL
        .iter()
        .map(|kind| (kind.keyword(), *kind))
        .collect()
});

/// Map a status-line keyword to its response type, `Unknown` if unregistered
pub fn lookup_response(keyword: &str) -> ResponseKind {
    RESPONSE_REGISTRY
        .get(keyword)
        .copied()
        .unwrap_or(ResponseKind::Unknown)
}

/// Map a request keyword back to its type
pub fn lookup_request(keyword: &str) -> Option<RequestKind> {
    REQUEST_REGISTRY.get(keyword).copied()
}
