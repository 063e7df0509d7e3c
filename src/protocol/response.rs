//! Response definitions
//!
//! A response starts with a status line whose first token selects the
//! [`ResponseKind`]. Single-line kinds are complete at that point; `VALUE`,
//! `STAT` and `queue` need the continuation engine to finish.

use std::fmt;

use bytes::Bytes;
use serde::Serialize;

use crate::error::{KestrelError, Result};

use super::registry::{lookup_response, ResponseKind};
use super::stats::{QueueStats, Stats};

/// The first line of a response, split into keyword and arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    kind: ResponseKind,
    keyword: String,
    args: Vec<String>,
    raw: String,
}

impl StatusLine {
    /// Split on whitespace and dispatch on the first token.
    ///
    /// Never fails: unrecognized keywords (and empty input) map to `Unknown`.
    pub fn parse(line: &[u8]) -> Self {
        let raw = String::from_utf8_lossy(line).trim().to_string();
        let mut tokens = raw.split_whitespace();
        let keyword = tokens.next().unwrap_or_default().to_string();
        let args = tokens.map(str::to_string).collect();

        Self {
            kind: lookup_response(&keyword),
            keyword,
            args,
            raw,
        }
    }

    pub fn kind(&self) -> ResponseKind {
        self.kind
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The trimmed line as received
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// Outcome class of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Success,
    Informational,
    Error,
}

/// Server-reported operating status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Up,
    Down,
    ReadOnly,
    Quiescent,
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self {
            ServerStatus::Up => "UP",
            ServerStatus::Down => "DOWN",
            ServerStatus::ReadOnly => "READONLY",
            ServerStatus::Quiescent => "QUIESCENT",
        };
        f.write_str(keyword)
    }
}

/// An item returned by GET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    pub queue: String,
    pub flags: u32,
    pub data: Bytes,
}

/// A fully read response
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Stored,
    NotStored,
    Deleted,
    NotFound,
    /// End of a (possibly empty) block
    End,
    /// The server closed the connection
    Eof,
    Value(Value),
    Stats(Stats),
    DumpedStats(QueueStats),
    Version(String),
    Status(ServerStatus),
    /// Bare `ERROR`: the server did not understand the command
    Error,
    ClientError(String),
    ServerError(String),
    /// Unregistered keyword; holds the raw line
    Unknown(String),
}

impl Response {
    /// Build a response that is complete after its status line.
    ///
    /// Continuation kinds are rejected; see [`read_response`](super::read_response).
    pub fn from_status_line(status: &StatusLine) -> Result<Self> {
        let args = status.args();
        let response = match status.kind() {
            ResponseKind::Stored => Response::Stored,
            ResponseKind::NotStored => Response::NotStored,
            ResponseKind::Deleted => Response::Deleted,
            ResponseKind::NotFound => Response::NotFound,
            ResponseKind::End => Response::End,
            ResponseKind::Eof => Response::Eof,
            ResponseKind::Error => Response::Error,
            ResponseKind::ClientError => Response::ClientError(args.join(" ")),
            ResponseKind::ServerError => Response::ServerError(args.join(" ")),
            ResponseKind::Version => match args.first() {
                Some(_) => Response::Version(args.join(" ")),
                None => {
                    return Err(KestrelError::Protocol(
                        "VERSION reply without a version".to_string(),
                    ))
                }
            },
            ResponseKind::Up => Response::Status(ServerStatus::Up),
            ResponseKind::Down => Response::Status(ServerStatus::Down),
            ResponseKind::ReadOnly => Response::Status(ServerStatus::ReadOnly),
            ResponseKind::Quiescent => Response::Status(ServerStatus::Quiescent),
            ResponseKind::Unknown => Response::Unknown(status.raw().to_string()),
            kind @ (ResponseKind::Value | ResponseKind::Stats | ResponseKind::DumpedStats) => {
                return Err(KestrelError::Protocol(format!(
                    "{:?} response needs its continuation: '{}'",
                    kind,
                    status.raw()
                )))
            }
        };
        Ok(response)
    }

    pub fn kind(&self) -> ResponseKind {
        match self {
            Response::Stored => ResponseKind::Stored,
            Response::NotStored => ResponseKind::NotStored,
            Response::Deleted => ResponseKind::Deleted,
            Response::NotFound => ResponseKind::NotFound,
            Response::End => ResponseKind::End,
            Response::Eof => ResponseKind::Eof,
            Response::Value(_) => ResponseKind::Value,
            Response::Stats(_) => ResponseKind::Stats,
            Response::DumpedStats(_) => ResponseKind::DumpedStats,
            Response::Version(_) => ResponseKind::Version,
            Response::Status(ServerStatus::Up) => ResponseKind::Up,
            Response::Status(ServerStatus::Down) => ResponseKind::Down,
            Response::Status(ServerStatus::ReadOnly) => ResponseKind::ReadOnly,
            Response::Status(ServerStatus::Quiescent) => ResponseKind::Quiescent,
            Response::Error => ResponseKind::Error,
            Response::ClientError(_) => ResponseKind::ClientError,
            Response::ServerError(_) => ResponseKind::ServerError,
            Response::Unknown(_) => ResponseKind::Unknown,
        }
    }

    pub fn classification(&self) -> Classification {
        match self {
            Response::Error | Response::ClientError(_) | Response::ServerError(_) => {
                Classification::Error
            }
            Response::NotStored | Response::NotFound | Response::Eof | Response::Unknown(_) => {
                Classification::Informational
            }
            _ => Classification::Success,
        }
    }

    pub fn is_error(&self) -> bool {
        self.classification() == Classification::Error
    }

    /// Human-readable `KEYWORD args...` form for logs and errors
    pub fn message(&self) -> String {
        let keyword = self.kind().keyword().unwrap_or_default();
        match self {
            Response::Value(value) => {
                format!("{} {} {} {}", keyword, value.queue, value.flags, value.data.len())
            }
            Response::Stats(stats) => format!("{} [{} entries]", keyword, stats.len()),
            Response::DumpedStats(queues) => format!("{} [{} queues]", keyword, queues.len()),
            Response::Version(version) => format!("{} {}", keyword, version),
            Response::ClientError(message) | Response::ServerError(message)
                if !message.is_empty() =>
            {
                format!("{} {}", keyword, message)
            }
            Response::Unknown(raw) => raw.clone(),
            _ => keyword.to_string(),
        }
    }

    /// Turn an error-classified response into the matching fault
    pub fn into_result(self) -> Result<Response> {
        match self {
            Response::ClientError(message) => Err(KestrelError::ClientFault(message)),
            Response::ServerError(message) => Err(KestrelError::ServerFault(message)),
            Response::Error => Err(KestrelError::ServerFault("ERROR".to_string())),
            other => Ok(other),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}
