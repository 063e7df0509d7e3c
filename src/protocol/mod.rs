//! Protocol Module
//!
//! The memcache-derived text protocol spoken by Kestrel queue servers.
//!
//! ## Format
//! ```text
//! request:   KEYWORD arg1 arg2 ...\r\n [payload\r\n]
//! response:  KEYWORD arg1 arg2 ...\r\n [continuation lines/bytes]
//! ```
//!
//! ### Requests
//! - `SET <queue> 0 <expiration> <len>` + payload
//! - `GET <queue>[/t=<ms>][/open][/close][/abort][/peek]`
//! - `DELETE <queue>`, `FLUSH <queue>`, `FLUSH_ALL`
//! - `STATS`, `DUMP_STATS`, `VERSION`, `STATUS [state]`
//! - `SHUTDOWN`, `RELOAD`, `QUIT`
//!
//! ### Responses
//! - `STORED` / `NOT_STORED`, `DELETED` / `NOT_FOUND`, `END`
//! - `VALUE <queue> <flags> <len>` + payload + `END`
//! - `STAT <key> <value>` ... `END`
//! - `queue '<name>' {` `key=value` ... `}` ... `END`
//! - `VERSION <string>`, `UP` / `DOWN` / `READONLY` / `QUIESCENT`
//! - `ERROR`, `CLIENT_ERROR <msg>`, `SERVER_ERROR <msg>`

mod registry;
mod request;
mod response;
mod stats;
mod continuation;

/// Line delimiter of the protocol
pub const CRLF: &[u8] = b"\r\n";

pub use registry::{lookup_request, lookup_response, RequestKind, ResponseKind};
pub use request::{GetOptions, Request};
pub use response::{Classification, Response, ServerStatus, StatusLine, Value};
pub use stats::{is_global_stat_key, QueueStats, ServerStats, StatValue, Stats};
pub use continuation::{complete, read_response};
