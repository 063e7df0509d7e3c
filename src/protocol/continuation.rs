//! Response continuation engine
//!
//! Reads a status line from a [`Connection`], dispatches it, and for the
//! multi-line kinds keeps pulling lines/bytes until the block is complete:
//!
//! ```text
//! VALUE <queue> <flags> <len>      ->  <len> bytes, CRLF, END
//! STAT <key> <value>               ->  STAT ... lines until END
//! queue '<name>' {                 ->  key=value / queue '<n>' { / } until END
//! ```
//!
//! Any line that does not fit the block grammar is a protocol error.

use crate::error::{KestrelError, Result};
use crate::network::{Connection, Transport};

use super::registry::ResponseKind;
use super::response::{Response, StatusLine, Value};
use super::stats::{
    is_global_stat_key, parse_assignment, parse_queue_header, parse_stat_line, QueueStats,
    StatValue, Stats,
};
use super::CRLF;

const END: &str = "END";

/// Read one complete response from `conn`
pub fn read_response<T: Transport>(conn: &mut Connection<T>) -> Result<Response> {
    let line = conn.read_line()?;
    let status = StatusLine::parse(&line);
    complete(status, conn)
}

/// Finish a response whose status line has already been read.
///
/// A failure leaves the rest of the reply unread, so the connection is
/// closed before the error is returned.
pub fn complete<T: Transport>(status: StatusLine, conn: &mut Connection<T>) -> Result<Response> {
    let result = dispatch(&status, conn);
    if let Err(e) = &result {
        tracing::debug!(
            "Dropping connection to {} after bad response: {}",
            conn.transport().peer(),
            e
        );
        conn.close();
    }
    result
}

fn dispatch<T: Transport>(status: &StatusLine, conn: &mut Connection<T>) -> Result<Response> {
    let kind = status.kind();
    if status.args().len() < kind.arity() {
        return Err(KestrelError::Protocol(format!(
            "'{}' has {} arguments, expected at least {}",
            status.raw(),
            status.args().len(),
            kind.arity()
        )));
    }

    if !kind.needs_continuation() {
        return Response::from_status_line(status);
    }

    match kind {
        ResponseKind::Value => read_value(status, conn).map(Response::Value),
        ResponseKind::Stats => read_stats(status, conn).map(Response::Stats),
        _ => read_dumped_stats(status, conn).map(Response::DumpedStats),
    }
}

fn read_value<T: Transport>(status: &StatusLine, conn: &mut Connection<T>) -> Result<Value> {
    let args = status.args();
    let queue = args[0].clone();
    let flags: u32 = parse_number(&args[1], status)?;
    let len: usize = parse_number(&args[2], status)?;

    if len > conn.max_item_size() {
        return Err(KestrelError::Protocol(format!(
            "value of {} bytes for '{}' exceeds the {} byte limit",
            len,
            queue,
            conn.max_item_size()
        )));
    }

    let total = len
        .checked_add(CRLF.len())
        .ok_or_else(|| KestrelError::Protocol(format!("value length {} out of range", len)))?;
    let block = conn.read_bytes(total)?;
    if !block.ends_with(CRLF) {
        return Err(KestrelError::Protocol(format!(
            "value block of {} bytes for '{}' is not CRLF-terminated",
            len, queue
        )));
    }
    let data = block.slice(..len);

    // Servers close every value block with a terminator line
    let terminator = next_line(conn)?;
    if terminator != END {
        return Err(KestrelError::Protocol(format!(
            "expected END after value, got '{}'",
            terminator
        )));
    }

    Ok(Value { queue, flags, data })
}

fn read_stats<T: Transport>(status: &StatusLine, conn: &mut Connection<T>) -> Result<Stats> {
    let mut stats = Stats::new();
    let mut line = status.raw().to_string();

    loop {
        match parse_stat_line(&line) {
            Some((key, value)) => {
                if is_global_stat_key(key) {
                    stats.insert(key.to_string(), StatValue::coerce(value));
                }
            }
            None if line == END => break,
            None => {
                return Err(KestrelError::Protocol(format!(
                    "unexpected line '{}' in STAT block",
                    line
                )))
            }
        }
        line = next_line(conn)?;
    }

    Ok(stats)
}

fn read_dumped_stats<T: Transport>(
    status: &StatusLine,
    conn: &mut Connection<T>,
) -> Result<QueueStats> {
    let mut queues = QueueStats::new();
    let mut current: Option<String> = None;
    let mut line = status.raw().to_string();

    loop {
        if let Some(name) = parse_queue_header(&line) {
            queues.entry(name.to_string()).or_default();
            current = Some(name.to_string());
        } else if let Some((key, value)) = parse_assignment(&line) {
            let name = current.as_ref().ok_or_else(|| {
                KestrelError::Protocol(format!("'{}' outside of a queue block", line))
            })?;
            queues
                .entry(name.clone())
                .or_default()
                .insert(key.to_string(), StatValue::coerce(value));
        } else if line == "}" {
            current = None;
        } else if line == END {
            break;
        } else {
            return Err(KestrelError::Protocol(format!(
                "unexpected line '{}' in queue stats block",
                line
            )));
        }
        line = next_line(conn)?;
    }

    Ok(queues)
}

/// Next line, trimmed and decoded
fn next_line<T: Transport>(conn: &mut Connection<T>) -> Result<String> {
    let line = conn.read_line()?;
    let text = std::str::from_utf8(&line)
        .map_err(|_| KestrelError::Protocol("non-UTF-8 line in response block".to_string()))?;
    Ok(text.trim().to_string())
}

fn parse_number<N: std::str::FromStr>(token: &str, status: &StatusLine) -> Result<N> {
    token.parse().map_err(|_| {
        KestrelError::Protocol(format!("bad number '{}' in '{}'", token, status.raw()))
    })
}
