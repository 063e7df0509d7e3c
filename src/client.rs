//! Client
//!
//! High-level queue operations on top of one [`Connection`].
//!
//! ## Responsibilities
//! - Build a request per call, send it, read the full response
//! - Turn `ERROR` / `CLIENT_ERROR` / `SERVER_ERROR` replies into errors
//! - Widen the read deadline for calls that block server-side
//!
//! ## Concurrency
//! One request is in flight at a time and every response is drained before
//! the next request. A `Client` is not shared between threads; give each
//! worker its own.

use std::time::Duration;

use bytes::Bytes;

use crate::config::Config;
use crate::error::{KestrelError, Result};
use crate::network::{Connection, SocketTransport, Transport};
use crate::protocol::{
    read_response, GetOptions, QueueStats, Request, Response, ServerStats, ServerStatus, Stats,
};
use crate::stats_cache::StatsCache;

/// Synchronous client for one queue server
pub struct Client<T: Transport = SocketTransport> {
    connection: Connection<T>,
    stats_cache: StatsCache,
    flush_timeout: Duration,
}

impl Client<SocketTransport> {
    /// Create a client; the socket is dialed on first use
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_connection(Connection::open(&config), &config))
    }

    /// Client for `host:port` with default settings
    pub fn connect(host: impl Into<String>, port: u16) -> Result<Self> {
        Self::new(Config::builder().host(host).port(port).build())
    }
}

impl<T: Transport> Client<T> {
    /// Create a client over an existing connection
    pub fn with_connection(connection: Connection<T>, config: &Config) -> Self {
        Self {
            connection,
            stats_cache: StatsCache::new(config.stats_cache_ttl),
            flush_timeout: config.flush_timeout,
        }
    }

    pub fn connection(&self) -> &Connection<T> {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut Connection<T> {
        &mut self.connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Close the socket; the next call redials
    pub fn disconnect(&mut self) {
        self.connection.close();
    }

    // =========================================================================
    // Server Information
    // =========================================================================

    /// Version string reported by the server
    pub fn version(&mut self) -> Result<String> {
        let request = Request::Version;
        match self.send_recv(&request)? {
            Response::Version(version) => Ok(version),
            other => Err(unexpected(&request, other)),
        }
    }

    /// True if the server answers a VERSION request
    pub fn ping(&mut self) -> bool {
        match self.version() {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("Ping to {} failed: {}", self.connection.transport().peer(), e);
                false
            }
        }
    }

    /// Current server status, or change it with `update_to`
    pub fn status(&mut self, update_to: Option<&str>) -> Result<Option<ServerStatus>> {
        let request = Request::Status {
            update_to: update_to.map(str::to_string),
        };
        match self.send_recv(&request)? {
            Response::Status(status) => Ok(Some(status)),
            Response::End => Ok(None),
            other => Err(unexpected(&request, other)),
        }
    }

    // =========================================================================
    // Queue Operations
    // =========================================================================

    /// Add an item to a queue. `expiration` of zero means never.
    ///
    /// Returns `true` if the server stored it.
    pub fn set(
        &mut self,
        queue: &str,
        item: impl Into<Bytes>,
        expiration: Duration,
    ) -> Result<bool> {
        let seconds = u32::try_from(expiration.as_secs()).map_err(|_| {
            KestrelError::Config(format!("expiration {:?} does not fit the protocol", expiration))
        })?;
        let request = Request::set(queue, item, seconds);
        match self.send_recv(&request)? {
            Response::Stored => Ok(true),
            Response::NotStored => Ok(false),
            other => Err(unexpected(&request, other)),
        }
    }

    /// Fetch an item. `None` when the queue had nothing within the wait.
    pub fn get(&mut self, queue: &str, options: GetOptions) -> Result<Option<Bytes>> {
        let wait = options.wait_for.unwrap_or_default();
        let request = Request::get(queue, options);

        let response = if wait.is_zero() {
            self.send_recv(&request)?
        } else {
            self.send_recv_with_allowance(&request, wait)?
        };

        match response {
            Response::Value(value) => Ok(Some(value.data)),
            Response::End => Ok(None),
            other => Err(unexpected(&request, other)),
        }
    }

    /// Start a reliable read: the item stays pending until closed or aborted
    pub fn reserve(&mut self, queue: &str) -> Result<Option<Bytes>> {
        self.get(queue, GetOptions::new().open())
    }

    /// Confirm the pending reliable read and open the next one
    pub fn close_and_reserve(&mut self, queue: &str) -> Result<Option<Bytes>> {
        self.get(queue, GetOptions::new().close().open())
    }

    /// Confirm the pending reliable read without fetching another item
    pub fn close(&mut self, queue: &str) -> Result<()> {
        self.get(queue, GetOptions::new().close()).map(|_| ())
    }

    /// Return the pending reliable read to the head of the queue
    pub fn abort(&mut self, queue: &str) -> Result<Option<Bytes>> {
        self.get(queue, GetOptions::new().abort())
    }

    /// Look at the head item without removing it
    pub fn peek(&mut self, queue: &str) -> Result<Option<Bytes>> {
        self.get(queue, GetOptions::new().peek())
    }

    /// Remove a queue. Deleting a missing queue is not an error.
    pub fn delete(&mut self, queue: &str) -> Result<bool> {
        let request = Request::delete(queue);
        match self.send_recv(&request)? {
            Response::Deleted => Ok(true),
            Response::NotFound => Ok(false),
            other => Err(unexpected(&request, other)),
        }
    }

    /// Drop every item of one queue
    pub fn flush(&mut self, queue: &str) -> Result<bool> {
        let request = Request::flush(queue);
        let response = self.send_recv_with_allowance(&request, self.flush_timeout)?;
        Ok(matches!(response, Response::End))
    }

    /// Drop every item of every queue
    pub fn flush_all(&mut self) -> Result<bool> {
        let response = self.send_recv_with_allowance(&Request::FlushAll, self.flush_timeout)?;
        Ok(matches!(response, Response::End))
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Stats snapshot, served from cache while fresh
    pub fn stats(&mut self) -> Result<ServerStats> {
        let Client {
            connection,
            stats_cache,
            ..
        } = self;
        stats_cache.get_or_refresh(|| fetch_stats(connection))
    }

    /// Stats snapshot straight from the server
    pub fn stats_uncached(&mut self) -> Result<ServerStats> {
        fetch_stats(&mut self.connection)
    }

    /// Stats of one queue, `None` if the server does not know it
    pub fn queue_stats(&mut self, queue: &str) -> Result<Option<Stats>> {
        Ok(self.stats()?.queues.remove(queue))
    }

    // =========================================================================
    // Administration
    // =========================================================================

    /// Ask the server to reload its configuration
    pub fn reload(&mut self) -> Result<bool> {
        let response = self.send_recv(&Request::Reload)?;
        Ok(!response.is_error())
    }

    /// Ask the server to shut down
    pub fn shutdown(&mut self) -> Result<bool> {
        let response = self.send_recv(&Request::Shutdown)?;
        self.connection.close();
        Ok(!response.is_error())
    }

    /// Ask the server to hang up. Returns `true` once the connection closed.
    pub fn quit(&mut self) -> Result<bool> {
        let response = self.send_recv(&Request::Quit)?;
        self.connection.close();
        Ok(matches!(response, Response::Eof))
    }

    // =========================================================================
    // Request/Response
    // =========================================================================

    /// Send `request` and read its complete response.
    ///
    /// Error replies become [`KestrelError::ClientFault`] or
    /// [`KestrelError::ServerFault`].
    pub fn send_recv(&mut self, request: &Request) -> Result<Response> {
        exchange(&mut self.connection, request)
    }

    fn send_recv_with_allowance(&mut self, request: &Request, extra: Duration) -> Result<Response> {
        self.connection
            .with_additional_read_timeout(extra, |conn| exchange(conn, request))
    }
}

fn exchange<T: Transport>(connection: &mut Connection<T>, request: &Request) -> Result<Response> {
    connection.write(&request.to_bytes())?;
    let response = read_response(connection)?.into_result()?;

    if !request.accepts(&response) {
        tracing::warn!(
            "{} received unexpected response '{}'",
            request.keyword(),
            response.message()
        );
    }
    Ok(response)
}

/// STATS followed by DUMP_STATS, merged into one snapshot
fn fetch_stats<T: Transport>(connection: &mut Connection<T>) -> Result<ServerStats> {
    let stats = match exchange(connection, &Request::Stats)? {
        Response::Stats(stats) => stats,
        other => return Err(unexpected(&Request::Stats, other)),
    };

    let queues = match exchange(connection, &Request::DumpStats)? {
        Response::DumpedStats(queues) => queues,
        Response::End => QueueStats::new(),
        other => return Err(unexpected(&Request::DumpStats, other)),
    };

    Ok(ServerStats { stats, queues })
}

fn unexpected(request: &Request, response: Response) -> KestrelError {
    KestrelError::UnexpectedResponse(format!(
        "{} got '{}'",
        request.keyword(),
        response.message()
    ))
}
