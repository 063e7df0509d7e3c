//! Stats cache
//!
//! Time-boxed memoizer for the client's stats snapshot, so dashboards and
//! health checks polling `stats()` do not hit the server on every call.

use std::time::{Duration, Instant};

use crate::error::Result;
use crate::protocol::ServerStats;

/// Serves the last fetched [`ServerStats`] until `ttl` has passed
#[derive(Debug, Clone)]
pub struct StatsCache {
    ttl: Duration,
    last_refresh: Option<Instant>,
    stats: Option<ServerStats>,
}

impl StatsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            last_refresh: None,
            stats: None,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// When the cached snapshot was fetched
    pub fn last_refresh(&self) -> Option<Instant> {
        self.last_refresh
    }

    /// True if nothing is cached or the snapshot has reached the TTL
    pub fn is_expired(&self) -> bool {
        match (self.last_refresh, &self.stats) {
            (Some(at), Some(_)) => at.elapsed() >= self.ttl,
            _ => true,
        }
    }

    /// Return the cached snapshot, calling `fetch` first if it has expired.
    ///
    /// A failed fetch leaves the previous snapshot in place.
    pub fn get_or_refresh<F>(&mut self, fetch: F) -> Result<ServerStats>
    where
        F: FnOnce() -> Result<ServerStats>,
    {
        if !self.is_expired() {
            if let Some(stats) = &self.stats {
                return Ok(stats.clone());
            }
        }

        let fresh = fetch()?;
        self.stats = Some(fresh.clone());
        self.last_refresh = Some(Instant::now());
        Ok(fresh)
    }

    /// Force the next call to refetch
    pub fn invalidate(&mut self) {
        self.last_refresh = None;
    }
}
