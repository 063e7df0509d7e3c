//! Configuration for the Kestrel client
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

use crate::error::{KestrelError, Result};

/// Default memcache-protocol port of a Kestrel server
pub const DEFAULT_PORT: u16 = 22133;

/// Largest item a VALUE block may announce by default (64 MiB)
pub const DEFAULT_MAX_ITEM_SIZE: usize = 64 * 1024 * 1024;

/// Main configuration for a client connection
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Server Location
    // -------------------------------------------------------------------------
    /// Hostname or IPv4 address of the server
    pub host: String,

    /// TCP port of the memcache-protocol listener
    pub port: u16,

    // -------------------------------------------------------------------------
    // Timeouts
    // -------------------------------------------------------------------------
    /// Budget shared by every candidate address while dialing
    pub connect_timeout: Duration,

    /// Budget for reading one complete response
    pub read_timeout: Duration,

    /// Budget for writing one request
    pub write_timeout: Duration,

    /// Extra read allowance for FLUSH and FLUSH_ALL, which block server-side
    pub flush_timeout: Duration,

    // -------------------------------------------------------------------------
    // Limits
    // -------------------------------------------------------------------------
    /// VALUE blocks announcing more bytes than this are rejected unread
    pub max_item_size: usize,

    // -------------------------------------------------------------------------
    // TCP Keepalive
    // -------------------------------------------------------------------------
    pub keepalive: KeepaliveConfig,

    // -------------------------------------------------------------------------
    // Stats Cache
    // -------------------------------------------------------------------------
    /// How long a fetched stats snapshot is served before refetching
    pub stats_cache_ttl: Duration,
}

/// TCP keepalive tuning applied to every dialed socket
#[derive(Debug, Clone, Copy)]
pub struct KeepaliveConfig {
    /// Enable SO_KEEPALIVE at all
    pub active: bool,

    /// Idle time before the first probe (TCP_KEEPIDLE)
    pub idle: Duration,

    /// Time between unanswered probes (TCP_KEEPINTVL)
    pub interval: Duration,

    /// Unanswered probes before the peer is considered dead (TCP_KEEPCNT)
    pub count: u32,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            active: true,
            idle: Duration::from_secs(60),
            interval: Duration::from_secs(30),
            count: 5,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_secs(2),
            write_timeout: Duration::from_secs(2),
            flush_timeout: Duration::from_secs(60),
            max_item_size: DEFAULT_MAX_ITEM_SIZE,
            keepalive: KeepaliveConfig::default(),
            stats_cache_ttl: Duration::ZERO,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// `host:port` as used in error messages and logs
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Reject settings that can never produce a working connection
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(KestrelError::Config("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(KestrelError::Config("port must not be 0".to_string()));
        }

        let timeouts = [
            ("connect_timeout", self.connect_timeout),
            ("read_timeout", self.read_timeout),
            ("write_timeout", self.write_timeout),
        ];
        for (name, value) in timeouts {
            if value.is_zero() {
                return Err(KestrelError::Config(format!("{} must be non-zero", name)));
            }
        }

        if self.max_item_size == 0 {
            return Err(KestrelError::Config(
                "max_item_size must be non-zero".to_string(),
            ));
        }

        if self.keepalive.active && self.keepalive.count == 0 {
            return Err(KestrelError::Config(
                "keepalive count must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the server host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the read timeout
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// Set the write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    /// Set the extra read allowance for flush operations
    pub fn flush_timeout(mut self, timeout: Duration) -> Self {
        self.config.flush_timeout = timeout;
        self
    }

    /// Enable or disable TCP keepalive
    pub fn keepalive(mut self, active: bool) -> Self {
        self.config.keepalive.active = active;
        self
    }

    /// Set the keepalive idle time, probe interval and probe count
    pub fn keepalive_tuning(mut self, idle: Duration, interval: Duration, count: u32) -> Self {
        self.config.keepalive.idle = idle;
        self.config.keepalive.interval = interval;
        self.config.keepalive.count = count;
        self
    }

    /// Set the stats cache TTL
    pub fn max_item_size(mut self, bytes: usize) -> Self {
        self.config.max_item_size = bytes;
        self
    }

    pub fn stats_cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.stats_cache_ttl = ttl;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
