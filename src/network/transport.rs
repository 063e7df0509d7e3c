//! Socket Transport
//!
//! Owns one OS socket. Resolves the target, dials with a shared deadline,
//! applies Nagle/keepalive options and performs bounded-wait reads and
//! writes. Knows nothing about the protocol.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, SockAddr, Socket, TcpKeepalive, Type};

use crate::config::{Config, KeepaliveConfig};
use crate::error::{KestrelError, Result};

/// An absolute instant an operation must finish by, plus the budget it was
/// computed from (kept for error messages).
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    /// Deadline `budget` from now
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    /// Time left before expiry, zero once passed
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn instant(&self) -> Instant {
        self.at
    }
}

/// Byte-level I/O used by [`Connection`](super::Connection).
///
/// Every read and write is bounded by an absolute deadline supplied by the
/// caller, so retries after a partial transfer never extend the budget.
pub trait Transport {
    /// Dial if there is no usable socket.
    ///
    /// Returns `true` when a fresh socket was opened, so callers can drop any
    /// bytes buffered from the previous one.
    fn ensure_connected(&mut self) -> Result<bool>;

    /// Read at most `buf.len()` bytes. `Ok(0)` means the peer closed the stream.
    fn read(&mut self, buf: &mut [u8], deadline: Deadline) -> Result<usize>;

    /// Write the whole buffer before `deadline`.
    fn write_all(&mut self, buf: &[u8], deadline: Deadline) -> Result<()>;

    /// Drop the socket. The next operation redials.
    fn close(&mut self);

    fn is_connected(&self) -> bool;

    /// `host:port` for logs and error messages
    fn peer(&self) -> &str;
}

/// TCP transport backed by a `socket2`-configured stream
pub struct SocketTransport {
    host: String,
    port: u16,
    addr: String,
    connect_timeout: Duration,
    keepalive: KeepaliveConfig,
    stream: Option<TcpStream>,

    /// Process that dialed `stream`; a mismatch means we are in a forked child
    owner_pid: Option<u32>,
}

impl SocketTransport {
    pub fn new(config: &Config) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            addr: config.addr(),
            connect_timeout: config.connect_timeout,
            keepalive: config.keepalive,
            stream: None,
            owner_pid: None,
        }
    }

    /// Local address of the current socket, if connected
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.stream.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Resolve the target and try each IPv4 candidate until one connects.
    ///
    /// All candidates share one deadline computed up front.
    fn connect(&self) -> Result<TcpStream> {
        let deadline = Deadline::after(self.connect_timeout);
        let candidates = self.resolve()?;
        self.connect_any(&candidates, deadline)
    }

    fn resolve(&self) -> Result<Vec<SocketAddr>> {
        let candidates: Vec<SocketAddr> = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|source| KestrelError::Connect {
                addr: self.addr.clone(),
                source,
            })?
            .filter(SocketAddr::is_ipv4)
            .collect();

        if candidates.is_empty() {
            return Err(KestrelError::Connect {
                addr: self.addr.clone(),
                source: io::Error::new(io::ErrorKind::AddrNotAvailable, "no IPv4 address"),
            });
        }
        Ok(candidates)
    }

    /// Dial `candidates` in order until one connects or `deadline` passes
    fn connect_any(&self, candidates: &[SocketAddr], deadline: Deadline) -> Result<TcpStream> {
        let mut last_error = None;
        for &candidate in candidates {
            let remaining = deadline.remaining();
            if remaining.is_zero() {
                return Err(self.connect_timeout_error());
            }

            match self.connect_one(candidate, remaining) {
                Ok(stream) => {
                    tracing::debug!("Connected to {} via {}", self.addr, candidate);
                    return Ok(stream);
                }
                Err(e) => {
                    tracing::debug!("Connect to {} via {} failed: {}", self.addr, candidate, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if is_timeout_kind(&e) || deadline.is_expired() => {
                Err(self.connect_timeout_error())
            }
            Some(source) => Err(KestrelError::Connect {
                addr: self.addr.clone(),
                source,
            }),
            None => Err(self.connect_timeout_error()),
        }
    }

    /// Allocate, configure and dial a single candidate within `timeout`
    fn connect_one(&self, candidate: SocketAddr, timeout: Duration) -> io::Result<TcpStream> {
        let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;

        // Disable Nagle's algorithm: requests are small and latency bound
        socket.set_nodelay(true)?;

        if self.keepalive.active {
            socket.set_keepalive(true)?;
            socket.set_tcp_keepalive(&keepalive_params(&self.keepalive))?;
        }

        socket.connect_timeout(&SockAddr::from(candidate), timeout)?;
        Ok(socket.into())
    }

    fn connect_timeout_error(&self) -> KestrelError {
        KestrelError::ConnectTimeout {
            addr: self.addr.clone(),
            timeout: self.connect_timeout,
        }
    }

    fn stream(&mut self) -> Result<&mut TcpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "socket is closed").into())
    }
}

impl Transport for SocketTransport {
    fn ensure_connected(&mut self) -> Result<bool> {
        let pid = std::process::id();
        if let Some(owner) = self.owner_pid {
            if owner != pid && self.stream.is_some() {
                // Never shut down an inherited socket: that would also cut off
                // the parent. Dropping it only releases our descriptor.
                tracing::debug!(
                    "Socket to {} was opened by pid {} (now {}), redialing",
                    self.addr,
                    owner,
                    pid
                );
                self.stream = None;
            }
        }

        if self.stream.is_some() {
            return Ok(false);
        }

        let stream = self.connect()?;
        self.stream = Some(stream);
        self.owner_pid = Some(pid);
        Ok(true)
    }

    fn read(&mut self, buf: &mut [u8], deadline: Deadline) -> Result<usize> {
        loop {
            let remaining = deadline.remaining();
            if remaining.is_zero() {
                return Err(KestrelError::ReadTimeout {
                    addr: self.addr.clone(),
                    timeout: deadline.budget(),
                });
            }

            let stream = self.stream()?;
            stream.set_read_timeout(Some(remaining))?;
            match stream.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if is_retry_kind(&e) => continue,
                Err(e) => {
                    self.close();
                    return Err(KestrelError::Io(e));
                }
            }
        }
    }

    fn write_all(&mut self, mut buf: &[u8], deadline: Deadline) -> Result<()> {
        while !buf.is_empty() {
            let remaining = deadline.remaining();
            if remaining.is_zero() {
                return Err(KestrelError::WriteTimeout {
                    addr: self.addr.clone(),
                    timeout: deadline.budget(),
                });
            }

            let stream = self.stream()?;
            stream.set_write_timeout(Some(remaining))?;
            match stream.write(buf) {
                Ok(0) => {
                    self.close();
                    return Err(KestrelError::Io(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "socket accepted no bytes",
                    )));
                }
                Ok(n) => buf = &buf[n..],
                Err(e) if is_retry_kind(&e) => continue,
                Err(e) => {
                    self.close();
                    return Err(KestrelError::Io(e));
                }
            }
        }

        Ok(())
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("Closed connection to {}", self.addr);
        }
        self.owner_pid = None;
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn peer(&self) -> &str {
        &self.addr
    }
}

fn keepalive_params(config: &KeepaliveConfig) -> TcpKeepalive {
    let params = TcpKeepalive::new().with_time(config.idle);

    #[cfg(any(
        target_os = "linux",
        target_os = "android",
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "netbsd"
    ))]
    let params = params
        .with_interval(config.interval)
        .with_retries(config.count);

    params
}

/// Would-block and timed-out both mean the bounded wait expired; the deadline
/// check at the top of the loop decides whether to give up.
fn is_retry_kind(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

fn is_timeout_kind(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}
