//! Transport Tests
//!
//! Real sockets against local listeners.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;
use std::time::{Duration, Instant};

use kestrel_client::network::{Connection, SocketTransport, Transport};
use kestrel_client::{Config, KestrelError};

use crate::common::{local_config, spawn_silent_server};

/// Slack allowed past a deadline for scheduling and socket wakeup
const GRANULARITY: Duration = Duration::from_millis(150);

// =============================================================================
// Connect
// =============================================================================

#[test]
fn test_connect_refused() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut transport = SocketTransport::new(&local_config(port));
    let err = transport.ensure_connected().unwrap_err();

    assert!(matches!(err, KestrelError::Connect { .. }), "{:?}", err);
    assert!(!transport.is_connected());
}

#[test]
fn test_connect_reports_peer() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut transport = SocketTransport::new(&local_config(port));
    assert_eq!(transport.peer(), format!("127.0.0.1:{}", port));

    assert!(transport.ensure_connected().unwrap());
    assert!(transport.is_connected());
    assert!(transport.local_addr().is_some());
}

#[test]
fn test_request_reply_over_socket() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        let mut stream = stream;
        stream.write_all(b"VERSION 2.4.1\r\n").unwrap();
        line
    });

    let mut conn = Connection::open(&local_config(port));
    conn.write(b"VERSION\r\n").unwrap();
    assert_eq!(&conn.read_line().unwrap()[..], b"VERSION 2.4.1\r\n");

    assert_eq!(server.join().unwrap(), "VERSION\r\n");
}

#[test]
fn test_peer_close_is_eof() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        drop(stream);
    });

    let mut conn = Connection::open(&local_config(port));
    conn.write(b"QUIT\r\n").unwrap();
    assert_eq!(&conn.read_line().unwrap()[..], b"EOF");
    assert!(!conn.is_connected());
}

// =============================================================================
// Timeouts
// =============================================================================

#[test]
fn test_read_timeout_is_bounded() {
    let port = spawn_silent_server();
    let config = Config::builder()
        .host("127.0.0.1")
        .port(port)
        .read_timeout(Duration::from_millis(100))
        .build();

    let mut conn = Connection::open(&config);
    conn.write(b"GET q\r\n").unwrap();

    let started = Instant::now();
    let err = conn.read_line().unwrap_err();
    let elapsed = started.elapsed();

    match err {
        KestrelError::ReadTimeout { timeout, .. } => {
            assert_eq!(timeout, Duration::from_millis(100))
        }
        other => panic!("Expected ReadTimeout, got {:?}", other),
    }
    assert!(elapsed >= Duration::from_millis(100), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(100) + GRANULARITY, "{:?}", elapsed);
    assert!(!conn.is_connected());
}

#[test]
fn test_timeout_then_redial() {
    let port = spawn_silent_server();
    let config = Config::builder()
        .host("127.0.0.1")
        .port(port)
        .read_timeout(Duration::from_millis(50))
        .build();

    let mut conn = Connection::open(&config);
    conn.write(b"GET q\r\n").unwrap();
    assert!(conn.read_line().unwrap_err().is_timeout());

    // The next operation dials a fresh socket
    conn.write(b"GET q\r\n").unwrap();
    assert!(conn.is_connected());
}

#[test]
fn test_write_timeout_is_bounded() {
    let port = spawn_silent_server();
    let config = Config::builder()
        .host("127.0.0.1")
        .port(port)
        .write_timeout(Duration::from_millis(100))
        .build();

    // Far more than the socket buffers hold while the peer never reads
    let payload = vec![b'x'; 64 * 1024 * 1024];

    let mut conn = Connection::open(&config);
    let started = Instant::now();
    let err = conn.write(&payload).unwrap_err();
    let elapsed = started.elapsed();

    match err {
        KestrelError::WriteTimeout { addr, timeout } => {
            assert_eq!(addr, format!("127.0.0.1:{}", port));
            assert_eq!(timeout, Duration::from_millis(100));
        }
        other => panic!("Expected WriteTimeout, got {:?}", other),
    }
    assert!(elapsed >= Duration::from_millis(100), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(100) + GRANULARITY, "{:?}", elapsed);
    assert!(!conn.is_connected());
}
