//! Continuation Tests
//!
//! Multi-line responses read through a scripted connection.

use kestrel_client::protocol::{read_response, Response, StatValue};
use kestrel_client::KestrelError;

use crate::common::scripted;

// =============================================================================
// VALUE
// =============================================================================

#[test]
fn test_value_block() {
    let mut conn = scripted(["VALUE q 0 5\r\nhello\r\nEND\r\n"]);

    match read_response(&mut conn).unwrap() {
        Response::Value(value) => {
            assert_eq!(value.queue, "q");
            assert_eq!(value.flags, 0);
            assert_eq!(&value.data[..], b"hello");
        }
        other => panic!("Expected VALUE, got {:?}", other),
    }
    assert!(conn.buffered().is_empty());
}

#[test]
fn test_value_split_across_chunks() {
    let mut conn = scripted(["VAL", "UE q 7 5\r", "\nhe", "llo", "\r\nE", "ND\r\n"]);

    match read_response(&mut conn).unwrap() {
        Response::Value(value) => {
            assert_eq!(value.flags, 7);
            assert_eq!(&value.data[..], b"hello");
        }
        other => panic!("Expected VALUE, got {:?}", other),
    }
    assert!(conn.buffered().is_empty());
}

#[test]
fn test_value_payload_may_contain_crlf() {
    let mut conn = scripted(["VALUE q 0 6\r\nab\r\ncd\r\nEND\r\n"]);

    match read_response(&mut conn).unwrap() {
        Response::Value(value) => assert_eq!(&value.data[..], b"ab\r\ncd"),
        other => panic!("Expected VALUE, got {:?}", other),
    }
}

#[test]
fn test_value_leaves_next_response_buffered() {
    let mut conn = scripted(["VALUE q 0 1\r\nx\r\nEND\r\nSTORED\r\n"]);

    assert!(matches!(read_response(&mut conn).unwrap(), Response::Value(_)));
    assert_eq!(conn.buffered(), b"STORED\r\n");
    assert_eq!(read_response(&mut conn).unwrap(), Response::Stored);
}

#[test]
fn test_value_without_terminator_fails() {
    let mut conn = scripted(["VALUE q 0 5\r\nhello\r\nSTORED\r\n"]);
    let err = read_response(&mut conn).unwrap_err();
    assert!(matches!(err, KestrelError::Protocol(_)));
}

#[test]
fn test_value_block_without_crlf_fails() {
    let mut conn = scripted(["VALUE q 0 5\r\nhelloXY\r\nEND\r\n"]);
    let err = read_response(&mut conn).unwrap_err();
    assert!(matches!(err, KestrelError::Protocol(_)));
}

#[test]
fn test_value_truncated_by_close_fails() {
    let mut conn = scripted(["VALUE q 0 10\r\nhel"]);
    let err = read_response(&mut conn).unwrap_err();
    assert!(matches!(err, KestrelError::Protocol(_)));
    assert!(!conn.is_connected());
}

#[test]
fn test_value_with_missing_arguments_fails() {
    let mut conn = scripted(["VALUE q 0\r\n"]);
    let err = read_response(&mut conn).unwrap_err();
    assert!(matches!(err, KestrelError::Protocol(_)));
}

#[test]
fn test_value_with_bad_length_fails() {
    let mut conn = scripted(["VALUE q 0 five\r\nhello\r\nEND\r\n"]);
    let err = read_response(&mut conn).unwrap_err();
    assert!(matches!(err, KestrelError::Protocol(_)));

    // The unread payload goes with the socket
    assert!(!conn.is_connected());
    assert!(conn.buffered().is_empty());
}

#[test]
fn test_empty_fetch_is_end() {
    let mut conn = scripted(["END\r\n"]);
    assert_eq!(read_response(&mut conn).unwrap(), Response::End);
}

// =============================================================================
// STAT
// =============================================================================

#[test]
fn test_stats_block() {
    let mut conn = scripted(["STAT curr_items 3\r\nSTAT uptime 1.5\r\nSTAT version 2.4.1\r\nEND\r\n"]);

    match read_response(&mut conn).unwrap() {
        Response::Stats(stats) => {
            assert_eq!(stats.get("curr_items"), Some(&StatValue::Integer(3)));
            assert_eq!(stats.get("uptime"), Some(&StatValue::Float(1.5)));
            assert_eq!(
                stats.get("version"),
                Some(&StatValue::Text("2.4.1".to_string()))
            );
            assert_eq!(stats.len(), 3);
        }
        other => panic!("Expected STAT block, got {:?}", other),
    }
    assert!(conn.buffered().is_empty());
}

#[test]
fn test_stats_excludes_per_queue_keys() {
    let mut conn = scripted([
        "STAT queue_foo_extra 1\r\n",
        "STAT queue_creates 4\r\n",
        "STAT curr_items 3\r\n",
        "END\r\n",
    ]);

    match read_response(&mut conn).unwrap() {
        Response::Stats(stats) => {
            assert!(!stats.contains_key("queue_foo_extra"));
            assert_eq!(stats.get("queue_creates"), Some(&StatValue::Integer(4)));
            assert_eq!(stats.get("curr_items"), Some(&StatValue::Integer(3)));
        }
        other => panic!("Expected STAT block, got {:?}", other),
    }
}

#[test]
fn test_stats_with_foreign_line_fails() {
    let mut conn = scripted(["STAT uptime 5\r\nSTORED\r\nEND\r\n"]);
    let err = read_response(&mut conn).unwrap_err();
    assert!(matches!(err, KestrelError::Protocol(_)));
    assert!(!conn.is_connected());
    assert!(conn.buffered().is_empty());
}

#[test]
fn test_stats_cut_off_by_close_fails() {
    let mut conn = scripted(["STAT uptime 5\r\n"]);
    let err = read_response(&mut conn).unwrap_err();
    assert!(matches!(err, KestrelError::Protocol(_)));
    assert!(!conn.is_connected());
}

// =============================================================================
// DUMP_STATS
// =============================================================================

#[test]
fn test_dumped_stats_blocks() {
    let mut conn = scripted([
        "queue 'a' {\r\n",
        "  items=2\r\n",
        "}\r\n",
        "queue 'b' {\r\n",
        "  items=0\r\n",
        "}\r\n",
        "END\r\n",
    ]);

    match read_response(&mut conn).unwrap() {
        Response::DumpedStats(queues) => {
            assert_eq!(queues.len(), 2);
            assert_eq!(queues["a"].get("items"), Some(&StatValue::Integer(2)));
            assert_eq!(queues["b"].get("items"), Some(&StatValue::Integer(0)));
        }
        other => panic!("Expected queue blocks, got {:?}", other),
    }
    assert!(conn.buffered().is_empty());
}

#[test]
fn test_dumped_stats_mixed_values() {
    let mut conn = scripted([
        "queue 'jobs.high' {\r\n  items=12\r\n  age=0.25\r\n  state=open\r\n}\r\nEND\r\n",
    ]);

    match read_response(&mut conn).unwrap() {
        Response::DumpedStats(queues) => {
            let jobs = &queues["jobs.high"];
            assert_eq!(jobs.get("items"), Some(&StatValue::Integer(12)));
            assert_eq!(jobs.get("age"), Some(&StatValue::Float(0.25)));
            assert_eq!(jobs.get("state"), Some(&StatValue::Text("open".to_string())));
        }
        other => panic!("Expected queue blocks, got {:?}", other),
    }
}

#[test]
fn test_dumped_stats_empty_block() {
    let mut conn = scripted(["queue 'idle' {\r\n}\r\nEND\r\n"]);

    match read_response(&mut conn).unwrap() {
        Response::DumpedStats(queues) => assert!(queues["idle"].is_empty()),
        other => panic!("Expected queue blocks, got {:?}", other),
    }
}

#[test]
fn test_assignment_outside_block_fails() {
    let mut conn = scripted(["queue 'a' {\r\n}\r\nitems=2\r\nEND\r\n"]);
    let err = read_response(&mut conn).unwrap_err();
    assert!(matches!(err, KestrelError::Protocol(_)));
}

#[test]
fn test_dumped_stats_with_garbage_fails() {
    let mut conn = scripted(["queue 'a' {\r\nthis is not a stat\r\n}\r\nEND\r\n"]);
    let err = read_response(&mut conn).unwrap_err();
    assert!(matches!(err, KestrelError::Protocol(_)));
}

// =============================================================================
// End of Stream
// =============================================================================

#[test]
fn test_closed_stream_is_eof_response() {
    let mut conn = scripted(Vec::<&[u8]>::new());
    assert_eq!(read_response(&mut conn).unwrap(), Response::Eof);
    assert!(!conn.is_connected());
}
