//! Statistics values and line grammars
//!
//! Shared by the `STAT` and `queue '<name>' {` continuations.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// A statistic value, coerced from its wire token
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl StatValue {
    /// Digits only become an integer, digits-dot-digits a float, anything
    /// else stays text. Integers too large for `i64` stay text.
    pub fn coerce(token: &str) -> Self {
        if is_digits(token) {
            if let Ok(n) = token.parse::<i64>() {
                return StatValue::Integer(n);
            }
        } else if let Some((whole, frac)) = token.split_once('.') {
            if is_digits(whole) && is_digits(frac) {
                if let Ok(f) = token.parse::<f64>() {
                    return StatValue::Float(f);
                }
            }
        }
        StatValue::Text(token.to_string())
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            StatValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Integers widen to floats
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StatValue::Integer(n) => Some(*n as f64),
            StatValue::Float(f) => Some(*f),
            StatValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StatValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Integer(n) => write!(f, "{}", n),
            StatValue::Float(x) => write!(f, "{}", x),
            StatValue::Text(s) => f.write_str(s),
        }
    }
}

/// Flat server-wide statistics
pub type Stats = BTreeMap<String, StatValue>;

/// Per-queue statistics, keyed by queue name
pub type QueueStats = BTreeMap<String, Stats>;

/// Combined STATS + DUMP_STATS snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServerStats {
    pub stats: Stats,
    pub queues: QueueStats,
}

impl ServerStats {
    /// Global statistic by name
    pub fn get(&self, key: &str) -> Option<&StatValue> {
        self.stats.get(key)
    }

    /// Statistics of one queue
    pub fn queue(&self, name: &str) -> Option<&Stats> {
        self.queues.get(name)
    }
}

/// Keys of the form `queue_<name>_<stat>` are per-queue figures repeated in
/// the STATS output; they stay out of the global map.
pub fn is_global_stat_key(key: &str) -> bool {
    let mut parts = key.split('_');
    !(parts.next() == Some("queue") && parts.count() > 1)
}

/// `STAT <key> <value>`
pub(crate) fn parse_stat_line(line: &str) -> Option<(&str, &str)> {
    let mut parts = line.split(' ');
    let (keyword, key, value) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || keyword != "STAT" {
        return None;
    }
    if !is_word(key) || !is_token(value) {
        return None;
    }
    Some((key, value))
}

/// `queue '<name>' {`
pub(crate) fn parse_queue_header(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("queue")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start().strip_prefix('\'')?;
    let (name, rest) = rest.split_once('\'')?;
    if name.is_empty() || name.contains(char::is_whitespace) || rest.trim() != "{" {
        return None;
    }
    Some(name)
}

/// `<key>=<value>` inside a queue block
pub(crate) fn parse_assignment(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    if !is_word(key) || !is_token(value) {
        return None;
    }
    Some((key, value))
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn is_token(s: &str) -> bool {
    !s.is_empty() && !s.contains(char::is_whitespace)
}
