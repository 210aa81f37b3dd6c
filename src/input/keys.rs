//! Key edge definitions and line parsing
//!
//! One edge per line: `press [t]` or `release [t]`, with `down`/`up` and
//! `1`/`0` accepted as aliases. `t` is in seconds.

use super::InputError;

/// Direction of a key transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Press,
    Release,
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Edge::Press => write!(f, "press"),
            Edge::Release => write!(f, "release"),
        }
    }
}

/// Timestamped key transition delivered to the decoder
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyEvent {
    /// Key went down at the given time in seconds
    Pressed(f64),
    /// Key went up at the given time in seconds
    Released(f64),
}

impl KeyEvent {
    /// Build an event from an edge and a timestamp
    pub fn new(edge: Edge, timestamp: f64) -> Self {
        match edge {
            Edge::Press => KeyEvent::Pressed(timestamp),
            Edge::Release => KeyEvent::Released(timestamp),
        }
    }

    /// Direction of this transition
    pub fn edge(&self) -> Edge {
        match self {
            KeyEvent::Pressed(_) => Edge::Press,
            KeyEvent::Released(_) => Edge::Release,
        }
    }

    /// Timestamp in seconds
    pub fn timestamp(&self) -> f64 {
        match *self {
            KeyEvent::Pressed(t) | KeyEvent::Released(t) => t,
        }
    }
}

/// Parse one input line
///
/// Returns `Ok(None)` for blank lines and `#` comments. Lines without a
/// timestamp are stamped with `now`.
pub fn parse_line(line: &str, now: f64) -> Result<Option<KeyEvent>, InputError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut parts = line.split_whitespace();
    let edge = match parts.next().map(str::to_ascii_lowercase).as_deref() {
        Some("press" | "down" | "1") => Edge::Press,
        Some("release" | "up" | "0") => Edge::Release,
        _ => return Err(InputError::UnknownEdge(line.to_string())),
    };

    let timestamp = match parts.next() {
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|t| t.is_finite())
            .ok_or_else(|| InputError::BadTimestamp(raw.to_string()))?,
        None => now,
    };

    if parts.next().is_some() {
        return Err(InputError::UnknownEdge(line.to_string()));
    }

    Ok(Some(KeyEvent::new(edge, timestamp)))
}
