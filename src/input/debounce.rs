//! Edge debouncing applied before events reach the decoder
//!
//! Drops edges that arrive within the bounce window of the last accepted
//! edge, and edges that repeat the direction of the last accepted one, so
//! the decoder only ever sees alternating press/release transitions.

use super::keys::{Edge, KeyEvent};

/// Bounce filter for a single switch
#[derive(Debug, Clone)]
pub struct Debouncer {
    window_secs: f64,
    last: Option<(Edge, f64)>,
}

impl Debouncer {
    /// Create a debouncer with a bounce window in milliseconds
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_secs: window_ms as f64 / 1000.0,
            last: None,
        }
    }

    /// Returns true if the event should be forwarded
    pub fn accept(&mut self, event: &KeyEvent) -> bool {
        let edge = event.edge();
        let timestamp = event.timestamp();

        match self.last {
            // A session starts with the key down
            None if edge == Edge::Release => return false,
            Some((last_edge, _)) if last_edge == edge => return false,
            Some((_, last_time)) if timestamp - last_time < self.window_secs => return false,
            _ => {}
        }

        self.last = Some((edge, timestamp));
        true
    }
}
