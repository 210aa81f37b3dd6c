//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::decoder::{DecoderSnapshot, DecoderStats};
use crate::events::DecodeEvent;

/// Requests from clients to the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request a full status snapshot
    GetStatus,

    /// Request the decoded text and the letter in progress
    GetText,

    /// Ping to check connectivity
    Ping,

    /// Switch this connection to pushed decode notifications
    Subscribe,
}

/// Responses from daemon to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current decoder status
    Status(DecoderStatus),

    /// Decoded text so far
    Text { text: String, pending: String },

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

/// Push notification from daemon to subscribed clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Decoder emitted an event
    Decode { event: DecodeEvent },

    /// Client fell behind and missed events
    Lagged { skipped: u64 },
}

/// Full decoder status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderStatus {
    /// Daemon version
    pub version: String,

    /// Text decoded so far
    pub text: String,

    /// Pattern of the letter in progress
    pub pending: String,

    /// Session counters
    pub stats: DecoderStats,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl Default for DecoderStatus {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            text: String::new(),
            pending: String::new(),
            stats: DecoderStats::default(),
            uptime_secs: 0,
        }
    }
}

impl DecoderStatus {
    /// Status for a decoder snapshot
    pub fn from_snapshot(snapshot: DecoderSnapshot, uptime_secs: u64) -> Self {
        Self {
            text: snapshot.text,
            pending: snapshot.pending,
            stats: snapshot.stats,
            uptime_secs,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let json = serde_json::to_string(&Request::GetText).unwrap();
        assert_eq!(json, r#"{"type":"get_text"}"#);

        let req: Request = serde_json::from_str(r#"{"type":"subscribe"}"#).unwrap();
        assert!(matches!(req, Request::Subscribe));
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::Status(DecoderStatus::default());
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("status"));
        assert!(json.contains("rejected_edges"));
    }

    #[test]
    fn test_notification_serialization() {
        let note = Notification::Decode {
            event: DecodeEvent::WordCompleted {
                text: "SOS ".to_string(),
            },
        };
        let json = serde_json::to_string(&note).unwrap();
        assert!(json.contains(r#""type":"decode""#));
        assert!(json.contains("word_completed"));
    }

    #[test]
    fn test_status_from_snapshot() {
        let snapshot = DecoderSnapshot {
            text: "E ".to_string(),
            pending: ".-".to_string(),
            stats: DecoderStats {
                letters: 1,
                words: 1,
                ..Default::default()
            },
        };
        let status = DecoderStatus::from_snapshot(snapshot, 12);

        assert_eq!(status.text, "E ");
        assert_eq!(status.pending, ".-");
        assert_eq!(status.stats.letters, 1);
        assert_eq!(status.uptime_secs, 12);
        assert_eq!(status.version, env!("CARGO_PKG_VERSION"));
    }
}
