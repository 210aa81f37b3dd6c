//! morse-decoder: real-time Morse decoding for a single momentary switch
//!
//! Timestamped press/release edges go in, decoded text comes out. Only
//! the durations of presses and releases are used, measured against one
//! configurable time unit:
//! - Presses classify as dot or dash
//! - Releases mark letter and word boundaries
//!
//! The binary wires a line-oriented edge source to the decoder and serves
//! the decoded text over a Unix socket.

pub mod config;
pub mod decoder;
pub mod events;
pub mod input;
pub mod ipc;
pub mod lifecycle;

pub use config::{Config, ConfigError, TimingConfig};
pub use decoder::{Decoder, DecodeError, GapKind, Symbol, Thresholds};
pub use events::DecodeEvent;
pub use input::KeyEvent;
