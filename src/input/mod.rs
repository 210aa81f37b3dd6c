//! Input module for key edge sources
//!
//! Parses press/release edges from a line-oriented source, applies the
//! bounce filter and forwards clean alternating edges to the decoder.

mod debounce;
mod keys;
mod listener;

pub use debounce::Debouncer;
pub use keys::{parse_line, Edge, KeyEvent};
pub use listener::{EdgeListener, InputError};
