//! Morse decoder module
//!
//! - `classifier`: maps press and release durations to symbols and gaps
//! - `table`: read-only Morse table for A-Z and 0-9
//! - `machine`: session state machine consuming timestamped key edges

mod classifier;
mod machine;
pub mod table;

pub use classifier::{GapKind, Symbol, Thresholds};
pub use machine::{
    Decoder, DecodeError, DecoderSnapshot, DecoderState, DecoderStats, SymbolSequence,
};
pub use table::UNKNOWN_LETTER;
