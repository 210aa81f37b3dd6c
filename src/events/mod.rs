//! Events module for decoder observers
//!
//! Every accepted edge that changes the decoder's buffers produces one or
//! more events, so loggers and IPC clients can follow a session without
//! touching decoder state.

use serde::{Deserialize, Serialize};

use crate::decoder::Symbol;

/// Events emitted by the decoder while processing edges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecodeEvent {
    /// A dot or dash was added to the letter in progress
    SymbolAppended {
        symbol: Symbol,
        /// Pattern of the letter in progress, e.g. `".-"`
        sequence: String,
    },

    /// A letter was completed and appended to the decoded text
    LetterDecoded {
        letter: char,
        sequence: String,
        /// False when the pattern had no table entry
        recognized: bool,
        text: String,
    },

    /// A word gap appended a space to the decoded text
    WordCompleted { text: String },

    /// A press landed between the dot and dash windows and was dropped
    AmbiguousPress {
        /// Press duration in milliseconds
        duration_ms: u64,
    },

    /// An edge was discarded without changing decoder state
    EdgeRejected { reason: String },
}

impl std::fmt::Display for DecodeEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeEvent::SymbolAppended { sequence, .. } => {
                write!(f, "SYMBOL_APPENDED ({})", sequence)
            }
            DecodeEvent::LetterDecoded {
                letter, sequence, ..
            } => write!(f, "LETTER_DECODED ({} = {})", sequence, letter),
            DecodeEvent::WordCompleted { text } => write!(f, "WORD_COMPLETED ({:?})", text),
            DecodeEvent::AmbiguousPress { duration_ms } => {
                write!(f, "AMBIGUOUS_PRESS ({}ms)", duration_ms)
            }
            DecodeEvent::EdgeRejected { reason } => write!(f, "EDGE_REJECTED ({})", reason),
        }
    }
}
