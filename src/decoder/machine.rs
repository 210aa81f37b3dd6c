//! Core decoder state machine
//!
//! Letters and words are flushed on the press edge, using the length of
//! the release that preceded it. Symbols are accumulated on the release
//! edge, using the length of the press that preceded it.
//!
//! Every accepted or rejected edge publishes a fresh [`DecoderSnapshot`] on a
//! watch channel. Boundary crossings and symbols are additionally reported as
//! [`DecodeEvent`]s; a press that crosses no boundary only updates the
//! snapshot.

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use crate::events::DecodeEvent;
use crate::input::{Edge, KeyEvent};

use super::classifier::{GapKind, Symbol, Thresholds};
use super::table::{self, UNKNOWN_LETTER};

/// Reasons an edge is discarded without touching decoder state
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("timestamp {received} precedes last edge at {previous}")]
    OutOfOrderTimestamp { previous: f64, received: f64 },

    #[error("timestamp is not finite: {0}")]
    NonFiniteTimestamp(f64),

    #[error("{0} received twice in a row")]
    DuplicateEdge(Edge),

    #[error("release received before any press")]
    NoPriorPress,
}

/// Dots and dashes of the letter in progress
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolSequence(String);

impl SymbolSequence {
    /// Append a symbol. Returns false for [`Symbol::None`], which is not stored.
    pub fn push(&mut self, symbol: Symbol) -> bool {
        match symbol.as_char() {
            Some(c) => {
                self.0.push(c);
                true
            }
            None => false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Take the pattern, leaving the sequence empty
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.0)
    }
}

impl std::fmt::Display for SymbolSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mutable session state owned by a [`Decoder`]
#[derive(Debug, Clone, Default)]
pub struct DecoderState {
    last_press: Option<f64>,
    last_release: Option<f64>,
    key_down: bool,
    sequence: SymbolSequence,
    text: String,
}

impl DecoderState {
    pub fn last_press(&self) -> Option<f64> {
        self.last_press
    }

    pub fn last_release(&self) -> Option<f64> {
        self.last_release
    }

    pub fn is_key_down(&self) -> bool {
        self.key_down
    }

    pub fn sequence(&self) -> &SymbolSequence {
        &self.sequence
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Timestamp of the most recent accepted edge
    fn last_edge(&self) -> Option<f64> {
        match (self.last_press, self.last_release) {
            (Some(p), Some(r)) => Some(p.max(r)),
            (p, r) => p.or(r),
        }
    }
}

/// Session counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderStats {
    /// Edges accepted by the decoder
    pub edges: u64,
    pub symbols: u64,
    pub letters: u64,
    pub unknown_letters: u64,
    pub words: u64,
    pub ambiguous_presses: u64,
    pub rejected_edges: u64,
}

/// Published view of the decoder after each edge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderSnapshot {
    pub text: String,
    pub pending: String,
    pub stats: DecoderStats,
}

/// Morse decoder for a single key
pub struct Decoder {
    thresholds: Thresholds,
    state: DecoderState,
    stats: DecoderStats,
    /// Channel for emitting decode events
    event_tx: broadcast::Sender<DecodeEvent>,
    /// Latest state for observers that must not miss updates
    snapshot_tx: watch::Sender<DecoderSnapshot>,
}

impl Decoder {
    /// Create a decoder with empty buffers
    pub fn new(thresholds: Thresholds, event_tx: broadcast::Sender<DecodeEvent>) -> Self {
        Self {
            thresholds,
            state: DecoderState::default(),
            stats: DecoderStats::default(),
            event_tx,
            snapshot_tx: watch::channel(DecoderSnapshot::default()).0,
        }
    }

    /// Watch the decoder state; always holds the latest snapshot
    pub fn subscribe_snapshots(&self) -> watch::Receiver<DecoderSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Current state as published to observers
    pub fn snapshot(&self) -> DecoderSnapshot {
        DecoderSnapshot {
            text: self.state.text.clone(),
            pending: self.state.sequence.to_string(),
            stats: self.stats,
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn state(&self) -> &DecoderState {
        &self.state
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Text decoded so far
    pub fn current_decoded_text(&self) -> &str {
        &self.state.text
    }

    /// Pattern of the letter in progress
    pub fn pending_sequence(&self) -> &str {
        self.state.sequence.as_str()
    }

    /// Run the decoder until the edge channel closes
    pub async fn run(&mut self, mut key_rx: mpsc::Receiver<KeyEvent>) {
        info!(thresholds = ?self.thresholds, "decoder started");

        while let Some(event) = key_rx.recv().await {
            self.handle_event(event);
        }

        info!(text = %self.state.text, "decoder stopped");
    }

    /// Process one edge, reporting rejected edges instead of failing
    pub fn handle_event(&mut self, event: KeyEvent) {
        if let Err(e) = self.try_handle_event(event) {
            warn!(?event, %e, "edge rejected");
            self.stats.rejected_edges += 1;
            self.emit(DecodeEvent::EdgeRejected {
                reason: e.to_string(),
            });
            self.publish();
        }
    }

    /// Process one edge. On error the state is left unchanged.
    pub fn try_handle_event(&mut self, event: KeyEvent) -> Result<(), DecodeError> {
        match event {
            KeyEvent::Pressed(timestamp) => self.on_press(timestamp),
            KeyEvent::Released(timestamp) => self.on_release(timestamp),
        }
    }

    /// Key went down: the preceding release decides letter and word boundaries
    pub fn on_press(&mut self, timestamp: f64) -> Result<(), DecodeError> {
        self.check_timestamp(timestamp)?;
        if self.state.key_down {
            return Err(DecodeError::DuplicateEdge(Edge::Press));
        }

        // The first press of a session has no gap before it.
        if let Some(last_release) = self.state.last_release {
            let release_duration = timestamp - last_release;
            let gap = self.thresholds.classify_release(release_duration);
            debug!(release_duration, ?gap, "key pressed");

            match gap {
                GapKind::InterChar => self.flush_letter(),
                GapKind::WordGap => {
                    self.flush_letter();
                    self.finish_word();
                }
                GapKind::IntraChar | GapKind::None => {}
            }
        }

        self.state.last_press = Some(timestamp);
        self.state.key_down = true;
        self.stats.edges += 1;
        self.publish();
        Ok(())
    }

    /// Key went up: the preceding press decides the symbol
    pub fn on_release(&mut self, timestamp: f64) -> Result<(), DecodeError> {
        self.check_timestamp(timestamp)?;
        let last_press = match (self.state.key_down, self.state.last_press) {
            (true, Some(t)) => t,
            (_, None) => return Err(DecodeError::NoPriorPress),
            (false, Some(_)) => return Err(DecodeError::DuplicateEdge(Edge::Release)),
        };

        let press_duration = timestamp - last_press;
        let symbol = self.thresholds.classify_press(press_duration);
        debug!(press_duration, %symbol, "key released");

        if self.state.sequence.push(symbol) {
            self.stats.symbols += 1;
            self.emit(DecodeEvent::SymbolAppended {
                symbol,
                sequence: self.state.sequence.to_string(),
            });
        } else {
            warn!(press_duration, "press matched neither dot nor dash");
            self.stats.ambiguous_presses += 1;
            self.emit(DecodeEvent::AmbiguousPress {
                duration_ms: (press_duration * 1000.0).round() as u64,
            });
        }

        self.state.last_release = Some(timestamp);
        self.state.key_down = false;
        self.stats.edges += 1;
        self.publish();
        Ok(())
    }

    /// Decode a letter still in progress when the session ends
    ///
    /// Call only once the edge source has stopped. This is the one place a
    /// letter is appended without a press edge closing it; mid-session,
    /// letters are flushed only by `on_press`. Returns true if a letter was
    /// appended.
    pub fn flush_pending(&mut self) -> bool {
        if self.state.sequence.is_empty() {
            return false;
        }
        self.flush_letter();
        self.publish();
        true
    }

    fn check_timestamp(&self, timestamp: f64) -> Result<(), DecodeError> {
        if !timestamp.is_finite() {
            return Err(DecodeError::NonFiniteTimestamp(timestamp));
        }
        match self.state.last_edge() {
            Some(previous) if timestamp < previous => Err(DecodeError::OutOfOrderTimestamp {
                previous,
                received: timestamp,
            }),
            _ => Ok(()),
        }
    }

    fn flush_letter(&mut self) {
        let sequence = self.state.sequence.take();
        let letter = table::decode_letter(&sequence);
        let recognized = letter != UNKNOWN_LETTER;

        self.state.text.push(letter);
        self.stats.letters += 1;

        if recognized {
            info!(%letter, %sequence, text = %self.state.text, "letter decoded");
        } else {
            self.stats.unknown_letters += 1;
            warn!(%sequence, text = %self.state.text, "unrecognized sequence");
        }

        self.emit(DecodeEvent::LetterDecoded {
            letter,
            sequence,
            recognized,
            text: self.state.text.clone(),
        });
    }

    fn finish_word(&mut self) {
        self.state.text.push(' ');
        self.stats.words += 1;
        info!(text = %self.state.text, "word completed");

        self.emit(DecodeEvent::WordCompleted {
            text: self.state.text.clone(),
        });
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }

    fn emit(&self, event: DecodeEvent) {
        debug!(%event, "emitting decode event");
        let _ = self.event_tx.send(event);
    }
}
