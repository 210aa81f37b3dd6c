//! Edge listener reading key transitions from a line-oriented source
//!
//! Runs on a dedicated thread since reading stdin blocks. Edges are
//! debounced and forwarded to the decoder over a tokio channel.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::debounce::Debouncer;
use super::keys::{parse_line, KeyEvent};

/// Errors that can occur in the edge listener
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("edge listener is already running")]
    AlreadyRunning,

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),

    #[error("unrecognized edge line: {0:?}")]
    UnknownEdge(String),

    #[error("invalid timestamp: {0:?}")]
    BadTimestamp(String),

    #[error("failed to read input: {0}")]
    Read(#[from] std::io::Error),
}

/// Listener that turns input lines into debounced key events
pub struct EdgeListener {
    /// Handed to the listener thread on start
    event_tx: Option<mpsc::Sender<KeyEvent>>,
    debounce_ms: u64,
    running: Arc<AtomicBool>,
}

impl EdgeListener {
    /// Create a new edge listener
    pub fn new(event_tx: mpsc::Sender<KeyEvent>, debounce_ms: u64) -> Self {
        Self {
            event_tx: Some(event_tx),
            debounce_ms,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start reading edges from `source`
    ///
    /// The listener thread owns the only sender, so the decoder loop sees
    /// the channel close when the thread exits at end of input or after
    /// `stop()`. A listener can be started once.
    pub fn start<R>(&mut self, source: R) -> Result<(), InputError>
    where
        R: BufRead + Send + 'static,
    {
        let event_tx = self.event_tx.take().ok_or(InputError::AlreadyRunning)?;
        self.running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.running);
        let debouncer = Debouncer::new(self.debounce_ms);

        thread::Builder::new()
            .name("edge-listener".to_string())
            .spawn(move || {
                info!("edge listener thread started");

                if let Err(e) = read_edges(source, debouncer, event_tx, running.clone()) {
                    error!(?e, "edge listener error");
                }

                running.store(false, Ordering::SeqCst);
                info!("edge listener thread stopped");
            })
            .map_err(|e| InputError::ThreadSpawn(e.to_string()))?;

        Ok(())
    }

    /// Stop the edge listener after the line currently being read
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the listener is currently running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

fn read_edges<R: BufRead>(
    source: R,
    mut debouncer: Debouncer,
    event_tx: mpsc::Sender<KeyEvent>,
    running: Arc<AtomicBool>,
) -> Result<(), InputError> {
    let started = Instant::now();

    for line in source.lines() {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        let line = line?;

        let event = match parse_line(&line, started.elapsed().as_secs_f64()) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) => {
                warn!(%e, "skipping input line");
                continue;
            }
        };

        if !debouncer.accept(&event) {
            debug!(?event, "edge suppressed by debounce");
            continue;
        }

        if event_tx.blocking_send(event).is_err() {
            warn!("failed to send key event - channel closed?");
            break;
        }
    }

    Ok(())
}
