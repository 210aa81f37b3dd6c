//! morse-decoder: decodes press/release edges from stdin into text
//!
//! Reads one edge per line (`press 0.00`, `release 0.21`, ...), decodes
//! them in real time and serves the decoded text to IPC clients. The
//! session ends at end of input or on SIGINT/SIGTERM, after which any
//! letter still in progress is decoded and the text is printed.

use std::io::BufReader;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use morse_decoder::config::Config;
use morse_decoder::decoder::Decoder;
use morse_decoder::events::DecodeEvent;
use morse_decoder::input::EdgeListener;
use morse_decoder::ipc::Server;
use morse_decoder::lifecycle::ShutdownSignal;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr, decoded text to stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "morse-decoder starting"
    );

    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, ?config.timing, "configuration loaded");

    let thresholds = config.timing.thresholds()?;

    let shutdown = ShutdownSignal::new();

    // Edge listener -> decoder
    let (key_tx, key_rx) = mpsc::channel(32);
    // Decoder -> IPC server and subscribers
    let (event_tx, _event_rx) = broadcast::channel::<DecodeEvent>(64);

    let mut decoder = Decoder::new(thresholds, event_tx.clone());

    // The listener thread owns the only sender; EOF closes the channel
    let mut listener = EdgeListener::new(key_tx, config.debounce_ms);
    listener.start(BufReader::new(std::io::stdin()))?;
    info!("edge listener started");

    let server = Server::new(
        &config.socket_path,
        event_tx.clone(),
        decoder.subscribe_snapshots(),
    )?;

    info!("decoder initialized, entering main loop");

    tokio::select! {
        // Decoder runs until the edge source closes
        _ = decoder.run(key_rx) => {
            info!("edge source closed");
        }

        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        result = shutdown.wait() => {
            match result {
                Ok(()) => info!("shutdown signal received"),
                Err(e) => error!(?e, "failed to install signal handlers"),
            }
        }
    }

    info!("shutting down...");

    listener.stop();
    if decoder.flush_pending() {
        info!("flushed letter in progress");
    }

    let status = server.status();
    info!(
        stats = ?decoder.stats(),
        uptime_secs = status.uptime_secs,
        "session finished"
    );
    println!("{}", decoder.current_decoded_text());

    server.shutdown().await;

    info!("morse-decoder stopped");

    Ok(())
}
