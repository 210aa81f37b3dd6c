//! Unix domain socket server for IPC
//!
//! Answers status and text queries from the decoder's published snapshot,
//! and pushes decode events to clients that subscribe. A subscribed
//! connection only receives notifications.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

use crate::decoder::DecoderSnapshot;
use crate::events::DecodeEvent;

use super::protocol::{DecoderStatus, Notification, Request, Response};

const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: UnixListener,
    state: Arc<ServerState>,
    shutdown_tx: broadcast::Sender<()>,
    /// Source of decode events for subscribed clients
    event_tx: broadcast::Sender<DecodeEvent>,
}

/// Shared server state
struct ServerState {
    /// Latest decoder state, published by the decoder itself
    snapshot_rx: watch::Receiver<DecoderSnapshot>,
    start_time: std::time::Instant,
}

impl ServerState {
    fn status(&self) -> DecoderStatus {
        let snapshot = self.snapshot_rx.borrow().clone();
        DecoderStatus::from_snapshot(snapshot, self.start_time.elapsed().as_secs())
    }
}

impl Server {
    /// Create a new IPC server
    pub fn new(
        socket_path: &Path,
        event_tx: broadcast::Sender<DecodeEvent>,
        snapshot_rx: watch::Receiver<DecoderSnapshot>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        let state = Arc::new(ServerState {
            snapshot_rx,
            start_time: std::time::Instant::now(),
        });

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener,
            state,
            shutdown_tx,
            event_tx,
        })
    }

    /// Current status as served to clients
    pub fn status(&self) -> DecoderStatus {
        self.state.status()
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let state = Arc::clone(&self.state);
                    let event_tx = self.event_tx.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, state, event_tx) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(
        mut stream: UnixStream,
        state: Arc<ServerState>,
        event_tx: broadcast::Sender<DecodeEvent>,
    ) -> Result<()> {
        let mut len_buf = [0u8; 4];

        loop {
            // Read message length (4-byte little-endian)
            match stream.read_exact(&mut len_buf).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    debug!("client disconnected");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len > MAX_MESSAGE_LEN {
                warn!(len, "message too large, disconnecting");
                return Ok(());
            }

            // Read message body
            let mut msg_buf = vec![0u8; len];
            stream.read_exact(&mut msg_buf).await?;

            let request: Request = match serde_json::from_slice(&msg_buf) {
                Ok(request) => request,
                Err(e) => {
                    warn!(%e, "malformed request");
                    let response = Response::Error {
                        code: "bad_request".to_string(),
                        message: e.to_string(),
                    };
                    Self::send_message(&mut stream, &response).await?;
                    continue;
                }
            };

            debug!(?request, "received request");

            let (response, subscribe) = Self::process_request(request, &state);
            // Subscribe before replying so the client sees every later event
            let events = subscribe.then(|| event_tx.subscribe());
            Self::send_message(&mut stream, &response).await?;

            if let Some(events) = events {
                debug!("client subscribed to notifications");
                return Self::push_notifications(stream, events).await;
            }
        }
    }

    /// Forward decode events until the client goes away
    async fn push_notifications(
        mut stream: UnixStream,
        mut events: broadcast::Receiver<DecodeEvent>,
    ) -> Result<()> {
        loop {
            let notification = match events.recv().await {
                Ok(event) => Notification::Decode { event },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber lagged");
                    Notification::Lagged { skipped }
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            };

            if let Err(e) = Self::send_message(&mut stream, &notification).await {
                debug!(?e, "subscriber disconnected");
                return Ok(());
            }
        }
    }

    /// Send a length-prefixed JSON message
    async fn send_message<T: serde::Serialize>(stream: &mut UnixStream, msg: &T) -> Result<()> {
        let msg_bytes = serde_json::to_vec(msg)?;
        let msg_len = (msg_bytes.len() as u32).to_le_bytes();

        stream.write_all(&msg_len).await?;
        stream.write_all(&msg_bytes).await?;

        Ok(())
    }

    /// Process a request and return a response
    /// Returns (Response, should_subscribe)
    fn process_request(request: Request, state: &ServerState) -> (Response, bool) {
        match request {
            Request::Ping => (Response::Pong, false),

            Request::GetStatus => (Response::Status(state.status()), false),

            Request::GetText => {
                let snapshot = state.snapshot_rx.borrow();
                let response = Response::Text {
                    text: snapshot.text.clone(),
                    pending: snapshot.pending.clone(),
                };
                (response, false)
            }

            Request::Subscribe => (Response::Subscribed, true),
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn request(stream: &mut UnixStream, request: &Request) -> serde_json::Value {
        Server::send_message(stream, request).await.unwrap();
        read_message(stream).await
    }

    async fn read_message(stream: &mut UnixStream) -> serde_json::Value {
        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await.unwrap();
        let mut body = vec![0u8; u32::from_le_bytes(len_buf) as usize];
        stream.read_exact(&mut body).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn socket_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("morse-decoder-{}-{}", std::process::id(), name))
            .join("decoder.sock")
    }

    fn snapshot(text: &str) -> watch::Receiver<DecoderSnapshot> {
        let (tx, rx) = watch::channel(DecoderSnapshot {
            text: text.to_string(),
            ..Default::default()
        });
        // Keep the value readable after the sender goes away.
        drop(tx);
        rx
    }

    #[tokio::test]
    async fn test_text_and_subscription() {
        let (event_tx, _) = broadcast::channel(16);
        let path = socket_path("ipc");
        let server = Arc::new(Server::new(&path, event_tx.clone(), snapshot("S")).unwrap());

        let runner = Arc::clone(&server);
        tokio::spawn(async move { runner.run().await });

        let mut client = UnixStream::connect(&path).await.unwrap();
        let pong = request(&mut client, &Request::Ping).await;
        assert_eq!(pong["type"], "pong");

        let text = request(&mut client, &Request::GetText).await;
        assert_eq!(text["type"], "text");
        assert_eq!(text["text"], "S");

        let subscribed = request(&mut client, &Request::Subscribe).await;
        assert_eq!(subscribed["type"], "subscribed");

        event_tx
            .send(DecodeEvent::WordCompleted {
                text: "S ".to_string(),
            })
            .unwrap();

        let pushed = read_message(&mut client).await;
        assert_eq!(pushed["type"], "decode");
        assert_eq!(pushed["event"]["type"], "word_completed");

        server.shutdown().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_malformed_request() {
        let (event_tx, _) = broadcast::channel(16);
        let path = socket_path("bad");
        let server = Arc::new(Server::new(&path, event_tx, snapshot("")).unwrap());

        let runner = Arc::clone(&server);
        tokio::spawn(async move { runner.run().await });

        let mut client = UnixStream::connect(&path).await.unwrap();
        let body = br#"{"type":"launch"}"#;
        client.write_all(&(body.len() as u32).to_le_bytes()).await.unwrap();
        client.write_all(body).await.unwrap();

        let error = read_message(&mut client).await;
        assert_eq!(error["type"], "error");
        assert_eq!(error["code"], "bad_request");

        // Connection stays usable.
        let pong = request(&mut client, &Request::Ping).await;
        assert_eq!(pong["type"], "pong");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_status_exact_after_event_lag() {
        use crate::decoder::{Decoder, Thresholds};
        use crate::input::KeyEvent;

        // Event channel too small to hold the session.
        let (event_tx, _) = broadcast::channel(1);
        let mut decoder = Decoder::new(Thresholds::from_unit(1.0), event_tx.clone());
        let path = socket_path("lag");
        let server = Arc::new(Server::new(&path, event_tx, decoder.subscribe_snapshots()).unwrap());

        let runner = Arc::clone(&server);
        tokio::spawn(async move { runner.run().await });

        for (down, up) in [(0.0, 1.0), (2.0, 3.0), (4.0, 5.0), (8.0, 11.0), (12.0, 15.0)] {
            decoder.handle_event(KeyEvent::Pressed(down));
            decoder.handle_event(KeyEvent::Released(up));
        }
        decoder.handle_event(KeyEvent::Pressed(22.0));

        let mut client = UnixStream::connect(&path).await.unwrap();
        let status = request(&mut client, &Request::GetStatus).await;
        assert_eq!(status["type"], "status");
        assert_eq!(status["text"], "SM ");
        assert_eq!(status["pending"], "");
        assert_eq!(status["stats"]["letters"], 2);
        assert_eq!(status["stats"]["words"], 1);
        assert_eq!(status["stats"]["symbols"], 5);

        assert_eq!(server.status().stats, decoder.stats());
        server.shutdown().await;
    }
}
