//! Test helpers for integration tests
//!
//! Provides an axum WebSocket relay the tests drive by hand, plus small
//! polling and configuration utilities.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use chat_client::{ClientEvent, ConnectionManager, RecordingRenderer, WebSocketTransport};
use chat_common::{try_init_tracing_with_config, RelayConfig, TracingConfig};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// How long helpers wait before failing a test
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Frames the test asks the relay to write
enum RelayCommand {
    Text(String),
    Close,
}

/// Relay side of one accepted client connection
pub struct RelaySession {
    incoming: mpsc::UnboundedReceiver<String>,
    outgoing: mpsc::UnboundedSender<RelayCommand>,
}

impl RelaySession {
    /// Wait for the next text frame from the client
    ///
    /// Fails if the client closed the connection first.
    pub async fn recv_text(&mut self) -> Result<String> {
        tokio::time::timeout(WAIT_TIMEOUT, self.incoming.recv())
            .await
            .context("timed out waiting for a client frame")?
            .ok_or_else(|| anyhow!("client connection closed"))
    }

    /// Wait for the next text frame and parse it as JSON
    pub async fn recv_json(&mut self) -> Result<serde_json::Value> {
        let text = self.recv_text().await?;
        serde_json::from_str(&text).with_context(|| format!("client sent invalid JSON: {text}"))
    }

    /// Wait until the client side goes away
    pub async fn closed(&mut self) -> Result<()> {
        tokio::time::timeout(WAIT_TIMEOUT, async {
            while self.incoming.recv().await.is_some() {}
        })
        .await
        .context("client connection still open")
    }

    /// Write a raw text frame to the client
    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.outgoing
            .send(RelayCommand::Text(text.into()))
            .map_err(|_| anyhow!("relay session already closed"))
    }

    /// Write a JSON frame to the client
    pub fn send_json(&self, value: &serde_json::Value) -> Result<()> {
        self.send_text(value.to_string())
    }

    /// Close the connection from the relay side
    pub fn close(self) {
        let _ = self.outgoing.send(RelayCommand::Close);
    }
}

/// In-process relay endpoint that hands every accepted socket to the test
pub struct TestRelay {
    pub addr: SocketAddr,
    sessions: mpsc::UnboundedReceiver<RelaySession>,
    _handle: JoinHandle<()>,
}

impl TestRelay {
    /// Start a new relay on a free local port
    pub async fn start() -> Result<Self> {
        let (sessions_tx, sessions) = mpsc::unbounded_channel();

        let app = Router::new()
            .route("/ws", get(relay_handler))
            .with_state(sessions_tx);

        // Bind to port
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        // Spawn server task
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self {
            addr,
            sessions,
            _handle: handle,
        })
    }

    /// WebSocket URL of the relay
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Wait for the next client connection
    pub async fn accept(&mut self) -> Result<RelaySession> {
        tokio::time::timeout(WAIT_TIMEOUT, self.sessions.recv())
            .await
            .context("timed out waiting for a client to connect")?
            .ok_or_else(|| anyhow!("relay stopped"))
    }

    /// Check that no client connects within `window`
    pub async fn expect_no_connection(&mut self, window: Duration) -> Result<()> {
        match tokio::time::timeout(window, self.sessions.recv()).await {
            Err(_) | Ok(None) => Ok(()),
            Ok(Some(_)) => Err(anyhow!("unexpected client connection")),
        }
    }
}

async fn relay_handler(
    State(sessions): State<mpsc::UnboundedSender<RelaySession>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, sessions))
}

async fn handle_socket(socket: WebSocket, sessions: mpsc::UnboundedSender<RelaySession>) {
    let (incoming_tx, incoming) = mpsc::unbounded_channel();
    let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel();

    if sessions.send(RelaySession { incoming, outgoing }).is_err() {
        return;
    }

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Test -> client
    let send_task = tokio::spawn(async move {
        while let Some(command) = outgoing_rx.recv().await {
            match command {
                RelayCommand::Text(text) => {
                    if ws_sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                RelayCommand::Close => {
                    let frame = CloseFrame {
                        code: close_code::NORMAL,
                        reason: "relay closing".into(),
                    };
                    let _ = ws_sink.send(Message::Close(Some(frame))).await;
                    break;
                }
            }
        }

        let _ = ws_sink.close().await;
    });

    // Client -> test
    while let Some(Ok(msg)) = ws_stream.next().await {
        match msg {
            Message::Text(text) => {
                let _ = incoming_tx.send(text);
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    send_task.abort();
}

/// Relay settings with short timers for tests
pub fn relay_config(url: impl Into<String>) -> RelayConfig {
    RelayConfig {
        url: url.into(),
        max_retries: 5,
        retry_delay_ms: 100,
        connect_timeout_ms: 2_000,
        display_name: "You".to_string(),
        typing_idle_ms: 200,
    }
}

/// URL on a local port nothing listens on
pub async fn unreachable_url() -> Result<String> {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("ws://{addr}/ws"))
}

/// Build a manager on the real WebSocket transport with a recording renderer
pub fn spawn_client(config: RelayConfig) -> (Arc<ConnectionManager>, Arc<RecordingRenderer>) {
    init_test_tracing();

    let transport = Arc::new(WebSocketTransport::new(config.connect_timeout()));
    let renderer = Arc::new(RecordingRenderer::new());
    let manager = ConnectionManager::new(config, transport, renderer.clone());
    (manager, renderer)
}

/// Route client logs to the test output (honours `RUST_LOG`)
pub fn init_test_tracing() {
    let _ = try_init_tracing_with_config(TracingConfig::development());
}

/// Wait for an event matching `pred`
pub async fn wait_for_event(
    rx: &mut broadcast::Receiver<ClientEvent>,
    pred: impl Fn(&ClientEvent) -> bool,
) -> Result<ClientEvent> {
    tokio::time::timeout(WAIT_TIMEOUT, async {
        loop {
            let event = rx.recv().await?;
            if pred(&event) {
                return Ok::<_, anyhow::Error>(event);
            }
        }
    })
    .await
    .context("timed out waiting for client event")?
}

/// Poll `check` until it holds
pub async fn eventually(mut check: impl FnMut() -> bool) -> Result<()> {
    tokio::time::timeout(WAIT_TIMEOUT, async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .context("condition never became true")
}
