//! Transport boundary
//!
//! A [`Transport`] opens one bidirectional text link to the relay. The manager only
//! ever sees the [`TransportLink`] halves, never the socket itself.

use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Frames delivered from the transport to the manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A text payload
    Text(String),
    /// The remote side closed the link (optional reason)
    Closed(Option<String>),
    /// The link broke
    Error(String),
}

/// Frames sent from the manager to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Close,
}

/// Opens links to a relay endpoint
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open a new link to `url`
    async fn open(&self, url: &str) -> ClientResult<TransportLink>;
}

/// Manager-side ends of an open link
#[derive(Debug)]
pub struct TransportLink {
    writer: LinkWriter,
    inbound: mpsc::UnboundedReceiver<Frame>,
}

impl TransportLink {
    /// Create a link together with the transport-side ends
    #[must_use]
    pub fn channel() -> (Self, PeerHandle) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        (
            Self {
                writer: LinkWriter { tx: outbound_tx },
                inbound: inbound_rx,
            },
            PeerHandle {
                outbound: outbound_rx,
                inbound: inbound_tx,
            },
        )
    }

    pub(crate) fn into_parts(self) -> (LinkWriter, mpsc::UnboundedReceiver<Frame>) {
        (self.writer, self.inbound)
    }
}

/// Write half held by the manager while connected
#[derive(Debug, Clone)]
pub(crate) struct LinkWriter {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl LinkWriter {
    pub(crate) fn send_text(&self, text: String) -> ClientResult<()> {
        self.tx
            .send(Outbound::Text(text))
            .map_err(|_| ClientError::NotConnected)
    }

    pub(crate) fn close(&self) {
        // Already gone means already closed
        let _ = self.tx.send(Outbound::Close);
    }
}

/// Transport-side ends of a link
///
/// Transports pump socket traffic through this; tests use it to play the relay.
#[derive(Debug)]
pub struct PeerHandle {
    outbound: mpsc::UnboundedReceiver<Outbound>,
    inbound: mpsc::UnboundedSender<Frame>,
}

impl PeerHandle {
    /// Deliver a text payload to the manager
    pub fn deliver(&self, text: impl Into<String>) -> bool {
        self.inbound.send(Frame::Text(text.into())).is_ok()
    }

    /// Report a clean remote close
    pub fn close(&self, reason: Option<String>) -> bool {
        self.inbound.send(Frame::Closed(reason)).is_ok()
    }

    /// Report a broken link
    pub fn fail(&self, error: impl Into<String>) -> bool {
        self.inbound.send(Frame::Error(error.into())).is_ok()
    }

    /// Wait for the next frame the manager wrote
    pub async fn next_outbound(&mut self) -> Option<Outbound> {
        self.outbound.recv().await
    }

    /// Take a written frame without waiting
    pub fn try_outbound(&mut self) -> Option<Outbound> {
        self.outbound.try_recv().ok()
    }

    fn into_parts(self) -> (mpsc::UnboundedReceiver<Outbound>, mpsc::UnboundedSender<Frame>) {
        (self.outbound, self.inbound)
    }
}

/// WebSocket transport backed by `tokio-tungstenite`
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    connect_timeout: Duration,
}

impl WebSocketTransport {
    #[must_use]
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self, url: &str) -> ClientResult<TransportLink> {
        let (ws_stream, _response) = tokio::time::timeout(self.connect_timeout, connect_async(url))
            .await
            .map_err(|_| ClientError::Transport(format!("connect to {url} timed out")))?
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        tracing::debug!(url = %url, "WebSocket handshake complete");

        let (mut ws_sink, mut ws_stream) = ws_stream.split();
        let (link, peer) = TransportLink::channel();
        let (mut outbound, inbound) = peer.into_parts();

        // Writer: manager -> socket
        tokio::spawn(async move {
            while let Some(frame) = outbound.recv().await {
                match frame {
                    Outbound::Text(text) => {
                        if let Err(e) = ws_sink.send(Message::Text(text)).await {
                            tracing::warn!(error = %e, "Failed to write to WebSocket");
                            break;
                        }
                    }
                    Outbound::Close => break,
                }
            }

            let _ = ws_sink.close().await;
        });

        // Reader: socket -> manager
        tokio::spawn(async move {
            while let Some(msg) = ws_stream.next().await {
                let frame = match msg {
                    Ok(Message::Text(text)) => Frame::Text(text),
                    Ok(Message::Close(close_frame)) => {
                        let reason = close_frame
                            .map(|f| f.reason.to_string())
                            .filter(|r| !r.is_empty());
                        let _ = inbound.send(Frame::Closed(reason));
                        return;
                    }
                    Ok(Message::Binary(data)) => {
                        tracing::debug!(len = data.len(), "Binary messages not supported");
                        continue;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        let _ = inbound.send(Frame::Error(e.to_string()));
                        return;
                    }
                };

                if inbound.send(frame).is_err() {
                    // Manager dropped the link
                    return;
                }
            }

            let _ = inbound.send(Frame::Closed(None));
        });

        Ok(link)
    }
}
