//! # chat-client
//!
//! Client side of the chat relay: a single WebSocket connection with fixed-delay
//! reconnects, typed message dispatch and a pluggable render surface.
//!
//! ```no_run
//! use chat_client::{ConnectionManager, ConsoleRenderer, WebSocketTransport};
//! use chat_common::RelayConfig;
//! use std::sync::Arc;
//!
//! # async fn demo() {
//! let config = RelayConfig::default();
//! let transport = Arc::new(WebSocketTransport::new(config.connect_timeout()));
//! let manager = ConnectionManager::new(config, transport, Arc::new(ConsoleRenderer::new()));
//! manager.start();
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod events;
pub mod handlers;
pub mod input;
pub mod protocol;
pub mod render;

pub use connection::{ConnectionManager, ConnectionState, Transport, WebSocketTransport};
pub use error::{ClientError, ClientResult};
pub use events::ClientEvent;
pub use input::TypingNotifier;
pub use protocol::ChatMessage;
pub use render::{ConsoleRenderer, RecordingRenderer, RenderCall, Renderer, Severity};
