//! Relay connection handling
//!
//! Manages the single client connection: state machine, transport and reconnect logic.

mod manager;
mod state;
mod transport;

pub use manager::ConnectionManager;
pub use state::{ConnectionState, Trigger};
pub use transport::{Frame, Outbound, PeerHandle, Transport, TransportLink, WebSocketTransport};
