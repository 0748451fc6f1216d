//! Observer events
//!
//! Everything the connection manager reports to subscribers goes through a
//! `tokio::sync::broadcast` channel of [`ClientEvent`]s.

use crate::connection::ConnectionState;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};

/// Default buffer for the event broadcast channel
pub const EVENT_BUFFER_SIZE: usize = 64;

/// Status and state-change notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The connection state changed
    StateChanged {
        from: ConnectionState,
        to: ConnectionState,
    },
    /// Transport opened; retry count is back to zero
    Connected,
    /// A retry timer was armed
    RetryScheduled { attempt: u32, delay: Duration },
    /// A reconnect attempt started
    Reconnecting { attempt: u32, max_attempts: u32 },
    /// Automatic reconnection gave up
    RetriesExhausted { attempts: u32 },
    /// The transport failed to open or broke
    TransportError(String),
    /// A `send` was rejected because the connection is not open
    SendFailed,
    /// `stop()` closed the connection
    Stopped,
}

impl std::fmt::Display for ClientEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StateChanged { from, to } => write!(f, "state {from} -> {to}"),
            Self::Connected => write!(f, "connected"),
            Self::RetryScheduled { attempt, delay } => {
                write!(f, "retry {attempt} in {}ms", delay.as_millis())
            }
            Self::Reconnecting {
                attempt,
                max_attempts,
            } => write!(f, "reconnecting {attempt}/{max_attempts}"),
            Self::RetriesExhausted { attempts } => write!(f, "gave up after {attempts} attempts"),
            Self::TransportError(e) => write!(f, "transport error: {e}"),
            Self::SendFailed => write!(f, "send failed: not connected"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Log events at debug level until the sender side goes away
///
/// A lagging receiver only skips the overwritten events. Returns how many
/// events were logged.
pub async fn log_events(mut events: broadcast::Receiver<ClientEvent>) -> usize {
    let mut logged = 0;
    loop {
        match events.recv().await {
            Ok(event) => {
                tracing::debug!(%event, "Client event");
                logged += 1;
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event log lagging behind");
            }
            Err(RecvError::Closed) => return logged,
        }
    }
}
