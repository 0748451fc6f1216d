//! Connection state machine
//!
//! Transport callbacks are turned into named [`Trigger`]s; [`ConnectionState::apply`]
//! is the only place that decides which transitions are legal.

use serde::{Deserialize, Serialize};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No connection and none scheduled
    #[default]
    Disconnected,
    /// A connection attempt is in flight
    Connecting,
    /// Transport is open
    Connected,
    /// Waiting for the retry timer before the next attempt
    Reconnecting,
    /// Retries exhausted, only a manual connect leaves this state
    Failed,
}

impl ConnectionState {
    /// Apply a trigger, returning the new state or `None` if the trigger is not valid here
    #[must_use]
    pub fn apply(self, trigger: Trigger) -> Option<Self> {
        use ConnectionState::{Connected, Connecting, Disconnected, Failed, Reconnecting};

        match (self, trigger) {
            (Disconnected | Reconnecting | Failed, Trigger::Connect) => Some(Connecting),
            (Connecting, Trigger::Opened) => Some(Connected),
            (Connecting | Connected, Trigger::Dropped { retries_remain: true }) => {
                Some(Reconnecting)
            }
            (Connecting | Connected, Trigger::Dropped { retries_remain: false }) => Some(Failed),
            (Reconnecting, Trigger::RetryElapsed) => Some(Connecting),
            (_, Trigger::Close) => Some(Disconnected),
            _ => None,
        }
    }

    /// Check if the transport is open
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if a link is open or being opened
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Reconnecting => "Reconnecting",
            Self::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Named events that drive [`ConnectionState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// `connect()` was called (startup, manual, or visibility)
    Connect,
    /// Transport reported open
    Opened,
    /// Transport failed to open, errored, or closed unexpectedly
    Dropped { retries_remain: bool },
    /// Retry delay has passed
    RetryElapsed,
    /// Explicit close (`stop()`)
    Close,
}
