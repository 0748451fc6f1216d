//! Client error types

use crate::render::Severity;
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// Send attempted while the connection is not open
    #[error("Not connected")]
    NotConnected,

    /// Inbound payload could not be parsed
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Underlying transport failed to open or broke
    #[error("Transport error: {0}")]
    Transport(String),

    /// Automatic reconnection gave up
    #[error("Reconnection failed after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    /// Outbound message could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Banner shown to the user for this error (if any)
    #[must_use]
    pub fn banner(&self) -> Option<(&'static str, Severity)> {
        match self {
            Self::NotConnected => Some((
                "Message failed to send. Please check your connection.",
                Severity::Error,
            )),
            Self::Transport(_) => Some(("Connection error occurred", Severity::Error)),
            Self::RetriesExhausted { .. } => Some((
                "Connection failed. Please refresh the page.",
                Severity::Error,
            )),
            Self::MalformedPayload(_) | Self::Serialization(_) => None,
        }
    }
}

/// Client result type
pub type ClientResult<T> = Result<T, ClientError>;
