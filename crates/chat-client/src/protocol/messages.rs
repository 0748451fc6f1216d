//! Relay message format
//!
//! Every frame on the wire is a JSON object with a `type` field selecting the variant.

use super::MessageKind;
use crate::error::{ClientError, ClientResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A chat relay message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChatMessage {
    /// A chat line from `sender`
    Chat {
        content: String,
        sender: String,
        #[serde(
            default,
            deserialize_with = "lenient_timestamp",
            skip_serializing_if = "Option::is_none"
        )]
        timestamp: Option<String>,
    },

    /// Typing indicator for `sender`
    Typing {
        sender: String,
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },

    /// Presence update for a user
    Status {
        #[serde(rename = "userId")]
        user_id: String,
        status: String,
    },
}

impl ChatMessage {
    /// Create a chat message stamped with the current UTC time
    #[must_use]
    pub fn chat(content: impl Into<String>, sender: impl Into<String>) -> Self {
        Self::Chat {
            content: content.into(),
            sender: sender.into(),
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
        }
    }

    /// Create a typing indicator message
    #[must_use]
    pub fn typing(sender: impl Into<String>, is_typing: bool) -> Self {
        Self::Typing {
            sender: sender.into(),
            is_typing,
        }
    }

    /// Create a presence message
    #[must_use]
    pub fn status(user_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self::Status {
            user_id: user_id.into(),
            status: status.into(),
        }
    }

    /// The variant tag of this message
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Chat { .. } => MessageKind::Chat,
            Self::Typing { .. } => MessageKind::Typing,
            Self::Status { .. } => MessageKind::Status,
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl std::fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chat { sender, .. } => write!(f, "ChatMessage(type=chat, sender={sender})"),
            Self::Typing { sender, is_typing } => {
                write!(f, "ChatMessage(type=typing, sender={sender}, is_typing={is_typing})")
            }
            Self::Status { user_id, status } => {
                write!(f, "ChatMessage(type=status, user_id={user_id}, status={status})")
            }
        }
    }
}

/// Accept any `timestamp` shape; it is informational only
///
/// Strings are kept, numbers (epoch millis from some peers) become their text,
/// anything else is dropped.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Result of decoding one inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A message with a recognised `type`
    Message(ChatMessage),
    /// Valid JSON whose `type` is missing or not one we handle
    Unknown(Option<String>),
}

/// Decode a raw inbound text frame
///
/// Invalid JSON, or a known `type` whose fields do not match, is a
/// `MalformedPayload`. An unrecognised `type` is not an error.
pub fn decode(raw: &str) -> ClientResult<Inbound> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| ClientError::MalformedPayload(e.to_string()))?;

    let tag = value.get("type").and_then(Value::as_str);
    match tag.and_then(MessageKind::from_tag) {
        Some(_) => serde_json::from_value(value)
            .map(Inbound::Message)
            .map_err(|e| ClientError::MalformedPayload(e.to_string())),
        None => Ok(Inbound::Unknown(tag.map(str::to_owned))),
    }
}
