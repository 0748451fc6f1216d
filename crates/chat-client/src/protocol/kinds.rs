//! Message type tags
//!
//! The `type` values recognised on the relay wire.

/// Relay message type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Chat line
    Chat,
    /// Typing indicator
    Typing,
    /// Presence update
    Status,
}

impl MessageKind {
    /// Resolve a wire tag, `None` for anything we do not handle
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "chat" => Some(Self::Chat),
            "typing" => Some(Self::Typing),
            "status" => Some(Self::Status),
            _ => None,
        }
    }

    /// The wire tag
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Typing => "typing",
            Self::Status => "status",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
