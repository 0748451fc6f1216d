//! In-memory renderer that records every call.
//!
//! Useful for headless embedding and for asserting on what the manager displayed.

use super::{Renderer, Severity};
use parking_lot::Mutex;

/// One recorded renderer call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderCall {
    Chat {
        content: String,
        sender: String,
        avatar_ref: String,
    },
    Typing {
        sender: String,
        is_typing: bool,
    },
    Presence {
        user_id: String,
        status: String,
    },
    Banner {
        text: String,
        severity: Severity,
    },
    Online(bool),
}

/// Renderer that stores calls in order
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    calls: Mutex<Vec<RenderCall>>,
}

impl RecordingRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls so far
    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().clone()
    }

    /// Banner texts so far, in order
    pub fn banners(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                RenderCall::Banner { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn push(&self, call: RenderCall) {
        self.calls.lock().push(call);
    }
}

impl Renderer for RecordingRenderer {
    fn display_incoming_chat(&self, content: &str, sender: &str, avatar_ref: &str) {
        self.push(RenderCall::Chat {
            content: content.to_string(),
            sender: sender.to_string(),
            avatar_ref: avatar_ref.to_string(),
        });
    }

    fn display_typing_indicator(&self, sender: &str, is_typing: bool) {
        self.push(RenderCall::Typing {
            sender: sender.to_string(),
            is_typing,
        });
    }

    fn display_presence(&self, user_id: &str, status: &str) {
        self.push(RenderCall::Presence {
            user_id: user_id.to_string(),
            status: status.to_string(),
        });
    }

    fn display_status_banner(&self, text: &str, severity: Severity) {
        self.push(RenderCall::Banner {
            text: text.to_string(),
            severity,
        });
    }

    fn display_online_status(&self, online: bool) {
        self.push(RenderCall::Online(online));
    }
}
