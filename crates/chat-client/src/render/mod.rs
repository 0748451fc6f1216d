//! Render collaborator
//!
//! The connection manager reports everything user-visible through [`Renderer`];
//! it never knows how the output is drawn.

mod console;
mod recording;

pub use console::ConsoleRenderer;
pub use recording::{RecordingRenderer, RenderCall};

/// Banner severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// Display surface driven by the connection manager
///
/// Implementations must not block; they are called from the connection task.
pub trait Renderer: Send + Sync {
    /// Show a chat line received from `sender`
    ///
    /// `avatar_ref` identifies the sender's avatar; building a URL from it is up to the renderer.
    fn display_incoming_chat(&self, content: &str, sender: &str, avatar_ref: &str);

    /// Show or hide the typing indicator for `sender`
    fn display_typing_indicator(&self, sender: &str, is_typing: bool);

    /// Show a presence change
    fn display_presence(&self, user_id: &str, status: &str);

    /// Show a connection status banner
    fn display_status_banner(&self, text: &str, severity: Severity);

    /// Flip the online/offline indicator
    fn display_online_status(&self, online: bool);
}
