//! Plain terminal renderer used by the `chat-client` binary.

use super::{Renderer, Severity};
use parking_lot::Mutex;
use std::io::Write;

/// Writes everything to stdout, one line per call
#[derive(Debug, Default)]
pub struct ConsoleRenderer {
    /// Sender currently shown as typing
    typing: Mutex<Option<String>>,
}

impl ConsoleRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn line(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        // A closed stdout is not worth failing the connection over
        let _ = writeln!(out, "{text}");
    }
}

impl Renderer for ConsoleRenderer {
    fn display_incoming_chat(&self, content: &str, sender: &str, _avatar_ref: &str) {
        let time = chrono::Local::now().format("%-I:%M %p");
        self.line(&format!("[{time}] {sender}: {content}"));
    }

    fn display_typing_indicator(&self, sender: &str, is_typing: bool) {
        let mut typing = self.typing.lock();
        if is_typing {
            // Only one indicator is shown at a time
            if typing.is_none() {
                self.line(&format!("  {sender} is typing..."));
                *typing = Some(sender.to_string());
            }
        } else if typing.take().is_some() {
            self.line(&format!("  {sender} stopped typing"));
        }
    }

    fn display_presence(&self, user_id: &str, status: &str) {
        self.line(&format!("  * {user_id} is now {status}"));
    }

    fn display_status_banner(&self, text: &str, severity: Severity) {
        let marker = match severity {
            Severity::Info => "--",
            Severity::Success => "++",
            Severity::Error => "!!",
        };
        self.line(&format!("{marker} {text} {marker}"));
    }

    fn display_online_status(&self, online: bool) {
        self.line(if online { "(online)" } else { "(disconnected)" });
    }
}
