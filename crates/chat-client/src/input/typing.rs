//! Typing indicator debounce
//!
//! Every keystroke sends `typing=true` and re-arms the idle timer; `typing=false`
//! follows once input has been idle for the configured time, or immediately on
//! submit. Resending on each keystroke lets a peer catch up after a reconnect.

use crate::connection::ConnectionManager;
use crate::error::ClientResult;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Default)]
struct TypingState {
    typing: bool,
    /// Bumped on every keystroke so an outdated timer does nothing
    generation: u64,
    idle_timer: Option<JoinHandle<()>>,
}

/// Sends typing updates for local input on behalf of an input surface
pub struct TypingNotifier {
    manager: Arc<ConnectionManager>,
    idle: Duration,
    state: Mutex<TypingState>,
}

impl TypingNotifier {
    pub fn new(manager: Arc<ConnectionManager>, idle: Duration) -> Arc<Self> {
        Arc::new(Self {
            manager,
            idle,
            state: Mutex::new(TypingState::default()),
        })
    }

    /// Whether a `typing=true` is currently outstanding
    pub fn is_typing(&self) -> bool {
        self.state.lock().typing
    }

    /// Record a keystroke
    pub fn on_input(self: &Arc<Self>) {
        let mut state = self.state.lock();
        state.typing = true;
        self.manager.set_typing_status(true);

        if let Some(timer) = state.idle_timer.take() {
            timer.abort();
        }
        state.generation += 1;
        let generation = state.generation;

        let notifier = Arc::clone(self);
        let idle = self.idle;
        state.idle_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(idle).await;
            notifier.idle_elapsed(generation);
        }));
    }

    /// Send `content` as a chat line and clear the typing indicator
    pub fn submit(&self, content: impl Into<String>) -> ClientResult<()> {
        self.clear();
        self.manager.send_chat(content)
    }

    /// Clear the typing indicator without sending anything else
    pub fn clear(&self) {
        let mut state = self.state.lock();
        if let Some(timer) = state.idle_timer.take() {
            timer.abort();
        }
        state.generation += 1;

        if std::mem::take(&mut state.typing) {
            self.manager.set_typing_status(false);
        }
    }

    fn idle_elapsed(&self, generation: u64) {
        let mut state = self.state.lock();
        if state.generation != generation {
            return;
        }

        state.idle_timer = None;
        if std::mem::take(&mut state.typing) {
            tracing::trace!(idle_ms = self.idle.as_millis() as u64, "Typing idle");
            self.manager.set_typing_status(false);
        }
    }
}

impl std::fmt::Debug for TypingNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypingNotifier")
            .field("idle", &self.idle)
            .field("typing", &self.state.lock().typing)
            .finish_non_exhaustive()
    }
}
