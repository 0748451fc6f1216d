//! Connection manager
//!
//! Owns the single relay connection: opens it, retries on a fixed delay after
//! it drops, writes outbound messages and routes inbound ones.

use super::state::{ConnectionState, Trigger};
use super::transport::{Frame, LinkWriter, Transport};
use crate::error::{ClientError, ClientResult};
use crate::events::{ClientEvent, EVENT_BUFFER_SIZE};
use crate::handlers::MessageDispatcher;
use crate::protocol::{self, ChatMessage, Inbound};
use crate::render::{Renderer, Severity};
use chat_common::RelayConfig;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Work decided under the lock and carried out after it is released
enum Effect {
    Event(ClientEvent),
    Banner(String, Severity),
    Online(bool),
}

impl Effect {
    fn banner_for(error: &ClientError) -> Option<Self> {
        error
            .banner()
            .map(|(text, severity)| Self::Banner(text.to_string(), severity))
    }
}

/// Mutable connection state, only touched through the manager
struct Inner {
    state: ConnectionState,
    retry_count: u32,
    /// Bumped for every new attempt and on stop; events from older attempts are ignored
    generation: u64,
    /// Set by `stop()`, cleared by an explicit `connect()`
    stopped: bool,
    writer: Option<LinkWriter>,
    attempt_task: Option<JoinHandle<()>>,
    retry_timer: Option<JoinHandle<()>>,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            retry_count: 0,
            generation: 0,
            stopped: false,
            writer: None,
            attempt_task: None,
            retry_timer: None,
        }
    }

    fn transition(&mut self, trigger: Trigger, effects: &mut Vec<Effect>) -> bool {
        let Some(next) = self.state.apply(trigger) else {
            tracing::trace!(state = %self.state, trigger = ?trigger, "Trigger ignored");
            return false;
        };

        let from = std::mem::replace(&mut self.state, next);
        tracing::debug!(from = %from, to = %next, trigger = ?trigger, "Connection state changed");
        if from != next {
            effects.push(Effect::Event(ClientEvent::StateChanged { from, to: next }));
        }
        true
    }

    fn cancel_retry_timer(&mut self) {
        if let Some(timer) = self.retry_timer.take() {
            timer.abort();
        }
    }
}

/// Manages the single connection to the relay endpoint
///
/// Must be used from within a tokio runtime. Call [`stop`](Self::stop) on
/// teardown; background tasks keep the manager alive until then.
pub struct ConnectionManager {
    config: RelayConfig,
    transport: Arc<dyn Transport>,
    renderer: Arc<dyn Renderer>,
    events: broadcast::Sender<ClientEvent>,
    inner: Mutex<Inner>,
}

impl ConnectionManager {
    /// Create a new manager in the `Disconnected` state
    pub fn new(
        config: RelayConfig,
        transport: Arc<dyn Transport>,
        renderer: Arc<dyn Renderer>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_BUFFER_SIZE);

        Arc::new(Self {
            config,
            transport,
            renderer,
            events,
            inner: Mutex::new(Inner::new()),
        })
    }

    /// Get the current state
    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    /// Check if the transport is open
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Reconnect attempts made since the last successful connection
    pub fn retry_count(&self) -> u32 {
        self.inner.lock().retry_count
    }

    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    /// Subscribe to status and state-change events
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    // === Lifecycle ===

    /// Start the manager (call once on application init)
    pub fn start(self: &Arc<Self>) {
        tracing::info!(
            url = %self.config.url,
            max_retries = self.config.max_retries,
            retry_delay_ms = self.config.retry_delay_ms,
            "Starting connection manager"
        );
        self.connect();
    }

    /// Close the connection for good; no retries are scheduled afterwards
    pub fn stop(&self) {
        let mut effects = Vec::new();
        {
            let mut inner = self.inner.lock();
            inner.stopped = true;
            inner.cancel_retry_timer();
            if let Some(task) = inner.attempt_task.take() {
                task.abort();
            }

            let was_connected = inner.state.is_connected();
            if let Some(writer) = inner.writer.take() {
                writer.close();
            }
            inner.generation += 1;

            if inner.state != ConnectionState::Disconnected
                && inner.transition(Trigger::Close, &mut effects)
            {
                if was_connected {
                    effects.push(Effect::Online(false));
                }
                effects.push(Effect::Event(ClientEvent::Stopped));
                tracing::info!("Connection closed by client");
            }
        }
        self.apply_effects(effects);
    }

    /// Open a new connection unless one is already open or opening
    ///
    /// Allowed from `Failed`; always starts a fresh retry sequence and cancels
    /// any pending retry timer.
    pub fn connect(self: &Arc<Self>) {
        let mut effects = Vec::new();
        {
            let mut inner = self.inner.lock();
            if inner.state.is_active() {
                tracing::debug!(state = %inner.state, "Connect ignored, already open or opening");
                return;
            }

            inner.stopped = false;
            inner.cancel_retry_timer();
            inner.retry_count = 0;
            self.begin_attempt(&mut inner, Trigger::Connect, &mut effects);
        }
        self.apply_effects(effects);
    }

    /// Page visibility hook: reconnect when the page becomes visible again
    pub fn on_visibility_change(self: &Arc<Self>, visible: bool) {
        if !visible {
            return;
        }

        let (state, stopped) = {
            let inner = self.inner.lock();
            (inner.state, inner.stopped)
        };

        if stopped {
            tracing::debug!("Visible again but manager was stopped, not reconnecting");
        } else if !state.is_active() {
            tracing::info!(state = %state, "Visible again, reconnecting");
            self.connect();
        }
    }

    // === Outbound ===

    /// Send a message; fails with `NotConnected` unless the connection is open
    ///
    /// A `NotConnected` failure is also reported to observers and the renderer.
    pub fn send(&self, message: ChatMessage) -> ClientResult<()> {
        let result = self.write(&message);

        match &result {
            Ok(()) => tracing::trace!(%message, "Message sent"),
            Err(e @ ClientError::NotConnected) => {
                tracing::warn!(%message, "Cannot send, not connected");
                let mut effects = vec![Effect::Event(ClientEvent::SendFailed)];
                effects.extend(Effect::banner_for(e));
                self.apply_effects(effects);
            }
            Err(e) => tracing::error!(error = %e, "Failed to encode message"),
        }

        result
    }

    /// Send a chat line as the configured display name
    pub fn send_chat(&self, content: impl Into<String>) -> ClientResult<()> {
        self.send(ChatMessage::chat(content, self.config.display_name.as_str()))
    }

    /// Best-effort typing indicator; silently skipped unless connected
    pub fn set_typing_status(&self, is_typing: bool) {
        let message = ChatMessage::typing(self.config.display_name.as_str(), is_typing);
        if let Err(e) = self.write(&message) {
            tracing::trace!(error = %e, is_typing, "Typing status not sent");
        }
    }

    fn write(&self, message: &ChatMessage) -> ClientResult<()> {
        let inner = self.inner.lock();
        let writer = match (&inner.writer, inner.state) {
            (Some(writer), ConnectionState::Connected) => writer,
            _ => return Err(ClientError::NotConnected),
        };
        writer.send_text(message.to_json()?)
    }

    // === Inbound ===

    /// Parse one raw payload and route it to the matching display path
    ///
    /// Unknown message types are logged and dropped. Malformed payloads are
    /// logged and returned as `MalformedPayload`; connection state is untouched.
    pub fn on_message(&self, raw: &str) -> ClientResult<()> {
        match protocol::decode(raw) {
            Ok(Inbound::Message(message)) => {
                MessageDispatcher::dispatch(self.renderer.as_ref(), message);
                Ok(())
            }
            Ok(Inbound::Unknown(kind)) => {
                tracing::info!(kind = ?kind, "Unknown message type, discarding");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, len = raw.len(), "Discarding malformed payload");
                Err(e)
            }
        }
    }

    // === Attempt lifecycle ===

    fn begin_attempt(
        self: &Arc<Self>,
        inner: &mut Inner,
        trigger: Trigger,
        effects: &mut Vec<Effect>,
    ) {
        if !inner.transition(trigger, effects) {
            return;
        }

        inner.generation += 1;
        let generation = inner.generation;
        if let Some(stale) = inner.attempt_task.take() {
            stale.abort();
        }

        let manager = Arc::clone(self);
        inner.attempt_task = Some(tokio::spawn(async move {
            manager.run_attempt(generation).await;
        }));
    }

    /// Drive one connection attempt from open to drop
    async fn run_attempt(self: Arc<Self>, generation: u64) {
        tracing::debug!(url = %self.config.url, generation, "Opening transport");

        let link = match self.transport.open(&self.config.url).await {
            Ok(link) => link,
            Err(e) => {
                self.handle_drop(generation, Some(e));
                return;
            }
        };

        let (writer, mut inbound) = link.into_parts();
        if !self.handle_opened(generation, writer.clone()) {
            writer.close();
            return;
        }

        while let Some(frame) = inbound.recv().await {
            match frame {
                Frame::Text(raw) => {
                    // Already logged; a bad payload never takes the link down
                    let _ = self.on_message(&raw);
                }
                Frame::Closed(reason) => {
                    tracing::info!(reason = ?reason, "Relay closed the connection");
                    self.handle_drop(generation, None);
                    return;
                }
                Frame::Error(e) => {
                    self.handle_drop(generation, Some(ClientError::Transport(e)));
                    return;
                }
            }
        }

        tracing::info!("Transport link ended");
        self.handle_drop(generation, None);
    }

    fn handle_opened(&self, generation: u64, writer: LinkWriter) -> bool {
        let mut effects = Vec::new();
        {
            let mut inner = self.inner.lock();
            if inner.generation != generation || !inner.transition(Trigger::Opened, &mut effects) {
                tracing::debug!(generation, "Discarding stale transport link");
                return false;
            }

            inner.retry_count = 0;
            inner.cancel_retry_timer();
            inner.writer = Some(writer);
        }

        tracing::info!(url = %self.config.url, "Connected to relay");
        effects.push(Effect::Event(ClientEvent::Connected));
        effects.push(Effect::Banner("Connected to chat".to_string(), Severity::Success));
        effects.push(Effect::Online(true));
        self.apply_effects(effects);
        true
    }

    fn handle_drop(self: &Arc<Self>, generation: u64, error: Option<ClientError>) {
        let mut effects = Vec::new();
        {
            let mut inner = self.inner.lock();
            if inner.generation != generation || !inner.state.is_active() {
                return;
            }

            inner.writer = None;
            // The ending task is the caller; detach instead of aborting it
            inner.attempt_task = None;

            if let Some(error) = &error {
                tracing::warn!(error = %error, "Transport error");
                effects.push(Effect::Event(ClientEvent::TransportError(error.to_string())));
                effects.extend(Effect::banner_for(error));
            } else {
                tracing::info!("Disconnected from relay");
            }
            effects.push(Effect::Online(false));

            let retries_remain = inner.retry_count < self.config.max_retries;
            inner.transition(Trigger::Dropped { retries_remain }, &mut effects);

            if retries_remain {
                self.schedule_retry(&mut inner, &mut effects);
            } else {
                let attempts = inner.retry_count;
                tracing::error!(attempts, "Reconnection attempts exhausted");
                effects.push(Effect::Event(ClientEvent::RetriesExhausted { attempts }));
                effects.extend(Effect::banner_for(&ClientError::RetriesExhausted { attempts }));
            }
        }
        self.apply_effects(effects);
    }

    /// Arm the retry timer; at most one is ever outstanding
    fn schedule_retry(self: &Arc<Self>, inner: &mut Inner, effects: &mut Vec<Effect>) {
        inner.cancel_retry_timer();

        let generation = inner.generation;
        let attempt = inner.retry_count + 1;
        let delay = self.config.retry_delay();

        let manager = Arc::clone(self);
        inner.retry_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            manager.handle_retry_elapsed(generation);
        }));

        tracing::info!(
            attempt,
            max_retries = self.config.max_retries,
            delay_ms = self.config.retry_delay_ms,
            "Reconnect scheduled"
        );
        effects.push(Effect::Event(ClientEvent::RetryScheduled { attempt, delay }));
    }

    fn handle_retry_elapsed(self: &Arc<Self>, generation: u64) {
        let mut effects = Vec::new();
        {
            let mut inner = self.inner.lock();
            if inner.generation != generation || inner.state != ConnectionState::Reconnecting {
                return;
            }

            // The timer task is the caller
            inner.retry_timer = None;
            inner.retry_count += 1;
            let attempt = inner.retry_count;
            let max_attempts = self.config.max_retries;

            self.begin_attempt(&mut inner, Trigger::RetryElapsed, &mut effects);

            tracing::info!(attempt, max_attempts, "Reconnecting");
            effects.push(Effect::Event(ClientEvent::Reconnecting {
                attempt,
                max_attempts,
            }));
            effects.push(Effect::Banner(
                format!("Reconnecting... Attempt {attempt}/{max_attempts}"),
                Severity::Info,
            ));
        }
        self.apply_effects(effects);
    }

    fn apply_effects(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Event(event) => {
                    // No subscribers is fine
                    let _ = self.events.send(event);
                }
                Effect::Banner(text, severity) => {
                    tracing::debug!(severity = severity.as_str(), text = %text, "Status banner");
                    self.renderer.display_status_banner(&text, severity);
                }
                Effect::Online(online) => self.renderer.display_online_status(online),
            }
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ConnectionManager")
            .field("url", &self.config.url)
            .field("state", &inner.state)
            .field("retry_count", &inner.retry_count)
            .field("generation", &inner.generation)
            .finish()
    }
}
