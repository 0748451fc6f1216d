//! Inbound message handlers
//!
//! Routes decoded relay messages to the render collaborator by variant.

use crate::protocol::ChatMessage;
use crate::render::Renderer;

/// Dispatch decoded messages to the matching display path
pub struct MessageDispatcher;

impl MessageDispatcher {
    /// Handle one inbound message
    pub fn dispatch(renderer: &dyn Renderer, message: ChatMessage) {
        tracing::trace!(kind = %message.kind(), "Dispatching message");

        match message {
            ChatMessage::Chat {
                content, sender, ..
            } => {
                // The sender name doubles as the avatar reference
                renderer.display_incoming_chat(&content, &sender, &sender);
            }
            ChatMessage::Typing { sender, is_typing } => {
                renderer.display_typing_indicator(&sender, is_typing);
            }
            ChatMessage::Status { user_id, status } => {
                renderer.display_presence(&user_id, &status);
            }
        }
    }
}
