//! Relay protocol definitions
//!
//! Defines the JSON message format exchanged with the relay endpoint.

mod kinds;
mod messages;

pub use kinds::MessageKind;
pub use messages::{decode, ChatMessage, Inbound};
