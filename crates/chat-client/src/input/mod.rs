//! Input-side helpers that drive the connection manager from user activity.

mod typing;

pub use typing::TypingNotifier;
