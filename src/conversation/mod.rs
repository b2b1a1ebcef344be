//! Conversation state for one voice-assistant session.
//!
//! * [`ConversationState`] — history (for the chat service), display log (for
//!   the UI) and the reset flag.
//! * [`Message`] / [`Role`] — chat-completions history entries.
//! * [`Turn`] / [`Speaker`] / [`Timestamp`] — display log entries.

pub mod message;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use message::{Message, Role, Speaker, Timestamp, Turn};
pub use state::{ConversationState, DEFAULT_SYSTEM_PROMPT};
