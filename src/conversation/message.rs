//! Message and display-turn types.
//!
//! [`Message`] is what the chat service sees; [`Turn`] is what the UI
//! renders.  The two are appended together by
//! [`ConversationState`](crate::conversation::ConversationState) and never
//! converted into one another.

use std::fmt;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Role / Message
// ---------------------------------------------------------------------------

/// Author of a [`Message`] in the chat-completions wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One entry of the model-facing history.
///
/// Serialises as `{"role": "user", "content": "…"}` so a `&[Message]` can be
/// dropped straight into a chat-completions request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

// ---------------------------------------------------------------------------
// Timestamp
// ---------------------------------------------------------------------------

/// Wall-clock time of a turn at minute resolution, rendered as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(NaiveTime);

impl Timestamp {
    /// Current local time, truncated to the minute.
    pub fn now() -> Self {
        let now = chrono::Local::now().time();
        Self::from_hm(now.hour(), now.minute()).unwrap_or(Self(NaiveTime::MIN))
    }

    /// Build a timestamp from an hour (0-23) and minute (0-59).
    ///
    /// Returns `None` when either component is out of range.
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

// ---------------------------------------------------------------------------
// Speaker / Turn
// ---------------------------------------------------------------------------

/// Who produced a [`Turn`] in the display log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    /// The history role that is appended alongside a turn by this speaker.
    pub fn role(&self) -> Role {
        match self {
            Speaker::User => Role::User,
            Speaker::Assistant => Role::Assistant,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Assistant => "assistant",
        }
    }
}

/// One rendered line of the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub speaker: Speaker,
    pub timestamp: Timestamp,
    pub text: String,
}

impl fmt::Display for Turn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.timestamp, self.speaker.label(), self.text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
