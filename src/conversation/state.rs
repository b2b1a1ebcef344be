//! The authoritative in-memory conversation model.
//!
//! [`ConversationState`] holds two parallel sequences:
//!
//! * `history`: role-tagged [`Message`]s sent in full to the chat service on
//!   every call, always led by the system instruction.
//! * `display_log`: timestamped [`Turn`]s rendered by the UI, never sent to
//!   the chat service.
//!
//! Both only ever grow by append or get replaced wholesale by
//! [`reset`](ConversationState::reset), so
//! `history.len() == display_log.len() + 1` holds at every point.

use crate::conversation::message::{Message, Role, Speaker, Timestamp, Turn};

/// Behavioural instruction seeded as the first history entry.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a thoughtful assistant. Respond to all input in 25 words and answer in korea";

/// Conversation history, display log and reset flag for one session.
///
/// # Example
/// ```
/// use voice_assistant::conversation::{ConversationState, Timestamp};
///
/// let mut state = ConversationState::default();
/// let now = Timestamp::now();
/// state.append_user_turn("안녕", now);
/// state.append_assistant_turn("안녕하세요", now);
///
/// assert_eq!(state.history().len(), 3);
/// assert_eq!(state.display_log().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ConversationState {
    system_prompt: String,
    history: Vec<Message>,
    display_log: Vec<Turn>,
    reset_pending: bool,
}

impl ConversationState {
    /// Fresh session state seeded with `system_prompt`.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let system_prompt = system_prompt.into();
        Self {
            history: vec![Message::system(system_prompt.clone())],
            display_log: Vec::new(),
            reset_pending: false,
            system_prompt,
        }
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Discard the conversation and arm the reset flag.
    ///
    /// History goes back to `[system]`, the display log to empty.  The flag
    /// makes the next capture event a no-op (see
    /// [`consume_reset_pending`](Self::consume_reset_pending)).
    pub fn reset(&mut self) {
        self.history = vec![Message::system(self.system_prompt.clone())];
        self.display_log = Vec::new();
        self.reset_pending = true;
    }

    /// Append a user utterance to history and display log in one step.
    pub fn append_user_turn(&mut self, text: impl Into<String>, timestamp: Timestamp) {
        self.append(Speaker::User, text.into(), timestamp);
    }

    /// Append the assistant's reply to history and display log in one step.
    ///
    /// A reply always answers a user turn; calling this when the history does
    /// not end with a user message is a pipeline bug.
    pub fn append_assistant_turn(&mut self, text: impl Into<String>, timestamp: Timestamp) {
        debug_assert_eq!(
            self.history.last().map(|m| m.role),
            Some(Role::User),
            "assistant turn must follow a user turn"
        );
        self.append(Speaker::Assistant, text.into(), timestamp);
    }

    /// Return the reset flag and clear it.
    pub fn consume_reset_pending(&mut self) -> bool {
        std::mem::take(&mut self.reset_pending)
    }

    fn append(&mut self, speaker: Speaker, text: String, timestamp: Timestamp) {
        self.history.push(Message::new(speaker.role(), text.clone()));
        self.display_log.push(Turn {
            speaker,
            timestamp,
            text,
        });
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Full model-facing history, system message first.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// UI-facing log of turns.
    pub fn display_log(&self) -> &[Turn] {
        &self.display_log
    }

    pub fn is_reset_pending(&self) -> bool {
        self.reset_pending
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Number of entries in the display log (user and assistant turns).
    pub fn turn_count(&self) -> usize {
        self.display_log.len()
    }

    /// `true` when the latest user question has no assistant reply yet,
    /// which happens after a failed chat call.
    pub fn has_unanswered_question(&self) -> bool {
        matches!(self.history.last(), Some(m) if m.role == Role::User)
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(h: u32, m: u32) -> Timestamp {
        Timestamp::from_hm(h, m).unwrap()
    }

    fn assert_parallel(state: &ConversationState) {
        assert_eq!(state.history().len(), state.display_log().len() + 1);
        assert_eq!(state.history()[0].role, Role::System);
    }

    fn with_turns(pairs: usize) -> ConversationState {
        let mut state = ConversationState::default();
        for i in 0..pairs {
            state.append_user_turn(format!("질문 {i}"), ts(10, 0));
            state.append_assistant_turn(format!("답변 {i}"), ts(10, 1));
        }
        state
    }

    #[test]
    fn new_state_is_seeded_with_system_prompt() {
        let state = ConversationState::default();
        assert_eq!(state.history(), &[Message::system(DEFAULT_SYSTEM_PROMPT)]);
        assert!(state.display_log().is_empty());
        assert!(!state.is_reset_pending());
        assert_parallel(&state);
    }

    #[test]
    fn custom_system_prompt_is_used() {
        let state = ConversationState::new("be brief");
        assert_eq!(state.history()[0].content, "be brief");
        assert_eq!(state.system_prompt(), "be brief");
    }

    #[test]
    fn appends_keep_history_and_log_parallel() {
        let mut state = ConversationState::default();

        state.append_user_turn("안녕", ts(9, 0));
        assert_parallel(&state);
        assert!(state.has_unanswered_question());

        state.append_assistant_turn("안녕하세요", ts(9, 0));
        assert_parallel(&state);
        assert!(!state.has_unanswered_question());

        assert_eq!(state.history()[1], Message::user("안녕"));
        assert_eq!(state.history()[2], Message::assistant("안녕하세요"));
        assert_eq!(state.display_log()[0].speaker, Speaker::User);
        assert_eq!(state.display_log()[1].speaker, Speaker::Assistant);
        assert_eq!(state.turn_count(), 2);
    }

    #[test]
    fn user_turn_may_follow_unanswered_user_turn() {
        let mut state = ConversationState::default();
        state.append_user_turn("first", ts(9, 0));
        state.append_user_turn("second", ts(9, 1));
        assert_parallel(&state);
        assert_eq!(state.history()[2], Message::user("second"));
    }

    #[test]
    fn reset_restores_seed_and_arms_flag() {
        let mut state = with_turns(4);
        assert_eq!(state.turn_count(), 8);

        state.reset();

        assert_eq!(state.history(), &[Message::system(DEFAULT_SYSTEM_PROMPT)]);
        assert!(state.display_log().is_empty());
        assert!(state.is_reset_pending());
        assert_parallel(&state);
    }

    #[test]
    fn double_reset_equals_single_reset() {
        let mut once = with_turns(2);
        once.reset();

        let mut twice = with_turns(2);
        twice.reset();
        twice.reset();

        assert_eq!(once.history(), twice.history());
        assert_eq!(once.display_log(), twice.display_log());
        assert_eq!(once.is_reset_pending(), twice.is_reset_pending());
    }

    #[test]
    fn consume_reset_pending_clears_flag() {
        let mut state = ConversationState::default();
        assert!(!state.consume_reset_pending());

        state.reset();
        assert!(state.consume_reset_pending());
        assert!(!state.consume_reset_pending());
        assert!(!state.is_reset_pending());
    }

    #[test]
    fn reset_keeps_custom_system_prompt() {
        let mut state = ConversationState::new("custom");
        state.append_user_turn("q", ts(8, 0));
        state.reset();
        assert_eq!(state.history(), &[Message::system("custom")]);
    }
}
