//! Turn phases and the shared session snapshot.
//!
//! [`PipelinePhase`] drives the turn state machine.  A front end reads it,
//! together with the rendered display log and the last failure, through
//! [`SharedState`].
//!
//! [`SharedState`] is a type alias for `Arc<Mutex<SessionView>>`, cheap to
//! clone and safe to share across threads.  The pipeline writes a fresh
//! snapshot after every step; readers never see a half-applied turn.

use std::sync::{Arc, Mutex};

use crate::conversation::Turn;

// ---------------------------------------------------------------------------
// PipelinePhase
// ---------------------------------------------------------------------------

/// Phases of one conversational turn.
///
/// ```text
/// Idle ──capture──▶ Transcribing ──text──▶ AwaitingReply ──reply──▶ Synthesizing
///   ▲                    │                      │                        │
///   └────── failure ─────┴────── failure ───────┘                        │
///   └───────────────────────── success or failure ───────────────────────┘
/// ```
///
/// A reset is accepted only in `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelinePhase {
    /// Waiting for the next capture event.
    #[default]
    Idle,

    /// The clip is with the transcription service.
    Transcribing,

    /// The user turn is committed; the chat service is composing a reply.
    AwaitingReply,

    /// The reply is committed; speech is being synthesized and handed off.
    Synthesizing,
}

impl PipelinePhase {
    /// Returns `true` while a turn is in flight.
    ///
    /// ```
    /// use voice_assistant::pipeline::PipelinePhase;
    ///
    /// assert!(!PipelinePhase::Idle.is_busy());
    /// assert!(PipelinePhase::Transcribing.is_busy());
    /// assert!(PipelinePhase::AwaitingReply.is_busy());
    /// assert!(PipelinePhase::Synthesizing.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        !matches!(self, PipelinePhase::Idle)
    }

    /// Short status-line label.
    pub fn label(&self) -> &'static str {
        match self {
            PipelinePhase::Idle => "Idle",
            PipelinePhase::Transcribing => "Transcribing",
            PipelinePhase::AwaitingReply => "Awaiting reply",
            PipelinePhase::Synthesizing => "Speaking",
        }
    }
}

// ---------------------------------------------------------------------------
// SessionView
// ---------------------------------------------------------------------------

/// What a front end needs to render the session.
#[derive(Debug, Clone, Default)]
pub struct SessionView {
    /// Current phase of the turn pipeline.
    pub phase: PipelinePhase,

    /// Copy of the conversation's display log as of the last step.
    pub display_log: Vec<Turn>,

    /// Message for the most recent failed turn.
    ///
    /// Cleared when the next turn starts or the session is reset.
    pub last_failure: Option<String>,
}

impl SessionView {
    pub fn new() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// SharedState
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`SessionView`].
///
/// Lock for a short critical section; do **not** hold the lock across
/// `.await` points.
pub type SharedState = Arc<Mutex<SessionView>>;

/// Construct a new [`SharedState`] wrapping an idle, empty view.
pub fn new_shared_state() -> SharedState {
    Arc::new(Mutex::new(SessionView::new()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Speaker, Timestamp};

    #[test]
    fn only_idle_is_not_busy() {
        assert!(!PipelinePhase::Idle.is_busy());
        assert!(PipelinePhase::Transcribing.is_busy());
        assert!(PipelinePhase::AwaitingReply.is_busy());
        assert!(PipelinePhase::Synthesizing.is_busy());
    }

    #[test]
    fn labels() {
        assert_eq!(PipelinePhase::Idle.label(), "Idle");
        assert_eq!(PipelinePhase::Transcribing.label(), "Transcribing");
        assert_eq!(PipelinePhase::AwaitingReply.label(), "Awaiting reply");
        assert_eq!(PipelinePhase::Synthesizing.label(), "Speaking");
    }

    #[test]
    fn default_phase_is_idle() {
        assert_eq!(PipelinePhase::default(), PipelinePhase::Idle);
    }

    #[test]
    fn new_view_is_idle_and_empty() {
        let view = SessionView::new();
        assert_eq!(view.phase, PipelinePhase::Idle);
        assert!(view.display_log.is_empty());
        assert!(view.last_failure.is_none());
    }

    #[test]
    fn shared_state_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SharedState>();
    }

    #[test]
    fn shared_state_can_be_cloned_and_mutated() {
        let state = new_shared_state();
        let state2 = Arc::clone(&state);

        {
            let mut view = state.lock().unwrap();
            view.phase = PipelinePhase::AwaitingReply;
            view.display_log.push(Turn {
                speaker: Speaker::User,
                timestamp: Timestamp::from_hm(9, 5).unwrap(),
                text: "안녕".into(),
            });
        }

        let view = state2.lock().unwrap();
        assert_eq!(view.phase, PipelinePhase::AwaitingReply);
        assert_eq!(view.display_log.len(), 1);
    }
}
