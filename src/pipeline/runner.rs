//! Turn pipeline: capture → transcribe → chat → speak.
//!
//! [`TurnPipeline`] handles one [`CaptureEvent`] at a time against a
//! [`ConversationState`] it is lent by the caller.
//!
//! # Turn flow
//!
//! ```text
//! CaptureEvent
//!   ├─ id ≤ last accepted id        → Skipped(Stale)          (state untouched)
//!   ├─ consume reset_pending
//!   ├─ zero-duration clip           → Skipped(EmptyClip)
//!   ├─ reset was pending            → Skipped(ResetPending)
//!   └─▶ transcribe                                  [Transcribing]
//!         ├─ Err → Failed(Transcription)            (no mutation)
//!         └─ Ok  → append user turn
//!               └─▶ chat(full history)              [AwaitingReply]
//!                     ├─ Err → Failed(Chat)         (user turn stays)
//!                     └─ Ok  → append assistant turn
//!                           └─▶ synthesize + play   [Synthesizing]
//!                                 ├─ Ok  → Completed
//!                                 └─ Err → Failed(Synthesis) (both turns stay)
//! ```
//!
//! Every path ends in [`PipelinePhase::Idle`], including a turn whose future
//! is dropped before it finishes.  Gateway errors never escape as `Err`;
//! they come back inside the [`TurnReport`].

use std::sync::{Arc, MutexGuard};

use thiserror::Error;

use crate::audio::CaptureEvent;
use crate::conversation::{ConversationState, Timestamp};
use crate::llm::{ChatGateway, ChatServiceError};
use crate::stt::{TranscriptionError, TranscriptionGateway};
use crate::tts::{SynthesisError, SynthesisGateway};

use super::state::{new_shared_state, PipelinePhase, SessionView, SharedState};

// ---------------------------------------------------------------------------
// TurnFailure / TurnReport
// ---------------------------------------------------------------------------

/// A gateway failure, tagged by the step it happened in.
#[derive(Debug, Error)]
pub enum TurnFailure {
    #[error(transparent)]
    Transcription(#[from] TranscriptionError),

    #[error(transparent)]
    Chat(#[from] ChatServiceError),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
}

impl TurnFailure {
    /// The phase the turn was in when it failed.
    pub fn stage(&self) -> PipelinePhase {
        match self {
            TurnFailure::Transcription(_) => PipelinePhase::Transcribing,
            TurnFailure::Chat(_) => PipelinePhase::AwaitingReply,
            TurnFailure::Synthesis(_) => PipelinePhase::Synthesizing,
        }
    }

    /// `true` when the reply was committed before the failure.
    pub fn is_answered(&self) -> bool {
        matches!(self, TurnFailure::Synthesis(_))
    }
}

/// Why a capture event did not start a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The clip had zero duration.
    EmptyClip,
    /// The event id was not newer than the last accepted one.
    Stale,
    /// The first capture after a reset is discarded.
    ResetPending,
}

/// Result of handling one capture event.
#[derive(Debug)]
pub enum TurnReport {
    Skipped(SkipReason),
    Completed { question: String, reply: String },
    Failed(TurnFailure),
}

impl TurnReport {
    pub fn is_completed(&self) -> bool {
        matches!(self, TurnReport::Completed { .. })
    }

    pub fn failure(&self) -> Option<&TurnFailure> {
        match self {
            TurnReport::Failed(f) => Some(f),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// TurnPipeline
// ---------------------------------------------------------------------------

/// Drives one conversational turn per capture event.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use voice_assistant::audio::{AudioClip, CaptureEvent};
/// use voice_assistant::conversation::ConversationState;
/// use voice_assistant::pipeline::TurnPipeline;
/// # use voice_assistant::llm::ChatGateway;
/// # use voice_assistant::stt::TranscriptionGateway;
/// # use voice_assistant::tts::SynthesisGateway;
/// # fn make_stt() -> Arc<dyn TranscriptionGateway> { unimplemented!() }
/// # fn make_chat() -> Arc<dyn ChatGateway> { unimplemented!() }
/// # fn make_tts() -> Arc<dyn SynthesisGateway> { unimplemented!() }
///
/// # async fn example() {
/// let mut state = ConversationState::default();
/// let mut pipeline = TurnPipeline::new(make_stt(), make_chat(), make_tts(), "gpt-4o");
///
/// let clip = AudioClip::new(vec![0.0; 32_000], 16_000);
/// let report = pipeline.handle_capture(&mut state, CaptureEvent::new(1, clip)).await;
/// println!("{report:?}");
/// # }
/// ```
pub struct TurnPipeline {
    transcriber: Arc<dyn TranscriptionGateway>,
    chat: Arc<dyn ChatGateway>,
    synthesizer: Arc<dyn SynthesisGateway>,
    model_id: String,
    last_capture_id: Option<u64>,
    clock: fn() -> Timestamp,
    view: SharedState,
}

impl TurnPipeline {
    /// Create a pipeline.
    ///
    /// * `model_id`: concrete chat model id sent with every request.
    pub fn new(
        transcriber: Arc<dyn TranscriptionGateway>,
        chat: Arc<dyn ChatGateway>,
        synthesizer: Arc<dyn SynthesisGateway>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            transcriber,
            chat,
            synthesizer,
            model_id: model_id.into(),
            last_capture_id: None,
            clock: Timestamp::now,
            view: new_shared_state(),
        }
    }

    /// Replace the wall clock used to stamp turns.
    pub fn with_clock(mut self, clock: fn() -> Timestamp) -> Self {
        self.clock = clock;
        self
    }

    /// Handle to the snapshot the pipeline publishes after every step.
    pub fn view(&self) -> SharedState {
        Arc::clone(&self.view)
    }

    pub fn phase(&self) -> PipelinePhase {
        self.lock_view().phase
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    // -----------------------------------------------------------------------
    // Reset
    // -----------------------------------------------------------------------

    /// Reset the conversation.  Accepted only while idle; returns whether
    /// the reset was applied.
    pub fn reset(&mut self, state: &mut ConversationState) -> bool {
        let phase = self.phase();
        if phase.is_busy() {
            log::warn!("pipeline: reset ignored while {}", phase.label());
            return false;
        }

        state.reset();
        log::info!("pipeline: conversation reset");

        let mut view = self.lock_view();
        view.display_log.clear();
        view.last_failure = None;
        true
    }

    // -----------------------------------------------------------------------
    // Turn handling
    // -----------------------------------------------------------------------

    /// Run one capture event through the pipeline.
    pub async fn handle_capture(
        &mut self,
        state: &mut ConversationState,
        event: CaptureEvent,
    ) -> TurnReport {
        // ── 1. Gate ──────────────────────────────────────────────────────
        if self.last_capture_id.is_some_and(|last| event.id <= last) {
            log::debug!("pipeline: ignoring stale capture #{}", event.id);
            return TurnReport::Skipped(SkipReason::Stale);
        }
        self.last_capture_id = Some(event.id);

        let reset_was_pending = state.consume_reset_pending();

        if event.clip.is_empty() {
            log::debug!("pipeline: capture #{} has no audio", event.id);
            return TurnReport::Skipped(SkipReason::EmptyClip);
        }
        if reset_was_pending {
            log::info!("pipeline: discarding capture #{} recorded before reset", event.id);
            return TurnReport::Skipped(SkipReason::ResetPending);
        }

        self.lock_view().last_failure = None;
        let _idle = IdleOnDrop(self.view());

        // ── 2. Transcribe ────────────────────────────────────────────────
        self.publish(state, PipelinePhase::Transcribing);
        log::debug!(
            "pipeline: capture #{} → transcribing {:.2}s",
            event.id,
            event.clip.duration_seconds()
        );

        let question = match self.transcriber.transcribe(event.clip).await {
            Ok(text) => text,
            Err(e) => return self.fail(state, e.into()),
        };
        log::debug!("pipeline: heard {question:?}");

        state.append_user_turn(question.clone(), (self.clock)());

        // ── 3. Chat ──────────────────────────────────────────────────────
        self.publish(state, PipelinePhase::AwaitingReply);

        let reply = match self.chat.complete(state.history(), &self.model_id).await {
            Ok(reply) => reply,
            Err(e) => return self.fail(state, e.into()),
        };
        log::debug!("pipeline: reply {reply:?}");

        state.append_assistant_turn(reply.clone(), (self.clock)());

        // ── 4. Speak ─────────────────────────────────────────────────────
        self.publish(state, PipelinePhase::Synthesizing);

        if let Err(e) = self.synthesizer.synthesize_and_play(&reply).await {
            return self.fail(state, e.into());
        }

        self.publish(state, PipelinePhase::Idle);
        log::info!("pipeline: turn complete ({} turns)", state.turn_count());

        TurnReport::Completed { question, reply }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn lock_view(&self) -> MutexGuard<'_, SessionView> {
        lock(&self.view)
    }

    fn publish(&self, state: &ConversationState, phase: PipelinePhase) {
        let mut view = self.lock_view();
        view.phase = phase;
        view.display_log = state.display_log().to_vec();
    }

    fn fail(&self, state: &ConversationState, failure: TurnFailure) -> TurnReport {
        log::error!(
            "pipeline: {} failed: {failure}",
            failure.stage().label().to_lowercase()
        );
        self.publish(state, PipelinePhase::Idle);
        self.lock_view().last_failure = Some(failure.to_string());
        TurnReport::Failed(failure)
    }
}

fn lock(view: &SharedState) -> MutexGuard<'_, SessionView> {
    view.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Puts the published phase back to idle when a turn ends, however it ends.
struct IdleOnDrop(SharedState);

impl Drop for IdleOnDrop {
    fn drop(&mut self) {
        lock(&self.0).phase = PipelinePhase::Idle;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
