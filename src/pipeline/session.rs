//! One interactive session: owns the conversation and feeds it events in
//! order.
//!
//! [`Session::run`] consumes [`SessionEvent`]s from a `tokio::sync::mpsc`
//! channel.  Each event is handled to completion before the next is
//! received, so at most one turn is in flight and a reset queued behind a
//! running turn applies after that turn.

use tokio::sync::mpsc;

use crate::audio::CaptureEvent;
use crate::conversation::ConversationState;

use super::runner::{TurnPipeline, TurnReport};
use super::state::SharedState;

/// Input to a session.
#[derive(Debug)]
pub enum SessionEvent {
    /// A finished recording.
    Capture(CaptureEvent),
    /// Start a fresh conversation.
    Reset,
}

/// What a session did with one event.
#[derive(Debug)]
pub enum SessionReport {
    Turn(TurnReport),
    /// `accepted` is `false` when the pipeline was busy.
    Reset { accepted: bool },
}

/// A conversation and the pipeline that advances it.
pub struct Session {
    state: ConversationState,
    pipeline: TurnPipeline,
}

impl Session {
    pub fn new(state: ConversationState, pipeline: TurnPipeline) -> Self {
        Self { state, pipeline }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Snapshot handle for a front end.
    pub fn view(&self) -> SharedState {
        self.pipeline.view()
    }

    /// Handle a single event.
    pub async fn handle(&mut self, event: SessionEvent) -> SessionReport {
        match event {
            SessionEvent::Capture(capture) => {
                SessionReport::Turn(self.pipeline.handle_capture(&mut self.state, capture).await)
            }
            SessionEvent::Reset => SessionReport::Reset {
                accepted: self.pipeline.reset(&mut self.state),
            },
        }
    }

    /// Run until `events` is closed, sending a report for every event.
    ///
    /// A closed `reports` channel is not an error; the session keeps
    /// processing events.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<SessionEvent>,
        reports: mpsc::Sender<SessionReport>,
    ) -> ConversationState {
        while let Some(event) = events.recv().await {
            let report = self.handle(event).await;
            if reports.send(report).await.is_err() {
                log::debug!("pipeline: report receiver dropped");
            }
        }

        log::info!("pipeline: event channel closed, session shutting down");
        self.state
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioClip;
    use crate::conversation::Message;
    use crate::llm::{ChatGateway, ChatServiceError};
    use crate::pipeline::SkipReason;
    use crate::stt::MockTranscriber;
    use crate::tts::MockSynthesis;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct EchoChat;

    #[async_trait]
    impl ChatGateway for EchoChat {
        async fn complete(
            &self,
            history: &[Message],
            _model_id: &str,
        ) -> Result<String, ChatServiceError> {
            let last = history.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(format!("echo: {last}"))
        }
    }

    fn make_session() -> (Session, Arc<MockTranscriber>) {
        let stt = Arc::new(MockTranscriber::ok("안녕"));
        let pipeline = TurnPipeline::new(
            stt.clone(),
            Arc::new(EchoChat),
            Arc::new(MockSynthesis::ok()),
            "gpt-4o-mini",
        );
        (Session::new(ConversationState::default(), pipeline), stt)
    }

    fn capture(id: u64, samples: usize) -> SessionEvent {
        SessionEvent::Capture(CaptureEvent::new(id, AudioClip::new(vec![0.0; samples], 16_000)))
    }

    #[tokio::test]
    async fn events_are_processed_in_order() {
        let (session, stt) = make_session();
        let (tx, rx) = mpsc::channel(8);
        let (report_tx, mut report_rx) = mpsc::channel(8);

        tx.send(capture(1, 16_000)).await.unwrap();
        tx.send(SessionEvent::Reset).await.unwrap();
        tx.send(capture(2, 16_000)).await.unwrap();
        tx.send(capture(3, 16_000)).await.unwrap();
        drop(tx);

        let state = session.run(rx, report_tx).await;

        let mut reports = Vec::new();
        while let Some(r) = report_rx.recv().await {
            reports.push(r);
        }
        assert_eq!(reports.len(), 4);
        assert!(matches!(&reports[0], SessionReport::Turn(t) if t.is_completed()));
        assert!(matches!(reports[1], SessionReport::Reset { accepted: true }));
        assert!(matches!(
            reports[2],
            SessionReport::Turn(TurnReport::Skipped(SkipReason::ResetPending))
        ));
        assert!(matches!(&reports[3], SessionReport::Turn(t) if t.is_completed()));

        assert_eq!(stt.calls(), 2);
        assert_eq!(
            state.history()[1..],
            [Message::user("안녕"), Message::assistant("echo: 안녕")]
        );
    }

    #[tokio::test]
    async fn empty_capture_after_reset_spends_the_flag() {
        let (mut session, stt) = make_session();

        session.handle(capture(1, 16_000)).await;
        session.handle(SessionEvent::Reset).await;
        let skipped = session.handle(capture(2, 0)).await;
        let turn = session.handle(capture(3, 8_000)).await;

        assert!(matches!(
            skipped,
            SessionReport::Turn(TurnReport::Skipped(SkipReason::EmptyClip))
        ));
        assert!(matches!(turn, SessionReport::Turn(t) if t.is_completed()));
        assert_eq!(stt.calls(), 2);
        assert_eq!(session.state().turn_count(), 2);
    }

    #[tokio::test]
    async fn dropped_report_receiver_does_not_stop_session() {
        let (session, stt) = make_session();
        let (tx, rx) = mpsc::channel(4);
        let (report_tx, report_rx) = mpsc::channel(4);
        drop(report_rx);

        tx.send(capture(1, 16_000)).await.unwrap();
        tx.send(capture(2, 16_000)).await.unwrap();
        drop(tx);

        let state = session.run(rx, report_tx).await;

        assert_eq!(stt.calls(), 2);
        assert_eq!(state.turn_count(), 4);
    }

    #[tokio::test]
    async fn view_is_shared_with_pipeline() {
        let (mut session, _stt) = make_session();
        let view = session.view();

        session.handle(capture(1, 16_000)).await;

        assert_eq!(view.lock().unwrap().display_log.len(), 2);
    }
}
