//! Turn pipeline and session orchestration.
//!
//! This module wires capture events through transcription, chat and speech
//! synthesis, and publishes the state a front end renders.
//!
//! # Architecture
//!
//! ```text
//! SessionEvent (mpsc)
//!        │
//!        ▼
//! Session::run()  ← async tokio task, owns ConversationState
//!        │
//!        ├─ Reset            → TurnPipeline::reset
//!        │
//!        └─ Capture(event)   → TurnPipeline::handle_capture
//!              ├─ TranscriptionGateway::transcribe   → Transcribing
//!              ├─ ChatGateway::complete              → AwaitingReply
//!              └─ SynthesisGateway::synthesize_and_play → Synthesizing
//!
//! SharedState (Arc<Mutex<SessionView>>) ←─── read by the front end
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use voice_assistant::conversation::ConversationState;
//! use voice_assistant::pipeline::{Session, TurnPipeline};
//! # use voice_assistant::llm::ChatGateway;
//! # use voice_assistant::stt::TranscriptionGateway;
//! # use voice_assistant::tts::SynthesisGateway;
//! # fn make_stt() -> Arc<dyn TranscriptionGateway> { unimplemented!() }
//! # fn make_chat() -> Arc<dyn ChatGateway> { unimplemented!() }
//! # fn make_tts() -> Arc<dyn SynthesisGateway> { unimplemented!() }
//!
//! #[tokio::main]
//! async fn main() {
//!     let pipeline = TurnPipeline::new(make_stt(), make_chat(), make_tts(), "gpt-4o");
//!     let session = Session::new(ConversationState::default(), pipeline);
//!     let view = session.view();
//!
//!     let (event_tx, event_rx) = mpsc::channel(16);
//!     let (report_tx, mut report_rx) = mpsc::channel(16);
//!     tokio::spawn(session.run(event_rx, report_tx));
//!
//!     // event_tx is fed by the capture source
//!     # drop((event_tx, view));
//!     while let Some(report) = report_rx.recv().await {
//!         println!("{report:?}");
//!     }
//! }
//! ```

pub mod runner;
pub mod session;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{SkipReason, TurnFailure, TurnPipeline, TurnReport};
pub use session::{Session, SessionEvent, SessionReport};
pub use state::{new_shared_state, PipelinePhase, SessionView, SharedState};
