//! Text-to-speech gateway.
//!
//! # Architecture
//!
//! ```text
//! reply text ──▶ SpeechSynthesizer ──▶ MP3 bytes
//!                (Google / OpenAI)         │
//!                                          ▼
//!                               output-*.mp3 (transient)
//!                                          │
//!                                          ▼
//!                              AudioSink::play_file ──▶ speakers
//! ```
//!
//! [`SpeechGateway`] owns the transient file and deletes it as soon as the
//! sink has taken the audio.

pub mod gateway;
pub mod google;
pub mod openai;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use gateway::{SpeechGateway, SpeechSynthesizer, SynthesisError, SynthesisGateway};
pub use google::{split_text, GoogleTranslateTts, MAX_CHUNK_CHARS};
pub use openai::OpenAiTts;

#[cfg(test)]
pub use gateway::MockSynthesis;
