//! Speech-to-text gateway.
//!
//! # Architecture
//!
//! ```text
//! AudioClip ──export_wav──▶ input-*.wav (transient)
//!                                │
//!                                ▼
//!                 POST /v1/audio/transcriptions (multipart)
//!                                │
//!                                ▼
//!                      {"text": "…"} ──▶ String
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use voice_assistant::audio::AudioClip;
//! use voice_assistant::config::SttConfig;
//! use voice_assistant::credential::Credential;
//! use voice_assistant::stt::{TranscriptionGateway, WhisperApiTranscriber};
//!
//! # async fn example() {
//! let key = Credential::parse("sk-...").unwrap();
//! let stt = WhisperApiTranscriber::from_config(&SttConfig::default(), key, None);
//!
//! let clip = AudioClip::new(vec![0.0; 16_000], 16_000);
//! let text = stt.transcribe(clip).await.unwrap();
//! println!("{text}");
//! # }
//! ```

pub mod gateway;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use gateway::{TranscriptionError, TranscriptionGateway, WhisperApiTranscriber};

// test-only re-export so the pipeline tests can import MockTranscriber
// without `use crate::stt::gateway::MockTranscriber`.
#[cfg(test)]
pub use gateway::MockTranscriber;
