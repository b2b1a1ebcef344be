//! Voice assistant: record a question, transcribe it, ask a chat model with
//! the whole conversation, and speak the reply.
//!
//! * [`audio`]: microphone capture, clips, MP3 playback.
//! * [`stt`]: transcription gateway (Whisper API).
//! * [`llm`]: chat gateway (OpenAI chat completions) and model choice.
//! * [`tts`]: speech synthesis gateway (Google Translate or OpenAI).
//! * [`conversation`]: history, display log and reset flag.
//! * [`pipeline`]: the turn state machine and the session task.
//! * [`config`] / [`credential`]: settings and API key validation.

pub mod audio;
pub mod config;
pub mod conversation;
pub mod credential;
pub mod llm;
pub mod pipeline;
pub mod stt;
pub mod tts;
