//! Audio I/O: microphone capture, clip encoding and speaker playback.
//!
//! # Flow
//!
//! ```text
//! Microphone → cpal callback → downmix_to_mono → Recording → AudioClip
//!            → export_wav (transient input-*.wav) → TranscriptionGateway
//!
//! TTS service → MP3 bytes (transient output-*.mp3) → AudioSink::play_file
//!            → decode_mp3 → cpal output stream (detached thread)
//! ```

pub mod capture;
pub mod clip;
pub mod playback;

pub use capture::{downmix_to_mono, CaptureError, Recorder, Recording};
pub use clip::{AudioClip, CaptureEvent, ClipError};
pub use playback::{decode_mp3, AudioSink, DecodedAudio, PlaybackError, SpeakerSink};
