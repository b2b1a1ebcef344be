//! Synthesis traits and the synthesize-then-play gateway.
//!
//! Two seams:
//!
//! * [`SpeechSynthesizer`] — turns text into encoded (MP3) audio bytes.
//!   Implemented by [`GoogleTranslateTts`](crate::tts::GoogleTranslateTts)
//!   and [`OpenAiTts`](crate::tts::OpenAiTts).
//! * [`SynthesisGateway`] — what the turn pipeline calls: synthesize, hand
//!   the audio to playback, clean up.  [`SpeechGateway`] composes a
//!   synthesizer with an [`AudioSink`].

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::audio::{AudioSink, PlaybackError};

// ---------------------------------------------------------------------------
// SynthesisError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SynthesisError {
    /// Nothing but whitespace to speak.
    #[error("nothing to synthesize")]
    EmptyText,

    #[error("speech request failed: {0}")]
    Request(String),

    #[error("speech request timed out")]
    Timeout,

    #[error("speech service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The service answered with an empty body.
    #[error("speech service returned no audio")]
    EmptyAudio,

    /// The transient output file could not be written.
    #[error("transient speech file error: {0}")]
    Io(#[from] std::io::Error),

    /// Handing the audio to the playback device failed.
    #[error("playback failed: {0}")]
    Playback(#[from] PlaybackError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for SynthesisError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SynthesisError::Timeout
        } else {
            SynthesisError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Text-to-speech backend producing MP3 bytes.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SynthesisError>;
}

/// Speaks a reply: synthesis plus playback hand-off.
///
/// Returns once playback has been handed off; the audio may still be
/// sounding.
#[async_trait]
pub trait SynthesisGateway: Send + Sync {
    async fn synthesize_and_play(&self, text: &str) -> Result<(), SynthesisError>;
}

// ---------------------------------------------------------------------------
// SpeechGateway
// ---------------------------------------------------------------------------

/// [`SynthesisGateway`] built from a synthesizer and a sink.
///
/// The MP3 is written to a transient `output-*.mp3` before the hand-off and
/// removed right after it, whether or not the sink accepted it.
pub struct SpeechGateway {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    sink: Arc<dyn AudioSink>,
    scratch_dir: Option<PathBuf>,
}

impl SpeechGateway {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        sink: Arc<dyn AudioSink>,
        scratch_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            synthesizer,
            sink,
            scratch_dir,
        }
    }
}

#[async_trait]
impl SynthesisGateway for SpeechGateway {
    async fn synthesize_and_play(&self, text: &str) -> Result<(), SynthesisError> {
        if text.trim().is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        let audio = self.synthesizer.synthesize(text).await?;
        if audio.is_empty() {
            return Err(SynthesisError::EmptyAudio);
        }
        log::debug!("tts: {} bytes of speech", audio.len());

        let sink = Arc::clone(&self.sink);
        let scratch_dir = self.scratch_dir.clone();

        tokio::task::spawn_blocking(move || -> Result<(), SynthesisError> {
            let mut builder = tempfile::Builder::new();
            builder.prefix("output-").suffix(".mp3");
            let mut artifact = match scratch_dir {
                Some(dir) => builder.tempfile_in(dir)?,
                None => builder.tempfile()?,
            };
            artifact.write_all(&audio)?;
            artifact.flush()?;

            sink.play_file(artifact.path())?;
            Ok(())
        })
        .await
        .map_err(|e| SynthesisError::Internal(e.to_string()))?
    }
}

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

/// Synthesis stub: succeeds or fails on demand and records what it spoke.
#[cfg(test)]
pub struct MockSynthesis {
    fail: bool,
    spoken: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockSynthesis {
    pub fn ok() -> Self {
        Self {
            fail: false,
            spoken: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            spoken: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl SynthesisGateway for MockSynthesis {
    async fn synthesize_and_play(&self, text: &str) -> Result<(), SynthesisError> {
        self.spoken.lock().unwrap().push(text.to_string());
        if self.fail {
            Err(SynthesisError::Playback(PlaybackError::NoDevice))
        } else {
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct FixedSynth(Vec<u8>);

    #[async_trait]
    impl SpeechSynthesizer for FixedSynth {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, SynthesisError> {
            Ok(self.0.clone())
        }
    }

    struct FailingSynth;

    #[async_trait]
    impl SpeechSynthesizer for FailingSynth {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, SynthesisError> {
            Err(SynthesisError::Timeout)
        }
    }

    /// Records the path and contents it was handed.
    #[derive(Default)]
    struct RecordingSink {
        seen: Mutex<Vec<(PathBuf, Vec<u8>)>>,
        fail: bool,
    }

    impl AudioSink for RecordingSink {
        fn play_file(&self, path: &Path) -> Result<(), PlaybackError> {
            let bytes = std::fs::read(path)?;
            self.seen.lock().unwrap().push((path.to_path_buf(), bytes));
            if self.fail {
                Err(PlaybackError::NoDevice)
            } else {
                Ok(())
            }
        }
    }

    fn gateway(
        synth: Arc<dyn SpeechSynthesizer>,
        sink: Arc<RecordingSink>,
        dir: &Path,
    ) -> SpeechGateway {
        SpeechGateway::new(synth, sink, Some(dir.to_path_buf()))
    }

    #[tokio::test]
    async fn hands_audio_to_sink_then_deletes_file() {
        let dir = tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let gw = gateway(Arc::new(FixedSynth(vec![1, 2, 3])), Arc::clone(&sink), dir.path());

        gw.synthesize_and_play("안녕하세요").await.unwrap();

        let seen = sink.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, vec![1, 2, 3]);
        assert!(seen[0]
            .0
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("output-") && n.ends_with(".mp3")));
        assert!(!seen[0].0.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn file_deleted_when_sink_fails() {
        let dir = tempdir().unwrap();
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..RecordingSink::default()
        });
        let gw = gateway(Arc::new(FixedSynth(vec![9; 16])), Arc::clone(&sink), dir.path());

        let err = gw.synthesize_and_play("reply").await.unwrap_err();

        assert!(matches!(err, SynthesisError::Playback(PlaybackError::NoDevice)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn synthesizer_failure_never_reaches_sink() {
        let dir = tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let gw = gateway(Arc::new(FailingSynth), Arc::clone(&sink), dir.path());

        let err = gw.synthesize_and_play("reply").await.unwrap_err();

        assert!(matches!(err, SynthesisError::Timeout));
        assert!(sink.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_text_is_rejected() {
        let dir = tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let gw = gateway(Arc::new(FixedSynth(vec![1])), sink, dir.path());

        assert!(matches!(
            gw.synthesize_and_play("  \n").await,
            Err(SynthesisError::EmptyText)
        ));
    }

    #[tokio::test]
    async fn empty_audio_is_an_error() {
        let dir = tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let gw = gateway(Arc::new(FixedSynth(Vec::new())), Arc::clone(&sink), dir.path());

        assert!(matches!(
            gw.synthesize_and_play("reply").await,
            Err(SynthesisError::EmptyAudio)
        ));
        assert!(sink.seen.lock().unwrap().is_empty());
    }
}
