//! Core transcription trait and the Whisper API implementation.
//!
//! # Overview
//!
//! [`TranscriptionGateway`] is the interface used by the turn pipeline.  It
//! is object-safe and `Send + Sync` so it can be held behind an
//! `Arc<dyn TranscriptionGateway>`.
//!
//! [`WhisperApiTranscriber`] uploads the clip to an OpenAI-compatible
//! `/v1/audio/transcriptions` endpoint.  The clip is written to a transient
//! WAV file first; that file is removed when the call returns, whatever the
//! outcome.
//!
//! [`MockTranscriber`] (available under `#[cfg(test)]`) returns a
//! pre-configured response and counts calls.

use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use thiserror::Error;

use crate::audio::{AudioClip, ClipError};
use crate::config::SttConfig;
use crate::credential::Credential;

// ---------------------------------------------------------------------------
// TranscriptionError
// ---------------------------------------------------------------------------

/// All errors that can arise while turning a clip into text.
#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// The clip has zero duration; such clips must be filtered upstream.
    #[error("audio clip is empty")]
    EmptyClip,

    /// The clip could not be written as WAV.
    #[error("could not encode audio: {0}")]
    Encode(#[from] ClipError),

    /// The transient file could not be read back.
    #[error("transient audio file error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport or connection error.
    #[error("transcription request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("transcription request timed out")]
    Timeout,

    /// Non-success HTTP status from the service.
    #[error("transcription service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not the expected JSON.
    #[error("failed to parse transcription response: {0}")]
    Parse(String),

    /// The service heard nothing it could transcribe.
    #[error("transcription returned no text")]
    EmptyTranscript,

    /// Background encode task failed to run.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for TranscriptionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TranscriptionError::Timeout
        } else {
            TranscriptionError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// TranscriptionGateway trait
// ---------------------------------------------------------------------------

/// Speech-to-text backend.
///
/// # Contract
///
/// - `clip.duration_seconds()` must be greater than zero.
/// - The clip is consumed; any encoded copy made for transport is gone by
///   the time the call returns.
#[async_trait]
pub trait TranscriptionGateway: Send + Sync {
    async fn transcribe(&self, clip: AudioClip) -> Result<String, TranscriptionError>;
}

// Compile-time assertion: Box<dyn TranscriptionGateway> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn TranscriptionGateway>) {}
};

// ---------------------------------------------------------------------------
// WhisperApiTranscriber
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Transcribes clips with an OpenAI-compatible Whisper endpoint.
pub struct WhisperApiTranscriber {
    client: reqwest::Client,
    base_url: String,
    model: String,
    language: String,
    credential: Credential,
    scratch_dir: Option<PathBuf>,
}

impl WhisperApiTranscriber {
    /// Build from config.  `scratch_dir` is where the transient WAV is
    /// written; `None` uses the system temp directory.
    pub fn from_config(
        config: &SttConfig,
        credential: Credential,
        scratch_dir: Option<PathBuf>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            language: config.language.clone(),
            credential,
            scratch_dir,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/audio/transcriptions", self.base_url)
    }
}

#[async_trait]
impl TranscriptionGateway for WhisperApiTranscriber {
    async fn transcribe(&self, clip: AudioClip) -> Result<String, TranscriptionError> {
        if clip.is_empty() {
            return Err(TranscriptionError::EmptyClip);
        }

        log::debug!("stt: encoding {:.2}s clip", clip.duration_seconds());

        // ── 1. Write the transient WAV (blocking → thread pool) ──────────
        let scratch_dir = self.scratch_dir.clone();
        let artifact = tokio::task::spawn_blocking(move || clip.export_wav(scratch_dir.as_deref()))
            .await
            .map_err(|e| TranscriptionError::Internal(e.to_string()))??;

        // `artifact` is deleted when it goes out of scope below, on every
        // return path.
        let bytes = tokio::fs::read(artifact.path()).await?;

        // ── 2. Upload ────────────────────────────────────────────────────
        let part = Part::bytes(bytes)
            .file_name("input.wav")
            .mime_str("audio/wav")
            .map_err(|e| TranscriptionError::Request(e.to_string()))?;
        let form = Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", self.language.clone());

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.credential.expose())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("stt: service returned {status}");
            return Err(TranscriptionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let text = parse_transcript(&body)?;

        log::debug!("stt: transcript = {text:?}");
        Ok(text)
    }
}

/// Extract the transcript from a `{"text": "…"}` response body.
pub(crate) fn parse_transcript(body: &str) -> Result<String, TranscriptionError> {
    let parsed: TranscriptionResponse =
        serde_json::from_str(body).map_err(|e| TranscriptionError::Parse(e.to_string()))?;

    let text = parsed.text.trim();
    if text.is_empty() {
        return Err(TranscriptionError::EmptyTranscript);
    }
    Ok(text.to_string())
}

// ---------------------------------------------------------------------------
// MockTranscriber  (test-only)
// ---------------------------------------------------------------------------

/// Deterministic stub for unit tests; no network access.
#[cfg(test)]
pub struct MockTranscriber {
    response: Result<String, String>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockTranscriber {
    /// Always succeeds with `text`.
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Always fails with a `Request` error carrying `message`.
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            response: Err(message.into()),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl TranscriptionGateway for MockTranscriber {
    async fn transcribe(&self, clip: AudioClip) -> Result<String, TranscriptionError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if clip.is_empty() {
            return Err(TranscriptionError::EmptyClip);
        }
        self.response
            .clone()
            .map_err(TranscriptionError::Request)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_transcriber(base_url: &str, scratch_dir: Option<PathBuf>) -> WhisperApiTranscriber {
        let config = SttConfig {
            base_url: base_url.into(),
            timeout_secs: 5,
            ..SttConfig::default()
        };
        WhisperApiTranscriber::from_config(
            &config,
            Credential::parse("sk-test").unwrap(),
            scratch_dir,
        )
    }

    #[test]
    fn endpoint_path() {
        let stt = make_transcriber("https://api.openai.com/", None);
        assert_eq!(stt.endpoint(), "https://api.openai.com/v1/audio/transcriptions");
    }

    #[test]
    fn parses_text_field() {
        assert_eq!(parse_transcript(r#"{"text":" 안녕 "}"#).unwrap(), "안녕");
    }

    #[test]
    fn blank_text_is_empty_transcript() {
        assert!(matches!(
            parse_transcript(r#"{"text":"  "}"#),
            Err(TranscriptionError::EmptyTranscript)
        ));
    }

    #[test]
    fn non_json_is_parse_error() {
        assert!(matches!(
            parse_transcript("<html>bad gateway</html>"),
            Err(TranscriptionError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn empty_clip_is_rejected_before_any_io() {
        let dir = tempdir().unwrap();
        let stt = make_transcriber("http://127.0.0.1:9", Some(dir.path().to_path_buf()));

        let err = stt.transcribe(AudioClip::empty(16_000)).await.unwrap_err();
        assert!(matches!(err, TranscriptionError::EmptyClip));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    /// The transient WAV must be gone even when the upload fails.
    #[tokio::test]
    async fn transient_wav_removed_after_failed_upload() {
        let dir = tempdir().unwrap();
        let stt = make_transcriber("http://127.0.0.1:9", Some(dir.path().to_path_buf()));

        let clip = AudioClip::new(vec![0.0; 16_000], 16_000);
        let result = stt.transcribe(clip).await;

        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn mock_counts_calls() {
        let mock = MockTranscriber::ok("안녕");
        let text = mock
            .transcribe(AudioClip::new(vec![0.0; 10], 10))
            .await
            .unwrap();
        assert_eq!(text, "안녕");
        assert_eq!(mock.calls(), 1);
    }
}
