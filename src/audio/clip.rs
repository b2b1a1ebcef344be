//! Captured audio clips and their transport encoding.
//!
//! An [`AudioClip`] is mono `f32` PCM plus its sample rate.  It stays in
//! memory until a gateway needs it on disk; [`AudioClip::export_wav`] then
//! writes a 16-bit PCM WAV into a [`NamedTempFile`] that is removed as soon
//! as the handle is dropped, on every exit path.

use std::io::{Cursor, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ClipError
// ---------------------------------------------------------------------------

/// Errors raised while encoding a clip.
#[derive(Debug, Error)]
pub enum ClipError {
    #[error("WAV encoding failed: {0}")]
    Wav(#[from] hound::Error),

    #[error("could not write transient audio file: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// AudioClip
// ---------------------------------------------------------------------------

/// A finished recording: mono samples in `[-1.0, 1.0]` at `sample_rate` Hz.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// A clip with no audio, as delivered when nothing new was recorded.
    pub fn empty(sample_rate: u32) -> Self {
        Self::new(Vec::new(), sample_rate)
    }

    /// Length of the clip in seconds; `0.0` for an empty clip or a zero
    /// sample rate.
    ///
    /// ```
    /// use voice_assistant::audio::AudioClip;
    ///
    /// let clip = AudioClip::new(vec![0.0; 48_000], 16_000);
    /// assert_eq!(clip.duration_seconds(), 3.0);
    /// ```
    pub fn duration_seconds(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// `true` when the clip has zero duration.
    pub fn is_empty(&self) -> bool {
        self.duration_seconds() <= 0.0
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Encode as mono 16-bit PCM WAV in memory.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, ClipError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            for &sample in &self.samples {
                let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                writer.write_sample(sample_i16)?;
            }
            writer.finalize()?;
        }

        Ok(cursor.into_inner())
    }

    /// Write the clip as `input-*.wav` into `dir` (system temp dir when
    /// `None`).  The file lives exactly as long as the returned handle.
    pub fn export_wav(&self, dir: Option<&Path>) -> Result<NamedTempFile, ClipError> {
        let bytes = self.to_wav_bytes()?;

        let mut builder = tempfile::Builder::new();
        builder.prefix("input-").suffix(".wav");
        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        file.write_all(&bytes)?;
        file.flush()?;
        Ok(file)
    }
}

// ---------------------------------------------------------------------------
// CaptureEvent
// ---------------------------------------------------------------------------

/// A clip as handed over by the capture source.
///
/// `id` increases by one for every recording the source produces, so a
/// re-delivered event can be told apart from a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureEvent {
    pub id: u64,
    pub clip: AudioClip,
}

impl CaptureEvent {
    pub fn new(id: u64, clip: AudioClip) -> Self {
        Self { id, clip }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
