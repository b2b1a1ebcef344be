//! Microphone capture via `cpal`.
//!
//! [`Recorder`] wraps the cpal host/device lifecycle.  Call
//! [`Recorder::start`] to open the input stream; the returned [`Recording`]
//! accumulates mono samples until [`Recording::finish`] stops the stream and
//! yields an [`AudioClip`].

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use crate::audio::AudioClip;

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while setting up or running the audio capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

/// Default-input-device recorder.
///
/// ```rust,no_run
/// use voice_assistant::audio::Recorder;
///
/// let recorder = Recorder::new(120.0).unwrap();
/// let recording = recorder.start().unwrap();
/// // ... user speaks ...
/// let clip = recording.finish();
/// println!("{:.1}s captured", clip.duration_seconds());
/// ```
pub struct Recorder {
    device: cpal::Device,
    config: cpal::StreamConfig,
    sample_rate: u32,
    channels: u16,
    max_samples: usize,
}

impl Recorder {
    /// Open the system default input device.
    ///
    /// Recordings stop accumulating after `max_recording_secs`.
    pub fn new(max_recording_secs: f32) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

        let supported = device.default_input_config()?;

        let channels = supported.channels();
        let sample_rate = supported.sample_rate().0;
        let config: cpal::StreamConfig = supported.into();
        let max_samples = (max_recording_secs.max(0.0) * sample_rate as f32) as usize;

        Ok(Self {
            device,
            config,
            sample_rate,
            channels,
            max_samples,
        })
    }

    /// Start recording.  Dropping the returned [`Recording`] without calling
    /// `finish` discards the audio.
    pub fn start(&self) -> Result<Recording, CaptureError> {
        let samples = Arc::new(Mutex::new(Vec::with_capacity(self.sample_rate as usize * 10)));
        let sink = Arc::clone(&samples);
        let channels = self.channels;
        let max_samples = self.max_samples;

        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let mono = downmix_to_mono(data, channels);
                if let Ok(mut buf) = sink.lock() {
                    let room = max_samples.saturating_sub(buf.len());
                    buf.extend_from_slice(&mono[..mono.len().min(room)]);
                }
            },
            |err: cpal::StreamError| {
                log::error!("capture: cpal stream error: {err}");
            },
            None,
        )?;

        stream.play()?;
        log::debug!(
            "capture: recording at {} Hz, {} ch",
            self.sample_rate,
            self.channels
        );

        Ok(Recording {
            _stream: stream,
            samples,
            sample_rate: self.sample_rate,
        })
    }

    /// Native sample rate of the capture stream in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of interleaved channels delivered by the device.
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

// ---------------------------------------------------------------------------
// Recording
// ---------------------------------------------------------------------------

/// An in-progress recording.  Keeps the cpal stream alive.
pub struct Recording {
    _stream: cpal::Stream,
    samples: Arc<Mutex<Vec<f32>>>,
    sample_rate: u32,
}

impl Recording {
    /// Seconds captured so far.
    pub fn elapsed_secs(&self) -> f32 {
        let len = self.samples.lock().map(|buf| buf.len()).unwrap_or(0);
        len as f32 / self.sample_rate.max(1) as f32
    }

    /// Stop the stream and return everything captured.
    pub fn finish(self) -> AudioClip {
        let Recording {
            _stream,
            samples,
            sample_rate,
        } = self;
        drop(_stream);

        let samples = match samples.lock() {
            Ok(mut buf) => std::mem::take(&mut *buf),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        AudioClip::new(samples, sample_rate)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Average interleaved frames down to one channel.
pub fn downmix_to_mono(interleaved: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    let channels = channels as usize;
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
