//! Speaker playback of synthesized speech.
//!
//! [`AudioSink`] is the hand-off point between speech synthesis and the
//! speakers: it reads an encoded file and returns as soon as it no longer
//! needs that file.  [`SpeakerSink`] decodes MP3 with `minimp3` and plays it
//! on the default output device from a detached thread, so the reply keeps
//! sounding while the caller deletes the file and moves on.

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleRate;
use thiserror::Error;

// ---------------------------------------------------------------------------
// PlaybackError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("could not read audio file: {0}")]
    Io(#[from] std::io::Error),

    #[error("MP3 decode error: {0}")]
    Decode(String),

    #[error("no output device available")]
    NoDevice,

    #[error("no output config supports {channels} ch @ {sample_rate} Hz")]
    UnsupportedConfig { channels: u16, sample_rate: u32 },

    #[error("output stream error: {0}")]
    Stream(String),
}

// ---------------------------------------------------------------------------
// AudioSink trait
// ---------------------------------------------------------------------------

/// Destination for encoded speech audio.
///
/// `play_file` must return once the file at `path` may be deleted; playback
/// itself may continue afterwards.
pub trait AudioSink: Send + Sync {
    fn play_file(&self, path: &Path) -> Result<(), PlaybackError>;
}

// ---------------------------------------------------------------------------
// DecodedAudio
// ---------------------------------------------------------------------------

/// Interleaved PCM decoded from an MP3 stream.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration(&self) -> Duration {
        let rate = self.sample_rate.max(1) as u64;
        Duration::from_millis(self.frames() as u64 * 1000 / rate)
    }
}

/// Decode MP3 bytes into interleaved `f32` samples.
///
/// The format of the first frame is taken as the format of the stream.
pub fn decode_mp3(data: &[u8]) -> Result<DecodedAudio, PlaybackError> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(data));
    let mut samples = Vec::new();
    let mut format: Option<(u32, u16)> = None;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if format.is_none() {
                    format = Some((frame.sample_rate as u32, frame.channels as u16));
                }
                samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
            }
            Err(minimp3::Error::SkippedData) => continue,
            Err(minimp3::Error::Eof) | Err(minimp3::Error::InsufficientData) => break,
            Err(e) => return Err(PlaybackError::Decode(e.to_string())),
        }
    }

    let (sample_rate, channels) =
        format.ok_or_else(|| PlaybackError::Decode("no MP3 frames found".into()))?;

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

// ---------------------------------------------------------------------------
// SpeakerSink
// ---------------------------------------------------------------------------

/// Plays MP3 files on the default output device.
#[derive(Debug, Default, Clone)]
pub struct SpeakerSink;

impl SpeakerSink {
    pub fn new() -> Self {
        Self
    }
}

impl AudioSink for SpeakerSink {
    fn play_file(&self, path: &Path) -> Result<(), PlaybackError> {
        let data = std::fs::read(path)?;
        let audio = decode_mp3(&data)?;

        if cpal::default_host().default_output_device().is_none() {
            return Err(PlaybackError::NoDevice);
        }

        log::debug!(
            "playback: {} frames @ {} Hz, {} ch",
            audio.frames(),
            audio.sample_rate,
            audio.channels
        );

        std::thread::Builder::new()
            .name("tts-playback".into())
            .spawn(move || {
                if let Err(e) = play_blocking(audio) {
                    log::error!("playback: {e}");
                }
            })?;

        Ok(())
    }
}

/// Play `audio` to completion on the current thread.
fn play_blocking(audio: DecodedAudio) -> Result<(), PlaybackError> {
    let device = cpal::default_host()
        .default_output_device()
        .ok_or(PlaybackError::NoDevice)?;

    let rate = SampleRate(audio.sample_rate);
    let supports = |c: &cpal::SupportedStreamConfigRange, channels: u16| {
        c.channels() == channels && c.min_sample_rate() <= rate && c.max_sample_rate() >= rate
    };

    let supported = device
        .supported_output_configs()
        .map_err(|e| PlaybackError::Stream(e.to_string()))?
        .find(|c| supports(c, audio.channels))
        .or_else(|| {
            device
                .supported_output_configs()
                .ok()?
                .find(|c| supports(c, 2) || supports(c, 1))
        })
        .ok_or(PlaybackError::UnsupportedConfig {
            channels: audio.channels,
            sample_rate: audio.sample_rate,
        })?;

    let config = supported.with_sample_rate(rate).config();
    let out_channels = config.channels as usize;
    let src_channels = audio.channels.max(1) as usize;
    let total_frames = audio.frames();
    let expected = audio.duration();

    let samples = Arc::new(audio.samples);
    let position = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicBool::new(false));

    let stream = {
        let samples = Arc::clone(&samples);
        let position = Arc::clone(&position);
        let finished = Arc::clone(&finished);

        device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for out in data.chunks_mut(out_channels) {
                        let frame = position.load(Ordering::Relaxed);
                        if frame >= total_frames {
                            finished.store(true, Ordering::Relaxed);
                            out.fill(0.0);
                            continue;
                        }
                        let src = &samples[frame * src_channels..(frame + 1) * src_channels];
                        write_frame(src, out);
                        position.store(frame + 1, Ordering::Relaxed);
                    }
                },
                |err| log::error!("playback: cpal stream error: {err}"),
                None,
            )
            .map_err(|e| PlaybackError::Stream(e.to_string()))?
    };

    stream
        .play()
        .map_err(|e| PlaybackError::Stream(e.to_string()))?;

    let deadline = Instant::now() + expected + Duration::from_millis(500);
    while !finished.load(Ordering::Relaxed) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }
    // let the device drain its last buffer
    std::thread::sleep(Duration::from_millis(100));

    drop(stream);
    log::debug!("playback: complete");
    Ok(())
}

/// Map one source frame onto one output frame with a different channel
/// count.
fn write_frame(src: &[f32], out: &mut [f32]) {
    if src.len() == out.len() {
        out.copy_from_slice(src);
    } else if out.len() == 1 {
        out[0] = src.iter().sum::<f32>() / src.len() as f32;
    } else {
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = src[i.min(src.len() - 1)];
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_not_decodable() {
        let err = decode_mp3(b"definitely not an mp3 stream").unwrap_err();
        assert!(matches!(err, PlaybackError::Decode(_)));
    }

    #[test]
    fn empty_input_is_not_decodable() {
        assert!(decode_mp3(&[]).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let sink = SpeakerSink::new();
        let err = sink
            .play_file(Path::new("/nonexistent/output.mp3"))
            .unwrap_err();
        assert!(matches!(err, PlaybackError::Io(_)));
    }

    #[test]
    fn duration_from_frames() {
        let audio = DecodedAudio {
            samples: vec![0.0; 48_000],
            sample_rate: 24_000,
            channels: 2,
        };
        assert_eq!(audio.frames(), 24_000);
        assert_eq!(audio.duration(), Duration::from_secs(1));
    }

    #[test]
    fn mono_source_fills_stereo_output() {
        let mut out = [0.0; 2];
        write_frame(&[0.25], &mut out);
        assert_eq!(out, [0.25, 0.25]);
    }

    #[test]
    fn stereo_source_averages_into_mono_output() {
        let mut out = [0.0; 1];
        write_frame(&[0.5, -0.5], &mut out);
        assert_eq!(out, [0.0]);
    }

    #[test]
    fn sink_is_object_safe() {
        let _: Box<dyn AudioSink> = Box::new(SpeakerSink::new());
    }
}
