//! Audio playback to speakers

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use super::Player;
use crate::{Error, Result};

/// Sample rate for playback (matches common TTS output)
pub const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Cue tone: 880 Hz for 150 ms
const CUE_FREQUENCY: f32 = 880.0;
const CUE_SECONDS: f32 = 0.15;

/// Plays audio to the default output device
pub struct AudioPlayback {
    config: StreamConfig,
}

impl AudioPlayback {
    /// Create a new audio playback instance
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
            })
            .or_else(|| {
                // Fallback: try stereo
                device.supported_output_configs().ok()?.find(|c| {
                    c.channels() == 2
                        && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                        && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
                })
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = PLAYBACK_SAMPLE_RATE,
            channels = config.channels,
            "audio playback initialized"
        );

        Ok(Self { config })
    }

    /// Play raw samples (f32, mono, [`PLAYBACK_SAMPLE_RATE`])
    ///
    /// # Errors
    ///
    /// Returns error if playback fails
    pub async fn play_samples(&mut self, samples: Vec<f32>) -> Result<()> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || play_samples_blocking(&config, samples))
            .await
            .map_err(|e| Error::Audio(e.to_string()))?
    }
}

#[async_trait(?Send)]
impl Player for AudioPlayback {
    async fn play(&mut self, mp3: &[u8]) -> Result<()> {
        let samples = decode_mp3(mp3)?;
        self.play_samples(samples).await
    }

    async fn cue(&mut self) -> Result<()> {
        self.play_samples(cue_tone(PLAYBACK_SAMPLE_RATE)).await
    }
}

/// Short sine beep used to cue the actor
#[must_use]
pub fn cue_tone(sample_rate: u32) -> Vec<f32> {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let num_samples = (sample_rate as f32 * CUE_SECONDS) as usize;

    #[allow(clippy::cast_precision_loss)]
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * CUE_FREQUENCY * t).sin() * 0.3
        })
        .collect()
}

/// Play samples in a blocking manner
fn play_samples_blocking(config: &StreamConfig, samples: Vec<f32>) -> Result<()> {
    if samples.is_empty() {
        return Ok(());
    }

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device".to_string()))?;

    let channels = config.channels as usize;
    let sample_count = samples.len();

    let samples = Arc::new(samples);
    let position = Arc::new(Mutex::new(0usize));
    let finished = Arc::new(Mutex::new(false));

    let samples_clone = Arc::clone(&samples);
    let position_clone = Arc::clone(&position);
    let finished_clone = Arc::clone(&finished);

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let Ok(mut pos) = position_clone.lock() else {
                    return;
                };

                for frame in data.chunks_mut(channels) {
                    let sample = samples_clone.get(*pos).copied().unwrap_or_else(|| {
                        if let Ok(mut done) = finished_clone.lock() {
                            *done = true;
                        }
                        0.0
                    });

                    for out in frame.iter_mut() {
                        *out = sample;
                    }

                    if *pos < samples_clone.len() {
                        *pos += 1;
                    }
                }
            },
            |err| {
                tracing::error!(error = %err, "audio playback error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    // Wait for playback to finish
    let duration_ms = (sample_count as u64 * 1000) / u64::from(PLAYBACK_SAMPLE_RATE);
    let start = Instant::now();
    let timeout = Duration::from_millis(duration_ms + 500);

    while !finished.lock().map(|done| *done).unwrap_or(true) {
        if start.elapsed() > timeout {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    // Small delay to ensure audio finishes
    std::thread::sleep(Duration::from_millis(100));

    drop(stream);
    tracing::debug!(samples = sample_count, "playback complete");

    Ok(())
}

/// Decode MP3 bytes to mono f32 samples at [`PLAYBACK_SAMPLE_RATE`]
fn decode_mp3(mp3_data: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut source_rate = PLAYBACK_SAMPLE_RATE;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if let Ok(rate @ 1..) = u32::try_from(frame.sample_rate) {
                    source_rate = rate;
                }
                // Convert i16 samples to f32 and handle stereo to mono
                if frame.channels == 2 {
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right =
                            f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    if source_rate != PLAYBACK_SAMPLE_RATE {
        tracing::debug!(from = source_rate, to = PLAYBACK_SAMPLE_RATE, "resampling clip");
    }
    Ok(resample(&samples, source_rate, PLAYBACK_SAMPLE_RATE))
}

/// Linear interpolation from `from` Hz to `to` Hz
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn resample(samples: &[f32], from: u32, to: u32) -> Vec<f32> {
    if from == to || samples.is_empty() {
        return samples.to_vec();
    }

    let step = f64::from(from) / f64::from(to);
    let len = (samples.len() as f64 / step) as usize;
    (0..len)
        .map_while(|i| {
            let pos = i as f64 * step;
            let idx = pos as usize;
            let a = *samples.get(idx)?;
            let b = samples.get(idx + 1).copied().unwrap_or(a);
            Some((b - a).mul_add((pos - idx as f64) as f32, a))
        })
        .collect()
}
