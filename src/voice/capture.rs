//! Microphone capture for the actor's lines
//!
//! A take opens an input stream on the stored device and fills a shared
//! buffer for a fixed duration. The stream is owned by the take, so a take
//! abandoned halfway (Ctrl-C during a scene) stops recording at once.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};

use super::Microphone;
use crate::{Error, Result};

/// Capture rate; speech recognizers expect 16 kHz mono
pub const SAMPLE_RATE: u32 = 16000;

/// Default input device opened at [`SAMPLE_RATE`] mono
pub struct AudioCapture {
    device: Device,
    config: StreamConfig,
    heard: Arc<Mutex<Vec<f32>>>,
}

impl AudioCapture {
    /// Open the default input device
    ///
    /// # Errors
    ///
    /// Returns error if there is no input device or it cannot record 16 kHz mono
    pub fn new() -> Result<Self> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let rate = SampleRate(SAMPLE_RATE);
        let config = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1 && (c.min_sample_rate()..=c.max_sample_rate()).contains(&rate)
            })
            .ok_or_else(|| {
                Error::Audio(format!("input device cannot record {SAMPLE_RATE} Hz mono"))
            })?
            .with_sample_rate(rate)
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            "microphone ready"
        );

        Ok(Self {
            device,
            config,
            heard: Arc::default(),
        })
    }

    /// Start collecting samples
    ///
    /// Collection continues until the returned stream is dropped.
    ///
    /// # Errors
    ///
    /// Returns error if the input stream cannot be started
    pub fn listen(&self) -> Result<Stream> {
        let heard = Arc::clone(&self.heard);
        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut heard) = heard.lock() {
                        heard.extend_from_slice(data);
                    }
                },
                |err| tracing::error!(error = %err, "microphone stream error"),
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        Ok(stream)
    }

    /// Samples collected since the last drain
    #[must_use]
    pub fn drain(&self) -> Vec<f32> {
        self.heard
            .lock()
            .map(|mut heard| std::mem::take(&mut *heard))
            .unwrap_or_default()
    }

    fn forget(&self) {
        if let Ok(mut heard) = self.heard.lock() {
            heard.clear();
        }
    }
}

#[async_trait(?Send)]
impl Microphone for AudioCapture {
    async fn record(&mut self, duration: Duration) -> Result<Vec<f32>> {
        self.forget();
        let stream = self.listen()?;
        tracing::info!(seconds = duration.as_secs_f32(), "recording take");

        hold(stream, duration).await;

        let take = self.drain();
        tracing::debug!(samples = take.len(), "take recorded");
        Ok(take)
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }
}

/// Keep `stream` alive for `duration`
///
/// Dropping the future early releases the stream as well.
async fn hold<S>(stream: S, duration: Duration) {
    tokio::time::sleep(duration).await;
    drop(stream);
}

/// Encode a take as 16-bit mono WAV for the recognizers
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let wav_err = |e: hound::Error| Error::Audio(format!("WAV encoding failed: {e}"));
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut wav = std::io::Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    let mut writer = hound::WavWriter::new(&mut wav, spec).map_err(wav_err)?;
    for &sample in samples {
        writer.write_sample(to_pcm16(sample)).map_err(wav_err)?;
    }
    writer.finalize().map_err(wav_err)?;

    Ok(wav.into_inner())
}

/// `[-1.0, 1.0]` float to signed 16-bit, clamped
#[allow(clippy::cast_possible_truncation)]
fn to_pcm16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    struct Released(Arc<AtomicBool>);

    impl Drop for Released {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn wav_has_riff_header() {
        let wav = samples_to_wav(&[0.0, 0.5, -0.5], SAMPLE_RATE).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // 44 byte header + 3 samples of 2 bytes
        assert_eq!(wav.len(), 44 + 6);
    }

    #[tokio::test]
    async fn abandoned_take_releases_stream() {
        let released = Arc::new(AtomicBool::new(false));
        let take = hold(Released(Arc::clone(&released)), Duration::from_secs(60));

        let outcome = tokio::time::timeout(Duration::from_millis(10), take).await;
        assert!(outcome.is_err());
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn finished_take_releases_stream() {
        let released = Arc::new(AtomicBool::new(false));
        hold(Released(Arc::clone(&released)), Duration::ZERO).await;
        assert!(released.load(Ordering::SeqCst));
    }
}
