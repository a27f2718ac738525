//! Voice collaborators
//!
//! The scene core only sees the traits below. Concrete adapters: HTTP
//! speech APIs for synthesis and recognition, cpal for the microphone and
//! speakers.

mod capture;
mod playback;
mod silence;
mod stt;
mod tts;

use async_trait::async_trait;

pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
pub use playback::{AudioPlayback, PLAYBACK_SAMPLE_RATE, cue_tone};
pub use silence::{calculate_energy, is_silent, trim_silence};
pub use stt::{SpeechToText, SttProvider};
pub use tts::{TextToSpeech, TtsProvider};

use crate::Result;

/// Turns text into a playable clip
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` spoken in `language`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Synthesis`] if the backend fails
    async fn synthesize(&self, text: &str, language: &str) -> Result<Vec<u8>>;
}

/// Turns a recorded clip into text
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Transcribe WAV audio spoken in `language`
    ///
    /// Silence may legitimately come back as an empty string.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Recognition`] if the backend fails
    async fn transcribe(&self, wav: &[u8], language: &str) -> Result<String>;
}

/// Records a fixed-length clip
#[async_trait(?Send)]
pub trait Microphone {
    /// Record for `duration` and return mono samples in `[-1.0, 1.0]`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Audio`] if the device fails
    async fn record(&mut self, duration: std::time::Duration) -> Result<Vec<f32>>;

    /// Sample rate of the recorded samples
    fn sample_rate(&self) -> u32;
}

/// Plays synthesized clips
#[async_trait(?Send)]
pub trait Player {
    /// Play an MP3 clip to completion
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Audio`] if decoding or playback fails
    async fn play(&mut self, mp3: &[u8]) -> Result<()>;

    /// Short tone telling the actor to start
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Audio`] if playback fails
    async fn cue(&mut self) -> Result<()>;
}
