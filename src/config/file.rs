//! TOML configuration file loading
//!
//! Supports `~/.config/rehearsal/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RehearsalConfigFile {
    /// Scene playback settings
    #[serde(default)]
    pub scene: SceneFileConfig,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Scene playback settings
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SceneFileConfig {
    /// Character suggested for the system to voice (e.g. "JULIETTE")
    pub ai_character: Option<String>,

    /// Minimum similarity (0-100) for a line to pass
    pub threshold: Option<i32>,

    /// Language code for synthesis and recognition (e.g. "fr")
    pub language: Option<String>,

    /// "performance" or "rehearsal"
    pub mode: Option<String>,

    /// Seconds recorded for each actor line
    pub record_seconds: Option<f32>,

    /// Pause before recording, in seconds
    pub cue_delay_seconds: Option<f32>,

    /// Chain lines without the cue pause
    pub direct: Option<bool>,

    /// Play a short tone before recording
    pub cue_beep: Option<bool>,

    /// Directory for synthesized clips
    pub cache_dir: Option<String>,

    /// Lines synthesized at once during pre-generation
    pub pregenerate_concurrency: Option<usize>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct VoiceFileConfig {
    /// STT provider ("whisper" or "deepgram")
    pub stt_provider: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// TTS provider ("openai" or "elevenlabs")
    pub tts_provider: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f64>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub elevenlabs: Option<String>,
    pub deepgram: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `RehearsalConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> RehearsalConfigFile {
    config_file_path().map_or_else(RehearsalConfigFile::default, |path| load_from(&path))
}

/// Load a TOML config file from `path`, falling back to defaults
pub fn load_from(path: &Path) -> RehearsalConfigFile {
    if !path.exists() {
        return RehearsalConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                RehearsalConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            RehearsalConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/rehearsal/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("rehearsal").join("config.toml"))
}
