//! Configuration management for the rehearsal partner
//!
//! Every setting resolves as env > TOML file > default.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::scene::{DEFAULT_CONCURRENCY, Mode};
use crate::voice::{SttProvider, TtsProvider};

use file::RehearsalConfigFile;

/// Character voiced by the system when nothing else says otherwise
pub const DEFAULT_AI_CHARACTER: &str = "JULIETTE";

/// Minimum similarity for a line to pass
pub const DEFAULT_THRESHOLD: i32 = 40;

/// Language for synthesis and recognition
pub const DEFAULT_LANGUAGE: &str = "fr";

/// Seconds recorded per actor line
pub const DEFAULT_RECORD_SECONDS: f32 = 6.0;

/// Pause before recording when not in direct mode
pub const DEFAULT_CUE_DELAY_SECONDS: f32 = 2.0;

/// Rehearsal configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Character suggested for the system to voice, canonical form
    pub ai_character: String,

    /// Minimum similarity (0-100) for a line to pass
    pub threshold: i32,

    /// Language code for synthesis and recognition
    pub language: String,

    /// Feedback mode
    pub mode: Mode,

    /// How long each actor line is recorded
    pub record_duration: Duration,

    /// Pause between the cue and the recording
    pub cue_delay: Duration,

    /// Skip the cue pause
    pub direct: bool,

    /// Play a tone before recording
    pub cue_beep: bool,

    /// Directory for synthesized clips
    pub cache_dir: PathBuf,

    /// Lines synthesized at once during pre-generation
    pub pregenerate_concurrency: usize,

    /// Speech recognition
    pub stt: SttConfig,

    /// Speech synthesis
    pub tts: TtsConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// Speech recognition configuration
#[derive(Debug, Clone)]
pub struct SttConfig {
    pub provider: SttProvider,

    /// Model identifier (e.g. "whisper-1", "nova-2")
    pub model: String,
}

/// Speech synthesis configuration
#[derive(Debug, Clone)]
pub struct TtsConfig {
    pub provider: TtsProvider,

    /// Model identifier (e.g. "tts-1", "eleven_multilingual_v2")
    pub model: String,

    /// Voice identifier
    pub voice: String,

    /// Speed multiplier (0.25 to 4.0, `OpenAI` only)
    pub speed: f64,
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (Whisper and TTS)
    pub openai: Option<SecretString>,

    /// `ElevenLabs` API key (optional TTS)
    pub elevenlabs: Option<SecretString>,

    /// `Deepgram` API key (optional STT)
    pub deepgram: Option<SecretString>,
}

impl Default for Config {
    fn default() -> Self {
        Self::resolve(RehearsalConfigFile::default(), |_| None)
    }
}

/// Default cache directory: `~/.cache/rehearsal/tts/`
fn default_cache_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".cache/rehearsal/tts"),
        |d| d.cache_dir().join("rehearsal").join("tts"),
    )
}

impl Config {
    /// Load configuration from the environment and the TOML file
    #[must_use]
    pub fn load() -> Self {
        let fc = file::load_config_file();
        Self::resolve(fc, |key| std::env::var(key).ok())
    }

    /// Resolve settings from a parsed file and an environment lookup
    ///
    /// Unparseable values are logged and ignored.
    pub fn resolve(fc: RehearsalConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let scene = fc.scene;
        let voice = fc.voice;

        let ai_character = env("REHEARSAL_AI_CHARACTER")
            .or(scene.ai_character)
            .map(|c| crate::script::canonical_speaker(&c))
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_AI_CHARACTER.to_string());

        let threshold = parsed(&env, "REHEARSAL_THRESHOLD")
            .or(scene.threshold)
            .unwrap_or(DEFAULT_THRESHOLD);

        let language = env("REHEARSAL_LANGUAGE")
            .or(scene.language)
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        let mode = env("REHEARSAL_MODE")
            .or(scene.mode)
            .and_then(|m| parse_or_warn("mode", &m))
            .unwrap_or_default();

        let record_seconds = parsed(&env, "REHEARSAL_RECORD_SECONDS")
            .or(scene.record_seconds)
            .filter(|s: &f32| s.is_finite() && *s > 0.0)
            .unwrap_or(DEFAULT_RECORD_SECONDS);

        let cue_delay_seconds = parsed(&env, "REHEARSAL_CUE_DELAY")
            .or(scene.cue_delay_seconds)
            .filter(|s: &f32| s.is_finite() && *s >= 0.0)
            .unwrap_or(DEFAULT_CUE_DELAY_SECONDS);

        let direct = env("REHEARSAL_DIRECT")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .or(scene.direct)
            .unwrap_or(false);

        let cache_dir = env("REHEARSAL_CACHE_DIR")
            .or(scene.cache_dir)
            .map_or_else(default_cache_dir, PathBuf::from);

        let stt_provider: SttProvider = env("REHEARSAL_STT_PROVIDER")
            .or(voice.stt_provider)
            .and_then(|p| parse_or_warn("STT provider", &p))
            .unwrap_or_default();
        let default_stt_model = match stt_provider {
            SttProvider::Whisper => "whisper-1",
            SttProvider::Deepgram => "nova-2",
        };
        let stt = SttConfig {
            provider: stt_provider,
            model: env("REHEARSAL_STT_MODEL")
                .or(voice.stt_model)
                .unwrap_or_else(|| default_stt_model.to_string()),
        };

        let tts_provider: TtsProvider = env("REHEARSAL_TTS_PROVIDER")
            .or(voice.tts_provider)
            .and_then(|p| parse_or_warn("TTS provider", &p))
            .unwrap_or_default();
        let tts = TtsConfig {
            provider: tts_provider,
            model: env("REHEARSAL_TTS_MODEL")
                .or(voice.tts_model)
                .unwrap_or_else(|| tts_provider.default_model().to_string()),
            voice: env("REHEARSAL_TTS_VOICE")
                .or(voice.tts_voice)
                .unwrap_or_else(|| tts_provider.default_voice().to_string()),
            speed: voice.tts_speed.unwrap_or(1.0).clamp(0.25, 4.0),
        };

        let api_keys = ApiKeys {
            openai: env("OPENAI_API_KEY")
                .or(fc.api_keys.openai)
                .map(SecretString::from),
            elevenlabs: env("ELEVENLABS_API_KEY")
                .or(fc.api_keys.elevenlabs)
                .map(SecretString::from),
            deepgram: env("DEEPGRAM_API_KEY")
                .or(fc.api_keys.deepgram)
                .map(SecretString::from),
        };

        Self {
            ai_character,
            threshold,
            language,
            mode,
            record_duration: Duration::from_secs_f32(record_seconds),
            cue_delay: Duration::from_secs_f32(cue_delay_seconds),
            direct,
            cue_beep: scene.cue_beep.unwrap_or(true),
            cache_dir,
            pregenerate_concurrency: scene
                .pregenerate_concurrency
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_CONCURRENCY),
            stt,
            tts,
            api_keys,
        }
    }
}

fn parsed<T: std::str::FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = env(key)?;
    let value = raw.trim().parse().ok();
    if value.is_none() {
        tracing::warn!(key, value = %raw, "ignoring unparseable environment value");
    }
    value
}

fn parse_or_warn<T>(what: &str, raw: &str) -> Option<T>
where
    T: std::str::FromStr<Err = String>,
{
    raw.parse()
        .map_err(|e| tracing::warn!(setting = what, error = %e, "ignoring invalid setting"))
        .ok()
}
