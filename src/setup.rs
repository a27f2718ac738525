//! Interactive first-run setup wizard (`rehearse setup`)

use std::path::{Path, PathBuf};

use dialoguer::{Confirm, Input, Select};

use crate::config::file::{RehearsalConfigFile, SceneFileConfig, VoiceFileConfig};
use crate::config::{DEFAULT_AI_CHARACTER, DEFAULT_LANGUAGE, DEFAULT_THRESHOLD};
use crate::voice::TtsProvider;

/// Run the interactive setup wizard
///
/// # Errors
///
/// Returns error if user input fails or config cannot be written
pub fn run_setup() -> anyhow::Result<()> {
    println!("Rehearsal Partner Setup\n");

    // Load existing config if present
    let existing = crate::config::file::load_config_file();
    let config_path = crate::config::file::config_file_path()
        .unwrap_or_else(|| PathBuf::from("~/.config/rehearsal/config.toml"));

    if config_path.exists() {
        println!("Existing config found at {}\n", config_path.display());
    }

    let mut api_keys = existing.api_keys;

    // 1. Speech synthesis
    let tts_providers = ["openai", "elevenlabs"];
    let tts_idx = select_default(
        "Voice for the other characters",
        &["OpenAI TTS", "ElevenLabs"],
        existing
            .voice
            .tts_provider
            .as_deref()
            .and_then(|p| tts_providers.iter().position(|&l| l.eq_ignore_ascii_case(p))),
    )?;
    let tts_provider = tts_providers[tts_idx];

    if tts_provider == "elevenlabs" {
        api_keys.elevenlabs = prompt_key("ElevenLabs", "ELEVENLABS_API_KEY", api_keys.elevenlabs)?;
    } else {
        api_keys.openai = prompt_key("OpenAI", "OPENAI_API_KEY", api_keys.openai)?;
    }

    // A voice saved for the other provider would not resolve
    let same_provider = existing
        .voice
        .tts_provider
        .as_deref()
        .is_some_and(|p| p.eq_ignore_ascii_case(tts_provider));
    let default_voice = existing
        .voice
        .tts_voice
        .clone()
        .filter(|_| same_provider)
        .unwrap_or_else(|| {
            tts_provider
                .parse::<TtsProvider>()
                .unwrap_or_default()
                .default_voice()
                .to_string()
        });
    let tts_voice: String = Input::new()
        .with_prompt("Voice identifier")
        .default(default_voice)
        .allow_empty(true)
        .interact_text()?;

    // 2. Speech recognition
    let stt_providers = ["whisper", "deepgram"];
    let stt_idx = select_default(
        "Recognition of your lines",
        &["OpenAI Whisper", "Deepgram"],
        existing
            .voice
            .stt_provider
            .as_deref()
            .and_then(|p| stt_providers.iter().position(|&l| l.eq_ignore_ascii_case(p))),
    )?;
    let stt_provider = stt_providers[stt_idx];

    if stt_provider == "deepgram" {
        api_keys.deepgram = prompt_key("Deepgram", "DEEPGRAM_API_KEY", api_keys.deepgram)?;
    } else if api_keys.openai.is_none() {
        api_keys.openai = prompt_key("OpenAI", "OPENAI_API_KEY", None)?;
    }

    // 3. Scene defaults
    let language: String = Input::new()
        .with_prompt("Language of your scripts")
        .default(
            existing
                .scene
                .language
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        )
        .interact_text()?;

    let ai_character: String = Input::new()
        .with_prompt("Character voiced by default")
        .default(
            existing
                .scene
                .ai_character
                .unwrap_or_else(|| DEFAULT_AI_CHARACTER.to_string()),
        )
        .interact_text()?;

    let threshold: i32 = Input::new()
        .with_prompt("Similarity needed to pass (0-100)")
        .default(existing.scene.threshold.unwrap_or(DEFAULT_THRESHOLD))
        .interact_text()?;

    let modes = ["performance", "rehearsal"];
    let mode_idx = select_default(
        "Default mode",
        &["Performance (score at the end)", "Rehearsal (feedback on every line)"],
        existing
            .scene
            .mode
            .as_deref()
            .and_then(|m| modes.iter().position(|&l| l.eq_ignore_ascii_case(m))),
    )?;

    let direct = Confirm::new()
        .with_prompt("Chain lines without a pause before your cue?")
        .default(existing.scene.direct.unwrap_or(false))
        .interact()?;

    // 4. Build and write config
    let config_file = RehearsalConfigFile {
        scene: SceneFileConfig {
            ai_character: Some(ai_character),
            threshold: Some(threshold),
            language: Some(language),
            mode: Some(modes[mode_idx].to_string()),
            direct: Some(direct),
            ..existing.scene
        },
        voice: VoiceFileConfig {
            stt_provider: Some(stt_provider.to_string()),
            tts_provider: Some(tts_provider.to_string()),
            tts_voice: Some(tts_voice).filter(|v| !v.is_empty()),
            ..existing.voice
        },
        api_keys,
    };

    write_config(&config_path, &config_file)?;
    println!("\nConfig written to {}", config_path.display());
    println!("\nSetup complete! Run `rehearse test-tts` to check the voice,");
    println!("then `rehearse run <script>` to start a scene.");

    Ok(())
}

fn select_default(prompt: &str, items: &[&str], current: Option<usize>) -> anyhow::Result<usize> {
    Ok(Select::new()
        .with_prompt(prompt)
        .items(items)
        .default(current.unwrap_or(0))
        .interact()?)
}

/// Ask for an API key, keeping the existing one on blank input
fn prompt_key(
    service: &str,
    env_hint: &str,
    existing: Option<String>,
) -> anyhow::Result<Option<String>> {
    let prompt = match existing.as_deref() {
        Some(k) => format!("{service} API key (current: {}, leave blank to keep)", mask(k)),
        None => format!("{service} API key ({env_hint})"),
    };

    let input: String = Input::new()
        .with_prompt(&prompt)
        .allow_empty(true)
        .interact_text()?;

    Ok(if input.trim().is_empty() {
        existing
    } else {
        Some(input.trim().to_string())
    })
}

fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "****".to_string()
    }
}

/// Serialize and write the config file
fn write_config(path: &Path, config: &RehearsalConfigFile) -> anyhow::Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, serialize_config(config)?)?;
    Ok(())
}

/// Serialize config to TOML; unset fields are left out
fn serialize_config(config: &RehearsalConfigFile) -> anyhow::Result<String> {
    Ok(toml::to_string_pretty(config)?)
}
