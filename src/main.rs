use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Select};
use tracing_subscriber::EnvFilter;

use rehearsal_partner::matching;
use rehearsal_partner::voice::{
    AudioCapture, AudioPlayback, PLAYBACK_SAMPLE_RATE, Player, SpeechToText, TextToSpeech,
    Synthesizer, calculate_energy, is_silent,
};
use rehearsal_partner::{
    AudioCache, Config, Feedback, Line, Mode, Rehearsal, RehearsalOptions, RunState, Scene,
    SceneObserver, SceneSettings, SceneSummary, Script,
};

/// Rehearse - a scene partner that gives you your cues
#[derive(Parser)]
#[command(name = "rehearse", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play a scene, voicing every character but yours
    Run {
        /// Script file (.json, .txt or .docx)
        script: PathBuf,

        /// Character you play; asked interactively when omitted
        #[arg(short, long, env = "REHEARSAL_ROLE")]
        role: Option<String>,

        /// "performance" (summary at the end) or "rehearsal" (feedback per line)
        #[arg(short, long)]
        mode: Option<Mode>,

        /// Minimum similarity (0-100) for a line to pass
        #[arg(short, long, allow_negative_numbers = true)]
        threshold: Option<i32>,

        /// Language for synthesis and recognition (e.g. "fr")
        #[arg(short, long)]
        language: Option<String>,

        /// Chain lines without the pause before your cue
        #[arg(long)]
        direct: bool,

        /// Synthesize every line before the scene starts
        #[arg(long)]
        pregenerate: bool,

        /// Delete cached clips for this script first
        #[arg(long)]
        clean: bool,
    },
    /// List the characters of a script
    Characters {
        /// Script file (.json, .txt or .docx)
        script: PathBuf,
    },
    /// Score a delivered line against the reference
    Score {
        /// Line as written
        reference: String,
        /// Line as delivered
        hypothesis: String,
        /// Minimum similarity (0-100) for the line to pass
        #[arg(short, long, allow_negative_numbers = true)]
        threshold: Option<i32>,
    },
    /// Synthesize the system's lines ahead of a run
    Pregenerate {
        /// Script file (.json, .txt or .docx)
        script: PathBuf,
        /// Character you will play; every other line is synthesized
        #[arg(short, long)]
        role: Option<String>,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Bonjour ! Ceci est un test de la synthèse vocale.")]
        text: String,
    },
    /// Interactive first-run setup
    Setup,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,rehearsal_partner=info",
        1 => "info,rehearsal_partner=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Run {
            script,
            role,
            mode,
            threshold,
            language,
            direct,
            pregenerate,
            clean,
        } => {
            let mut config = Config::load();
            if let Some(mode) = mode {
                config.mode = mode;
            }
            if let Some(threshold) = threshold {
                config.threshold = threshold;
            }
            if let Some(language) = language {
                config.language = language;
            }
            config.direct |= direct;

            let opts = RunOptions {
                role,
                pregenerate,
                clean,
            };
            cmd_run(&config, &script, opts).await
        }
        Command::Characters { script } => cmd_characters(&script),
        Command::Score {
            reference,
            hypothesis,
            threshold,
        } => {
            let threshold = threshold.unwrap_or_else(|| Config::load().threshold);
            cmd_score(&reference, &hypothesis, threshold);
            Ok(())
        }
        Command::Pregenerate { script, role } => cmd_pregenerate(&script, role.as_deref()).await,
        Command::TestMic { duration } => test_mic(duration).await,
        Command::TestSpeaker => test_speaker().await,
        Command::TestTts { text } => test_tts(&text).await,
        Command::Setup => rehearsal_partner::setup::run_setup(),
    }
}

struct RunOptions {
    role: Option<String>,
    pregenerate: bool,
    clean: bool,
}

/// Load a script, using the configured AI character for `.txt` imports
fn load_script(config: &Config, path: &Path) -> anyhow::Result<Arc<Script>> {
    let script = Script::load(path, Some(&config.ai_character))?;
    if script.is_empty() {
        anyhow::bail!("{} has no lines", path.display());
    }
    Ok(Arc::new(script))
}

/// Clips are keyed by line index, so each script gets its own directory
fn script_cache_dir(config: &Config, path: &Path) -> PathBuf {
    let stem: String = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    config.cache_dir.join(stem)
}

/// Play a script until the user stops
#[allow(clippy::future_not_send)]
async fn cmd_run(config: &Config, path: &Path, opts: RunOptions) -> anyhow::Result<()> {
    let script = load_script(config, path)?;

    let mut cache = AudioCache::new(script_cache_dir(config, path))?;
    if opts.clean {
        let removed = cache.clear()?;
        println!("Removed {removed} cached clips");
    }

    let mut rehearsal = Rehearsal::new(
        TextToSpeech::from_config(config)?,
        SpeechToText::from_config(config)?,
        AudioCapture::new()?,
        AudioPlayback::new()?,
        cache,
        RehearsalOptions::from_config(config),
    );

    println!("{} ({} lines)\n", script.title(), script.len());

    loop {
        let role = match opts.role.as_deref() {
            Some(role) => Some(role.to_string()),
            None => pick_role(&script, config)?,
        };
        if let Some(role) = role.as_deref()
            && !role.trim().is_empty()
            && !script.has_speaker(role)
        {
            anyhow::bail!("{role} does not appear in {}", path.display());
        }

        let mut scene = Scene::new(
            Arc::clone(&script),
            SceneSettings {
                mode: config.mode,
                threshold: config.threshold,
                user_character: role,
            },
        );

        if opts.pregenerate {
            println!("Preparing the other characters' lines...");
            let report = rehearsal.pregenerate(&scene).await;
            println!(
                "{} generated, {} already cached, {} failed\n",
                report.generated, report.reused, report.failed
            );
        }

        let mut observer = TerminalObserver::new(config.mode, config.threshold);
        tokio::select! {
            _ = rehearsal.run(&mut scene, &mut observer) => {}
            _ = tokio::signal::ctrl_c() => {
                println!("\nScene interrupted, progress discarded.");
            }
        }

        let again = Confirm::new()
            .with_prompt("Play the scene again?")
            .default(true)
            .interact()?;
        if !again {
            return Ok(());
        }
        println!();
    }
}

/// Ask which character the user plays
///
/// Preselects the configured `ai_character` when the script has it,
/// otherwise the first character.
fn pick_role(script: &Script, config: &Config) -> anyhow::Result<Option<String>> {
    let counts = script.line_counts();

    let mut labels: Vec<String> = counts
        .iter()
        .map(|(name, n)| format!("{name} ({n} lines)"))
        .collect();
    labels.push("(nobody, just listen)".to_string());

    let default = script.speaker_position(&config.ai_character).unwrap_or(0);

    let choice = Select::new()
        .with_prompt("Which character do you play?")
        .items(&labels)
        .default(default)
        .interact()?;

    Ok(counts.get(choice).map(|(name, _)| (*name).to_string()))
}

/// Prints the scene as it plays
struct TerminalObserver {
    mode: Mode,
    threshold: i32,
}

impl TerminalObserver {
    const fn new(mode: Mode, threshold: i32) -> Self {
        Self { mode, threshold }
    }
}

impl SceneObserver for TerminalObserver {
    fn on_line(&mut self, index: usize, line: &Line, ai_turn: bool) {
        if ai_turn {
            println!("[{:>3}] {}: {}", index + 1, line.speaker, line.text);
        } else {
            // Performance mode hides the actor's text
            let text = match self.mode {
                Mode::Rehearsal => line.text.as_str(),
                Mode::Performance => "...",
            };
            println!("[{:>3}] {} (you): {text}", index + 1, line.speaker);
        }
    }

    fn on_transcript(&mut self, _index: usize, transcript: &str) {
        if transcript.is_empty() {
            println!("      heard: (nothing)");
        } else {
            println!("      heard: {transcript}");
        }
    }

    fn on_feedback(&mut self, feedback: &Feedback) {
        let verdict = if feedback.validation.passed { "ok" } else { "try again" };
        println!(
            "      {}% (needs {}%) {verdict}",
            feedback.validation.score, feedback.threshold
        );
    }

    fn on_error(&mut self, _index: usize, error: &rehearsal_partner::Error) {
        println!("      skipped: {error}");
    }

    fn on_finish(&mut self, summary: Option<&SceneSummary>) {
        println!("\n--- end of scene ---");
        match (self.mode, summary) {
            (Mode::Performance, Some(summary)) => {
                let verdict = if summary.passed { "passed" } else { "not yet" };
                println!(
                    "Average {:.1}% over {} lines (needs {}%): {verdict}",
                    summary.average, summary.scored_lines, self.threshold
                );
            }
            (Mode::Performance, None) => println!("No lines were scored."),
            (Mode::Rehearsal, _) => {}
        }
    }
}

/// List the characters of a script
fn cmd_characters(path: &Path) -> anyhow::Result<()> {
    let config = Config::load();
    let script = load_script(&config, path)?;
    let ai = script.ai_character().unwrap_or(&config.ai_character);

    println!("{} [{}]", script.title(), script.language());
    for (name, count) in script.line_counts() {
        let marker = if name == ai { "  (voiced by default)" } else { "" };
        println!("  {name:<20} {count:>4} lines{marker}");
    }

    Ok(())
}

/// Score one line and print the details
fn cmd_score(reference: &str, hypothesis: &str, threshold: i32) {
    let comparison = matching::compare(reference, hypothesis);
    let validation = matching::validate(reference, hypothesis, threshold);

    println!("reference:  {}", comparison.reference);
    println!("hypothesis: {}", comparison.hypothesis);
    println!(
        "score:      {}% ({} at threshold {threshold})",
        validation.score,
        if validation.passed { "pass" } else { "fail" }
    );
}

/// Synthesize the system's lines for a run
async fn cmd_pregenerate(path: &Path, role: Option<&str>) -> anyhow::Result<()> {
    let config = Config::load();
    let script = load_script(&config, path)?;

    let mut state = RunState::new(&script);
    if let Some(role) = role {
        state.set_user_character(role);
    }

    let tts = TextToSpeech::from_config(&config)?;
    let mut cache = AudioCache::new(script_cache_dir(&config, path))?;
    let report = cache
        .pregenerate(
            &script,
            &state,
            &tts,
            &config.language,
            config.pregenerate_concurrency,
        )
        .await;

    println!(
        "{} lines: {} generated, {} already cached, {} failed",
        report.total(),
        report.generated,
        report.reused,
        report.failed
    );
    println!("Clips in {}", cache.dir().display());

    if report.failed > 0 {
        anyhow::bail!("{} lines could not be synthesized", report.failed);
    }
    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let capture = AudioCapture::new()?;
    let stream = capture.listen()?;

    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.drain();
        let energy = calculate_energy(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
        let heard = if is_silent(&samples) { "silence" } else { "voice" };

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}] {heard}",
            i + 1,
            energy,
            peak,
            meter
        );
    }

    drop(stream);

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// Test speaker output with a sine wave
#[allow(clippy::future_not_send)]
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds, then the cue tone\n");

    let mut playback = AudioPlayback::new()?;

    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let num_samples = (PLAYBACK_SAMPLE_RATE as f32 * duration_secs) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / PLAYBACK_SAMPLE_RATE as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    playback.play_samples(samples).await?;
    playback.cue().await?;

    println!("\n---");
    println!("If you heard the tones, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");

    Ok(())
}

/// Test the configured TTS provider
#[allow(clippy::future_not_send)]
async fn test_tts(text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let config = Config::load();
    let tts = TextToSpeech::from_config(&config)?;

    println!("Synthesizing speech ({})...", tts.provider());
    let mp3_data = tts.synthesize(text, &config.language).await?;
    println!("Got {} bytes of audio data", mp3_data.len());

    println!("Playing audio...");
    let mut playback = AudioPlayback::new()?;
    playback.play(&mp3_data).await?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}
