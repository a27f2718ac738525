//! Rehearsal driver
//!
//! Runs a [`Scene`] to completion against real (or mock) voice
//! collaborators. The scene decides what happens next; the driver only
//! carries out [`Command`]s and reports back with [`Event`]s.

use std::time::Duration;

use crate::scene::{AudioCache, Command, Event, Feedback, PregenerateReport, Scene, SceneSummary};
use crate::script::Line;
use crate::voice::{self, Microphone, Player, Recognizer, Synthesizer};
use crate::{Config, Result};

/// Presentation hooks called as the scene plays
///
/// Every method has an empty default so observers only implement what
/// they display.
pub trait SceneObserver {
    /// A line is about to be voiced or is expected from the actor
    fn on_line(&mut self, _index: usize, _line: &Line, _ai_turn: bool) {}

    /// The actor's take came back from the recognizer
    fn on_transcript(&mut self, _index: usize, _transcript: &str) {}

    /// Per-line result (rehearsal mode)
    fn on_feedback(&mut self, _feedback: &Feedback) {}

    /// A collaborator failed and the line was skipped
    fn on_error(&mut self, _index: usize, _error: &crate::Error) {}

    /// Scene over
    fn on_finish(&mut self, _summary: Option<&SceneSummary>) {}
}

/// Timing and audio options for a run
#[derive(Debug, Clone)]
pub struct RehearsalOptions {
    /// Language passed to synthesis and recognition
    pub language: String,

    /// How long each actor line is recorded
    pub record_duration: Duration,

    /// Pause between the cue and the recording
    pub cue_delay: Duration,

    /// Skip the cue pause
    pub direct: bool,

    /// Play a tone before recording
    pub cue_beep: bool,

    /// Lines synthesized at once during pre-generation
    pub concurrency: usize,
}

impl Default for RehearsalOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl RehearsalOptions {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            language: config.language.clone(),
            record_duration: config.record_duration,
            cue_delay: config.cue_delay,
            direct: config.direct,
            cue_beep: config.cue_beep,
            concurrency: config.pregenerate_concurrency,
        }
    }
}

/// Drives scenes through the voice collaborators
pub struct Rehearsal<S, R, M, P> {
    synthesizer: S,
    recognizer: R,
    microphone: M,
    player: P,
    cache: AudioCache,
    options: RehearsalOptions,
}

impl<S, R, M, P> Rehearsal<S, R, M, P>
where
    S: Synthesizer,
    R: Recognizer,
    M: Microphone,
    P: Player,
{
    pub const fn new(
        synthesizer: S,
        recognizer: R,
        microphone: M,
        player: P,
        cache: AudioCache,
        options: RehearsalOptions,
    ) -> Self {
        Self {
            synthesizer,
            recognizer,
            microphone,
            player,
            cache,
            options,
        }
    }

    /// Synthesize every system line of `scene` ahead of time
    pub async fn pregenerate(&mut self, scene: &Scene) -> PregenerateReport {
        self.cache
            .pregenerate(
                scene.script(),
                scene.run_state(),
                &self.synthesizer,
                &self.options.language,
                self.options.concurrency,
            )
            .await
    }

    /// Play `scene` from its current line to the end
    ///
    /// Collaborator failures never abort the run; the line is reported
    /// to `observer` and skipped. Returns the performance summary, if any.
    #[allow(clippy::future_not_send)]
    pub async fn run(
        &mut self,
        scene: &mut Scene,
        observer: &mut dyn SceneObserver,
    ) -> Option<SceneSummary> {
        tracing::info!(
            title = scene.script().title(),
            mode = %scene.mode(),
            start = scene.run_state().current_index(),
            "scene starting"
        );

        let mut step = scene.step(Event::Start);
        loop {
            if let Some(feedback) = &step.feedback {
                observer.on_feedback(feedback);
            }

            let event = match step.command {
                Command::Speak { index, line } => {
                    observer.on_line(index, &line, true);
                    match self.speak(index, &line).await {
                        Ok(()) => Event::Spoken,
                        Err(e) => {
                            tracing::warn!(index, error = %e, "failed to voice line");
                            observer.on_error(index, &e);
                            Event::SpeakFailed
                        }
                    }
                }
                Command::Listen { index, line } => {
                    observer.on_line(index, &line, false);
                    match self.listen().await {
                        Ok(transcript) => {
                            observer.on_transcript(index, &transcript);
                            Event::Heard(transcript)
                        }
                        Err(e) => {
                            tracing::warn!(index, error = %e, "failed to capture line");
                            observer.on_error(index, &e);
                            Event::ListenFailed
                        }
                    }
                }
                Command::Finish(summary) => {
                    tracing::info!(summary = ?summary, "scene finished");
                    observer.on_finish(summary.as_ref());
                    return summary;
                }
            };

            step = scene.step(event);
        }
    }

    /// Voice one line, from the cache when possible
    async fn speak(&mut self, index: usize, line: &Line) -> Result<()> {
        let audio = if let Some(audio) = self.cache.get(index, line).await {
            tracing::debug!(index, "playing cached clip");
            audio
        } else {
            let audio = self
                .synthesizer
                .synthesize(&line.text, &self.options.language)
                .await?;
            if let Err(e) = self.cache.store(index, line, &audio).await {
                tracing::warn!(index, error = %e, "failed to cache clip");
            }
            audio
        };

        self.player.play(&audio).await
    }

    /// Cue the actor, record one take and transcribe it
    async fn listen(&mut self) -> Result<String> {
        if self.options.cue_beep {
            if let Err(e) = self.player.cue().await {
                tracing::debug!(error = %e, "cue tone failed");
            }
        }
        if !self.options.direct && !self.options.cue_delay.is_zero() {
            tokio::time::sleep(self.options.cue_delay).await;
        }

        let samples = self.microphone.record(self.options.record_duration).await?;
        let speech = voice::trim_silence(&samples);
        if speech.is_empty() {
            tracing::info!("no speech detected");
            return Ok(String::new());
        }

        let wav = voice::samples_to_wav(speech, self.microphone.sample_rate())?;
        let transcript = self
            .recognizer
            .transcribe(&wav, &self.options.language)
            .await?;
        tracing::debug!(transcript = %transcript, "take transcribed");
        Ok(transcript)
    }
}

