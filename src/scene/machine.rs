//! Scene playback state machine
//!
//! [`Scene::step`] is the only transition. It takes what just happened,
//! moves the cursor, and hands back the next thing the caller has to do.
//! The caller owns all I/O; the machine never blocks and never fails.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::matching::Validation;
use crate::script::{Line, Script};

use super::RunState;

/// How results are reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Scores are kept and summarized once the scene is over
    #[default]
    Performance,
    /// Every spoken line gets immediate feedback
    Rehearsal,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Performance => write!(f, "performance"),
            Self::Rehearsal => write!(f, "rehearsal"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "performance" | "perf" => Ok(Self::Performance),
            "rehearsal" | "repetition" | "répétition" => Ok(Self::Rehearsal),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

/// Where the scene is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneState {
    /// Waiting for the line at this index to be played
    AwaitingTurn(usize),
    /// Every line has been played
    Complete,
}

/// What happened since the last step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Begin (or resume) playback; does not move the cursor
    Start,
    /// The system finished voicing its line
    Spoken,
    /// Voicing the line failed; the scene moves on anyway
    SpeakFailed,
    /// The actor's line, as transcribed
    Heard(String),
    /// Capturing or transcribing the actor failed
    ListenFailed,
}

/// What the caller should do next
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Voice this line
    Speak { index: usize, line: Line },
    /// Record and transcribe the actor delivering this line
    Listen { index: usize, line: Line },
    /// Scene over; carries the summary in performance mode
    Finish(Option<SceneSummary>),
}

/// Per-line result shown in rehearsal mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub index: usize,
    pub transcript: String,
    pub validation: Validation,
    pub threshold: i32,
}

/// End-of-scene result in performance mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneSummary {
    /// Number of lines that were scored
    pub scored_lines: usize,
    /// Mean score, rounded to one decimal
    pub average: f64,
    pub threshold: i32,
    /// Whether `average` reached the threshold
    pub passed: bool,
}

impl SceneSummary {
    /// Summarize a list of scores; `None` when nothing was scored
    #[must_use]
    pub fn from_scores(scores: &[u8], threshold: i32) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }

        let total: u32 = scores.iter().copied().map(u32::from).sum();
        #[allow(clippy::cast_precision_loss)]
        let mean = f64::from(total) / scores.len() as f64;
        let average = (mean * 10.0).round() / 10.0;

        Some(Self {
            scored_lines: scores.len(),
            average,
            threshold,
            passed: average >= f64::from(threshold),
        })
    }
}

/// Result of one transition
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub state: SceneState,
    pub feedback: Option<Feedback>,
    pub command: Command,
}

/// Settings fixed for the duration of a scene
#[derive(Debug, Clone, Default)]
pub struct SceneSettings {
    pub mode: Mode,
    pub threshold: i32,
    pub user_character: Option<String>,
}

/// One playthrough of a script
pub struct Scene {
    script: Arc<Script>,
    state: RunState,
    mode: Mode,
    threshold: i32,
}

impl Scene {
    /// Start a playthrough at the first line
    #[must_use]
    pub fn new(script: Arc<Script>, settings: SceneSettings) -> Self {
        let mut state = RunState::new(&script);
        if let Some(name) = settings.user_character.as_deref() {
            state.set_user_character(name);
        }

        tracing::debug!(
            title = script.title(),
            lines = script.len(),
            mode = %settings.mode,
            threshold = settings.threshold,
            user_character = ?state.user_character(),
            "scene created"
        );

        Self {
            script,
            state,
            mode: settings.mode,
            threshold: settings.threshold,
        }
    }

    /// The script being played
    #[must_use]
    pub fn script(&self) -> &Script {
        &self.script
    }

    /// Progress so far
    #[must_use]
    pub const fn run_state(&self) -> &RunState {
        &self.state
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub const fn threshold(&self) -> i32 {
        self.threshold
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SceneState {
        if self.state.is_complete() {
            SceneState::Complete
        } else {
            SceneState::AwaitingTurn(self.state.current_index())
        }
    }

    /// Apply `event` and return the next command
    ///
    /// Every event except [`Event::Start`] moves past the current line,
    /// whoever owned it and however it went. Once complete, every event
    /// yields [`Command::Finish`] again.
    pub fn step(&mut self, event: Event) -> Step {
        let mut feedback = None;

        if !self.state.is_complete() {
            match event {
                Event::Start => {}
                Event::Spoken | Event::ListenFailed => self.state.advance(),
                Event::SpeakFailed => {
                    tracing::warn!(
                        index = self.state.current_index(),
                        "line skipped after failed synthesis"
                    );
                    self.state.advance();
                }
                Event::Heard(transcript) => {
                    feedback = self.score(transcript);
                    self.state.advance();
                }
            }
        }

        Step {
            state: self.state(),
            feedback,
            command: self.command(),
        }
    }

    /// Summary of the scores kept so far (performance mode only)
    #[must_use]
    pub fn summary(&self) -> Option<SceneSummary> {
        match self.mode {
            Mode::Performance => {
                SceneSummary::from_scores(self.state.accumulated_scores(), self.threshold)
            }
            Mode::Rehearsal => None,
        }
    }

    fn score(&mut self, transcript: String) -> Option<Feedback> {
        let index = self.state.current_index();
        let validation = self.script.validate(&self.state, &transcript, self.threshold);

        tracing::info!(
            index,
            score = validation.score,
            passed = validation.passed,
            "actor line scored"
        );

        match self.mode {
            Mode::Performance => {
                self.state.record_score(validation.score);
                None
            }
            Mode::Rehearsal => Some(Feedback {
                index,
                transcript,
                validation,
                threshold: self.threshold,
            }),
        }
    }

    fn command(&self) -> Command {
        let index = self.state.current_index();
        match self.script.current_line(&self.state) {
            Some(line) if self.state.voices(line) => Command::Speak {
                index,
                line: line.clone(),
            },
            Some(line) => Command::Listen {
                index,
                line: line.clone(),
            },
            None => Command::Finish(self.summary()),
        }
    }
}
