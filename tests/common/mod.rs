//! Shared test utilities
//!
//! In-memory stand-ins for the voice collaborators, so scenes can be played
//! end to end without audio hardware or network access.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use rehearsal_partner::script::{Line, RawLine, RawScript, Script};
use rehearsal_partner::voice::{Microphone, Player, Recognizer, SAMPLE_RATE, Synthesizer};
use rehearsal_partner::{
    AudioCache, Error, Feedback, Rehearsal, RehearsalOptions, Result, SceneObserver,
    SceneSummary,
};

/// Build a script from `(speaker, text)` pairs
#[must_use]
pub fn script(lines: &[(&str, &str)]) -> Script {
    Script::from_raw(RawScript {
        title: Some("Test".to_string()),
        lines: Some(lines.iter().map(|(s, t)| RawLine::new(*s, *t)).collect()),
        ..RawScript::default()
    })
    .expect("valid test script")
}

/// The two-line scene used throughout the tests
#[must_use]
pub fn two_hander() -> Arc<Script> {
    Arc::new(script(&[
        ("A", "Bonjour comment vas tu"),
        ("B", "Je vais bien merci"),
    ]))
}

/// A take with half a second of tone between silence
#[must_use]
pub fn speech_take() -> Vec<f32> {
    #[allow(clippy::cast_precision_loss)]
    let tone = (0..SAMPLE_RATE / 2).map(|i| 0.3 * (i as f32 * 0.2).sin());
    std::iter::repeat_n(0.0, 4800)
        .chain(tone)
        .chain(std::iter::repeat_n(0.0, 4800))
        .collect()
}

/// A take with nothing in it
#[must_use]
pub fn silent_take() -> Vec<f32> {
    vec![0.0; SAMPLE_RATE as usize]
}

/// Options that skip every pause
#[must_use]
pub fn fast_options() -> RehearsalOptions {
    RehearsalOptions {
        language: "fr".to_string(),
        record_duration: Duration::from_millis(10),
        cue_delay: Duration::ZERO,
        direct: true,
        cue_beep: true,
        concurrency: 2,
    }
}

/// Synthesizer that returns the text bytes and remembers what it was asked
#[derive(Clone, Default)]
pub struct MockSynthesizer {
    pub calls: Arc<Mutex<Vec<String>>>,
    /// Texts that fail to synthesize
    pub failing: Vec<String>,
}

impl MockSynthesizer {
    #[must_use]
    pub fn failing_on(text: &str) -> Self {
        Self {
            failing: vec![text.to_string()],
            ..Self::default()
        }
    }

    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, _language: &str) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(text.to_string());
        if self.failing.iter().any(|t| t == text) {
            return Err(Error::Synthesis(format!("cannot say {text}")));
        }
        Ok(text.as_bytes().to_vec())
    }
}

/// Recognizer that replays a queue of transcripts
#[derive(Clone, Default)]
pub struct MockRecognizer {
    pub transcripts: Arc<Mutex<VecDeque<Result<String>>>>,
    pub calls: Arc<Mutex<usize>>,
}

impl MockRecognizer {
    #[must_use]
    pub fn replying(transcripts: &[&str]) -> Self {
        let queue = transcripts.iter().map(|t| Ok((*t).to_string())).collect();
        Self {
            transcripts: Arc::new(Mutex::new(queue)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        let queue = VecDeque::from([Err(Error::Recognition("offline".to_string()))]);
        Self {
            transcripts: Arc::new(Mutex::new(queue)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Recognizer for MockRecognizer {
    async fn transcribe(&self, wav: &[u8], _language: &str) -> Result<String> {
        assert_eq!(&wav[0..4], b"RIFF", "recognizer expects WAV audio");
        *self.calls.lock().unwrap() += 1;
        self.transcripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

/// Microphone that hands out prepared takes, speech once they run out
#[derive(Default)]
pub struct MockMicrophone {
    pub takes: VecDeque<Result<Vec<f32>>>,
}

impl MockMicrophone {
    #[must_use]
    pub fn with_takes(takes: Vec<Vec<f32>>) -> Self {
        Self {
            takes: takes.into_iter().map(Ok).collect(),
        }
    }

    #[must_use]
    pub fn broken() -> Self {
        Self {
            takes: VecDeque::from([Err(Error::Audio("no input device".to_string()))]),
        }
    }
}

#[async_trait(?Send)]
impl Microphone for MockMicrophone {
    async fn record(&mut self, _duration: Duration) -> Result<Vec<f32>> {
        self.takes.pop_front().unwrap_or_else(|| Ok(speech_take()))
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }
}

/// Player that records what it played
#[derive(Clone, Default)]
pub struct MockPlayer {
    pub played: Arc<Mutex<Vec<Vec<u8>>>>,
    pub cues: Arc<Mutex<usize>>,
}

impl MockPlayer {
    #[must_use]
    pub fn played_texts(&self) -> Vec<String> {
        self.played
            .lock()
            .unwrap()
            .iter()
            .map(|clip| String::from_utf8_lossy(clip).into_owned())
            .collect()
    }

    #[must_use]
    pub fn cues(&self) -> usize {
        *self.cues.lock().unwrap()
    }
}

#[async_trait(?Send)]
impl Player for MockPlayer {
    async fn play(&mut self, mp3: &[u8]) -> Result<()> {
        self.played.lock().unwrap().push(mp3.to_vec());
        Ok(())
    }

    async fn cue(&mut self) -> Result<()> {
        *self.cues.lock().unwrap() += 1;
        Ok(())
    }
}

/// Everything the observer saw, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Seen {
    Line(usize, String, bool),
    Transcript(usize, String),
    Feedback(Feedback),
    Error(usize),
    Finish(Option<SceneSummary>),
}

#[derive(Default)]
pub struct RecordingObserver {
    pub seen: Vec<Seen>,
}

impl SceneObserver for RecordingObserver {
    fn on_line(&mut self, index: usize, line: &Line, ai_turn: bool) {
        self.seen.push(Seen::Line(index, line.speaker.clone(), ai_turn));
    }

    fn on_transcript(&mut self, index: usize, transcript: &str) {
        self.seen.push(Seen::Transcript(index, transcript.to_string()));
    }

    fn on_feedback(&mut self, feedback: &Feedback) {
        self.seen.push(Seen::Feedback(feedback.clone()));
    }

    fn on_error(&mut self, index: usize, _error: &Error) {
        self.seen.push(Seen::Error(index));
    }

    fn on_finish(&mut self, summary: Option<&SceneSummary>) {
        self.seen.push(Seen::Finish(summary.copied()));
    }
}

/// A driver wired to mocks, with handles kept for inspection
pub struct Harness {
    pub rehearsal: Rehearsal<MockSynthesizer, MockRecognizer, MockMicrophone, MockPlayer>,
    pub synthesizer: MockSynthesizer,
    pub recognizer: MockRecognizer,
    pub player: MockPlayer,
    pub dir: tempfile::TempDir,
}

impl Harness {
    #[must_use]
    pub fn new(
        synthesizer: MockSynthesizer,
        recognizer: MockRecognizer,
        microphone: MockMicrophone,
    ) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let cache = AudioCache::new(dir.path()).expect("cache dir");
        let player = MockPlayer::default();
        let rehearsal = Rehearsal::new(
            synthesizer.clone(),
            recognizer.clone(),
            microphone,
            player.clone(),
            cache,
            fast_options(),
        );
        Self {
            rehearsal,
            synthesizer,
            recognizer,
            player,
            dir,
        }
    }
}
