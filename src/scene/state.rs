//! Per-run progress through a script

use crate::matching::{self, Validation};
use crate::script::{Line, Script, canonical_speaker};

/// Mutable progress for one playthrough of a [`Script`]
///
/// Owned by the caller. Starting over means building a new one; nothing in
/// here survives a reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    line_count: usize,
    current_index: usize,
    user_character: Option<String>,
    accumulated_scores: Vec<u8>,
}

impl RunState {
    /// Fresh state positioned on the first line of `script`
    #[must_use]
    pub fn new(script: &Script) -> Self {
        Self {
            line_count: script.len(),
            current_index: 0,
            user_character: None,
            accumulated_scores: Vec::new(),
        }
    }

    /// Choose the character the human plays
    ///
    /// The name is canonicalized but not checked against the script's
    /// speakers; an unknown name means every line is voiced by the system.
    /// An empty name clears the role.
    pub fn set_user_character(&mut self, name: &str) {
        let canonical = canonical_speaker(name);
        self.user_character = (!canonical.is_empty()).then_some(canonical);
        tracing::debug!(user_character = ?self.user_character, "user character set");
    }

    /// Character the human plays, if chosen
    #[must_use]
    pub fn user_character(&self) -> Option<&str> {
        self.user_character.as_deref()
    }

    /// Index of the active line; equals the line count once complete
    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.current_index
    }

    /// Whether every line has been played
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.current_index >= self.line_count
    }

    /// Move to the next line
    ///
    /// Always moves forward by one until the end of the script, after which
    /// it has no effect.
    pub const fn advance(&mut self) {
        if self.current_index < self.line_count {
            self.current_index += 1;
        }
    }

    /// Whether `line` is voiced by the system under the current role
    #[must_use]
    pub fn voices(&self, line: &Line) -> bool {
        self.user_character
            .as_deref()
            .is_none_or(|user| line.speaker != user)
    }

    /// Keep a score for the end-of-scene summary
    pub fn record_score(&mut self, score: u8) {
        self.accumulated_scores.push(score);
    }

    /// Scores kept so far, in line order
    #[must_use]
    pub fn accumulated_scores(&self) -> &[u8] {
        &self.accumulated_scores
    }
}

/// Progress queries; the script is fixed, the cursor lives in [`RunState`]
impl Script {
    /// Line under the cursor, or `None` once the scene is complete
    #[must_use]
    pub fn current_line(&self, state: &RunState) -> Option<&Line> {
        self.line(state.current_index)
    }

    /// Whether the system should voice the current line
    ///
    /// `false` when the scene is complete, `true` when no role is chosen.
    #[must_use]
    pub fn is_ai_turn(&self, state: &RunState) -> bool {
        self.current_line(state).is_some_and(|line| state.voices(line))
    }

    /// Indexes of every line the system voices under the current role
    #[must_use]
    pub fn ai_line_indexes(&self, state: &RunState) -> Vec<usize> {
        self.lines()
            .iter()
            .enumerate()
            .filter(|(_, line)| state.voices(line))
            .map(|(i, _)| i)
            .collect()
    }

    /// Check what the actor said against the current line
    ///
    /// Returns [`Validation::NO_LINE`] without scoring once the scene is
    /// complete.
    #[must_use]
    pub fn validate(&self, state: &RunState, actor_text: &str, threshold: i32) -> Validation {
        self.current_line(state)
            .map_or(Validation::NO_LINE, |line| {
                matching::validate(&line.text, actor_text, threshold)
            })
    }
}
