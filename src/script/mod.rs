//! Script model
//!
//! A [`Script`] is the ordered, immutable list of lines for one scene.
//! Speaker names are canonicalized once, when the script is built, so every
//! comparison further down works on pre-normalized identifiers.

mod import;

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Title used when the input does not carry one
pub const DEFAULT_TITLE: &str = "Scène";

/// Language used when the input does not carry one
pub const DEFAULT_LANGUAGE: &str = "fr";

/// Canonical form of a speaker identifier
///
/// Trimmed and upper-cased. Applied at script load and when the user picks a
/// role, and nowhere else.
#[must_use]
pub fn canonical_speaker(name: &str) -> String {
    name.trim().to_uppercase()
}

/// One scripted utterance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Line {
    /// Canonical speaker identifier
    pub speaker: String,

    /// Utterance text, original case
    pub text: String,
}

/// Script input as produced by an importer
///
/// Every field is optional at this stage so that missing structure can be
/// reported as [`Error::MalformedScript`] instead of a bare decode error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawScript {
    pub title: Option<String>,
    pub language: Option<String>,
    pub ai_character: Option<String>,
    pub lines: Option<Vec<RawLine>>,
}

/// One entry of [`RawScript::lines`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLine {
    pub speaker: Option<String>,
    pub text: Option<String>,
}

impl RawLine {
    /// Build an entry from a speaker and a text
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: Some(speaker.into()),
            text: Some(text.into()),
        }
    }
}

/// An ordered, immutable scene
#[derive(Debug, Clone)]
pub struct Script {
    title: String,
    language: String,
    ai_character: Option<String>,
    lines: Vec<Line>,
    speakers: BTreeSet<String>,
}

impl Script {
    /// Build a script from its raw representation
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedScript`] if `lines` is missing or an entry
    /// has neither a speaker nor a text
    pub fn from_raw(raw: RawScript) -> Result<Self> {
        let raw_lines = raw
            .lines
            .ok_or_else(|| Error::MalformedScript("missing `lines`".to_string()))?;

        let lines = raw_lines
            .into_iter()
            .enumerate()
            .map(|(i, entry)| match (entry.speaker, entry.text) {
                (None, None) => Err(Error::MalformedScript(format!(
                    "line {i} has neither `speaker` nor `text`"
                ))),
                (speaker, text) => Ok(Line {
                    speaker: canonical_speaker(speaker.as_deref().unwrap_or_default()),
                    text: text.unwrap_or_default(),
                }),
            })
            .collect::<Result<Vec<_>>>()?;

        let speakers = lines.iter().map(|l| l.speaker.clone()).collect();

        let ai_character = raw
            .ai_character
            .as_deref()
            .map(canonical_speaker)
            .filter(|s| !s.is_empty());

        let script = Self {
            title: raw.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            language: raw.language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            ai_character,
            lines,
            speakers,
        };

        tracing::debug!(
            title = %script.title,
            lines = script.lines.len(),
            speakers = script.speakers.len(),
            "script loaded"
        );

        Ok(script)
    }

    /// Parse a script from its JSON representation
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedScript`] if the JSON does not have the
    /// expected shape
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawScript =
            serde_json::from_str(json).map_err(|e| Error::MalformedScript(e.to_string()))?;
        Self::from_raw(raw)
    }

    /// Parse a script from a JSON reader
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedScript`] if the JSON does not have the
    /// expected shape
    pub fn from_reader(reader: impl std::io::Read) -> Result<Self> {
        let raw: RawScript =
            serde_json::from_reader(reader).map_err(|e| Error::MalformedScript(e.to_string()))?;
        Self::from_raw(raw)
    }

    /// Parse a plain-text script (`SPEAKER: text`, one per line)
    ///
    /// # Errors
    ///
    /// Never fails in practice; the signature matches the other loaders
    pub fn from_text(content: &str, ai_character: Option<&str>) -> Result<Self> {
        Self::from_raw(import::parse_text(content, ai_character))
    }

    /// Parse a Word document of `SPEAKER: text` paragraphs
    ///
    /// # Errors
    ///
    /// Returns error if the document cannot be read
    pub fn from_docx<R: std::io::Read + std::io::Seek>(reader: R) -> Result<Self> {
        Self::from_raw(import::parse_docx(reader)?)
    }

    /// Load a script file, choosing the parser from its extension
    ///
    /// `.json` files are parsed as [`RawScript`]; `.txt` files use the
    /// `SPEAKER: text` format with `default_ai_character` as the AI hint.
    /// `.docx` paragraphs follow the same format without a hint.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, has an unknown extension,
    /// or is malformed
    pub fn load(path: &Path, default_ai_character: Option<&str>) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "json" => {
                let file = std::fs::File::open(path)?;
                Self::from_reader(std::io::BufReader::new(file))
            }
            "txt" => {
                let bytes = std::fs::read(path)?;
                let content = String::from_utf8_lossy(&bytes);
                Self::from_text(&content, default_ai_character)
            }
            "docx" => {
                let file = std::fs::File::open(path)?;
                Self::from_docx(std::io::BufReader::new(file))
            }
            _ => Err(Error::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Display title
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Locale tag (informational)
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Character the script suggests the system should voice, if any
    #[must_use]
    pub fn ai_character(&self) -> Option<&str> {
        self.ai_character.as_deref()
    }

    /// All lines, in order
    #[must_use]
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Line at `index`
    #[must_use]
    pub fn line(&self, index: usize) -> Option<&Line> {
        self.lines.get(index)
    }

    /// Number of lines
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the script has no lines
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Distinct canonical speakers, sorted
    #[must_use]
    pub const fn speakers(&self) -> &BTreeSet<String> {
        &self.speakers
    }

    /// Whether `name` (in any case) speaks in this script
    #[must_use]
    pub fn has_speaker(&self, name: &str) -> bool {
        self.speakers.contains(&canonical_speaker(name))
    }

    /// Position of `name` (in any case) among [`Script::speakers`]
    #[must_use]
    pub fn speaker_position(&self, name: &str) -> Option<usize> {
        let name = canonical_speaker(name);
        self.speakers.iter().position(|s| *s == name)
    }

    /// Number of lines spoken by each speaker, sorted by speaker
    #[must_use]
    pub fn line_counts(&self) -> Vec<(&str, usize)> {
        self.speakers
            .iter()
            .map(|s| {
                let count = self.lines.iter().filter(|l| &l.speaker == s).count();
                (s.as_str(), count)
            })
            .collect()
    }
}
