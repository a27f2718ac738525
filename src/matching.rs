//! Lenient line matching
//!
//! Spoken lines come back from speech recognition with lost accents, stray
//! punctuation and random casing. Both sides are normalized the same way and
//! then compared with an indel similarity ratio over characters.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Outcome of checking a spoken line against the expected one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validation {
    /// Whether `score` reached the threshold
    pub passed: bool,

    /// Similarity, 0 to 100
    pub score: u8,
}

impl Validation {
    /// Result when there is nothing left to compare against
    pub const NO_LINE: Self = Self {
        passed: false,
        score: 0,
    };
}

/// Normalized forms of both sides and their score
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub reference: String,
    pub hypothesis: String,
    pub score: u8,
}

/// Normalize text for comparison
///
/// Lower-cases, strips diacritics, turns anything that is not an ASCII
/// letter, digit or whitespace into a space, then collapses whitespace.
/// The output only contains `[a-z0-9 ]`.
#[must_use]
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .nfd()
        .filter(|&c| !is_combining_mark(c))
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Similarity between two lines, 0 to 100
///
/// `2 * LCS / (len(a) + len(b))` over the normalized strings, rounded. Two
/// strings that normalize to nothing are identical and score 100.
#[must_use]
pub fn score(reference: &str, hypothesis: &str) -> u8 {
    ratio(&normalize(reference), &normalize(hypothesis))
}

/// Normalize both sides and score them
#[must_use]
pub fn compare(reference: &str, hypothesis: &str) -> Comparison {
    let reference = normalize(reference);
    let hypothesis = normalize(hypothesis);
    let score = ratio(&reference, &hypothesis);
    Comparison {
        reference,
        hypothesis,
        score,
    }
}

/// Score `hypothesis` against `reference` and apply `threshold`
///
/// Any threshold is accepted; below 0 always passes, above 100 never does.
#[must_use]
pub fn validate(reference: &str, hypothesis: &str, threshold: i32) -> Validation {
    let comparison = compare(reference, hypothesis);

    tracing::debug!(
        reference = %comparison.reference,
        hypothesis = %comparison.hypothesis,
        score = comparison.score,
        threshold,
        "line compared"
    );

    Validation {
        passed: i32::from(comparison.score) >= threshold,
        score: comparison.score,
    }
}

/// Indel ratio of two already-normalized strings
///
/// Normalized text is ASCII, so bytes are characters here.
fn ratio(a: &str, b: &str) -> u8 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100;
    }

    let matched = lcs_len(a.as_bytes(), b.as_bytes());

    // Rounded half up; matched <= min(len) so the result is at most 100
    let percent = (200 * matched + total / 2) / total;
    u8::try_from(percent).unwrap_or(100)
}

/// Length of the longest common subsequence
fn lcs_len(a: &[u8], b: &[u8]) -> usize {
    let (a, b) = if a.len() < b.len() { (b, a) } else { (a, b) };
    let mut row = vec![0usize; b.len() + 1];

    for &x in a {
        let mut diag = 0;
        for (j, &y) in b.iter().enumerate() {
            let up = row[j + 1];
            row[j + 1] = if x == y { diag + 1 } else { up.max(row[j]) };
            diag = up;
        }
    }

    row[b.len()]
}
