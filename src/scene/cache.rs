//! Synthesized audio cache
//!
//! Clips are keyed by line index and stored under a deterministic file name,
//! so a second pre-generation pass (or a second run over the same script)
//! reuses what is already on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use futures::StreamExt;

use crate::script::{Line, Script};
use crate::voice::Synthesizer;
use crate::Result;

use super::RunState;

/// Default number of lines synthesized at once during pre-generation
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Counts from a pre-generation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PregenerateReport {
    /// Lines synthesized in this pass
    pub generated: usize,
    /// Lines whose clip was already on disk
    pub reused: usize,
    /// Lines that could not be synthesized
    pub failed: usize,
}

impl PregenerateReport {
    /// Number of AI lines visited
    #[must_use]
    pub const fn total(&self) -> usize {
        self.generated + self.reused + self.failed
    }
}

enum Outcome {
    Generated(PathBuf),
    Reused(PathBuf),
    Failed,
}

/// On-disk cache of synthesized lines
#[derive(Debug)]
pub struct AudioCache {
    dir: PathBuf,
    entries: HashMap<usize, PathBuf>,
}

impl AudioCache {
    /// Open a cache rooted at `dir`, creating it if needed
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        tracing::debug!(path = %dir.display(), "audio cache opened");
        Ok(Self {
            dir,
            entries: HashMap::new(),
        })
    }

    /// Cache directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds the clip for `line` at `index`
    #[must_use]
    pub fn path_for(&self, index: usize, line: &Line) -> PathBuf {
        self.dir.join(clip_file_name(index, &line.speaker))
    }

    /// Whether a clip for `index` is known to this cache
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.entries.contains_key(&index)
    }

    /// Number of clips known to this cache
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached clip for `line` at `index`, if present
    ///
    /// Falls back to the deterministic file name so clips left by an
    /// earlier run are picked up.
    pub async fn get(&mut self, index: usize, line: &Line) -> Option<Vec<u8>> {
        let path = self
            .entries
            .get(&index)
            .cloned()
            .unwrap_or_else(|| self.path_for(index, line));

        match tokio::fs::read(&path).await {
            Ok(audio) if !audio.is_empty() => {
                self.entries.insert(index, path);
                Some(audio)
            }
            Ok(_) => {
                tracing::debug!(index, path = %path.display(), "ignoring empty clip");
                self.entries.remove(&index);
                None
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.entries.remove(&index);
                None
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read cached clip");
                None
            }
        }
    }

    /// Store a freshly synthesized clip
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub async fn store(&mut self, index: usize, line: &Line, audio: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(index, line);
        write_clip(&path, audio).await?;
        self.entries.insert(index, path.clone());
        Ok(path)
    }

    /// Synthesize every line the system voices, ahead of playback
    ///
    /// Lines whose clip already exists with some content are skipped, so the pass can be
    /// repeated. Lines are independent and run `concurrency` at a time in
    /// no particular order. A failed line is logged and left uncached; it
    /// will be synthesized on the fly during playback.
    pub async fn pregenerate<S>(
        &mut self,
        script: &Script,
        state: &RunState,
        synthesizer: &S,
        language: &str,
        concurrency: usize,
    ) -> PregenerateReport
    where
        S: Synthesizer + ?Sized,
    {
        let jobs: Vec<(usize, &Line, PathBuf)> = script
            .ai_line_indexes(state)
            .into_iter()
            .filter_map(|i| script.line(i).map(|line| (i, line, self.path_for(i, line))))
            .collect();

        tracing::info!(lines = jobs.len(), concurrency, "pre-generating AI lines");

        let results: Vec<(usize, Outcome)> = futures::stream::iter(jobs)
            .map(move |(index, line, path)| async move {
                (index, generate_one(synthesizer, index, line, path, language).await)
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        let mut report = PregenerateReport::default();
        for (index, outcome) in results {
            match outcome {
                Outcome::Generated(path) => {
                    report.generated += 1;
                    self.entries.insert(index, path);
                }
                Outcome::Reused(path) => {
                    report.reused += 1;
                    self.entries.insert(index, path);
                }
                Outcome::Failed => report.failed += 1,
            }
        }

        tracing::info!(
            generated = report.generated,
            reused = report.reused,
            failed = report.failed,
            "pre-generation complete"
        );

        report
    }

    /// Delete every clip in the cache directory
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be listed
    pub fn clear(&mut self) -> Result<usize> {
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path
                .extension()
                .is_some_and(|e| e == CLIP_EXTENSION || e == PARTIAL_EXTENSION)
            {
                match std::fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "failed to remove clip");
                    }
                }
            }
        }
        self.entries.clear();
        tracing::debug!(removed, "audio cache cleared");
        Ok(removed)
    }
}

const CLIP_EXTENSION: &str = "mp3";
const PARTIAL_EXTENSION: &str = "part";

/// Write `audio` next to `path` and move it into place
///
/// A clip interrupted mid-write never appears under its final name.
async fn write_clip(path: &Path, audio: &[u8]) -> std::io::Result<()> {
    let partial = path.with_extension(format!("{CLIP_EXTENSION}.{PARTIAL_EXTENSION}"));
    tokio::fs::write(&partial, audio).await?;
    tokio::fs::rename(&partial, path).await
}

/// Whether a non-empty clip is already on disk at `path`
async fn has_clip(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_file() && meta.len() > 0)
}

/// `0007_ROMEO.mp3`; speaker characters unsafe in file names become `_`
fn clip_file_name(index: usize, speaker: &str) -> String {
    let speaker: String = speaker
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{index:04}_{speaker}.{CLIP_EXTENSION}")
}

async fn generate_one<S>(
    synthesizer: &S,
    index: usize,
    line: &Line,
    path: PathBuf,
    language: &str,
) -> Outcome
where
    S: Synthesizer + ?Sized,
{
    if has_clip(&path).await {
        tracing::trace!(index, path = %path.display(), "clip already cached");
        return Outcome::Reused(path);
    }

    let audio = match synthesizer.synthesize(&line.text, language).await {
        Ok(audio) => audio,
        Err(e) => {
            tracing::warn!(index, error = %e, "failed to pre-generate line");
            return Outcome::Failed;
        }
    };

    match write_clip(&path, &audio).await {
        Ok(()) => {
            tracing::debug!(index, bytes = audio.len(), "line pre-generated");
            Outcome::Generated(path)
        }
        Err(e) => {
            tracing::warn!(index, path = %path.display(), error = %e, "failed to write clip");
            Outcome::Failed
        }
    }
}
