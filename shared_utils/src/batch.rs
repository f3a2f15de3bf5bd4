//! Batch Processing Module
//!
//! File discovery by extension allow-list and per-run statistics.
//!
//! Statistics only ever grow and are combined by plain sums, so results from
//! files processed in any order (or on several threads) merge to the same
//! totals.

use crate::common_utils::has_extension;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov"];

/// Regular files under `dir` whose extension is in `extensions`, ordered by
/// file name. `recursive == false` looks at direct children only.
pub fn collect_files(dir: &Path, extensions: &[&str], recursive: bool) -> Vec<PathBuf> {
    collect_files_filtered(dir, extensions, recursive, |_| true)
}

pub fn collect_files_filtered<F>(
    dir: &Path,
    extensions: &[&str],
    recursive: bool,
    keep: F,
) -> Vec<PathBuf>
where
    F: Fn(&Path) -> bool,
{
    let walker = if recursive {
        WalkDir::new(dir).follow_links(true)
    } else {
        WalkDir::new(dir).max_depth(1)
    };

    walker
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(error = %err, "Skipping unreadable directory entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| has_extension(e.path(), extensions))
        .filter(|e| keep(e.path()))
        .map(|e| e.path().to_path_buf())
        .collect()
}

/// Result of processing one candidate file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// The original was replaced; sizes in bytes.
    Compressed { before: u64, after: u64 },
    /// The original was left untouched on purpose.
    Skipped { size: u64, reason: String },
    /// The original was left untouched because something went wrong.
    Failed { size: u64, error: String },
}

impl FileOutcome {
    pub fn size_before(&self) -> u64 {
        match self {
            FileOutcome::Compressed { before, .. } => *before,
            FileOutcome::Skipped { size, .. } | FileOutcome::Failed { size, .. } => *size,
        }
    }

    /// Size on disk after the run; untouched files keep their size.
    pub fn size_after(&self) -> u64 {
        match self {
            FileOutcome::Compressed { after, .. } => *after,
            FileOutcome::Skipped { size, .. } | FileOutcome::Failed { size, .. } => *size,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub errors: Vec<(PathBuf, String)>,
    /// Set when the run stopped early on user request.
    pub interrupted: bool,
}

impl BatchResult {
    pub fn new() -> Self {
        Self {
            total: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            input_bytes: 0,
            output_bytes: 0,
            errors: Vec::new(),
            interrupted: false,
        }
    }

    pub fn record(&mut self, path: &Path, outcome: &FileOutcome) {
        self.total += 1;
        self.input_bytes += outcome.size_before();
        self.output_bytes += outcome.size_after();
        match outcome {
            FileOutcome::Compressed { .. } => self.succeeded += 1,
            FileOutcome::Skipped { .. } => self.skipped += 1,
            FileOutcome::Failed { error, .. } => {
                self.failed += 1;
                self.errors.push((path.to_path_buf(), error.clone()));
            }
        }
    }

    pub fn merge(&mut self, other: BatchResult) {
        self.total += other.total;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.input_bytes += other.input_bytes;
        self.output_bytes += other.output_bytes;
        self.errors.extend(other.errors);
        self.interrupted |= other.interrupted;
    }

    pub fn saved_bytes(&self) -> i64 {
        self.input_bytes as i64 - self.output_bytes as i64
    }

    /// Aggregate size reduction in percent; 0 when nothing was processed.
    pub fn reduction_percent(&self) -> f64 {
        reduction_percent(self.input_bytes, self.output_bytes)
    }
}

impl Default for BatchResult {
    fn default() -> Self {
        Self::new()
    }
}

/// `(before - after) / before` in percent; negative when the file grew.
pub fn reduction_percent(before: u64, after: u64) -> f64 {
    if before == 0 {
        0.0
    } else {
        (before as f64 - after as f64) / before as f64 * 100.0
    }
}
