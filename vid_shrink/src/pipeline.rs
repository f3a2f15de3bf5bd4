//! Video batch: preflight, discover, back up, encode, commit, report.
//!
//! Per file the order is fixed: size, backup (verified), encode to a sibling
//! `<stem>.compressed.<ext>`, then rename over the original only when the
//! result is strictly smaller. The original is never opened for writing.

use crate::backup::{is_inside_backup, BackupDir};
use crate::encoder::{EncodeStatus, VideoEncoder};
use chrono::Local;
use shared_utils::common_utils::{compute_relative_path, display_name, file_size, has_extension};
use shared_utils::errors::{Result, VidShrinkError};
use shared_utils::{
    check_dangerous_directory, collect_files_filtered, format_bytes, format_file_line,
    handle_error, print_summary_report, verify_output_integrity, BatchResult, ErrorCategory,
    FileOutcome, Interrupt, VideoPolicy, RULE, VIDEO_EXTENSIONS,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct VideoRunConfig {
    /// Searched recursively.
    pub dir: PathBuf,
    /// Parent of the `videos_backup_<timestamp>` directory.
    pub backup_root: PathBuf,
    pub policy: VideoPolicy,
}

impl VideoRunConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            backup_root: PathBuf::from("."),
            policy: VideoPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VideoRunReport {
    pub result: BatchResult,
    /// `None` when nothing was processed and no backup directory was made.
    pub backup_dir: Option<PathBuf>,
}

/// `clip.mp4` → `clip.compressed.mp4`, next to the original.
pub fn temp_output_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}.compressed.{}", stem, ext.to_string_lossy()),
        None => format!("{}.compressed", stem),
    };
    path.with_file_name(name)
}

/// The original that `path` would be the temp output of, if its name has
/// the `<stem>.compressed.<ext>` shape.
pub fn original_for_temp(path: &Path) -> Option<PathBuf> {
    let ext = path.extension()?.to_string_lossy();
    let stem = path.file_stem()?.to_string_lossy();
    let original = stem.strip_suffix(".compressed").filter(|s| !s.is_empty())?;
    Some(path.with_file_name(format!("{}.{}", original, ext)))
}

/// A temp output left behind by an earlier run: its original is still there.
fn is_leftover_temp(path: &Path) -> bool {
    original_for_temp(path).is_some_and(|original| original.is_file())
}

/// mp4/mov in any case under `root`, excluding temp outputs whose original
/// still exists and anything in a backup directory below `root`.
pub fn is_video_candidate(path: &Path, root: &Path) -> bool {
    if !has_extension(path, VIDEO_EXTENSIONS) {
        return false;
    }
    if is_inside_backup(&compute_relative_path(path, root)) {
        debug!(file = %path.display(), "Skipping file inside a backup directory");
        return false;
    }
    if is_leftover_temp(path) {
        debug!(file = %path.display(), "Skipping leftover temp output");
        return false;
    }
    true
}

fn remove_temp(temp: &Path) {
    match fs::remove_file(temp) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(file = %temp.display(), error = %e, "Failed to remove temp output"),
    }
}

/// Back up, encode and conditionally replace one video.
///
/// `Ok` outcomes are `Compressed` or `Skipped`; every failure comes back as
/// an error with the original untouched and no temp file left behind.
pub fn process_video(
    path: &Path,
    backup: &BackupDir,
    encoder: &dyn VideoEncoder,
    policy: &VideoPolicy,
    interrupt: &Interrupt,
) -> Result<FileOutcome> {
    let before = fs::metadata(path)
        .map_err(|e| VidShrinkError::io(path, e))?
        .len();

    backup.backup(path)?;

    let temp = temp_output_path(path);
    remove_temp(&temp);

    match encoder.encode(path, &temp, policy, interrupt) {
        EncodeStatus::Success => {}
        EncodeStatus::Failed {
            exit_code,
            diagnostic,
        } => {
            remove_temp(&temp);
            return Err(VidShrinkError::EncoderFailed {
                path: path.to_path_buf(),
                exit_code,
                diagnostic,
            });
        }
        EncodeStatus::TimedOut => {
            remove_temp(&temp);
            return Err(VidShrinkError::EncoderTimedOut {
                path: path.to_path_buf(),
                timeout: encoder.timeout().unwrap_or_default(),
            });
        }
        EncodeStatus::Interrupted => {
            remove_temp(&temp);
            return Err(VidShrinkError::Interrupted(path.to_path_buf()));
        }
    }

    if !temp.exists() {
        return Err(VidShrinkError::MissingOutput(path.to_path_buf()));
    }
    if let Err(reason) = verify_output_integrity(&temp, 1) {
        remove_temp(&temp);
        return Err(VidShrinkError::EncoderFailed {
            path: path.to_path_buf(),
            exit_code: Some(0),
            diagnostic: reason,
        });
    }

    let after = fs::metadata(&temp)
        .map_err(|e| VidShrinkError::io(&temp, e))?
        .len();

    if after >= before {
        remove_temp(&temp);
        info!(file = %path.display(), before, after, "Encode did not shrink the file, keeping original");
        return Ok(FileOutcome::Skipped {
            size: before,
            reason: "compression didn't reduce size".to_string(),
        });
    }

    if let Err(e) = fs::rename(&temp, path) {
        remove_temp(&temp);
        return Err(VidShrinkError::io(path, e));
    }

    info!(file = %path.display(), before, after, "Video replaced with compressed version");
    Ok(FileOutcome::Compressed { before, after })
}

fn print_banner(policy: &VideoPolicy) {
    println!("{}", console::style("🎬 Video Compression").bold());
    println!("{}", RULE);
    println!("Profile: {}", policy);
    println!();
}

fn print_backup_hint(backup_dir: &Path) {
    println!();
    println!("💡 Backup location: {}", backup_dir.display());
    println!("   If you're happy with the results, you can delete the backup:");
    println!("   rm -rf {}", backup_dir.display());
}

/// Run the video pipeline.
///
/// Fatal errors (invalid policy, encoder unavailable, protected directory,
/// backup directory not creatable) are returned before any file is touched.
/// Per-file failures are recorded and the run continues. A missing source
/// directory yields an empty report.
pub fn run_video_batch(
    config: &VideoRunConfig,
    encoder: &dyn VideoEncoder,
    interrupt: &Interrupt,
) -> Result<VideoRunReport> {
    config.policy.validate()?;
    print_banner(&config.policy);

    encoder.check_available()?;
    info!(encoder = encoder.name(), "Encoder preflight passed");

    if !config.dir.is_dir() {
        println!("{} folder not found", config.dir.display());
        return Ok(VideoRunReport::default());
    }

    check_dangerous_directory(&config.dir).map_err(|reason| VidShrinkError::UnsafeTarget {
        path: config.dir.clone(),
        reason,
    })?;

    let start = Instant::now();
    let files = collect_files_filtered(&config.dir, VIDEO_EXTENSIONS, true, |path| {
        is_video_candidate(path, &config.dir)
    });
    println!("📹 Found {} video files", files.len());
    println!();

    if files.is_empty() {
        return Ok(VideoRunReport::default());
    }

    let backup = BackupDir::create(&config.backup_root, &config.dir, &Local::now())?;
    println!("📦 Backup directory: {}", backup.path().display());
    println!();

    let mut result = BatchResult::new();
    let total = files.len();

    for (i, path) in files.iter().enumerate() {
        if interrupt.is_requested() {
            result.interrupted = true;
            break;
        }

        println!("[{}/{}] Processing: {}", i + 1, total, path.display());
        let before = file_size(path).unwrap_or(0);
        println!("   Original size: {}", format_bytes(before));

        let name = display_name(path);
        let outcome = match process_video(path, &backup, encoder, &config.policy, interrupt) {
            Ok(outcome) => outcome,
            Err(err) if err.category() == ErrorCategory::Optional => {
                println!("   ⏹️  Interrupted, original kept");
                result.interrupted = true;
                let _ = handle_error(ErrorCategory::Optional, &name, err);
                break;
            }
            Err(err) if err.category() == ErrorCategory::Fatal => return Err(err),
            Err(err) => {
                let message = err.to_string();
                let _ = handle_error(ErrorCategory::Recoverable, &name, err);
                FileOutcome::Failed {
                    size: before,
                    error: message,
                }
            }
        };

        println!("{}", format_file_line(&name, &outcome));
        println!();
        result.record(path, &outcome);
    }

    print_summary_report(&result, start.elapsed(), "Video compression");
    print_backup_hint(backup.path());

    Ok(VideoRunReport {
        result,
        backup_dir: Some(backup.path().to_path_buf()),
    })
}
