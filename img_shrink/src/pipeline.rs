//! Image batch: discover, compress each file, report.

use crate::compressor::compress_image;
use rayon::prelude::*;
use shared_utils::common_utils::display_name;
use shared_utils::error_handler::{handle_error, ErrorAction};
use shared_utils::img_errors::{ImgShrinkError, Result};
use shared_utils::{
    check_dangerous_directory, collect_files, create_progress_bar, print_summary_report,
    BatchResult, FileOutcome, ImagePolicy, Interrupt, IMAGE_EXTENSIONS,
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

#[derive(Debug, Clone)]
pub struct ImageRunConfig {
    pub dir: PathBuf,
    pub policy: ImagePolicy,
    /// Process files on the rayon pool instead of one by one.
    pub parallel: bool,
}

impl ImageRunConfig {
    pub fn new(dir: impl Into<PathBuf>, policy: ImagePolicy) -> Self {
        Self {
            dir: dir.into(),
            policy,
            parallel: false,
        }
    }
}

fn process_one(path: &Path, policy: &ImagePolicy) -> FileOutcome {
    match compress_image(path, policy) {
        Ok(outcome) => outcome,
        Err(err) => {
            let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            let message = err.to_string();
            let context = format!("compress {}", display_name(path));
            if let ErrorAction::Abort(e) = handle_error(err.category(), &context, err) {
                tracing::error!(error = %e, "Unexpected fatal error on a single image");
            }
            FileOutcome::Failed {
                size,
                error: message,
            }
        }
    }
}

fn announce(path: &Path, outcome: &FileOutcome) {
    match outcome {
        FileOutcome::Compressed { .. } => println!("Compressed: {}", display_name(path)),
        FileOutcome::Failed { error, .. } => {
            println!("Error processing {}: {}", display_name(path), error)
        }
        FileOutcome::Skipped { .. } => {}
    }
}

/// Run the image pipeline over the direct children of `config.dir`.
///
/// A missing directory is not an error: a message is printed and an empty
/// result returned. Only precondition failures (bad policy, protected
/// directory) come back as `Err`.
pub fn run_image_batch(config: &ImageRunConfig, interrupt: &Interrupt) -> Result<BatchResult> {
    config.policy.validate()?;

    if !config.dir.is_dir() {
        println!("{} folder not found", config.dir.display());
        return Ok(BatchResult::new());
    }

    check_dangerous_directory(&config.dir).map_err(|reason| ImgShrinkError::UnsafeTarget {
        path: config.dir.clone(),
        reason,
    })?;

    let start = Instant::now();
    let files = collect_files(&config.dir, IMAGE_EXTENSIONS, false);
    info!(
        dir = %config.dir.display(),
        files = files.len(),
        policy = %config.policy,
        parallel = config.parallel,
        "Starting image batch"
    );

    let pb = create_progress_bar(files.len() as u64, "Images");
    let mut result = BatchResult::new();

    if config.parallel {
        // Per-file results are summed, so the reduction order does not matter.
        result = files
            .par_iter()
            .map(|path| {
                let mut part = BatchResult::new();
                if interrupt.is_requested() {
                    part.interrupted = true;
                    return part;
                }
                let outcome = process_one(path, &config.policy);
                pb.suspend(|| announce(path, &outcome));
                pb.inc(1);
                part.record(path, &outcome);
                part
            })
            .reduce(BatchResult::new, |mut acc, part| {
                acc.merge(part);
                acc
            });
    } else {
        for path in &files {
            if interrupt.is_requested() {
                result.interrupted = true;
                break;
            }
            let outcome = process_one(path, &config.policy);
            pb.suspend(|| announce(path, &outcome));
            pb.inc(1);
            result.record(path, &outcome);
        }
    }
    pb.finish_and_clear();

    if result.interrupted {
        info!(processed = result.total, "Image batch interrupted");
    }
    print_summary_report(&result, start.elapsed(), "Image compression");
    println!("Done.");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::fs;
    use tempfile::TempDir;

    fn write_png(path: &Path, width: u32, height: u32) {
        RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 7]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_only_matching_extensions_are_touched() {
        let temp = TempDir::new().unwrap();
        let notes = temp.path().join("notes.txt");
        let png = temp.path().join("chart.png");
        fs::write(&notes, b"keep me").unwrap();
        write_png(&png, 1500, 100);
        let png_before = fs::read(&png).unwrap();

        let config = ImageRunConfig::new(temp.path(), ImagePolicy::standard());
        let result = run_image_batch(&config, &Interrupt::new()).unwrap();

        assert_eq!(fs::read(&notes).unwrap(), b"keep me");
        assert_ne!(fs::read(&png).unwrap(), png_before);
        assert_eq!(image::open(&png).unwrap().width(), 1200);
        assert_eq!(result.total, 1);
        assert_eq!(result.succeeded, 1);
    }

    #[test]
    fn test_corrupt_file_does_not_stop_the_run() {
        let temp = TempDir::new().unwrap();
        let broken = temp.path().join("a_broken.jpg");
        let good = temp.path().join("b_good.png");
        fs::write(&broken, b"garbage").unwrap();
        write_png(&good, 64, 64);

        let config = ImageRunConfig::new(temp.path(), ImagePolicy::ultra());
        let result = run_image_batch(&config, &Interrupt::new()).unwrap();

        assert_eq!(result.total, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.succeeded, 1);
        assert_eq!(fs::read(&broken).unwrap(), b"garbage");
        assert_eq!(result.errors[0].0, broken);
    }

    #[test]
    fn test_subdirectories_are_not_visited() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("nested")).unwrap();
        let nested = temp.path().join("nested/deep.png");
        write_png(&nested, 2000, 10);
        let before = fs::read(&nested).unwrap();

        let config = ImageRunConfig::new(temp.path(), ImagePolicy::standard());
        let result = run_image_batch(&config, &Interrupt::new()).unwrap();

        assert_eq!(result.total, 0);
        assert_eq!(fs::read(&nested).unwrap(), before);
    }

    #[test]
    fn test_missing_directory_is_soft_noop() {
        let temp = TempDir::new().unwrap();
        let config = ImageRunConfig::new(temp.path().join("photography"), ImagePolicy::standard());
        let result = run_image_batch(&config, &Interrupt::new()).unwrap();
        assert_eq!(result.total, 0);
    }

    #[test]
    fn test_invalid_policy_is_fatal() {
        let temp = TempDir::new().unwrap();
        let policy = ImagePolicy {
            jpeg_quality: 0,
            ..ImagePolicy::standard()
        };
        let config = ImageRunConfig::new(temp.path(), policy);
        let err = run_image_batch(&config, &Interrupt::new()).unwrap_err();
        assert!(matches!(err, ImgShrinkError::InvalidPolicy(_)));
    }

    #[test]
    fn test_interrupt_before_start_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let png = temp.path().join("a.png");
        write_png(&png, 1500, 20);
        let before = fs::read(&png).unwrap();

        let interrupt = Interrupt::new();
        interrupt.trigger();
        let config = ImageRunConfig::new(temp.path(), ImagePolicy::standard());
        let result = run_image_batch(&config, &interrupt).unwrap();

        assert!(result.interrupted);
        assert_eq!(result.total, 0);
        assert_eq!(fs::read(&png).unwrap(), before);
    }

    #[test]
    fn test_parallel_matches_sequential_totals() {
        let temp = TempDir::new().unwrap();
        for i in 0..4 {
            write_png(&temp.path().join(format!("img{}.png", i)), 1300 + i * 10, 50);
        }

        let mut config = ImageRunConfig::new(temp.path(), ImagePolicy::standard());
        config.parallel = true;
        let result = run_image_batch(&config, &Interrupt::new()).unwrap();

        assert_eq!(result.total, 4);
        assert_eq!(result.succeeded, 4);
        let on_disk: u64 = (0..4)
            .map(|i| {
                fs::metadata(temp.path().join(format!("img{}.png", i)))
                    .unwrap()
                    .len()
            })
            .sum();
        assert_eq!(result.output_bytes, on_disk);
    }

    #[test]
    fn test_parallel_collects_failures_and_interrupt() {
        let temp = TempDir::new().unwrap();
        let broken = temp.path().join("broken.png");
        fs::write(&broken, b"not a png").unwrap();
        write_png(&temp.path().join("ok.png"), 1300, 40);

        let mut config = ImageRunConfig::new(temp.path(), ImagePolicy::standard());
        config.parallel = true;
        let result = run_image_batch(&config, &Interrupt::new()).unwrap();

        assert_eq!(result.failed, 1);
        assert_eq!(result.succeeded, 1);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].0, broken);

        let interrupt = Interrupt::new();
        interrupt.trigger();
        let stopped = run_image_batch(&config, &interrupt).unwrap();
        assert!(stopped.interrupted);
        assert_eq!(stopped.total, 0);
    }
}
