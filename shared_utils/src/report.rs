//! Report Module
//!
//! Per-file progress lines and the end-of-run summary. Every number printed
//! comes straight from the recorded outcomes, which are measured from disk.

use crate::batch::{reduction_percent, BatchResult, FileOutcome};
use crate::progress::{format_bytes, format_bytes_signed, format_duration};
use std::time::Duration;

pub const RULE: &str = "==================================================";

pub fn format_file_line(name: &str, outcome: &FileOutcome) -> String {
    match outcome {
        FileOutcome::Compressed { before, after } => format!(
            "   ✅ {}: {} → {} ({:.1}% reduction)",
            name,
            format_bytes(*before),
            format_bytes(*after),
            reduction_percent(*before, *after)
        ),
        FileOutcome::Skipped { size, reason } => format!(
            "   ⚠️  {}: skipped, kept original {} ({})",
            name,
            format_bytes(*size),
            reason
        ),
        FileOutcome::Failed { error, .. } => format!("   ❌ {}: {}", name, error),
    }
}

pub fn format_summary(result: &BatchResult, duration: Duration, label: &str) -> String {
    let mut lines = Vec::new();
    lines.push(RULE.to_string());
    if result.interrupted {
        lines.push(format!("⏹️  {} interrupted", label));
    } else {
        lines.push(format!("✅ {} complete!", label));
    }
    lines.push(String::new());
    lines.push("📊 Statistics:".to_string());
    lines.push(format!("   Files processed: {}", result.total));
    lines.push(format!("   Successfully compressed: {}", result.succeeded));
    lines.push(format!("   Skipped: {}", result.skipped));
    lines.push(format!("   Failed: {}", result.failed));
    lines.push(format!(
        "   Original total size: {}",
        format_bytes(result.input_bytes)
    ));
    lines.push(format!(
        "   New total size: {}",
        format_bytes(result.output_bytes)
    ));
    lines.push(format!(
        "   Total reduction: {} ({:.1}%)",
        format_bytes_signed(result.saved_bytes()),
        result.reduction_percent()
    ));
    lines.push(format!("   Time: {}", format_duration(duration)));

    if !result.errors.is_empty() {
        lines.push(String::new());
        lines.push("❌ Errors encountered:".to_string());
        for (path, error) in &result.errors {
            lines.push(format!("   {} → {}", path.display(), error));
        }
    }
    lines.join("\n")
}

pub fn print_summary_report(result: &BatchResult, duration: Duration, label: &str) {
    println!();
    println!("{}", format_summary(result, duration, label));

    tracing::info!(
        label,
        total = result.total,
        succeeded = result.succeeded,
        skipped = result.skipped,
        failed = result.failed,
        input_bytes = result.input_bytes,
        output_bytes = result.output_bytes,
        interrupted = result.interrupted,
        duration_secs = duration.as_secs_f64(),
        "Run summary"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    #[test]
    fn test_file_line_compressed() {
        let line = format_file_line(
            "clip.mp4",
            &FileOutcome::Compressed {
                before: 2048,
                after: 1024,
            },
        );
        assert!(line.contains("clip.mp4"));
        assert!(line.contains("2.00 KB → 1.00 KB"));
        assert!(line.contains("50.0% reduction"));
    }

    #[test]
    fn test_file_line_skipped_and_failed() {
        let skipped = format_file_line(
            "a.mov",
            &FileOutcome::Skipped {
                size: 10,
                reason: "compression did not reduce size".to_string(),
            },
        );
        assert!(skipped.contains("skipped"));

        let failed = format_file_line(
            "b.mov",
            &FileOutcome::Failed {
                size: 10,
                error: "moov atom not found".to_string(),
            },
        );
        assert!(failed.contains("moov atom not found"));
    }

    #[test]
    fn test_summary_numbers_match_result() {
        let mut result = BatchResult::new();
        result.record(
            Path::new("a.mp4"),
            &FileOutcome::Compressed {
                before: 4096,
                after: 1024,
            },
        );
        result.record(
            Path::new("b.mp4"),
            &FileOutcome::Failed {
                size: 1024,
                error: "boom".to_string(),
            },
        );

        let text = format_summary(&result, Duration::from_secs(3), "Video compression");
        assert!(text.contains("Files processed: 2"));
        assert!(text.contains("Successfully compressed: 1"));
        assert!(text.contains("Failed: 1"));
        assert!(text.contains("Original total size: 5.00 KB"));
        assert!(text.contains("New total size: 2.00 KB"));
        assert!(text.contains("Total reduction: 3.00 KB (60.0%)"));
        assert!(text.contains(&format!("{} → boom", PathBuf::from("b.mp4").display())));
    }

    #[test]
    fn test_summary_empty_run_has_no_nan() {
        let text = format_summary(&BatchResult::new(), Duration::from_secs(0), "Images");
        assert!(text.contains("(0.0%)"));
        assert!(!text.contains("NaN"));
    }

    #[test]
    fn test_summary_interrupted_banner() {
        let mut result = BatchResult::new();
        result.interrupted = true;
        let text = format_summary(&result, Duration::from_secs(1), "Images");
        assert!(text.contains("interrupted"));
    }
}
