//! Common Utilities Module
//!
//! Small helpers shared by both pipelines:
//! - extension matching (case-insensitive)
//! - relative-path computation for mirrored layouts
//! - directory creation and copies with path context in errors
//! - diagnostic truncation

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

// ═══════════════════════════════════════════════════════════════
// File Operations
// ═══════════════════════════════════════════════════════════════

/// Lower-cased extension of `path`, or an empty string when there is none.
///
/// # Examples
/// ```
/// use std::path::Path;
/// use shared_utils::common_utils::get_extension_lowercase;
///
/// assert_eq!(get_extension_lowercase(Path::new("test.JPG")), "jpg");
/// assert_eq!(get_extension_lowercase(Path::new("clip.mP4")), "mp4");
/// assert_eq!(get_extension_lowercase(Path::new("noext")), "");
/// ```
pub fn get_extension_lowercase(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// Case-insensitive extension check against a list of dot-less extensions.
///
/// # Examples
/// ```
/// use std::path::Path;
/// use shared_utils::common_utils::has_extension;
///
/// let extensions = &["jpg", "jpeg", "png"];
/// assert!(has_extension(Path::new("photo.JPG"), extensions));
/// assert!(has_extension(Path::new("image.png"), extensions));
/// assert!(!has_extension(Path::new("video.mp4"), extensions));
/// ```
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    let ext = get_extension_lowercase(path);
    !ext.is_empty() && extensions.contains(&ext.as_str())
}

/// File name for progress lines, falling back to the full path.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn ensure_dir_exists(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))
}

pub fn ensure_parent_dir_exists(file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent() {
        ensure_dir_exists(parent)?;
    }
    Ok(())
}

/// Path of `path` relative to `base`; `path` itself when it is not under `base`.
///
/// # Examples
/// ```
/// use std::path::{Path, PathBuf};
/// use shared_utils::common_utils::compute_relative_path;
///
/// let base = Path::new("videos");
/// let rel = compute_relative_path(Path::new("videos/trip/a.mp4"), base);
/// assert_eq!(rel, PathBuf::from("trip/a.mp4"));
/// ```
pub fn compute_relative_path(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base)
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Copy a file, returning the number of bytes copied.
pub fn copy_file_with_context(source: &Path, dest: &Path) -> Result<u64> {
    std::fs::copy(source, dest).with_context(|| {
        format!(
            "Failed to copy file from {} to {}",
            source.display(),
            dest.display()
        )
    })
}

pub fn file_size(path: &Path) -> Result<u64> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .with_context(|| format!("Failed to read metadata: {}", path.display()))
}

// ═══════════════════════════════════════════════════════════════
// String helpers
// ═══════════════════════════════════════════════════════════════

/// Cut `text` to at most `max_chars` characters, marking the cut with `…`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}
