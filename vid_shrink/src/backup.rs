//! Timestamped backup directory.
//!
//! Every original is copied to `<root>/videos_backup_<YYYYMMDD_HHMMSS>/
//! <source dir name>/<relative path>` and the copy is checked against the
//! original's length before the original may be replaced. Backups are never
//! removed by the tool.

use chrono::{DateTime, Local};
use shared_utils::common_utils::{
    compute_relative_path, copy_file_with_context, ensure_parent_dir_exists, file_size,
};
use shared_utils::errors::{Result, VidShrinkError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const BACKUP_DIR_PREFIX: &str = "videos_backup_";

pub fn backup_dir_name(timestamp: &DateTime<Local>) -> String {
    format!("{}{}", BACKUP_DIR_PREFIX, timestamp.format("%Y%m%d_%H%M%S"))
}

/// True when a component of `path` names a backup directory. Callers pass
/// paths relative to the source root so its ancestors are not considered.
pub fn is_inside_backup(path: &Path) -> bool {
    path.components().any(|c| {
        c.as_os_str()
            .to_string_lossy()
            .starts_with(BACKUP_DIR_PREFIX)
    })
}

#[derive(Debug, Clone)]
pub struct BackupDir {
    path: PathBuf,
    source_root: PathBuf,
    source_label: PathBuf,
}

impl BackupDir {
    /// Create `<root>/videos_backup_<timestamp>` for originals found under
    /// `source_root`.
    pub fn create(root: &Path, source_root: &Path, timestamp: &DateTime<Local>) -> Result<Self> {
        let path = root.join(backup_dir_name(timestamp));
        fs::create_dir_all(&path).map_err(|source| VidShrinkError::BackupDirectory {
            path: path.clone(),
            source,
        })?;

        let source_label = source_root
            .file_name()
            .map(PathBuf::from)
            .or_else(|| {
                source_root
                    .canonicalize()
                    .ok()
                    .and_then(|p| p.file_name().map(PathBuf::from))
            })
            .unwrap_or_else(|| PathBuf::from("videos"));

        debug!(path = %path.display(), "Created backup directory");
        Ok(Self {
            path,
            source_root: source_root.to_path_buf(),
            source_label,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where the backup of `file` lives.
    pub fn mirrored_path(&self, file: &Path) -> PathBuf {
        let relative = compute_relative_path(file, &self.source_root);
        self.path.join(&self.source_label).join(relative)
    }

    /// Copy `file` into the backup tree and verify the copy's length.
    pub fn backup(&self, file: &Path) -> Result<PathBuf> {
        let dest = self.mirrored_path(file);
        let failed = |reason: String| VidShrinkError::BackupFailed {
            path: file.to_path_buf(),
            reason,
        };

        ensure_parent_dir_exists(&dest).map_err(|e| failed(format!("{:#}", e)))?;

        let expected = file_size(file).map_err(|e| failed(format!("{:#}", e)))?;
        let copied = copy_file_with_context(file, &dest).map_err(|e| failed(format!("{:#}", e)))?;
        let on_disk = file_size(&dest).map_err(|e| failed(format!("{:#}", e)))?;

        if copied != expected || on_disk != expected {
            return Err(failed(format!(
                "backup size mismatch: expected {} bytes, got {}",
                expected, on_disk
            )));
        }

        debug!(file = %file.display(), backup = %dest.display(), bytes = on_disk, "Backed up original");
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn test_backup_dir_name_format() {
        assert_eq!(backup_dir_name(&fixed_time()), "videos_backup_20240309_140507");
    }

    #[test]
    fn test_is_inside_backup() {
        assert!(is_inside_backup(Path::new("videos/videos_backup_20240309_140507/a.mp4")));
        assert!(!is_inside_backup(Path::new("videos/trip/a.mp4")));
    }

    #[test]
    fn test_backup_mirrors_relative_path() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("videos");
        fs::create_dir_all(source.join("trip/day1")).unwrap();
        let original = source.join("trip/day1/clip.MOV");
        fs::write(&original, b"pre-run bytes").unwrap();

        let backup = BackupDir::create(temp.path(), &source, &fixed_time()).unwrap();
        let copy = backup.backup(&original).unwrap();

        assert_eq!(
            copy,
            temp.path()
                .join("videos_backup_20240309_140507/videos/trip/day1/clip.MOV")
        );
        assert_eq!(fs::read(&copy).unwrap(), b"pre-run bytes");
        assert_eq!(fs::read(&original).unwrap(), b"pre-run bytes");
    }

    #[test]
    fn test_backup_of_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("videos");
        fs::create_dir_all(&source).unwrap();

        let backup = BackupDir::create(temp.path(), &source, &fixed_time()).unwrap();
        let err = backup.backup(&source.join("gone.mp4")).unwrap_err();

        assert!(matches!(err, VidShrinkError::BackupFailed { .. }));
    }

    #[test]
    fn test_uncreatable_backup_dir_is_fatal() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("not_a_dir");
        fs::write(&blocker, b"x").unwrap();

        let err = BackupDir::create(&blocker, temp.path(), &fixed_time()).unwrap_err();

        assert!(matches!(err, VidShrinkError::BackupDirectory { .. }));
        assert_eq!(err.category(), shared_utils::ErrorCategory::Fatal);
    }
}
