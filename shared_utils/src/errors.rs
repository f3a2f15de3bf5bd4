use crate::error_handler::ErrorCategory;
use crate::policy::PolicyError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VidShrinkError {
    #[error("External tool not found: {tool}")]
    ToolNotFound { tool: String, detail: String },

    #[error("Encoder failed on {path} (exit code {exit_code:?}): {diagnostic}")]
    EncoderFailed {
        path: PathBuf,
        exit_code: Option<i32>,
        diagnostic: String,
    },

    #[error("Encoder timed out after {}s on {path}", .timeout.as_secs())]
    EncoderTimedOut { path: PathBuf, timeout: Duration },

    #[error("Encoder produced no output for {0}")]
    MissingOutput(PathBuf),

    #[error("Backup of {path} failed: {reason}")]
    BackupFailed { path: PathBuf, reason: String },

    #[error("Cannot create backup directory {path}: {source}")]
    BackupDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid video policy: {0}")]
    InvalidPolicy(#[from] PolicyError),

    #[error("Refusing to operate on {path}: {reason}")]
    UnsafeTarget { path: PathBuf, reason: String },

    #[error("Interrupted while processing {0}")]
    Interrupted(PathBuf),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl VidShrinkError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        VidShrinkError::Io {
            path: path.into(),
            source,
        }
    }

    /// Per-file failures are recoverable; anything that invalidates the whole
    /// run (missing encoder, no backup directory, bad policy) is fatal.
    pub fn category(&self) -> ErrorCategory {
        match self {
            VidShrinkError::ToolNotFound { .. }
            | VidShrinkError::BackupDirectory { .. }
            | VidShrinkError::InvalidPolicy(_)
            | VidShrinkError::UnsafeTarget { .. } => ErrorCategory::Fatal,

            VidShrinkError::EncoderFailed { .. }
            | VidShrinkError::EncoderTimedOut { .. }
            | VidShrinkError::MissingOutput(_)
            | VidShrinkError::BackupFailed { .. }
            | VidShrinkError::Io { .. } => ErrorCategory::Recoverable,

            VidShrinkError::Interrupted(_) => ErrorCategory::Optional,
        }
    }
}

pub type Result<T> = std::result::Result<T, VidShrinkError>;
