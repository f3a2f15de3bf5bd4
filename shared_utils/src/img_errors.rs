//! Image Pipeline Error Types

use crate::error_handler::ErrorCategory;
use crate::policy::PolicyError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImgShrinkError {
    #[error("Image format not supported: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Invalid image policy: {0}")]
    InvalidPolicy(#[from] PolicyError),

    #[error("Refusing to operate on {path}: {reason}")]
    UnsafeTarget { path: PathBuf, reason: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ImgShrinkError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ImgShrinkError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ImgShrinkError::InvalidPolicy(_) | ImgShrinkError::UnsafeTarget { .. } => {
                ErrorCategory::Fatal
            }
            _ => ErrorCategory::Recoverable,
        }
    }
}

pub type Result<T> = std::result::Result<T, ImgShrinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_names_path() {
        let err = ImgShrinkError::io(
            "photography/a.png",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("photography/a.png"));
        assert_eq!(err.category(), ErrorCategory::Recoverable);
    }

    #[test]
    fn test_policy_error_is_fatal() {
        let err = ImgShrinkError::from(PolicyError::ZeroWidth);
        assert_eq!(err.category(), ErrorCategory::Fatal);
    }
}
