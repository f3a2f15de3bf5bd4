//! Unified Error Handler Module
//!
//! ## Error categories
//! - Recoverable: per-file failure, log it and move on to the next file
//! - Fatal: precondition failure, abort the run before touching files
//! - Optional: non-critical (e.g. user interruption), log and stop quietly

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Recoverable,
    Fatal,
    Optional,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Recoverable => write!(f, "RECOVERABLE"),
            ErrorCategory::Fatal => write!(f, "FATAL"),
            ErrorCategory::Optional => write!(f, "OPTIONAL"),
        }
    }
}

#[derive(Debug)]
pub enum ErrorAction {
    Continue,
    Abort(anyhow::Error),
}

/// Log `error` according to its category and decide whether the batch goes on.
pub fn handle_error<E: std::error::Error + Send + Sync + 'static>(
    category: ErrorCategory,
    context: &str,
    error: E,
) -> ErrorAction {
    match category {
        ErrorCategory::Recoverable => {
            tracing::warn!(category = %category, context, error = %error, "Recoverable error");
            ErrorAction::Continue
        }
        ErrorCategory::Fatal => {
            tracing::error!(category = %category, context, error = %error, "Fatal error");
            ErrorAction::Abort(anyhow::anyhow!("{}: {}", context, error))
        }
        ErrorCategory::Optional => {
            tracing::info!(category = %category, context, error = %error, "Non-critical error");
            ErrorAction::Continue
        }
    }
}

/// Print an error and its source chain to stderr and the log.
pub fn report_error<E: std::error::Error + ?Sized>(error: &E) {
    eprintln!("❌ ERROR: {}", error);
    tracing::error!("Error occurred: {}", error);

    let mut source = error.source();
    let mut level = 1;
    while let Some(err) = source {
        eprintln!("   {}. Caused by: {}", level, err);
        tracing::error!("  Caused by (level {}): {}", level, err);
        source = err.source();
        level += 1;
    }
}
