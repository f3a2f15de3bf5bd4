//! Shared utilities for the media_shrink tools
//!
//! Common functionality used by `img-shrink` and `vid-shrink`:
//! - compression policies and their validation
//! - file discovery and batch statistics
//! - progress bar, per-file lines and the summary report
//! - safety checks (dangerous directory detection, atomic replacement)
//! - external encoder process management with deadlines
//! - logging, error types and Ctrl-C handling

pub mod batch;
pub mod common_utils;
pub mod error_handler;
pub mod errors;
pub mod external_process;
pub mod img_errors;
pub mod interrupt;
pub mod logging;
pub mod policy;
pub mod progress;
pub mod report;
pub mod safe_replace;
pub mod safety;
pub mod tools;

pub use batch::*;
pub use error_handler::{handle_error, report_error, ErrorAction, ErrorCategory};
pub use errors::VidShrinkError;
pub use external_process::{
    format_ffmpeg_error, get_error_suggestion, truncate_diagnostic, ExternalProcess, ProcessExit,
};
pub use img_errors::ImgShrinkError;
pub use interrupt::Interrupt;
pub use logging::{init_logging, log_external_tool, LogConfig};
pub use policy::{EncoderPreset, ImagePolicy, PolicyError, VideoPolicy};
pub use progress::{create_progress_bar, format_bytes, format_duration};
pub use report::*;
pub use safe_replace::{replace_atomically, verify_output_integrity};
pub use safety::*;
pub use tools::*;
