//! Video encoder seam.
//!
//! The pipeline only talks to [`VideoEncoder`]; [`FfmpegEncoder`] drives the
//! external `ffmpeg` binary with the libx264/aac profile from a
//! [`VideoPolicy`]. Tests substitute scripted encoders.

use shared_utils::errors::Result;
use shared_utils::external_process::{ExternalProcess, ProcessExit};
use shared_utils::policy::{AUDIO_CODEC, VIDEO_CODEC};
use shared_utils::{get_error_suggestion, require_tool, truncate_diagnostic, Interrupt, VideoPolicy};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tracing::{info, warn};

/// Default bound on a single encode.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

/// How one encoder invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeStatus {
    Success,
    Failed {
        exit_code: Option<i32>,
        diagnostic: String,
    },
    TimedOut,
    Interrupted,
}

pub trait VideoEncoder {
    fn name(&self) -> &str;

    /// Bound on a single encode, if any.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Preflight; an `Err` here aborts the run before any file is touched.
    fn check_available(&self) -> Result<()>;

    /// Encode `input` into `output`. `input` must not be modified.
    fn encode(
        &self,
        input: &Path,
        output: &Path,
        policy: &VideoPolicy,
        interrupt: &Interrupt,
    ) -> EncodeStatus;
}

#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    binary: PathBuf,
    timeout: Option<Duration>,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegEncoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    /// `None` waits for the encoder indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build_args(input: &Path, output: &Path, policy: &VideoPolicy) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-nostdin".into(),
            "-i".into(),
            input.as_os_str().to_owned(),
            "-c:v".into(),
            VIDEO_CODEC.into(),
            "-crf".into(),
            policy.crf.to_string().into(),
            "-preset".into(),
            policy.preset.as_str().into(),
            "-c:a".into(),
            AUDIO_CODEC.into(),
            "-b:a".into(),
            policy.audio_bitrate_arg().into(),
        ];
        if policy.faststart {
            args.push("-movflags".into());
            args.push("+faststart".into());
        }
        args.push("-y".into());
        args.push(output.as_os_str().to_owned());
        args
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn check_available(&self) -> Result<()> {
        require_tool(&self.binary.to_string_lossy()).map(|_| ())
    }

    fn encode(
        &self,
        input: &Path,
        output: &Path,
        policy: &VideoPolicy,
        interrupt: &Interrupt,
    ) -> EncodeStatus {
        let mut cmd = Command::new(&self.binary);
        cmd.args(Self::build_args(input, output, policy));

        let process = match ExternalProcess::spawn(&mut cmd) {
            Ok(p) => p,
            Err(e) => {
                return EncodeStatus::Failed {
                    exit_code: None,
                    diagnostic: format!("{:#}", e),
                }
            }
        };

        match process.wait_with_deadline(self.timeout, interrupt) {
            Ok(ProcessExit::Exited { status, .. }) if status.success() => EncodeStatus::Success,
            Ok(ProcessExit::Exited { status, stderr }) => {
                if let Some(hint) = get_error_suggestion(&stderr) {
                    info!(file = %input.display(), hint, "Encoder failure hint");
                }
                EncodeStatus::Failed {
                    exit_code: status.code(),
                    diagnostic: truncate_diagnostic(&stderr),
                }
            }
            Ok(ProcessExit::TimedOut { .. }) => EncodeStatus::TimedOut,
            Ok(ProcessExit::Interrupted { .. }) => EncodeStatus::Interrupted,
            Err(e) => {
                warn!(file = %input.display(), error = %e, "Lost track of encoder process");
                EncodeStatus::Failed {
                    exit_code: None,
                    diagnostic: format!("{:#}", e),
                }
            }
        }
    }
}

/// Printed when the preflight cannot find a working ffmpeg.
pub fn install_guidance() -> &'static str {
    "To install ffmpeg:\n\
     \x20  macOS:          brew install ffmpeg\n\
     \x20  Debian/Ubuntu:  sudo apt install ffmpeg\n\
     \x20  Fedora:         sudo dnf install ffmpeg\n\
     \x20  Windows:        winget install ffmpeg\n\
     \n\
     Or download from: https://ffmpeg.org/download.html\n\
     A binary outside PATH can be passed with --ffmpeg <path>."
}
