//! External encoder process management.
//!
//! Encoders write a lot of diagnostics to stderr. The pipe buffer is small
//! (typically 64KB), so stderr is drained on its own thread while the caller
//! polls for exit; otherwise a chatty encoder blocks forever on a full pipe.
//!
//! The wait is bounded: a deadline or an interrupt request kills the child,
//! and the caller decides what to do with whatever it left behind.

use crate::common_utils::truncate_chars;
use crate::interrupt::Interrupt;
use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Lines of stderr retained for diagnostics.
const STDERR_TAIL_LINES: usize = 200;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Length of the diagnostic recorded for a failed encode.
pub const DIAGNOSTIC_MAX_CHARS: usize = 100;

/// How a waited-on process ended.
#[derive(Debug)]
pub enum ProcessExit {
    Exited { status: ExitStatus, stderr: String },
    TimedOut { stderr: String },
    Interrupted { stderr: String },
}

/// Child process with stderr drained in the background.
pub struct ExternalProcess {
    child: Child,
    command: String,
    stderr_thread: Option<JoinHandle<String>>,
}

impl ExternalProcess {
    /// Spawn `cmd` with stdin closed, stdout discarded and stderr captured.
    ///
    /// On unix the child gets its own process group, so a Ctrl-C at the
    /// terminal reaches only this program; the child is stopped through
    /// [`Interrupt`] in [`Self::wait_with_deadline`].
    pub fn spawn(cmd: &mut Command) -> Result<Self> {
        let command = format!("{:?}", cmd);
        info!(command = %command, "Executing external command");

        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn process: {}", command))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow::anyhow!("Failed to capture stderr"))?;

        let stderr_thread = thread::spawn(move || {
            let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
            let reader = BufReader::new(stderr);
            for line in reader.lines().map_while(std::result::Result::ok) {
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            tail.into_iter().collect::<Vec<_>>().join("\n")
        });

        Ok(Self {
            child,
            command,
            stderr_thread: Some(stderr_thread),
        })
    }

    /// Wait for exit, killing the child on timeout or interrupt.
    /// `timeout == None` waits indefinitely.
    pub fn wait_with_deadline(
        mut self,
        timeout: Option<Duration>,
        interrupt: &Interrupt,
    ) -> Result<ProcessExit> {
        let start = Instant::now();

        loop {
            if let Some(status) = self
                .child
                .try_wait()
                .context("Failed to check process status")?
            {
                let stderr = self.collect_stderr();
                let duration = start.elapsed();
                if status.success() {
                    info!(
                        command = %self.command,
                        exit_code = status.code(),
                        duration_secs = duration.as_secs_f64(),
                        "External command completed successfully"
                    );
                    debug!(stderr_output = %stderr, "External command stderr");
                } else {
                    error!(
                        command = %self.command,
                        exit_code = status.code(),
                        duration_secs = duration.as_secs_f64(),
                        stderr_output = %stderr,
                        "External command failed"
                    );
                }
                return Ok(ProcessExit::Exited { status, stderr });
            }

            if interrupt.is_requested() {
                warn!(command = %self.command, "Interrupt requested, killing process");
                let stderr = self.kill_and_collect()?;
                return Ok(ProcessExit::Interrupted { stderr });
            }

            if let Some(limit) = timeout {
                if start.elapsed() >= limit {
                    warn!(
                        command = %self.command,
                        timeout_secs = limit.as_secs_f64(),
                        "Deadline exceeded, killing process"
                    );
                    let stderr = self.kill_and_collect()?;
                    return Ok(ProcessExit::TimedOut { stderr });
                }
            }

            thread::sleep(POLL_INTERVAL);
        }
    }

    fn kill_and_collect(&mut self) -> Result<String> {
        // kill() fails if the child exited in the meantime; wait() reaps it either way.
        let _ = self.child.kill();
        self.child.wait().context("Failed to reap killed process")?;
        Ok(self.collect_stderr())
    }

    fn collect_stderr(&mut self) -> String {
        self.stderr_thread
            .take()
            .map(|t| t.join().unwrap_or_default())
            .unwrap_or_default()
    }
}

// ═══════════════════════════════════════════════════════════════
// Diagnostics
// ═══════════════════════════════════════════════════════════════

/// Most meaningful line of an encoder's stderr.
///
/// 1. the last line mentioning "Error"/"error"
/// 2. otherwise the last non-empty line that is not a progress line
/// 3. otherwise "Unknown encoder error"
pub fn format_ffmpeg_error(stderr: &str) -> String {
    if let Some(error_line) = stderr
        .lines()
        .rev()
        .find(|line| line.contains("Error") || line.contains("error"))
    {
        return error_line.trim().to_string();
    }

    stderr
        .lines()
        .rev()
        .find(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty()
                && !trimmed.starts_with("frame=")
                && !trimmed.starts_with("fps=")
                && !trimmed.starts_with("size=")
        })
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "Unknown encoder error".to_string())
}

/// Short diagnostic for progress lines and the error list.
pub fn truncate_diagnostic(stderr: &str) -> String {
    truncate_chars(&format_ffmpeg_error(stderr), DIAGNOSTIC_MAX_CHARS)
}

pub fn get_error_suggestion(stderr: &str) -> Option<&'static str> {
    let patterns = [
        ("No such file or directory", "check that the input path exists"),
        ("Invalid data found", "the input file may be corrupt"),
        ("Unknown encoder", "install an ffmpeg build with libx264 and aac"),
        ("Permission denied", "check read/write permissions on the file and directory"),
        ("moov atom not found", "the MP4 is incomplete (interrupted download or recording?)"),
        ("No space left on device", "free disk space: the backup and temp file need room"),
        ("Too many packets buffered", "the input has broken timestamps"),
    ];

    patterns
        .iter()
        .find(|(pattern, _)| stderr.contains(pattern))
        .map(|(_, suggestion)| *suggestion)
}
