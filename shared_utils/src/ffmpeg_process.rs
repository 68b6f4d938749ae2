//! FFmpeg process management
//!
//! Piping both stdout and stderr but reading only stdout deadlocks once
//! ffmpeg fills the stderr pipe buffer (~64KB). `FfmpegProcess` drains
//! stderr on its own thread so stdout (the `-progress pipe:1` stream) can be
//! read safely.
//!
//! ```ignore
//! use shared_utils::ffmpeg_process::{FfmpegProcess, FfmpegProgressParser};
//! use std::io::{BufRead, BufReader};
//! use std::process::Command;
//!
//! let mut cmd = Command::new("ffmpeg");
//! cmd.args(["-progress", "pipe:1", "-i", "in.mp4", "out.gif"]);
//!
//! let mut process = FfmpegProcess::spawn(&mut cmd)?;
//! let mut parser = FfmpegProgressParser::new(Some(120));
//! if let Some(stdout) = process.take_stdout() {
//!     for line in BufReader::new(stdout).lines() {
//!         parser.parse_line(&line?);
//!     }
//! }
//! let (status, stderr) = process.wait_with_output()?;
//! ```

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader};
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, info};

pub fn is_ffmpeg_available() -> bool {
    which::which("ffmpeg").is_ok()
}

// ═══════════════════════════════════════════════════════════════
// FfmpegProcess
// ═══════════════════════════════════════════════════════════════

pub struct FfmpegProcess {
    child: Child,
    stderr_thread: Option<JoinHandle<String>>,
    command: String,
    started: Instant,
}

impl FfmpegProcess {
    /// Spawns the command with piped stdout/stderr and starts the stderr
    /// drain thread.
    pub fn spawn(cmd: &mut Command) -> Result<Self> {
        let command = format!("{:?}", cmd);
        info!(command = %command, "Executing FFmpeg command");

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().context("Failed to spawn FFmpeg process")?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow::anyhow!("Failed to capture FFmpeg stderr"))?;

        let stderr_thread = thread::spawn(move || {
            let mut buf = String::new();
            for line in BufReader::new(stderr).lines().map_while(|l| l.ok()) {
                buf.push_str(&line);
                buf.push('\n');
            }
            buf
        });

        Ok(Self {
            child,
            stderr_thread: Some(stderr_thread),
            command,
            started: Instant::now(),
        })
    }

    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Waits for exit and returns the status with everything ffmpeg wrote to
    /// stderr.
    pub fn wait_with_output(mut self) -> Result<(ExitStatus, String)> {
        let status = self.child.wait().context("Failed to wait for FFmpeg")?;
        let stderr = self
            .stderr_thread
            .take()
            .map(|t| t.join().unwrap_or_default())
            .unwrap_or_default();

        crate::logging::log_external_tool(
            "ffmpeg",
            &self.command,
            &stderr,
            status.code(),
            self.started.elapsed(),
        );

        if status.success() {
            debug!(stderr_output = %stderr, "FFmpeg stderr output");
        } else {
            error!(
                exit_code = status.code(),
                stderr_output = %stderr,
                "FFmpeg process failed"
            );
        }

        Ok((status, stderr))
    }
}

// ═══════════════════════════════════════════════════════════════
// FfmpegProgressParser
// ═══════════════════════════════════════════════════════════════

/// Parses the key=value lines ffmpeg writes with `-progress pipe:1`:
///
/// - `frame=123`
/// - `out_time_us=4100000`
/// - `progress=continue` / `progress=end`
#[derive(Debug, Clone)]
pub struct FfmpegProgressParser {
    total_frames: Option<u64>,
    current_frame: u64,
    current_time: f64,
    finished: bool,
}

impl FfmpegProgressParser {
    pub fn new(total_frames: Option<u64>) -> Self {
        Self {
            total_frames,
            current_frame: 0,
            current_time: 0.0,
            finished: false,
        }
    }

    /// Feeds one line; returns progress in 0.0..=1.0 when it can be computed.
    pub fn parse_line(&mut self, line: &str) -> Option<f64> {
        let (key, value) = line.trim().split_once('=')?;
        let value = value.trim();
        match key {
            "frame" => {
                if let Ok(frame) = value.parse::<u64>() {
                    self.current_frame = frame;
                }
            }
            "out_time_us" | "out_time_ms" => {
                // ffmpeg reports microseconds under both keys.
                if let Ok(us) = value.parse::<i64>() {
                    self.current_time = us.max(0) as f64 / 1_000_000.0;
                }
            }
            "progress" => {
                self.finished = value == "end";
            }
            _ => {}
        }
        self.progress()
    }

    fn progress(&self) -> Option<f64> {
        if self.finished {
            return Some(1.0);
        }
        match self.total_frames {
            Some(total) if total > 0 => Some((self.current_frame as f64 / total as f64).min(1.0)),
            _ => None,
        }
    }

    pub fn current_frame(&self) -> u64 {
        self.current_frame
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

// ═══════════════════════════════════════════════════════════════
// Error formatting
// ═══════════════════════════════════════════════════════════════

/// Picks the most meaningful line out of ffmpeg's stderr.
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
            !trimmed.is_empty() && !trimmed.starts_with("frame=") && !trimmed.starts_with("size=")
        })
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "Unknown FFmpeg error".to_string())
}

/// ffmpeg exits 0 on some muxers when nothing was encoded; this catches the
/// messages it prints in that case.
pub fn reports_empty_output(stderr: &str) -> bool {
    stderr.contains("Output file is empty")
        || stderr.contains("nothing was encoded")
        || stderr.contains("Output file #0 does not contain any stream")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_parser_frames() {
        let mut parser = FfmpegProgressParser::new(Some(200));
        assert_eq!(parser.parse_line("frame=50"), Some(0.25));
        assert_eq!(parser.parse_line("fps=12.0"), Some(0.25));
        assert_eq!(parser.parse_line("frame=400"), Some(1.0));
        assert_eq!(parser.current_frame(), 400);
    }

    #[test]
    fn test_progress_parser_time_and_end() {
        let mut parser = FfmpegProgressParser::new(None);
        assert_eq!(parser.parse_line("out_time_us=2500000"), None);
        assert_eq!(parser.current_time(), 2.5);
        assert_eq!(parser.parse_line("progress=continue"), None);
        assert_eq!(parser.parse_line("progress=end"), Some(1.0));
        assert!(parser.is_finished());
    }

    #[test]
    fn test_progress_parser_ignores_noise() {
        let mut parser = FfmpegProgressParser::new(Some(10));
        assert_eq!(parser.parse_line("no equals sign here"), None);
        assert_eq!(parser.parse_line("frame=abc"), Some(0.0));
        assert_eq!(parser.parse_line("out_time_us=-42"), Some(0.0));
        assert_eq!(parser.current_time(), 0.0);
    }

    #[test]
    fn test_format_ffmpeg_error() {
        let stderr = "Input #0, mov\n[gif @ 0x1] Error while opening encoder\nConversion failed!\n";
        assert_eq!(
            format_ffmpeg_error(stderr),
            "[gif @ 0x1] Error while opening encoder"
        );
        assert_eq!(format_ffmpeg_error(""), "Unknown FFmpeg error");
        assert_eq!(format_ffmpeg_error("frame=1\nsomething odd\n"), "something odd");
    }

    #[test]
    fn test_reports_empty_output() {
        assert!(reports_empty_output(
            "Output file is empty, nothing was encoded (check -ss / -t / -frames parameters if used)"
        ));
        assert!(!reports_empty_output("video:512kB audio:0kB"));
    }
}
