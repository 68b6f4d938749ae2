//! Shared Utilities for the vid-gif tools
//!
//! - Error type shared by the converter crates
//! - FFprobe wrapper for source analysis
//! - FFmpeg process handling (stderr drain, `-progress` parsing)
//! - Logging (tracing + rolling file appender)
//! - Progress bars
//! - Type-safe wrappers (file sizes, iteration budgets)

pub mod errors;
pub mod ffmpeg_process;
pub mod ffprobe;
pub mod logging;
pub mod progress;
pub mod types;

pub use errors::{GifFitError, Result};
pub use ffmpeg_process::{format_ffmpeg_error, is_ffmpeg_available, FfmpegProcess, FfmpegProgressParser};
pub use ffprobe::{is_ffprobe_available, parse_frame_rate, probe_video, FFprobeError, FFprobeResult};
pub use progress::{create_frame_progress_bar, create_spinner, enable_quiet_mode, is_quiet_mode};
pub use types::{FileSize, IterationGuard};
