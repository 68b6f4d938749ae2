use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GifFitError {
    #[error("Source unavailable: {}: {reason}", path.display())]
    SourceUnavailable { path: PathBuf, reason: String },

    #[error("No frames produced: {0}")]
    NoFramesProduced(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("FFmpeg failed: {0}")]
    FFmpegError(String),

    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl GifFitError {
    pub fn source_unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        GifFitError::SourceUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True when the source or the requested parameters are at fault,
    /// false when the toolchain or the filesystem is.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            GifFitError::SourceUnavailable { .. }
                | GifFitError::NoFramesProduced(_)
                | GifFitError::InvalidParameter(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GifFitError>;
