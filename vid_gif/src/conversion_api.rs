//! GIF Conversion API
//!
//! Entry point used by the CLI: resolves the output path, checks the source,
//! builds the ffmpeg encoder and runs the size-constrained loop.

use crate::gif_encoder::FfmpegGifEncoder;
use crate::params::{EncodeParameters, FitConfig, DEFAULT_MAX_SIZE_MB};
use crate::size_fit::{AttemptObserver, FitRequest, LoopResult, SizeConstrainedEncoderLoop};
use shared_utils::types::FileSize;
use shared_utils::{GifFitError, Result};
use std::path::{Component, Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone)]
pub struct GifConversionConfig {
    pub input: PathBuf,
    /// `None` writes next to the input with a `.gif` extension.
    pub output: Option<PathBuf>,
    pub initial: EncodeParameters,
    pub max_size: FileSize,
    pub auto_optimize: bool,
    pub fit: FitConfig,
}

impl GifConversionConfig {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            initial: EncodeParameters::default(),
            max_size: FileSize::from_mb_f64(DEFAULT_MAX_SIZE_MB),
            auto_optimize: true,
            fit: FitConfig::default(),
        }
    }

    pub fn output_path(&self) -> PathBuf {
        determine_output_path(&self.input, self.output.as_deref())
    }

    pub fn to_fit_request(&self) -> FitRequest {
        FitRequest {
            source: self.input.clone(),
            output: self.output_path(),
            initial: self.initial,
            size_ceiling: self.max_size,
            auto_optimize: self.auto_optimize,
        }
    }
}

pub fn determine_output_path(input: &Path, output: Option<&Path>) -> PathBuf {
    match output {
        Some(path) => path.to_path_buf(),
        None => input.with_extension("gif"),
    }
}

/// Absolute form of `path` with symlinks resolved as far as the path exists.
/// Components past the deepest existing ancestor are appended lexically
/// (`.` dropped, `..` popped).
pub fn resolve_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut existing = absolute.as_path();
    let mut rest: Vec<Component<'_>> = Vec::new();
    let mut resolved = loop {
        if let Ok(canonical) = existing.canonicalize() {
            break canonical;
        }
        match (existing.parent(), existing.components().next_back()) {
            (Some(parent), Some(last)) => {
                rest.push(last);
                existing = parent;
            }
            _ => break existing.to_path_buf(),
        }
    };

    for component in rest.into_iter().rev() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other.as_os_str()),
        }
    }
    resolved
}

/// True when `a` and `b` name the same file once aliases are resolved.
pub fn is_same_location(a: &Path, b: &Path) -> bool {
    resolve_path(a) == resolve_path(b)
}

/// Checked before any encoder is built so a bad path never reaches ffmpeg.
pub fn check_source(input: &Path) -> Result<FileSize> {
    let metadata = std::fs::metadata(input)
        .map_err(|e| GifFitError::source_unavailable(input, e.to_string()))?;
    if !metadata.is_file() {
        return Err(GifFitError::source_unavailable(input, "not a regular file"));
    }
    Ok(FileSize::new(metadata.len()))
}

pub fn convert_to_gif(
    config: &GifConversionConfig,
    observer: &mut dyn AttemptObserver,
) -> Result<LoopResult> {
    let input_size = check_source(&config.input)?;
    let request = config.to_fit_request();
    if is_same_location(&request.output, &request.source) {
        return Err(GifFitError::InvalidParameter(format!(
            "output would overwrite the input: {}",
            request.source.display()
        )));
    }

    info!(
        input = %config.input.display(),
        input_size = %input_size,
        output = %request.output.display(),
        "Converting video to GIF"
    );

    let encoder = FfmpegGifEncoder::new()?;
    SizeConstrainedEncoderLoop::new(encoder, config.fit.clone()).run_observed(&request, observer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_output_replaces_extension() {
        assert_eq!(
            determine_output_path(Path::new("/videos/demo.mp4"), None),
            PathBuf::from("/videos/demo.gif")
        );
        assert_eq!(
            determine_output_path(Path::new("clip"), None),
            PathBuf::from("clip.gif")
        );
    }

    #[test]
    fn test_explicit_output_wins() {
        assert_eq!(
            determine_output_path(Path::new("demo.mp4"), Some(Path::new("out/small.gif"))),
            PathBuf::from("out/small.gif")
        );
    }

    #[test]
    fn test_config_defaults() {
        let config = GifConversionConfig::new("demo.mov");
        assert_eq!(config.initial, EncodeParameters::default());
        assert_eq!(config.max_size, FileSize::from_mb(10));
        assert!(config.auto_optimize);

        let request = config.to_fit_request();
        assert_eq!(request.output, PathBuf::from("demo.gif"));
        assert_eq!(request.size_ceiling, FileSize::from_mb(10));
    }

    #[test]
    fn test_check_source_missing() {
        let temp = TempDir::new().unwrap();
        let err = check_source(&temp.path().join("missing.mp4")).unwrap_err();
        assert!(matches!(err, GifFitError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_check_source_directory() {
        let temp = TempDir::new().unwrap();
        let err = check_source(temp.path()).unwrap_err();
        assert!(matches!(err, GifFitError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_check_source_reports_size() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("clip.mp4");
        std::fs::write(&path, vec![0u8; 2048]).unwrap();
        assert_eq!(check_source(&path).unwrap(), FileSize::from_kb(2));
    }

    #[test]
    fn test_convert_missing_source_fails_before_encoding() {
        let temp = TempDir::new().unwrap();
        let config = GifConversionConfig::new(temp.path().join("nope.mp4"));
        let err = convert_to_gif(&config, &mut ()).unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn test_resolve_path_collapses_dot_dot() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        assert_eq!(
            resolve_path(&temp.path().join("sub/../clip.gif")),
            root.join("clip.gif")
        );
        assert_eq!(
            resolve_path(&temp.path().join("./a/./b.gif")),
            root.join("a/b.gif")
        );
    }

    #[test]
    fn test_convert_rejects_dot_dot_alias_of_input() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("clip.gif");
        std::fs::write(&input, b"GIF89a").unwrap();
        std::fs::create_dir(temp.path().join("sub")).unwrap();

        for alias in ["sub/../clip.gif", "missing/../clip.gif", "./clip.gif"] {
            let mut config = GifConversionConfig::new(&input);
            config.output = Some(temp.path().join(alias));
            let err = convert_to_gif(&config, &mut ()).unwrap_err();
            assert!(
                matches!(err, GifFitError::InvalidParameter(_)),
                "{} was not rejected: {}",
                alias,
                err
            );
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_convert_rejects_symlink_to_input() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("clip.mp4");
        std::fs::write(&input, b"not really a video").unwrap();
        let link = temp.path().join("link.gif");
        std::os::unix::fs::symlink(&input, &link).unwrap();

        let mut config = GifConversionConfig::new(&input);
        config.output = Some(link);
        let err = convert_to_gif(&config, &mut ()).unwrap_err();
        assert!(matches!(err, GifFitError::InvalidParameter(_)));
    }

    #[test]
    fn test_distinct_output_is_not_same_location() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("clip.mp4");
        std::fs::write(&input, b"x").unwrap();
        assert!(!is_same_location(&input, &temp.path().join("clip.gif")));
        assert!(is_same_location(&input, &temp.path().join("sub/../clip.mp4")));
    }

    #[test]
    fn test_convert_rejects_output_equal_to_input() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("already.gif");
        std::fs::write(&path, b"GIF89a").unwrap();
        let config = GifConversionConfig::new(&path);
        let err = convert_to_gif(&config, &mut ()).unwrap_err();
        assert!(matches!(err, GifFitError::InvalidParameter(_)));
    }
}
