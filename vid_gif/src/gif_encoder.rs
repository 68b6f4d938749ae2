//! Video → animated GIF encoding through ffmpeg.
//!
//! One encode samples every N-th source frame (N = source fps / requested
//! fps), retimes the samples to the requested fps, area-scales them, builds a
//! palette limited to the tier's colour budget and writes a looping GIF.

use crate::params::EncodeParameters;
use crate::size_fit::{EncodeRequest, FrameEncoder};
use shared_utils::ffmpeg_process::{format_ffmpeg_error, reports_empty_output};
use shared_utils::types::FileSize;
use shared_utils::{
    create_frame_progress_bar, create_spinner, is_ffmpeg_available, probe_video, FFprobeError, FFprobeResult,
    FfmpegProcess, FfmpegProgressParser, GifFitError, Result,
};
use std::ffi::OsString;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSamplingPlan {
    /// Keep every `interval`-th source frame.
    pub interval: u64,
    /// `None` when the source frame count is unknown; ffmpeg is then the
    /// judge of whether any frame comes out.
    pub expected_frames: Option<u64>,
    pub output_width: u32,
    pub output_height: u32,
}

/// Works out sampling and output geometry for `params` against the probed
/// source.
pub fn plan_sampling(source: &FFprobeResult, params: &EncodeParameters) -> Result<FrameSamplingPlan> {
    params.validate()?;

    if source.width == 0 || source.height == 0 {
        return Err(GifFitError::InvalidParameter(format!(
            "source has no usable dimensions ({}x{})",
            source.width, source.height
        )));
    }

    let interval = ((source.frame_rate / params.sample_rate as f64).floor() as u64).max(1);
    let expected_frames = source
        .frame_count
        .filter(|&n| n > 0)
        .map(|n| n.div_ceil(interval));

    let ratio = params.target_width as f64 / source.width as f64;
    let output_height = ((source.height as f64 * ratio) as u32).max(1);

    Ok(FrameSamplingPlan {
        interval,
        expected_frames,
        output_width: params.target_width,
        output_height,
    })
}

pub fn build_filter_graph(plan: &FrameSamplingPlan, params: &EncodeParameters) -> String {
    format!(
        "select=not(mod(n\\,{interval})),setpts=N/({fps}*TB),\
         scale={w}:{h}:flags=area,split[s0][s1];\
         [s0]palettegen=max_colors={colors}:stats_mode=full[p];\
         [s1][p]paletteuse=dither=sierra2_4a",
        interval = plan.interval,
        fps = params.sample_rate,
        w = plan.output_width,
        h = plan.output_height,
        colors = params.palette_colors(),
    )
}

pub fn build_ffmpeg_args(
    source: &Path,
    output: &Path,
    plan: &FrameSamplingPlan,
    params: &EncodeParameters,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-y",
        "-hide_banner",
        "-nostats",
        "-loglevel",
        "warning",
        "-progress",
        "pipe:1",
        "-i",
    ]
    .into_iter()
    .map(OsString::from)
    .collect();
    args.push(source.as_os_str().to_os_string());
    for arg in ["-an", "-vf"] {
        args.push(arg.into());
    }
    args.push(build_filter_graph(plan, params).into());
    // -loop 0: repeat forever
    for arg in ["-loop", "0", "-f", "gif"] {
        args.push(arg.into());
    }
    args.push(output.as_os_str().to_os_string());
    args
}

/// Sibling path the encoder writes to before replacing the real output.
pub fn temp_path_for_output(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("output.gif"));
    name.push(".tmp");
    output.with_file_name(name)
}

pub struct FfmpegGifEncoder {
    probe_cache: Option<(PathBuf, FFprobeResult)>,
    attempts: u32,
}

impl FfmpegGifEncoder {
    pub fn new() -> Result<Self> {
        if !is_ffmpeg_available() {
            return Err(GifFitError::ToolNotFound(
                "ffmpeg not found. Install ffmpeg (e.g. brew install ffmpeg)".to_string(),
            ));
        }
        Ok(Self {
            probe_cache: None,
            attempts: 0,
        })
    }

    /// Probes `source` once; later calls for the same path reuse the result.
    pub fn source_info(&mut self, source: &Path) -> Result<&FFprobeResult> {
        let cached = matches!(&self.probe_cache, Some((path, _)) if path == source);
        if !cached {
            let spinner = create_spinner("Probing source");
            let probed = probe_video(source);
            spinner.finish_and_clear();
            let probe = probed.map_err(|e| match e {
                FFprobeError::ToolNotFound(msg) => GifFitError::ToolNotFound(msg),
                other => GifFitError::source_unavailable(source, other.to_string()),
            })?;
            info!(
                source = %source.display(),
                width = probe.width,
                height = probe.height,
                fps = probe.frame_rate,
                frames = ?probe.frame_count,
                "Source probed"
            );
            self.probe_cache = Some((source.to_path_buf(), probe));
        }
        match &self.probe_cache {
            Some((_, probe)) => Ok(probe),
            None => Err(GifFitError::source_unavailable(source, "probe result missing")),
        }
    }

    fn run_ffmpeg(&self, args: &[OsString], plan: &FrameSamplingPlan) -> Result<String> {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(args);

        let mut process =
            FfmpegProcess::spawn(&mut cmd).map_err(|e| GifFitError::FFmpegError(e.to_string()))?;

        let prefix = format!("Attempt {}", self.attempts);
        let bar = match plan.expected_frames {
            Some(total) => create_frame_progress_bar(total, &prefix),
            None => create_spinner(&prefix),
        };
        let mut parser = FfmpegProgressParser::new(plan.expected_frames);
        if let Some(stdout) = process.take_stdout() {
            for line in BufReader::new(stdout).lines().map_while(|l| l.ok()) {
                parser.parse_line(&line);
                let frame = parser.current_frame();
                match plan.expected_frames {
                    Some(total) => bar.set_position(frame.min(total)),
                    None => bar.set_message(format!(
                        "{} • {} frames • {:.1}s",
                        prefix,
                        frame,
                        parser.current_time()
                    )),
                }
                if parser.is_finished() {
                    if let Some(total) = plan.expected_frames {
                        bar.set_position(total);
                    }
                }
            }
        }
        bar.finish_and_clear();

        let (status, stderr) = process
            .wait_with_output()
            .map_err(|e| GifFitError::FFmpegError(e.to_string()))?;

        if !status.success() {
            if reports_empty_output(&stderr) {
                return Err(GifFitError::NoFramesProduced(format_ffmpeg_error(&stderr)));
            }
            return Err(GifFitError::FFmpegError(format!(
                "exit code {:?}: {}",
                status.code(),
                format_ffmpeg_error(&stderr)
            )));
        }
        Ok(stderr)
    }
}

impl FrameEncoder for FfmpegGifEncoder {
    fn encode(&mut self, request: &EncodeRequest<'_>) -> Result<FileSize> {
        let plan = plan_sampling(self.source_info(request.source)?, &request.params)?;
        self.attempts += 1;

        debug!(
            interval = plan.interval,
            expected_frames = ?plan.expected_frames,
            width = plan.output_width,
            height = plan.output_height,
            colors = request.params.palette_colors(),
            "Frame sampling plan"
        );

        let temp_output = temp_path_for_output(request.output);
        let args = build_ffmpeg_args(request.source, &temp_output, &plan, &request.params);

        let outcome = self.run_ffmpeg(&args, &plan).and_then(|stderr| {
            let size = fs::metadata(&temp_output)?.len();
            if size == 0 || reports_empty_output(&stderr) {
                return Err(GifFitError::NoFramesProduced(format!(
                    "ffmpeg wrote no frames for {}",
                    request.source.display()
                )));
            }
            Ok(FileSize::new(size))
        });

        match outcome {
            Ok(size) => {
                fs::rename(&temp_output, request.output)?;
                Ok(size)
            }
            Err(e) => {
                let _ = fs::remove_file(&temp_output);
                Err(e)
            }
        }
    }
}
