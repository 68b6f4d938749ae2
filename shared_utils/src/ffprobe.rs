//! FFprobe wrapper module
//!
//! Reads the source geometry and frame timing the GIF encoder needs.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FFprobeError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),
    #[error("FFprobe failed: {0}")]
    ExecutionFailed(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FFprobeResult {
    pub format_name: String,
    pub duration: f64,
    pub size: u64,
    pub video_codec: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    /// `None` when the container reports neither a frame count nor a
    /// duration.
    pub frame_count: Option<u64>,
}

pub fn is_ffprobe_available() -> bool {
    which::which("ffprobe").is_ok()
}

pub fn probe_video(path: &Path) -> Result<FFprobeResult, FFprobeError> {
    if !is_ffprobe_available() {
        return Err(FFprobeError::ToolNotFound(
            "ffprobe not found. Install ffmpeg (e.g. brew install ffmpeg)".to_string(),
        ));
    }

    if !path.exists() {
        return Err(FFprobeError::ExecutionFailed(format!(
            "File not found: {}",
            path.display()
        )));
    }

    if !path.is_file() {
        return Err(FFprobeError::ExecutionFailed(format!(
            "Not a file (is it a directory?): {}",
            path.display()
        )));
    }

    let output = Command::new("ffprobe")
        .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams", "--"])
        .arg(path)
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let error_msg = if stderr.trim().is_empty() {
            format!(
                "ffprobe failed to analyze file: {} (exit code: {:?})",
                path.display(),
                output.status.code()
            )
        } else {
            format!("ffprobe error for '{}': {}", path.display(), stderr.trim())
        };
        return Err(FFprobeError::ExecutionFailed(error_msg));
    }

    let result = parse_probe_json(&String::from_utf8_lossy(&output.stdout))?;
    tracing::debug!(
        path = %path.display(),
        width = result.width,
        height = result.height,
        frame_rate = result.frame_rate,
        frame_count = ?result.frame_count,
        "Probed source video"
    );
    Ok(result)
}

/// Parses `ffprobe -print_format json -show_format -show_streams` output.
pub fn parse_probe_json(json_str: &str) -> Result<FFprobeResult, FFprobeError> {
    let json: serde_json::Value =
        serde_json::from_str(json_str).map_err(|e| FFprobeError::ParseError(e.to_string()))?;

    let format = &json["format"];
    let format_name = format["format_name"]
        .as_str()
        .unwrap_or("unknown")
        .to_string();
    let duration = format["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);
    let size = format["size"]
        .as_str()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    let streams = json["streams"]
        .as_array()
        .ok_or_else(|| FFprobeError::ParseError("No streams found".to_string()))?;

    let video_stream = streams
        .iter()
        .find(|s| s["codec_type"].as_str() == Some("video"))
        .ok_or_else(|| FFprobeError::ParseError("No video stream found".to_string()))?;

    let video_codec = video_stream["codec_name"]
        .as_str()
        .unwrap_or("unknown")
        .to_string();
    let width = video_stream["width"].as_u64().unwrap_or(0) as u32;
    let height = video_stream["height"].as_u64().unwrap_or(0) as u32;
    if width == 0 || height == 0 {
        return Err(FFprobeError::ParseError(format!(
            "Video stream has no usable dimensions ({}x{})",
            width, height
        )));
    }

    let frame_rate = parse_frame_rate(video_stream["r_frame_rate"].as_str().unwrap_or("0/1"));

    // Stream-level duration is more reliable for containers with cover art.
    let duration = video_stream["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(duration);

    let frame_count = video_stream["nb_frames"]
        .as_str()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|&n| n > 0)
        .or_else(|| Some((duration * frame_rate) as u64).filter(|&n| n > 0));

    Ok(FFprobeResult {
        format_name,
        duration,
        size,
        video_codec,
        width,
        height,
        frame_rate,
        frame_count,
    })
}

const FALLBACK_FRAME_RATE: f64 = 24.0;

pub fn parse_frame_rate(s: &str) -> f64 {
    if let Some((num, den)) = s.split_once('/') {
        let num = num.parse::<f64>().unwrap_or(0.0);
        let den = den.parse::<f64>().unwrap_or(0.0);
        if den > 0.0 {
            let rate = num / den;
            if rate > 0.0 {
                return rate;
            }
        }
    }
    match s.parse::<f64>() {
        Ok(v) if v > 0.0 => v,
        _ => {
            if !s.is_empty() && s != "0" && s != "0/1" {
                tracing::warn!(
                    value = s,
                    fallback = FALLBACK_FRAME_RATE,
                    "Failed to parse frame rate, using fallback"
                );
            }
            FALLBACK_FRAME_RATE
        }
    }
}
