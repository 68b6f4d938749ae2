//! vid-gif - Video to Animated GIF Under a Size Limit
//!
//! Encodes a video as a looping GIF and, when the result is too large,
//! re-encodes with cheaper settings (fewer frames per second, narrower
//! frames, smaller palette) until it fits or nothing is left to lower.
//!
//! ```rust,ignore
//! use vid_gif::{convert_to_gif, GifConversionConfig};
//!
//! let config = GifConversionConfig::new("demo.mp4");
//! let result = convert_to_gif(&config, &mut ())?;
//! println!("{} ({})", result.final_artifact_path.display(), result.final_size);
//! ```

pub mod conversion_api;
pub mod gif_encoder;
pub mod params;
pub mod policy;
pub mod report;
pub mod size_fit;


pub use conversion_api::{check_source, convert_to_gif, determine_output_path, GifConversionConfig};
pub use gif_encoder::FfmpegGifEncoder;
pub use params::{EncodeParameters, FitConfig, QualityTier};
pub use policy::{plan_adjustment, Adjustment, AdjustmentTier};
pub use report::{classify_for_github, AttemptBanner, UploadVerdict};
pub use size_fit::{
    Attempt, AttemptObserver, EncodeRequest, FitRequest, FrameEncoder, LoopResult,
    SizeConstrainedEncoderLoop, StopReason,
};

pub use shared_utils::errors::{GifFitError, Result};
pub use shared_utils::types::FileSize;
