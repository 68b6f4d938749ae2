use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, Level};

use shared_utils::logging::{init_logging, LogConfig};
use vid_gif::params::{DEFAULT_MAX_SIZE_MB, DEFAULT_SAMPLE_RATE, DEFAULT_TARGET_WIDTH};
use vid_gif::report::{print_result, AttemptBanner};
use vid_gif::{
    check_source, classify_for_github, convert_to_gif, EncodeParameters, FileSize, FitConfig,
    GifConversionConfig, LoopResult, QualityTier, UploadVerdict,
};

#[derive(Parser)]
#[command(name = "vid-gif")]
#[command(
    version,
    about = "Convert a video to an animated GIF that fits under a size limit",
    long_about = None,
    after_help = "Examples:\n  vid-gif demo.mp4\n  vid-gif demo.mp4 demo.gif 12 640 high 8\n  vid-gif demo.mp4 -o 5"
)]
struct Cli {
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Defaults to INPUT with a .gif extension
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Frames sampled per second
    #[arg(value_name = "FPS", default_value_t = DEFAULT_SAMPLE_RATE)]
    fps: u32,

    #[arg(value_name = "WIDTH", default_value_t = DEFAULT_TARGET_WIDTH)]
    width: u32,

    #[arg(value_name = "QUALITY", value_enum, default_value_t = QualityTier::Medium)]
    quality: QualityTier,

    #[arg(value_name = "MAX_MB", default_value_t = DEFAULT_MAX_SIZE_MB)]
    max_mb: f64,

    /// Default settings, only choose the size limit
    #[arg(
        short = 'o',
        long = "optimize",
        value_name = "MAX_MB",
        num_args = 0..=1,
        default_missing_value = "10",
        conflicts_with_all = ["output", "fps", "width", "quality", "max_mb"]
    )]
    optimize: Option<f64>,

    /// Encode once with the given settings, even if too large
    #[arg(long)]
    no_optimize: bool,

    #[arg(long, default_value_t = shared_utils::types::iteration::DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,

    #[arg(long, default_value_t = vid_gif::params::MIN_TARGET_WIDTH)]
    min_width: u32,

    #[arg(long, default_value_t = vid_gif::params::MIN_SAMPLE_RATE)]
    min_fps: u32,

    /// Print the result as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Exit with status 2 when the GIF is still over the limit
    #[arg(long)]
    strict: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    result: &'a LoopResult,
    input_size: FileSize,
    github: UploadVerdict,
}

impl Cli {
    fn conversion_config(&self) -> GifConversionConfig {
        let fit = FitConfig::new()
            .with_max_attempts(self.max_attempts)
            .with_min_width(self.min_width)
            .with_min_sample_rate(self.min_fps);

        let mut config = GifConversionConfig::new(&self.input);
        config.fit = fit;
        config.auto_optimize = !self.no_optimize;
        match self.optimize {
            Some(max_mb) => {
                config.max_size = FileSize::from_mb_f64(max_mb);
            }
            None => {
                config.output = self.output.clone();
                config.initial = EncodeParameters::new(self.fps, self.width, self.quality);
                config.max_size = FileSize::from_mb_f64(self.max_mb);
            }
        }
        config
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.json {
        shared_utils::enable_quiet_mode();
    }

    let log_config = LogConfig::default()
        .with_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_stderr(cli.verbose && !cli.json);
    if let Err(e) = init_logging("vid_gif", log_config) {
        eprintln!("⚠️  Could not initialise logging: {}", e);
    }

    let config = cli.conversion_config();
    let input_size = check_source(&config.input)?;

    info!("🎬 Video → GIF");
    info!("   Start: {}", config.initial);
    info!("   Limit: {} (auto-optimize: {})", config.max_size, config.auto_optimize);

    let result = if cli.json {
        convert_to_gif(&config, &mut ())?
    } else {
        convert_to_gif(&config, &mut AttemptBanner::new())?
    };

    if cli.json {
        let report = JsonReport {
            result: &result,
            input_size,
            github: classify_for_github(result.final_size, result.size_ceiling),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_result(&result, input_size);
    }

    if cli.strict && !result.succeeded {
        std::process::exit(2);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_defaults() {
        let cli = Cli::try_parse_from(["vid-gif", "demo.mp4"]).unwrap();
        let config = cli.conversion_config();
        assert_eq!(config.initial, EncodeParameters::default());
        assert_eq!(config.max_size, FileSize::from_mb(10));
        assert_eq!(config.output_path(), PathBuf::from("demo.gif"));
        assert!(config.auto_optimize);
    }

    #[test]
    fn test_full_positionals() {
        let cli =
            Cli::try_parse_from(["vid-gif", "in.mov", "out.gif", "12", "640", "high", "2.5"])
                .unwrap();
        let config = cli.conversion_config();
        assert_eq!(config.initial, EncodeParameters::new(12, 640, QualityTier::High));
        assert_eq!(config.max_size, FileSize::from_mb_f64(2.5));
        assert_eq!(config.output_path(), PathBuf::from("out.gif"));
    }

    #[test]
    fn test_optimize_shorthand() {
        let cli = Cli::try_parse_from(["vid-gif", "in.mov", "-o", "5"]).unwrap();
        let config = cli.conversion_config();
        assert_eq!(config.max_size, FileSize::from_mb(5));
        assert_eq!(config.initial, EncodeParameters::default());

        let cli = Cli::try_parse_from(["vid-gif", "in.mov", "-o"]).unwrap();
        assert_eq!(cli.conversion_config().max_size, FileSize::from_mb(10));
    }

    #[test]
    fn test_optimize_conflicts_with_positionals() {
        assert!(Cli::try_parse_from(["vid-gif", "in.mov", "out.gif", "-o", "5"]).is_err());
    }

    #[test]
    fn test_unknown_quality_rejected() {
        assert!(
            Cli::try_parse_from(["vid-gif", "in.mov", "out.gif", "10", "480", "ultra"]).is_err()
        );
    }

    #[test]
    fn test_policy_flags() {
        let cli = Cli::try_parse_from([
            "vid-gif",
            "in.mov",
            "--no-optimize",
            "--max-attempts",
            "4",
            "--min-width",
            "200",
            "--min-fps",
            "6",
        ])
        .unwrap();
        let config = cli.conversion_config();
        assert!(!config.auto_optimize);
        assert_eq!(config.fit.max_attempts, 4);
        assert_eq!(config.fit.min_width, 200);
        assert_eq!(config.fit.min_sample_rate, 6);
    }
}
