//! Encode parameters and the fitting policy configuration.

use serde::{Deserialize, Serialize};
use shared_utils::types::iteration::{DEFAULT_MAX_ATTEMPTS, EMERGENCY_MAX_ATTEMPTS};
use shared_utils::{GifFitError, Result};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_SAMPLE_RATE: u32 = 10;
pub const DEFAULT_TARGET_WIDTH: u32 = 480;
pub const DEFAULT_MAX_SIZE_MB: f64 = 10.0;

pub const MIN_TARGET_WIDTH: u32 = 160;
pub const MIN_SAMPLE_RATE: u32 = 5;

// ============================================================================
// QualityTier
// ============================================================================

/// Palette budget. Ordered `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    Medium,
    High,
}

impl QualityTier {
    pub const fn palette_colors(self) -> u16 {
        match self {
            QualityTier::Low => 32,
            QualityTier::Medium => 64,
            QualityTier::High => 128,
        }
    }

    /// One step toward `Low`; `Low` stays `Low`.
    pub const fn step_down(self) -> Self {
        match self {
            QualityTier::High => QualityTier::Medium,
            QualityTier::Medium | QualityTier::Low => QualityTier::Low,
        }
    }

    pub const fn is_lowest(self) -> bool {
        matches!(self, QualityTier::Low)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Low => "low",
            QualityTier::Medium => "medium",
            QualityTier::High => "high",
        }
    }
}

impl Default for QualityTier {
    fn default() -> Self {
        QualityTier::Medium
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityTier {
    type Err = GifFitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(QualityTier::Low),
            "medium" => Ok(QualityTier::Medium),
            "high" => Ok(QualityTier::High),
            other => Err(GifFitError::InvalidParameter(format!(
                "unknown quality '{}' (expected low, medium or high)",
                other
            ))),
        }
    }
}

// ============================================================================
// EncodeParameters
// ============================================================================

/// Settings for one encode attempt. Height follows the source aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncodeParameters {
    /// Frames sampled per second of source.
    pub sample_rate: u32,
    pub target_width: u32,
    pub quality: QualityTier,
}

impl EncodeParameters {
    pub fn new(sample_rate: u32, target_width: u32, quality: QualityTier) -> Self {
        Self {
            sample_rate,
            target_width,
            quality,
        }
    }

    pub fn palette_colors(&self) -> u16 {
        self.quality.palette_colors()
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(GifFitError::InvalidParameter(
                "sample rate must be positive".to_string(),
            ));
        }
        if self.target_width == 0 {
            return Err(GifFitError::InvalidParameter(
                "target width must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// At or below every configured minimum, with the lowest palette.
    pub fn is_floor(&self, config: &FitConfig) -> bool {
        self.target_width <= config.min_width
            && self.sample_rate <= config.min_sample_rate
            && self.quality.is_lowest()
    }

    /// No field is larger than in `earlier`.
    pub fn never_exceeds(&self, earlier: &EncodeParameters) -> bool {
        self.sample_rate <= earlier.sample_rate
            && self.target_width <= earlier.target_width
            && self.quality <= earlier.quality
    }
}

impl Default for EncodeParameters {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE, DEFAULT_TARGET_WIDTH, QualityTier::Medium)
    }
}

impl fmt::Display for EncodeParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fps={}, width={}, quality={} ({} colors)",
            self.sample_rate,
            self.target_width,
            self.quality,
            self.palette_colors()
        )
    }
}

// ============================================================================
// FitConfig
// ============================================================================

/// Policy constants for the size-fitting loop. Tier boundaries and step
/// sizes are empirical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    pub min_width: u32,
    pub min_sample_rate: u32,
    pub max_attempts: u32,
    /// Overshoot above this is "severe".
    pub severe_ratio: f64,
    /// Overshoot above this (and not severe) is "moderate".
    pub moderate_ratio: f64,
    pub severe_width_factor: f64,
    pub moderate_width_factor: f64,
    pub fine_width_factor: f64,
    pub severe_rate_step: u32,
    pub moderate_rate_step: u32,
    pub fine_rate_step: u32,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            min_width: MIN_TARGET_WIDTH,
            min_sample_rate: MIN_SAMPLE_RATE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            severe_ratio: 2.0,
            moderate_ratio: 1.5,
            severe_width_factor: 0.6,
            moderate_width_factor: 0.75,
            fine_width_factor: 0.8,
            severe_rate_step: 2,
            moderate_rate_step: 1,
            fine_rate_step: 2,
        }
    }
}

impl FitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_width(mut self, width: u32) -> Self {
        self.min_width = width;
        self
    }

    pub fn with_min_sample_rate(mut self, rate: u32) -> Self {
        self.min_sample_rate = rate;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_tier_ratios(mut self, moderate: f64, severe: f64) -> Self {
        self.moderate_ratio = moderate;
        self.severe_ratio = severe;
        self
    }

    /// The floor state `{min_width, min_sample_rate, Low}`.
    pub fn floor(&self) -> EncodeParameters {
        EncodeParameters::new(self.min_sample_rate, self.min_width, QualityTier::Low)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 || self.max_attempts > EMERGENCY_MAX_ATTEMPTS {
            return Err(GifFitError::InvalidParameter(format!(
                "max attempts must be between 1 and {} (got {})",
                EMERGENCY_MAX_ATTEMPTS, self.max_attempts
            )));
        }
        if self.min_width == 0 || self.min_sample_rate == 0 {
            return Err(GifFitError::InvalidParameter(
                "minimum width and sample rate must be positive".to_string(),
            ));
        }
        if !(self.moderate_ratio >= 1.0 && self.severe_ratio >= self.moderate_ratio) {
            return Err(GifFitError::InvalidParameter(format!(
                "tier ratios must satisfy 1.0 <= moderate ({}) <= severe ({})",
                self.moderate_ratio, self.severe_ratio
            )));
        }
        for factor in [
            self.severe_width_factor,
            self.moderate_width_factor,
            self.fine_width_factor,
        ] {
            if !(factor > 0.0 && factor < 1.0) {
                return Err(GifFitError::InvalidParameter(format!(
                    "width factor {} must be in (0, 1)",
                    factor
                )));
            }
        }
        Ok(())
    }
}
