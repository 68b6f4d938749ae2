//! Size-constrained encode loop.
//!
//! Re-encodes the source with progressively cheaper parameters until the
//! artifact fits under the ceiling, the attempt budget runs out, or the
//! parameters cannot be lowered any further.

use crate::params::{EncodeParameters, FitConfig};
use crate::policy::{plan_adjustment, AdjustmentTier};
use serde::{Deserialize, Serialize};
use shared_utils::types::FileSize;
use shared_utils::{GifFitError, IterationGuard, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One encode invocation.
#[derive(Debug, Clone, Copy)]
pub struct EncodeRequest<'a> {
    pub source: &'a Path,
    pub output: &'a Path,
    pub params: EncodeParameters,
}

/// The codec seam. Implementations write the artifact to `request.output`
/// (replacing whatever is there) and report its size in bytes.
///
/// Must fail with `SourceUnavailable` when the source cannot be opened and
/// `NoFramesProduced` when sampling yields no frames.
pub trait FrameEncoder {
    fn encode(&mut self, request: &EncodeRequest<'_>) -> Result<FileSize>;
}

impl<E: FrameEncoder + ?Sized> FrameEncoder for &mut E {
    fn encode(&mut self, request: &EncodeRequest<'_>) -> Result<FileSize> {
        (**self).encode(request)
    }
}

/// Called after every recorded attempt; used by the CLI for its banners.
pub trait AttemptObserver {
    fn on_attempt(&mut self, attempt: &Attempt, ceiling: FileSize);
}

impl AttemptObserver for () {
    fn on_attempt(&mut self, _attempt: &Attempt, _ceiling: FileSize) {}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub attempt_index: u32,
    pub parameters: EncodeParameters,
    pub produced_size: FileSize,
    pub overshoot_ratio: f64,
    /// Tier whose step produced the next parameters, if the loop went on
    /// adjusting. A severe or moderate overshoot that could only be met by
    /// the fine step is recorded as `Fine`.
    pub adjustment: Option<AdjustmentTier>,
}

impl Attempt {
    pub fn fits(&self) -> bool {
        self.overshoot_ratio <= 1.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    TargetMet,
    OptimizationDisabled,
    FloorReached,
    AttemptsExhausted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StopReason::TargetMet => "target met",
            StopReason::OptimizationDisabled => "auto-optimize disabled",
            StopReason::FloorReached => "minimum settings reached",
            StopReason::AttemptsExhausted => "attempt budget exhausted",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopResult {
    pub final_artifact_path: PathBuf,
    pub final_size: FileSize,
    pub size_ceiling: FileSize,
    pub succeeded: bool,
    pub stop_reason: StopReason,
    pub attempts: Vec<Attempt>,
}

impl LoopResult {
    pub fn final_parameters(&self) -> Option<EncodeParameters> {
        self.attempts.last().map(|a| a.parameters)
    }
}

/// Inputs of one fitting run.
#[derive(Debug, Clone)]
pub struct FitRequest {
    pub source: PathBuf,
    pub output: PathBuf,
    pub initial: EncodeParameters,
    pub size_ceiling: FileSize,
    pub auto_optimize: bool,
}

pub struct SizeConstrainedEncoderLoop<E> {
    encoder: E,
    config: FitConfig,
}

impl<E: FrameEncoder> SizeConstrainedEncoderLoop<E> {
    pub fn new(encoder: E, config: FitConfig) -> Self {
        Self { encoder, config }
    }

    pub fn run(&mut self, request: &FitRequest) -> Result<LoopResult> {
        self.run_observed(request, &mut ())
    }

    pub fn run_observed(
        &mut self,
        request: &FitRequest,
        observer: &mut dyn AttemptObserver,
    ) -> Result<LoopResult> {
        self.config.validate()?;
        request.initial.validate()?;
        if request.size_ceiling.is_zero() {
            return Err(GifFitError::InvalidParameter(
                "size ceiling must be greater than zero".to_string(),
            ));
        }

        info!(
            source = %request.source.display(),
            output = %request.output.display(),
            ceiling = %request.size_ceiling,
            max_attempts = self.config.max_attempts,
            auto_optimize = request.auto_optimize,
            "Starting size-constrained encode"
        );

        let mut guard = IterationGuard::new(self.config.max_attempts, "gif size fitting");
        let mut attempts: Vec<Attempt> = Vec::new();
        let mut params = request.initial;
        let mut stop_reason = StopReason::AttemptsExhausted;

        while let Ok(number) = guard.increment() {
            let encode = EncodeRequest {
                source: &request.source,
                output: &request.output,
                params,
            };
            let produced_size = self.encoder.encode(&encode)?;
            let overshoot_ratio = produced_size
                .ratio_to(request.size_ceiling)
                .unwrap_or(f64::INFINITY);

            info!(
                attempt = number,
                remaining = guard.remaining(),
                params = %params,
                size = %produced_size,
                ceiling = %request.size_ceiling,
                overshoot = overshoot_ratio,
                "Encode attempt finished"
            );

            let mut attempt = Attempt {
                attempt_index: number - 1,
                parameters: params,
                produced_size,
                overshoot_ratio,
                adjustment: None,
            };

            let mut next_params = params;
            let stop = if produced_size <= request.size_ceiling {
                Some(StopReason::TargetMet)
            } else if !request.auto_optimize {
                Some(StopReason::OptimizationDisabled)
            } else if guard.is_exhausted() {
                warn!(context = guard.context(), max = guard.max(), "Attempt budget exhausted");
                Some(StopReason::AttemptsExhausted)
            } else {
                let adjustment = plan_adjustment(params, overshoot_ratio, &self.config);
                let already_tried = adjustment.next == params
                    || attempts.iter().any(|a| a.parameters == adjustment.next);

                if already_tried {
                    warn!(params = %params, "Minimum settings reached, cannot reduce further");
                    Some(StopReason::FloorReached)
                } else {
                    debug!(
                        tier = %adjustment.tier,
                        fell_back_to_fine = adjustment.fell_back_to_fine,
                        next = %adjustment.next,
                        "Adjusting parameters"
                    );
                    attempt.adjustment = Some(adjustment.applied_tier());
                    next_params = adjustment.next;
                    None
                }
            };

            observer.on_attempt(&attempt, request.size_ceiling);
            attempts.push(attempt);

            if let Some(reason) = stop {
                stop_reason = reason;
                break;
            }
            params = next_params;
        }

        let final_size = attempts
            .last()
            .map(|a| a.produced_size)
            .unwrap_or(FileSize::ZERO);
        let succeeded = stop_reason == StopReason::TargetMet;

        info!(
            succeeded,
            stop_reason = %stop_reason,
            attempts = attempts.len(),
            final_size = %final_size,
            "Size-constrained encode finished"
        );

        Ok(LoopResult {
            final_artifact_path: request.output.clone(),
            final_size,
            size_ceiling: request.size_ceiling,
            succeeded,
            stop_reason,
            attempts,
        })
    }
}
