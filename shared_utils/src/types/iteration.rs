//! IterationGuard - attempt budget for search loops
//!
//! Bounds how many encode attempts a fitting run may make.

use std::fmt;
use tracing::warn;

/// Attempts a fitting run makes unless configured otherwise.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Hard cap regardless of configuration.
pub const EMERGENCY_MAX_ATTEMPTS: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct IterationError {
    pub current: u32,
    pub max: u32,
    pub context: String,
}

impl fmt::Display for IterationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Iteration limit exceeded: {}/{} in {}",
            self.current, self.max, self.context
        )
    }
}

impl std::error::Error for IterationError {}

#[derive(Debug, Clone)]
pub struct IterationGuard {
    current: u32,
    max: u32,
    context: String,
}

impl IterationGuard {
    pub fn new(max: u32, context: &str) -> Self {
        if max > EMERGENCY_MAX_ATTEMPTS {
            warn!(
                requested = max,
                cap = EMERGENCY_MAX_ATTEMPTS,
                context,
                "Iteration budget above hard cap, clamping"
            );
        }
        Self {
            current: 0,
            max: max.min(EMERGENCY_MAX_ATTEMPTS),
            context: context.to_string(),
        }
    }

    /// Claims the next iteration. Returns its 1-based number, or an error
    /// once the budget is spent.
    pub fn increment(&mut self) -> Result<u32, IterationError> {
        if self.current >= self.max {
            return Err(IterationError {
                current: self.current + 1,
                max: self.max,
                context: self.context.clone(),
            });
        }
        self.current += 1;
        Ok(self.current)
    }

    #[inline]
    pub fn current(&self) -> u32 {
        self.current
    }

    #[inline]
    pub fn max(&self) -> u32 {
        self.max
    }

    #[inline]
    pub fn remaining(&self) -> u32 {
        self.max.saturating_sub(self.current)
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.current >= self.max
    }

    pub fn context(&self) -> &str {
        &self.context
    }
}
