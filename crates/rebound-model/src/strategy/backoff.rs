use serde::{Deserialize, Serialize};
use std::time::Duration;

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::{
    domain::{DEFAULT_FIRST_MS, DEFAULT_JITTER_RATIO, DEFAULT_MAX_MS, DelayMs},
    error::{ModelError, ModelResult},
    strategy::{BackoffPolicy, JitterStrategy},
};

/// Declarative retry configuration.
///
/// Describes *how long* to wait between attempts of an operation that keeps failing:
/// - growth (`policy`)
/// - bounds (`first_ms`, `max_ms`)
/// - randomization (`jitter`, `jitter_ratio`)
///
/// Missing fields fall back to the defaults in [`crate::DEFAULT_FIRST_MS`], [`crate::DEFAULT_MAX_MS`] and [`crate::DEFAULT_JITTER_RATIO`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct BackoffStrategy {
    /// How consecutive delays grow.
    pub policy: BackoffPolicy,
    /// Randomization applied on top of each computed delay.
    pub jitter: JitterStrategy,
    /// Delay before the first retry. Must be greater than zero.
    pub first_ms: DelayMs,
    /// Cap for every delay, jitter included. Must be `>= first_ms`.
    pub max_ms: DelayMs,
    /// Upper bound of additive jitter as a fraction of the base delay, in `[0, 1]`.
    pub jitter_ratio: f64,
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self {
            policy: BackoffPolicy::default(),
            jitter: JitterStrategy::default(),
            first_ms: DEFAULT_FIRST_MS,
            max_ms: DEFAULT_MAX_MS,
            jitter_ratio: DEFAULT_JITTER_RATIO,
        }
    }
}

impl BackoffStrategy {
    /// Exponential strategy with default jitter.
    pub fn exponential(first_ms: DelayMs, max_ms: DelayMs) -> Self {
        Self {
            policy: BackoffPolicy::Exponential,
            first_ms,
            max_ms,
            ..Default::default()
        }
    }

    /// Fibonacci strategy with default jitter.
    pub fn fibonacci(first_ms: DelayMs, max_ms: DelayMs) -> Self {
        Self {
            policy: BackoffPolicy::Fibonacci,
            first_ms,
            max_ms,
            ..Default::default()
        }
    }

    /// Replace the jitter strategy and return the updated value.
    pub fn with_jitter(mut self, jitter: JitterStrategy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before the first retry.
    #[inline]
    pub fn first(&self) -> Duration {
        Duration::from_millis(self.first_ms)
    }

    /// Cap applied to every delay.
    #[inline]
    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }

    /// Effective jitter ratio: `0.0` when jitter is disabled.
    #[inline]
    pub fn effective_jitter_ratio(&self) -> f64 {
        match self.jitter {
            JitterStrategy::None => 0.0,
            JitterStrategy::Additive => self.jitter_ratio,
        }
    }

    /// Check the bounds required by the scheduler.
    ///
    /// Rejects:
    /// - `first_ms == 0`
    /// - `max_ms < first_ms`
    /// - a non-finite `jitter_ratio` or one outside `[0, 1]`
    pub fn validate(&self) -> ModelResult<()> {
        if self.first_ms == 0 {
            return Err(ModelError::Invalid("firstMs must be greater than zero".into()));
        }
        if self.max_ms < self.first_ms {
            return Err(ModelError::Invalid(format!(
                "maxMs ({}) must be >= firstMs ({})",
                self.max_ms, self.first_ms
            )));
        }
        if !self.jitter_ratio.is_finite() || !(0.0..=1.0).contains(&self.jitter_ratio) {
            return Err(ModelError::Invalid(format!(
                "jitterRatio must be within [0, 1], got {}",
                self.jitter_ratio
            )));
        }
        Ok(())
    }
}
