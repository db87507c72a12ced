use std::time::Duration;

use rebound_model::{BackoffPolicy, BackoffStrategy};

use super::random::RandomSource;

/// Delay bookkeeping for one pending retry.
///
/// A state is created on the first failure and replaced by [`BackoffState::next`] on every further failure.
/// It is never mutated in place.
///
/// Two values are tracked:
/// - `current`/`previous`: pre-jitter delays (capped at `max`) that drive growth;
/// - `delay`: the jittered delay that is actually waited, also capped at `max`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffState {
    policy: BackoffPolicy,
    current: Duration,
    previous: Duration,
    max: Duration,
    jitter_ratio: f64,
    delay: Duration,
}

impl BackoffState {
    /// State for the first retry.
    ///
    /// The pre-jitter delay is `first` (clamped to `max`); for Fibonacci the previous delay is seeded with the same value.
    pub fn first(strategy: &BackoffStrategy, random: &dyn RandomSource) -> Self {
        let max = strategy.max();
        let current = strategy.first().min(max);
        let jitter_ratio = strategy.effective_jitter_ratio();

        Self {
            policy: strategy.policy,
            current,
            previous: current,
            max,
            jitter_ratio,
            delay: apply_jitter(current, jitter_ratio, max, random),
        }
    }

    /// State for the retry that follows a failure of the retry described by `self`.
    pub fn next(&self, random: &dyn RandomSource) -> Self {
        let current = grow(self.policy, self.current, self.previous).min(self.max);

        Self {
            policy: self.policy,
            current,
            previous: self.current,
            max: self.max,
            jitter_ratio: self.jitter_ratio,
            delay: apply_jitter(current, self.jitter_ratio, self.max, random),
        }
    }

    /// Delay to wait before the retry, jitter included.
    #[inline]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Pre-jitter delay.
    #[inline]
    pub fn base(&self) -> Duration {
        self.current
    }

    /// Pre-jitter delay of the preceding retry.
    #[inline]
    pub fn previous(&self) -> Duration {
        self.previous
    }

    #[inline]
    pub fn max(&self) -> Duration {
        self.max
    }

    #[inline]
    pub fn policy(&self) -> BackoffPolicy {
        self.policy
    }
}

/// Infinite sequence of backoff states for consecutive failures.
///
/// Useful for previewing a strategy without running anything.
pub struct BackoffSequence<'a> {
    strategy: &'a BackoffStrategy,
    random: &'a dyn RandomSource,
    last: Option<BackoffState>,
}

impl<'a> BackoffSequence<'a> {
    pub fn new(strategy: &'a BackoffStrategy, random: &'a dyn RandomSource) -> Self {
        Self {
            strategy,
            random,
            last: None,
        }
    }
}

impl Iterator for BackoffSequence<'_> {
    type Item = BackoffState;

    fn next(&mut self) -> Option<Self::Item> {
        let next = match &self.last {
            None => BackoffState::first(self.strategy, self.random),
            Some(prev) => prev.next(self.random),
        };
        self.last = Some(next);
        Some(next)
    }
}

fn grow(policy: BackoffPolicy, current: Duration, previous: Duration) -> Duration {
    match policy {
        BackoffPolicy::Exponential => current.checked_mul(2).unwrap_or(Duration::MAX),
        BackoffPolicy::Fibonacci => current.saturating_add(previous),
    }
}

/// Adds a uniform value in `[0, ratio * base)` to `base` and caps the result at `max`.
fn apply_jitter(base: Duration, ratio: f64, max: Duration, random: &dyn RandomSource) -> Duration {
    if ratio <= 0.0 {
        return base.min(max);
    }
    let extra = Duration::try_from_secs_f64(base.as_secs_f64() * ratio * random.next_unit())
        .unwrap_or(Duration::ZERO);
    base.saturating_add(extra).min(max)
}
