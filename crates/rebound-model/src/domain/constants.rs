//! Common model-level constants.
//!
//! Defaults applied when a [`crate::BackoffStrategy`] field is omitted from config.

/// Delay before the first retry, in milliseconds.
pub const DEFAULT_FIRST_MS: u64 = 100;

/// Upper bound for any retry delay, in milliseconds.
pub const DEFAULT_MAX_MS: u64 = 30_000;

/// Fraction of the base delay used as the upper bound of additive jitter.
///
/// With `0.1` a computed delay `d` becomes a random value in `[d, 1.1 * d]` before capping.
pub const DEFAULT_JITTER_RATIO: f64 = 0.1;
