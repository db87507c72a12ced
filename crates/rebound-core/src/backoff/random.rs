use std::sync::Arc;

use rand::Rng;

/// Source of uniform random numbers in `[0, 1)` used for jitter.
pub trait RandomSource: Send + Sync + 'static {
    /// Returns a value in `[0, 1)`.
    fn next_unit(&self) -> f64;
}

/// Shared handle to a random source.
pub type RandomHandle = Arc<dyn RandomSource>;

/// Random source backed by the thread-local generator from `rand`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    #[inline]
    fn next_unit(&self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// Deterministic random source that always yields the same value.
///
/// The value is clamped into `[0, 1)`, so `FixedRandom::new(1.0)` yields the largest value below one.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(f64);

impl FixedRandom {
    pub fn new(value: f64) -> Self {
        let value = if value.is_nan() { 0.0 } else { value };
        Self(value.clamp(0.0, 1.0 - f64::EPSILON))
    }
}

impl RandomSource for FixedRandom {
    #[inline]
    fn next_unit(&self) -> f64 {
        self.0
    }
}

/// Create a handle to the thread-local random source.
#[inline]
pub fn thread_random() -> RandomHandle {
    Arc::new(ThreadRandom)
}
