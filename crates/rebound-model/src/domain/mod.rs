mod constants;
pub use constants::{DEFAULT_FIRST_MS, DEFAULT_JITTER_RATIO, DEFAULT_MAX_MS};

/// Delay value in milliseconds.
///
/// Used in serialized strategies where a plain integer is easier to write by hand than a duration literal.
pub type DelayMs = u64;
