mod domain;
pub use domain::{DEFAULT_FIRST_MS, DEFAULT_JITTER_RATIO, DEFAULT_MAX_MS, DelayMs};

mod error;
pub use error::{ModelError, ModelResult};

mod strategy;
pub use strategy::{BackoffPolicy, BackoffStrategy, JitterStrategy};
