mod backoff;
pub use backoff::BackoffStrategy;

mod jitter;
pub use jitter::JitterStrategy;

mod policy;
pub use policy::BackoffPolicy;
