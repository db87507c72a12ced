//! Delay math for consecutive retries.
//!
//! [`BackoffState`] turns a [`rebound_model::BackoffStrategy`] into concrete delays;
//! [`RandomSource`] supplies the jitter.
mod random;
pub use random::{FixedRandom, RandomHandle, RandomSource, ThreadRandom, thread_random};

mod state;
pub use state::{BackoffSequence, BackoffState};
