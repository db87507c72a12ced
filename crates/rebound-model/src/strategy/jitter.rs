use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::error::{ModelError, ModelResult};

/// Controls how random jitter is applied to backoff delays.
///
/// Jitter spreads retries over time so that many callers failing at once do not retry in lockstep.
///
/// Strategies:
/// - `None`: No jitter. Delays are deterministic.
/// - `Additive`: Adds a uniform random value in `[0, ratio * base]` to the base delay.
///
/// The ratio itself is carried by [`crate::BackoffStrategy::jitter_ratio`].
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub enum JitterStrategy {
    /// No randomness applied.
    None,
    /// Delay is uniformly sampled from `[base, base * (1 + ratio)]`, then capped.
    #[default]
    #[serde(alias = "default")]
    Additive,
}

impl FromStr for JitterStrategy {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(JitterStrategy::None),
            "additive" | "default" => Ok(JitterStrategy::Additive),
            other => Err(ModelError::UnknownJitter(other.to_string())),
        }
    }
}
