use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::error::{ModelError, ModelResult};

/// Defines how the delay between consecutive retries grows.
///
/// Policies:
/// - `Exponential`: every failure doubles the previous delay (`d, 2d, 4d, 8d, ...`).
/// - `Fibonacci`: every failure adds the two previous delays (`d, 2d, 3d, 5d, 8d, ...`).
///
/// The policy is pure data. The growth math lives in the scheduler crate.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub enum BackoffPolicy {
    /// Next delay is `current * 2`.
    #[default]
    #[serde(alias = "exp")]
    Exponential,
    /// Next delay is `current + previous`.
    #[serde(alias = "fib")]
    Fibonacci,
}

impl BackoffPolicy {
    /// Returns the canonical name of the policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackoffPolicy::Exponential => "exponential",
            BackoffPolicy::Fibonacci => "fibonacci",
        }
    }
}

impl fmt::Display for BackoffPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackoffPolicy {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exponential" | "exp" => Ok(BackoffPolicy::Exponential),
            "fibonacci" | "fib" => Ok(BackoffPolicy::Fibonacci),
            other => Err(ModelError::UnknownBackoff(other.to_string())),
        }
    }
}
