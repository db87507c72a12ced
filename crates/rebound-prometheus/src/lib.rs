//! Prometheus backend for `rebound-core` retry metrics.
//!
//! ```rust
//! use std::sync::Arc;
//! use rebound_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let handle: rebound_core::MetricsHandle = Arc::new(metrics.clone());
//! // pass `handle` to `BackoffScheduler::with_metrics`
//! # let _ = handle;
//!
//! let body = metrics.encode_text()?;
//! # let _ = body;
//! # Ok(())
//! # }
//! ```
//!
//! No HTTP endpoint is provided; serve [`PrometheusMetrics::encode_text`] from
//! whatever server the application already runs.

mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
