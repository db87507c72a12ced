//! Logging setup for the rebound crates: text, JSON or journald output through
//! `tracing-subscriber`, configured from code or `REBOUND_LOG*` variables.
mod logger;
pub use logger::*;
